//! Stonefire ordering API library.
//!
//! This crate provides the ordering service as a library, allowing the
//! router to be exercised in tests against in-memory collaborators.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
