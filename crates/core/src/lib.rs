//! Stonefire Core - Shared types library.
//!
//! This crate provides the common domain types used across the Stonefire
//! backend (currently the ordering API service).
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for emails, money amounts, session-token
//!   identifiers, and order statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
