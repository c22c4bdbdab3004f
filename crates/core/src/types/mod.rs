//! Core types for the Stonefire backend.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod amount;
pub mod email;
pub mod status;
pub mod token;

pub use amount::Amount;
pub use email::{Email, EmailError};
pub use status::{OrderStatus, PayStatus};
pub use token::{TokenId, TokenIdError};
