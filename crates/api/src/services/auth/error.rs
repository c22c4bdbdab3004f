//! Session service errors.

use thiserror::Error;

use stonefire_core::EmailError;

use crate::store::StoreError;

/// Errors that can occur during account and session operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// An account already exists for this email.
    #[error("a user with that email already exists")]
    DuplicateIdentity,

    /// No account exists for this email.
    #[error("could not find the specified user")]
    UnknownAccount,

    /// The password hash did not match.
    #[error("password is incorrect")]
    BadCredentials,

    /// The bearer token is missing, mismatched, or expired.
    #[error("missing required token in header, or token is invalid")]
    Forbidden,

    /// The token has already expired and cannot be extended.
    #[error("the token has already expired, and cannot be extended")]
    AlreadyExpired,

    /// No token record exists for this id.
    #[error("could not find the specified token")]
    TokenNotFound,

    /// The token id is not in the account's session set.
    #[error("the token does not belong to the user")]
    NotInSession,

    /// A profile update with no fields to change.
    #[error("missing fields to update")]
    NothingToUpdate,

    /// The email shape is invalid.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// The account was deleted but some of its tokens were not.
    #[error("account deleted, but not all of its session tokens were removed")]
    CascadeIncomplete,

    /// The record store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
