//! Session-token identifiers.

use core::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Alphabet session-token identifiers are drawn from.
const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Errors that can occur when parsing a [`TokenId`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum TokenIdError {
    /// Wrong length after trimming.
    #[error("token id must be exactly {expected} characters")]
    WrongLength {
        /// Required identifier length.
        expected: usize,
    },
    /// A character outside `a-z0-9`.
    #[error("token id may only contain lowercase letters and digits")]
    InvalidCharacter,
}

/// An opaque bearer-token identifier: 20 lowercase alphanumeric characters.
///
/// The identifier is both the bearer secret and the token's storage key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct TokenId(String);

impl TokenId {
    /// Fixed identifier length.
    pub const LENGTH: usize = 20;

    /// Draw a fresh random identifier from a uniform distribution over
    /// lowercase alphanumerics.
    #[must_use]
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let id = (0..Self::LENGTH)
            .map(|_| {
                let idx = rng.random_range(0..ALPHABET.len());
                char::from(ALPHABET[idx])
            })
            .collect();
        Self(id)
    }

    /// Parse a `TokenId` from a string, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns a [`TokenIdError`] if the input is not exactly 20 lowercase
    /// alphanumeric characters.
    pub fn parse(s: &str) -> Result<Self, TokenIdError> {
        let s = s.trim();
        if s.len() != Self::LENGTH {
            return Err(TokenIdError::WrongLength {
                expected: Self::LENGTH,
            });
        }
        if !s.bytes().all(|b| ALPHABET.contains(&b)) {
            return Err(TokenIdError::InvalidCharacter);
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TokenId {
    type Err = TokenIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for TokenId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
