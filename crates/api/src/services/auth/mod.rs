//! Credential and session management.
//!
//! Passwords are hashed with a deterministic keyed HMAC-SHA256 so the same
//! password always produces the same digest for a given hashing secret;
//! login compares digests, never plaintext. Session tokens are opaque
//! 20-character bearer credentials with a one-hour TTL.

mod error;

pub use error::AuthError;

use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use stonefire_core::{Email, TokenId};

use crate::models::{Account, SessionToken};
use crate::services::{decode, encode};
use crate::store::{RecordStore, StoreError, collections};

type HmacSha256 = Hmac<Sha256>;

/// Session-token time to live.
const TOKEN_TTL: Duration = Duration::hours(1);

/// Fields of a profile update; at least one must be set.
#[derive(Debug, Default, Clone)]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
    pub password: Option<String>,
}

impl AccountUpdate {
    fn is_empty(&self) -> bool {
        self.name.is_none() && self.address.is_none() && self.password.is_none()
    }
}

/// Account and session service.
pub struct SessionService<'a, S> {
    store: &'a S,
    hashing_secret: &'a SecretString,
}

impl<'a, S: RecordStore> SessionService<'a, S> {
    /// Create a new session service over the given store.
    #[must_use]
    pub const fn new(store: &'a S, hashing_secret: &'a SecretString) -> Self {
        Self {
            store,
            hashing_secret,
        }
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::DuplicateIdentity` if an account already exists
    /// for the email.
    pub async fn register(
        &self,
        name: &str,
        email: &Email,
        address: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        let account = Account {
            name: name.to_owned(),
            email: email.clone(),
            address: address.to_owned(),
            hashed_password: hash_password(self.hashing_secret, password),
            tokens: Vec::new(),
        };

        self.store
            .create(collections::USERS, email.as_str(), &encode(&account)?)
            .await
            .map_err(|e| match e {
                StoreError::AlreadyExists => AuthError::DuplicateIdentity,
                other => AuthError::Store(other),
            })
    }

    /// Read an account. The password hash stays in the model; responses
    /// strip it at the serialization boundary.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnknownAccount` if no account exists.
    pub async fn account(&self, email: &Email) -> Result<Account, AuthError> {
        let doc = self
            .store
            .read(collections::USERS, email.as_str())
            .await
            .map_err(|e| match e {
                StoreError::NotFound => AuthError::UnknownAccount,
                other => AuthError::Store(other),
            })?;
        Ok(decode(doc)?)
    }

    /// Apply a profile update; rehashes the password when one is supplied.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NothingToUpdate` if no field is set, and
    /// `AuthError::UnknownAccount` if the account does not exist.
    pub async fn update_account(
        &self,
        email: &Email,
        update: AccountUpdate,
    ) -> Result<(), AuthError> {
        if update.is_empty() {
            return Err(AuthError::NothingToUpdate);
        }

        let mut account = self.account(email).await?;
        if let Some(name) = update.name {
            account.name = name;
        }
        if let Some(address) = update.address {
            account.address = address;
        }
        if let Some(password) = update.password {
            account.hashed_password = hash_password(self.hashing_secret, &password);
        }

        self.store
            .update(collections::USERS, email.as_str(), &encode(&account)?)
            .await?;
        Ok(())
    }

    /// Delete an account and cascade-delete its session tokens.
    ///
    /// The account record goes first; token deletions follow one by one.
    /// If any token deletion fails the cascade keeps going, and the partial
    /// outcome is reported as `CascadeIncomplete` rather than rolled back.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnknownAccount` if the account does not exist.
    pub async fn delete_account(&self, email: &Email) -> Result<(), AuthError> {
        let account = self.account(email).await?;

        self.store
            .delete(collections::USERS, email.as_str())
            .await?;

        let mut cascade_failed = false;
        for token_id in &account.tokens {
            if let Err(e) = self
                .store
                .delete(collections::TOKENS, token_id.as_str())
                .await
            {
                tracing::warn!(token = %token_id, error = %e, "token cascade deletion failed");
                cascade_failed = true;
            }
        }

        if cascade_failed {
            return Err(AuthError::CascadeIncomplete);
        }
        Ok(())
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Exchange credentials for a fresh session token.
    ///
    /// Two independent writes: the token record is created first, then the
    /// id is appended to the account's session set. A crash in between
    /// leaves a token record the account does not list - a documented
    /// partial state, not rolled back.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UnknownAccount` or `AuthError::BadCredentials`.
    pub async fn authenticate(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<SessionToken, AuthError> {
        let mut account = self.account(email).await?;

        if hash_password(self.hashing_secret, password) != account.hashed_password {
            return Err(AuthError::BadCredentials);
        }

        let token = SessionToken {
            id: TokenId::generate(),
            email: email.clone(),
            expires: Utc::now() + TOKEN_TTL,
        };

        self.store
            .create(collections::TOKENS, token.id.as_str(), &encode(&token)?)
            .await?;

        account.tokens.push(token.id.clone());
        self.store
            .update(collections::USERS, email.as_str(), &encode(&account)?)
            .await?;

        Ok(token)
    }

    /// Check that a token exists, belongs to the claimed identity, and has
    /// not expired. Expired tokens are reported invalid but not deleted.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Forbidden` on any failure; callers get no hint
    /// which check failed.
    pub async fn validate(&self, token_id: &TokenId, email: &Email) -> Result<(), AuthError> {
        let Ok(doc) = self.store.read(collections::TOKENS, token_id.as_str()).await else {
            return Err(AuthError::Forbidden);
        };
        let token: SessionToken = decode(doc)?;

        if token.email != *email || token.is_expired(Utc::now()) {
            return Err(AuthError::Forbidden);
        }
        Ok(())
    }

    /// Read a token record.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenNotFound` if absent.
    pub async fn token(&self, token_id: &TokenId) -> Result<SessionToken, AuthError> {
        let doc = self
            .store
            .read(collections::TOKENS, token_id.as_str())
            .await
            .map_err(|e| match e {
                StoreError::NotFound => AuthError::TokenNotFound,
                other => AuthError::Store(other),
            })?;
        Ok(decode(doc)?)
    }

    /// Push an unexpired token's expiry out to now + TTL.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AlreadyExpired` when the expiry has passed; the
    /// stored record is left untouched in that case.
    pub async fn extend(&self, token_id: &TokenId) -> Result<SessionToken, AuthError> {
        let mut token = self.token(token_id).await?;

        if token.is_expired(Utc::now()) {
            return Err(AuthError::AlreadyExpired);
        }

        token.expires = Utc::now() + TOKEN_TTL;
        self.store
            .update(collections::TOKENS, token_id.as_str(), &encode(&token)?)
            .await?;
        Ok(token)
    }

    /// Log out: remove the token from the account's session set, then
    /// delete the record. Both writes must succeed; a failure after the
    /// first write leaves a dangling record and is reported, not undone.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotInSession` if the account does not list the
    /// token, and `AuthError::TokenNotFound` if the record is absent.
    pub async fn revoke(&self, token_id: &TokenId, email: &Email) -> Result<(), AuthError> {
        let mut account = self.account(email).await?;

        let position = account
            .tokens
            .iter()
            .position(|t| t == token_id)
            .ok_or(AuthError::NotInSession)?;
        account.tokens.remove(position);

        self.store
            .update(collections::USERS, email.as_str(), &encode(&account)?)
            .await?;

        self.delete_token(token_id).await
    }

    /// Delete a token record without touching the owner's session set.
    ///
    /// The stale id left in the account is a documented partial state; it
    /// is harmless because validation goes through the token record.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenNotFound` if absent.
    pub async fn delete_token(&self, token_id: &TokenId) -> Result<(), AuthError> {
        self.store
            .delete(collections::TOKENS, token_id.as_str())
            .await
            .map_err(|e| match e {
                StoreError::NotFound => AuthError::TokenNotFound,
                other => AuthError::Store(other),
            })
    }
}

/// Deterministic keyed password hash: hex(HMAC-SHA256(secret, password)).
fn hash_password(secret: &SecretString, password: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(password.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemStore;

    fn secret() -> SecretString {
        SecretString::from("k9#mQ2$vX7@pL4!wR8&nJ3*bT6^cF1%z")
    }

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    async fn registered(store: &MemStore) -> Email {
        let hashing = secret();
        let service = SessionService::new(store, &hashing);
        let addr = email("ada@example.com");
        service
            .register("Ada", &addr, "12 Analytical Way", "engine-1842")
            .await
            .unwrap();
        addr
    }

    #[test]
    fn password_hash_is_deterministic_and_keyed() {
        let a = hash_password(&secret(), "engine-1842");
        let b = hash_password(&secret(), "engine-1842");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let other_key = SecretString::from("z1%fC6^tB3*jN8&rW4!lP7@xV2$qM9#k");
        assert_ne!(a, hash_password(&other_key, "engine-1842"));
        assert_ne!(a, hash_password(&secret(), "engine-1843"));
    }

    #[tokio::test]
    async fn duplicate_registration_fails_and_keeps_the_first_record() {
        let store = MemStore::new();
        let hashing = secret();
        let service = SessionService::new(&store, &hashing);
        let addr = email("ada@example.com");

        service
            .register("Ada", &addr, "12 Analytical Way", "engine-1842")
            .await
            .unwrap();
        let err = service
            .register("Imposter", &addr, "elsewhere", "other-pass")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::DuplicateIdentity));

        let account = service.account(&addr).await.unwrap();
        assert_eq!(account.name, "Ada");
        assert_eq!(account.address, "12 Analytical Way");
    }

    #[tokio::test]
    async fn authenticate_issues_a_listed_one_hour_token() {
        let store = MemStore::new();
        let hashing = secret();
        let service = SessionService::new(&store, &hashing);
        let addr = email("ada@example.com");
        service
            .register("Ada", &addr, "12 Analytical Way", "engine-1842")
            .await
            .unwrap();

        let before = Utc::now();
        let token = service.authenticate(&addr, "engine-1842").await.unwrap();
        assert_eq!(token.email, addr);
        assert!(token.expires >= before + Duration::minutes(59));
        assert!(token.expires <= Utc::now() + Duration::minutes(61));

        // The id landed in the account's session set.
        let account = service.account(&addr).await.unwrap();
        assert_eq!(account.tokens, vec![token.id.clone()]);

        // And the token record itself validates.
        service.validate(&token.id, &addr).await.unwrap();
    }

    #[tokio::test]
    async fn authenticate_rejects_bad_credentials() {
        let store = MemStore::new();
        let hashing = secret();
        let service = SessionService::new(&store, &hashing);
        let addr = email("ada@example.com");
        service
            .register("Ada", &addr, "12 Analytical Way", "engine-1842")
            .await
            .unwrap();

        assert!(matches!(
            service.authenticate(&addr, "wrong").await,
            Err(AuthError::BadCredentials)
        ));
        assert!(matches!(
            service
                .authenticate(&email("ghost@example.com"), "engine-1842")
                .await,
            Err(AuthError::UnknownAccount)
        ));
    }

    #[tokio::test]
    async fn validate_honors_the_one_hour_window() {
        let store = MemStore::new();
        let hashing = secret();
        let service = SessionService::new(&store, &hashing);
        let addr = email("ada@example.com");

        // A token one minute from expiry is valid; one past expiry is not.
        let fresh = SessionToken {
            id: TokenId::generate(),
            email: addr.clone(),
            expires: Utc::now() + Duration::minutes(1),
        };
        let stale = SessionToken {
            id: TokenId::generate(),
            email: addr.clone(),
            expires: Utc::now() - Duration::minutes(1),
        };
        store
            .create(collections::TOKENS, fresh.id.as_str(), &encode(&fresh).unwrap())
            .await
            .unwrap();
        store
            .create(collections::TOKENS, stale.id.as_str(), &encode(&stale).unwrap())
            .await
            .unwrap();

        service.validate(&fresh.id, &addr).await.unwrap();
        assert!(matches!(
            service.validate(&stale.id, &addr).await,
            Err(AuthError::Forbidden)
        ));

        // Expiry is reported, not garbage collected.
        assert!(service.token(&stale.id).await.is_ok());
    }

    #[tokio::test]
    async fn validate_rejects_identity_mismatch() {
        let store = MemStore::new();
        let hashing = secret();
        let service = SessionService::new(&store, &hashing);

        let token = SessionToken {
            id: TokenId::generate(),
            email: email("ada@example.com"),
            expires: Utc::now() + Duration::minutes(30),
        };
        store
            .create(collections::TOKENS, token.id.as_str(), &encode(&token).unwrap())
            .await
            .unwrap();

        assert!(matches!(
            service.validate(&token.id, &email("eve@example.com")).await,
            Err(AuthError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn extend_resets_expiry_only_for_live_tokens() {
        let store = MemStore::new();
        let hashing = secret();
        let service = SessionService::new(&store, &hashing);
        let addr = email("ada@example.com");

        let live = SessionToken {
            id: TokenId::generate(),
            email: addr.clone(),
            expires: Utc::now() + Duration::minutes(5),
        };
        store
            .create(collections::TOKENS, live.id.as_str(), &encode(&live).unwrap())
            .await
            .unwrap();

        let extended = service.extend(&live.id).await.unwrap();
        assert!(extended.expires > live.expires + Duration::minutes(50));

        let expired = SessionToken {
            id: TokenId::generate(),
            email: addr,
            expires: Utc::now() - Duration::seconds(1),
        };
        store
            .create(collections::TOKENS, expired.id.as_str(), &encode(&expired).unwrap())
            .await
            .unwrap();

        assert!(matches!(
            service.extend(&expired.id).await,
            Err(AuthError::AlreadyExpired)
        ));
        // The stored expiry did not move.
        let unchanged = service.token(&expired.id).await.unwrap();
        assert_eq!(
            unchanged.expires.timestamp_millis(),
            expired.expires.timestamp_millis()
        );
    }

    #[tokio::test]
    async fn revoke_requires_session_membership_and_removes_both_sides() {
        let store = MemStore::new();
        let hashing = secret();
        let service = SessionService::new(&store, &hashing);
        let addr = email("ada@example.com");
        service
            .register("Ada", &addr, "12 Analytical Way", "engine-1842")
            .await
            .unwrap();
        let token = service.authenticate(&addr, "engine-1842").await.unwrap();

        // A foreign token id is not in the session set.
        assert!(matches!(
            service.revoke(&TokenId::generate(), &addr).await,
            Err(AuthError::NotInSession)
        ));

        service.revoke(&token.id, &addr).await.unwrap();
        assert!(service.account(&addr).await.unwrap().tokens.is_empty());
        assert!(matches!(
            service.token(&token.id).await,
            Err(AuthError::TokenNotFound)
        ));
    }

    #[tokio::test]
    async fn delete_account_cascades_to_tokens() {
        let store = MemStore::new();
        let hashing = secret();
        let service = SessionService::new(&store, &hashing);
        let addr = email("ada@example.com");
        service
            .register("Ada", &addr, "12 Analytical Way", "engine-1842")
            .await
            .unwrap();
        let t1 = service.authenticate(&addr, "engine-1842").await.unwrap();
        let t2 = service.authenticate(&addr, "engine-1842").await.unwrap();

        service.delete_account(&addr).await.unwrap();
        assert!(matches!(
            service.account(&addr).await,
            Err(AuthError::UnknownAccount)
        ));
        assert!(service.token(&t1.id).await.is_err());
        assert!(service.token(&t2.id).await.is_err());
    }

    #[tokio::test]
    async fn profile_update_needs_at_least_one_field() {
        let store = MemStore::new();
        let hashing = secret();
        let service = SessionService::new(&store, &hashing);
        let addr = registered(&store).await;

        assert!(matches!(
            service.update_account(&addr, AccountUpdate::default()).await,
            Err(AuthError::NothingToUpdate)
        ));

        service
            .update_account(
                &addr,
                AccountUpdate {
                    address: Some("1 New Street".to_owned()),
                    ..AccountUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(service.account(&addr).await.unwrap().address, "1 New Street");
    }
}
