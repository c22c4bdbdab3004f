//! Application state shared across handlers.

use std::sync::Arc;

use secrecy::SecretString;

use crate::catalog::Catalog;
use crate::services::mailer::Mailer;
use crate::services::payment::PaymentGateway;
use crate::store::RecordStore;

/// Application state shared across all handlers.
///
/// Generic over the record store and the two external adapters so tests can
/// swap in an in-memory store and stubs. Cheaply cloneable via `Arc`.
pub struct AppState<S, P, N> {
    inner: Arc<AppStateInner<S, P, N>>,
}

impl<S, P, N> Clone for AppState<S, P, N> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct AppStateInner<S, P, N> {
    store: S,
    payments: P,
    mailer: N,
    catalog: Catalog,
    hashing_secret: SecretString,
}

impl<S, P, N> AppState<S, P, N>
where
    S: RecordStore,
    P: PaymentGateway,
    N: Mailer,
{
    /// Create a new application state.
    #[must_use]
    pub fn new(store: S, payments: P, mailer: N, hashing_secret: SecretString) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                store,
                payments,
                mailer,
                catalog: Catalog::standard(),
                hashing_secret,
            }),
        }
    }

    /// Get a reference to the record store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Get a reference to the payment gateway.
    #[must_use]
    pub fn payments(&self) -> &P {
        &self.inner.payments
    }

    /// Get a reference to the mailer.
    #[must_use]
    pub fn mailer(&self) -> &N {
        &self.inner.mailer
    }

    /// Get a reference to the menu catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// Get a reference to the password-hashing secret.
    #[must_use]
    pub fn hashing_secret(&self) -> &SecretString {
        &self.inner.hashing_secret
    }
}
