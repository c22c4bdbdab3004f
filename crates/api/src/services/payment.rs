//! Card-payment gateway.
//!
//! The trait abstracts the two-step Stripe flow (tokenize the card, then
//! charge the token) so handlers and tests can run against a stub.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::{debug, instrument};

use stonefire_core::Amount;

use crate::models::CardDetails;

/// Stripe REST API base URL.
const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

#[derive(Debug, Error)]
pub enum PaymentError {
    /// Request never completed.
    #[error("payment request failed: {0}")]
    Request(String),

    /// The processor rejected the card or the charge.
    #[error("the payment was declined ({status}): {detail}")]
    Declined { status: u16, detail: String },
}

/// A processor that turns card details plus an amount into a settled charge.
pub trait PaymentGateway: Send + Sync {
    /// Charge the card for the given amount, in the currency's minor units.
    fn charge(
        &self,
        card: &CardDetails,
        amount: Amount,
        description: &str,
    ) -> impl Future<Output = Result<(), PaymentError>> + Send;
}

/// Stripe gateway: tokenizes with the publishable key, charges with the
/// secret key.
#[derive(Clone)]
pub struct StripeGateway {
    client: Client,
    public_key: String,
    secret_key: SecretString,
}

impl std::fmt::Debug for StripeGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeGateway")
            .field("public_key", &self.public_key)
            .field("secret_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl StripeGateway {
    #[must_use]
    pub fn new(public_key: String, secret_key: SecretString) -> Self {
        Self {
            client: Client::new(),
            public_key,
            secret_key,
        }
    }

    /// Exchange raw card details for a single-use card token.
    #[instrument(skip(self, card))]
    async fn tokenize(&self, card: &CardDetails) -> Result<String, PaymentError> {
        #[derive(serde::Deserialize)]
        struct TokenResponse {
            id: String,
        }

        let form = [
            ("card[number]", card.number.as_str()),
            ("card[exp_month]", card.exp_month.as_str()),
            ("card[exp_year]", card.exp_year.as_str()),
            ("card[cvc]", card.cvc.as_str()),
        ];

        let response = self
            .client
            .post(format!("{STRIPE_API_BASE}/tokens"))
            .basic_auth(&self.public_key, None::<&str>)
            .form(&form)
            .send()
            .await
            .map_err(|e| PaymentError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PaymentError::Declined {
                status: status.as_u16(),
                detail,
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::Request(e.to_string()))?;

        debug!("card tokenized");
        Ok(token.id)
    }

    /// Charge a previously issued card token.
    #[instrument(skip(self, source))]
    async fn create_charge(
        &self,
        source: &str,
        amount: Amount,
        description: &str,
    ) -> Result<(), PaymentError> {
        let amount_minor = amount.minor().to_string();
        let form = [
            ("amount", amount_minor.as_str()),
            ("currency", "usd"),
            ("source", source),
            ("description", description),
        ];

        let response = self
            .client
            .post(format!("{STRIPE_API_BASE}/charges"))
            .basic_auth(self.secret_key.expose_secret(), None::<&str>)
            .form(&form)
            .send()
            .await
            .map_err(|e| PaymentError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PaymentError::Declined {
                status: status.as_u16(),
                detail,
            });
        }

        debug!(amount = %amount, "charge accepted");
        Ok(())
    }
}

impl PaymentGateway for StripeGateway {
    async fn charge(
        &self,
        card: &CardDetails,
        amount: Amount,
        description: &str,
    ) -> Result<(), PaymentError> {
        let source = self.tokenize(card).await?;
        self.create_charge(&source, amount, description).await
    }
}
