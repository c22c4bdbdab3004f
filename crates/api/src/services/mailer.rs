//! Receipt delivery over email.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::{debug, instrument};

use stonefire_core::Email;

/// Mailgun REST API base URL.
const MAILGUN_API_BASE: &str = "https://api.mailgun.net/v3";

#[derive(Debug, Error)]
pub enum MailError {
    /// Request never completed.
    #[error("mail request failed: {0}")]
    Request(String),

    /// The provider refused the message.
    #[error("mail delivery rejected ({status}): {detail}")]
    Rejected { status: u16, detail: String },
}

/// An outbound transactional-email sender.
pub trait Mailer: Send + Sync {
    fn send(
        &self,
        to: &Email,
        subject: &str,
        body: &str,
    ) -> impl Future<Output = Result<(), MailError>> + Send;
}

/// Mailgun mailer; authenticates with HTTP basic auth user `api`.
#[derive(Clone)]
pub struct MailgunMailer {
    client: Client,
    domain: String,
    api_key: SecretString,
    from: String,
}

impl std::fmt::Debug for MailgunMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailgunMailer")
            .field("domain", &self.domain)
            .field("api_key", &"[REDACTED]")
            .field("from", &self.from)
            .finish_non_exhaustive()
    }
}

impl MailgunMailer {
    #[must_use]
    pub fn new(domain: String, api_key: SecretString, from: String) -> Self {
        Self {
            client: Client::new(),
            domain,
            api_key,
            from,
        }
    }
}

impl Mailer for MailgunMailer {
    #[instrument(skip(self, body), fields(to = %to))]
    async fn send(&self, to: &Email, subject: &str, body: &str) -> Result<(), MailError> {
        let form = [
            ("from", self.from.as_str()),
            ("to", to.as_str()),
            ("subject", subject),
            ("text", body),
        ];

        let response = self
            .client
            .post(format!("{MAILGUN_API_BASE}/{}/messages", self.domain))
            .basic_auth("api", Some(self.api_key.expose_secret()))
            .form(&form)
            .send()
            .await
            .map_err(|e| MailError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        debug!("receipt email accepted for delivery");
        Ok(())
    }
}
