//! Unified error handling with Sentry integration.
//!
//! Every route handler returns `Result<T, ApiError>`. The error renders as
//! a status code plus `{"error": "<message>"}`; server-side failures are
//! captured to Sentry before the response goes out.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::services::mailer::MailError;
use crate::services::order::OrderError;
use crate::services::payment::PaymentError;
use crate::store::StoreError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Account or session operation failed.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart operation failed.
    #[error("cart error: {0}")]
    Cart(#[from] CartError),

    /// Order workflow failed.
    #[error("order error: {0}")]
    Order(#[from] OrderError),

    /// Storage operation failed outside a service.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Malformed or incomplete request payload.
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Auth(err) => match err {
                AuthError::DuplicateIdentity
                | AuthError::AlreadyExpired
                | AuthError::NotInSession
                | AuthError::NothingToUpdate
                | AuthError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
                AuthError::BadCredentials | AuthError::Forbidden => StatusCode::FORBIDDEN,
                AuthError::UnknownAccount | AuthError::TokenNotFound => StatusCode::NOT_FOUND,
                AuthError::CascadeIncomplete | AuthError::Store(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Cart(err) => match err {
                CartError::InvalidSelection(_) => StatusCode::BAD_REQUEST,
                CartError::NotFound => StatusCode::NOT_FOUND,
                CartError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Order(err) => match err {
                // A missing order on status update is a caller mistake in
                // this API's vocabulary, not a 404.
                OrderError::EmptyCart | OrderError::NotFound => StatusCode::BAD_REQUEST,
                OrderError::Payment(_) | OrderError::Receipt(_) | OrderError::Store(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Client-facing message; storage details never leak.
    fn message(&self) -> String {
        match self {
            Self::Auth(err) => match err {
                AuthError::Store(_) => "internal server error".to_owned(),
                other => other.to_string(),
            },
            Self::Cart(err) => match err {
                CartError::Store(_) => "internal server error".to_owned(),
                other => other.to_string(),
            },
            Self::Order(err) => match err {
                OrderError::Payment(PaymentError::Request(_) | PaymentError::Declined { .. }) => {
                    "could not process the payment".to_owned()
                }
                OrderError::Receipt(MailError::Request(_) | MailError::Rejected { .. }) => {
                    "could not send a receipt email".to_owned()
                }
                OrderError::Store(_) => "internal server error".to_owned(),
                other => other.to_string(),
            },
            Self::Store(_) => "internal server error".to_owned(),
            Self::BadRequest(message) => message.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "request error"
            );
        }

        (status, Json(json!({ "error": self.message() }))).into_response()
    }
}

/// Result type alias for `ApiError`.
pub type Result<T> = std::result::Result<T, ApiError>;
