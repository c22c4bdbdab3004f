//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /ping              - Liveness check
//!
//! # Accounts
//! POST   /users           - Register
//! GET    /users?email=    - Read profile (auth)
//! PUT    /users           - Update profile (auth)
//! DELETE /users?email=    - Delete account + sessions (auth)
//!
//! # Sessions
//! POST   /login           - Exchange credentials for a token
//! POST   /logout          - Revoke the presented token (auth)
//! POST   /tokens          - Same exchange as /login
//! GET    /tokens?id=      - Introspect a token
//! PUT    /tokens          - Extend an unexpired token
//! DELETE /tokens?id=      - Delete a token record
//!
//! # Menu
//! GET  /menu?email=       - Full catalog (auth)
//!
//! # Cart
//! POST   /cart            - Submit a selection (auth)
//! GET    /cart?email=     - Read, repriced (auth)
//! DELETE /cart?email=     - Clear; 202 when already empty (auth)
//!
//! # Orders
//! POST   /order           - Place from the current cart (auth)
//! PUT    /order           - Overwrite an order's status (auth)
//! GET    /order?email=    - List the identity's orders (auth)
//! DELETE /order?email=&date= - Cancel (auth)
//! ```
//!
//! Authenticated routes read the session token from a `token` header and
//! check it against the identity named in the request.

pub mod accounts;
pub mod cart;
pub mod menu;
pub mod orders;
pub mod sessions;

use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use stonefire_core::{Email, TokenId};

use crate::error::{ApiError, Result};
use crate::services::auth::{AuthError, SessionService};
use crate::services::mailer::Mailer;
use crate::services::payment::PaymentGateway;
use crate::state::AppState;
use crate::store::RecordStore;

/// Assemble the full application router.
pub fn router<S, P, N>(state: AppState<S, P, N>) -> Router
where
    S: RecordStore + 'static,
    P: PaymentGateway + 'static,
    N: Mailer + 'static,
{
    Router::new()
        .route("/ping", get(ping))
        .route(
            "/users",
            post(accounts::register::<S, P, N>)
                .get(accounts::read::<S, P, N>)
                .put(accounts::update::<S, P, N>)
                .delete(accounts::delete::<S, P, N>),
        )
        .route("/login", post(sessions::login::<S, P, N>))
        .route("/logout", post(sessions::logout::<S, P, N>))
        .route(
            "/tokens",
            post(sessions::create::<S, P, N>)
                .get(sessions::read::<S, P, N>)
                .put(sessions::extend::<S, P, N>)
                .delete(sessions::delete::<S, P, N>),
        )
        .route("/menu", get(menu::list::<S, P, N>))
        .route(
            "/cart",
            post(cart::submit::<S, P, N>)
                .get(cart::read::<S, P, N>)
                .delete(cart::clear::<S, P, N>),
        )
        .route(
            "/order",
            post(orders::place::<S, P, N>)
                .get(orders::list::<S, P, N>)
                .put(orders::update_status::<S, P, N>)
                .delete(orders::cancel::<S, P, N>),
        )
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness probe.
async fn ping() -> Json<serde_json::Value> {
    Json(json!({ "service": "ping" }))
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "no such resource" })),
    )
}

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "method not allowed" })),
    )
}

/// Pull the session token out of the `token` header.
///
/// Any shape problem reads as a missing credential, not a parse error.
pub(crate) fn session_token(headers: &HeaderMap) -> Result<TokenId> {
    headers
        .get("token")
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.parse().ok())
        .ok_or_else(|| ApiError::Auth(AuthError::Forbidden))
}

/// Admission check shared by every authenticated route.
pub(crate) async fn require_session<S, P, N>(
    state: &AppState<S, P, N>,
    headers: &HeaderMap,
    email: &Email,
) -> Result<()>
where
    S: RecordStore,
    P: PaymentGateway,
    N: Mailer,
{
    let token = session_token(headers)?;
    let sessions = SessionService::new(state.store(), state.hashing_secret());
    sessions.validate(&token, email).await?;
    Ok(())
}

/// Parse an email out of a request field, reporting shape problems as 400.
pub(crate) fn parse_email(raw: &str) -> Result<Email> {
    Email::parse(raw).map_err(|e| ApiError::Auth(AuthError::InvalidEmail(e)))
}

/// Read a required string field from a JSON body.
///
/// Bodies arrive as raw JSON values so that a missing or mistyped field is
/// a 400 with a message naming the field, never a generic rejection.
pub(crate) fn required_str<'a>(body: &'a serde_json::Value, key: &str) -> Result<&'a str> {
    body.get(key)
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("missing required field '{key}'")))
}

/// Read an optional string field from a JSON body.
pub(crate) fn optional_str<'a>(body: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    body.get(key)
        .and_then(serde_json::Value::as_str)
        .filter(|s| !s.trim().is_empty())
}
