//! Session route handlers.
//!
//! `/login` and `/tokens` POST are the same exchange; the former is the
//! friendly alias, the latter the resource-shaped surface that also offers
//! introspection, extension, and deletion.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use serde::Deserialize;
use serde_json::{Value, json};

use stonefire_core::TokenId;

use crate::error::{ApiError, Result};
use crate::models::SessionToken;
use crate::routes::{parse_email, required_str, session_token};
use crate::services::auth::SessionService;
use crate::services::mailer::Mailer;
use crate::services::payment::PaymentGateway;
use crate::state::AppState;
use crate::store::RecordStore;

/// Query parameters addressing a token.
#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    pub id: String,
}

fn token_json(token: &SessionToken) -> Value {
    json!({
        "id": token.id,
        "email": token.email,
        "expires": token.expires.timestamp_millis(),
    })
}

fn parse_token_id(raw: &str) -> Result<TokenId> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest("invalid token id".to_owned()))
}

/// `POST /login` — exchange credentials for a fresh session token.
pub async fn login<S, P, N>(
    State(state): State<AppState<S, P, N>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>>
where
    S: RecordStore,
    P: PaymentGateway,
    N: Mailer,
{
    let email = parse_email(required_str(&body, "email")?)?;
    let password = required_str(&body, "password")?;

    let sessions = SessionService::new(state.store(), state.hashing_secret());
    let token = sessions.authenticate(&email, password).await?;
    Ok(Json(token_json(&token)))
}

/// `POST /logout` — revoke the presented token for the named identity.
pub async fn logout<S, P, N>(
    State(state): State<AppState<S, P, N>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>>
where
    S: RecordStore,
    P: PaymentGateway,
    N: Mailer,
{
    let email = parse_email(required_str(&body, "email")?)?;
    let token = session_token(&headers)?;

    let sessions = SessionService::new(state.store(), state.hashing_secret());
    sessions.revoke(&token, &email).await?;
    Ok(Json(json!({})))
}

/// `POST /tokens` — same exchange as `/login`.
pub async fn create<S, P, N>(
    state: State<AppState<S, P, N>>,
    body: Json<Value>,
) -> Result<Json<Value>>
where
    S: RecordStore,
    P: PaymentGateway,
    N: Mailer,
{
    login(state, body).await
}

/// `GET /tokens?id=` — introspect a token record.
pub async fn read<S, P, N>(
    State(state): State<AppState<S, P, N>>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<Value>>
where
    S: RecordStore,
    P: PaymentGateway,
    N: Mailer,
{
    let id = parse_token_id(&query.id)?;
    let sessions = SessionService::new(state.store(), state.hashing_secret());
    let token = sessions.token(&id).await?;
    Ok(Json(token_json(&token)))
}

/// `PUT /tokens` — `{id, extend: true}` pushes the expiry out an hour.
pub async fn extend<S, P, N>(
    State(state): State<AppState<S, P, N>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>>
where
    S: RecordStore,
    P: PaymentGateway,
    N: Mailer,
{
    let id = parse_token_id(required_str(&body, "id")?)?;
    if body.get("extend").and_then(Value::as_bool) != Some(true) {
        return Err(ApiError::BadRequest(
            "missing required field 'extend'".to_owned(),
        ));
    }

    let sessions = SessionService::new(state.store(), state.hashing_secret());
    let token = sessions.extend(&id).await?;
    Ok(Json(token_json(&token)))
}

/// `DELETE /tokens?id=` — drop the record; the owning account's session
/// set is left alone.
pub async fn delete<S, P, N>(
    State(state): State<AppState<S, P, N>>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<Value>>
where
    S: RecordStore,
    P: PaymentGateway,
    N: Mailer,
{
    let id = parse_token_id(&query.id)?;
    let sessions = SessionService::new(state.store(), state.hashing_secret());
    sessions.delete_token(&id).await?;
    Ok(Json(json!({})))
}
