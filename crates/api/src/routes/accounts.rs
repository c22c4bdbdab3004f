//! Account route handlers.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::Result;
use crate::routes::{optional_str, parse_email, require_session, required_str};
use crate::services::auth::{AccountUpdate, SessionService};
use crate::services::mailer::Mailer;
use crate::services::payment::PaymentGateway;
use crate::state::AppState;
use crate::store::RecordStore;

/// Query parameters addressing an account.
#[derive(Debug, Deserialize)]
pub struct AccountQuery {
    pub email: String,
}

/// `POST /users` — register a new account. Open to anyone.
pub async fn register<S, P, N>(
    State(state): State<AppState<S, P, N>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>>
where
    S: RecordStore,
    P: PaymentGateway,
    N: Mailer,
{
    let email = parse_email(required_str(&body, "email")?)?;
    let name = required_str(&body, "name")?;
    let address = required_str(&body, "address")?;
    let password = required_str(&body, "password")?;

    let sessions = SessionService::new(state.store(), state.hashing_secret());
    sessions.register(name, &email, address, password).await?;
    Ok(Json(json!({})))
}

/// `GET /users?email=` — read a profile. The password hash never leaves
/// the store.
pub async fn read<S, P, N>(
    State(state): State<AppState<S, P, N>>,
    headers: HeaderMap,
    Query(query): Query<AccountQuery>,
) -> Result<Json<Value>>
where
    S: RecordStore,
    P: PaymentGateway,
    N: Mailer,
{
    let email = parse_email(&query.email)?;
    require_session(&state, &headers, &email).await?;

    let sessions = SessionService::new(state.store(), state.hashing_secret());
    let account = sessions.account(&email).await?;
    Ok(Json(json!({
        "name": account.name,
        "email": account.email,
        "address": account.address,
    })))
}

/// `PUT /users` — update name, address, or password; at least one.
pub async fn update<S, P, N>(
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
    require_session(&state, &headers, &email).await?;

    let update = AccountUpdate {
        name: optional_str(&body, "name").map(str::to_owned),
        address: optional_str(&body, "address").map(str::to_owned),
        password: optional_str(&body, "password").map(str::to_owned),
    };

    let sessions = SessionService::new(state.store(), state.hashing_secret());
    sessions.update_account(&email, update).await?;
    Ok(Json(json!({})))
}

/// `DELETE /users?email=` — remove the account and revoke its sessions.
pub async fn delete<S, P, N>(
    State(state): State<AppState<S, P, N>>,
    headers: HeaderMap,
    Query(query): Query<AccountQuery>,
) -> Result<Json<Value>>
where
    S: RecordStore,
    P: PaymentGateway,
    N: Mailer,
{
    let email = parse_email(&query.email)?;
    require_session(&state, &headers, &email).await?;

    let sessions = SessionService::new(state.store(), state.hashing_secret());
    sessions.delete_account(&email).await?;
    Ok(Json(json!({})))
}
