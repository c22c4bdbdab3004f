//! Menu route handler.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::Result;
use crate::routes::{parse_email, require_session};
use crate::services::mailer::Mailer;
use crate::services::payment::PaymentGateway;
use crate::state::AppState;
use crate::store::RecordStore;

#[derive(Debug, Deserialize)]
pub struct MenuQuery {
    pub email: String,
}

/// `GET /menu?email=` — the full catalog, for signed-in accounts only.
pub async fn list<S, P, N>(
    State(state): State<AppState<S, P, N>>,
    headers: HeaderMap,
    Query(query): Query<MenuQuery>,
) -> Result<Json<Value>>
where
    S: RecordStore,
    P: PaymentGateway,
    N: Mailer,
{
    let email = parse_email(&query.email)?;
    require_session(&state, &headers, &email).await?;

    let menu: serde_json::Map<String, Value> = state
        .catalog()
        .items()
        .iter()
        .map(|(name, item)| {
            (
                (*name).to_owned(),
                json!({ "ingredients": item.ingredients, "price": item.price }),
            )
        })
        .collect();
    Ok(Json(Value::Object(menu)))
}
