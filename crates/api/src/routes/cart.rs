//! Cart route handlers.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{ApiError, Result};
use crate::routes::{parse_email, require_session, required_str};
use crate::services::cart::CartService;
use crate::services::mailer::Mailer;
use crate::services::payment::PaymentGateway;
use crate::state::AppState;
use crate::store::RecordStore;

#[derive(Debug, Deserialize)]
pub struct CartQuery {
    pub email: String,
}

/// Pull the `order` object out of a submit body: item name to quantity.
fn parse_selection(body: &Value) -> Result<BTreeMap<String, u32>> {
    let entries = body
        .get("order")
        .and_then(Value::as_object)
        .ok_or_else(|| ApiError::BadRequest("missing required field 'order'".to_owned()))?;

    let mut selection = BTreeMap::new();
    for (item, quantity) in entries {
        let quantity = quantity
            .as_u64()
            .and_then(|q| u32::try_from(q).ok())
            .ok_or_else(|| {
                ApiError::BadRequest(format!("'{item}' needs a whole-number quantity"))
            })?;
        selection.insert(item.clone(), quantity);
    }
    Ok(selection)
}

/// `POST /cart` — replace the identity's cart with a priced selection.
pub async fn submit<S, P, N>(
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
    let selection = parse_selection(&body)?;

    let carts = CartService::new(state.store(), state.catalog());
    let snapshot = carts.submit(&email, &selection).await?;
    Ok(Json(serde_json::to_value(snapshot).map_err(crate::store::StoreError::from)?))
}

/// `GET /cart?email=` — the stored cart, repriced against today's menu.
pub async fn read<S, P, N>(
    State(state): State<AppState<S, P, N>>,
    headers: HeaderMap,
    Query(query): Query<CartQuery>,
) -> Result<Json<Value>>
where
    S: RecordStore,
    P: PaymentGateway,
    N: Mailer,
{
    let email = parse_email(&query.email)?;
    require_session(&state, &headers, &email).await?;

    let carts = CartService::new(state.store(), state.catalog());
    let snapshot = carts.get(&email).await?;
    Ok(Json(serde_json::to_value(snapshot).map_err(crate::store::StoreError::from)?))
}

/// `DELETE /cart?email=` — clear the cart; clearing an already-empty cart
/// is accepted rather than an error.
pub async fn clear<S, P, N>(
    State(state): State<AppState<S, P, N>>,
    headers: HeaderMap,
    Query(query): Query<CartQuery>,
) -> Result<(StatusCode, Json<Value>)>
where
    S: RecordStore,
    P: PaymentGateway,
    N: Mailer,
{
    let email = parse_email(&query.email)?;
    require_session(&state, &headers, &email).await?;

    let carts = CartService::new(state.store(), state.catalog());
    let removed = carts.clear(&email).await?;
    let status = if removed {
        StatusCode::OK
    } else {
        StatusCode::ACCEPTED
    };
    Ok((status, Json(json!({}))))
}
