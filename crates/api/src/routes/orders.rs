//! Order route handlers.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use stonefire_core::{Email, OrderStatus};

use crate::error::{ApiError, Result};
use crate::models::{CardDetails, CardForm, OrderId};
use crate::routes::{parse_email, require_session, required_str};
use crate::services::mailer::Mailer;
use crate::services::order::OrderService;
use crate::services::payment::PaymentGateway;
use crate::state::AppState;
use crate::store::RecordStore;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct CancelQuery {
    pub email: String,
    /// Placement timestamp in epoch milliseconds.
    pub date: i64,
}

fn order_id(email: Email, date_ms: i64) -> Result<OrderId> {
    let date = DateTime::<Utc>::from_timestamp_millis(date_ms)
        .ok_or_else(|| ApiError::BadRequest("invalid order date".to_owned()))?;
    Ok(OrderId::new(email, date))
}

/// `POST /order` — place an order from the identity's current cart.
///
/// The card shape is checked before the workflow touches the store.
pub async fn place<S, P, N>(
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

    let form = CardForm {
        card_number: required_str(&body, "cardNumber")?.to_owned(),
        exp_month: required_str(&body, "expMonth")?.to_owned(),
        exp_year: required_str(&body, "expYear")?.to_owned(),
        cvc: required_str(&body, "cvc")?.to_owned(),
    };
    let card = CardDetails::parse(&form).map_err(ApiError::BadRequest)?;

    let orders = OrderService::new(state.store(), state.payments(), state.mailer());
    let order = orders.place(&email, &card).await?;
    Ok(Json(to_value(&order)?))
}

/// `PUT /order` — `{email, date, status}` overwrites the order's status.
pub async fn update_status<S, P, N>(
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

    let date_ms = body
        .get("date")
        .and_then(Value::as_i64)
        .ok_or_else(|| ApiError::BadRequest("missing required field 'date'".to_owned()))?;
    let status: OrderStatus = required_str(&body, "status")?
        .parse()
        .map_err(|_| ApiError::BadRequest("status must be active, done, or canceled".to_owned()))?;

    let id = order_id(email, date_ms)?;
    let orders = OrderService::new(state.store(), state.payments(), state.mailer());
    let order = orders.update_status(&id, status).await?;
    Ok(Json(to_value(&order)?))
}

/// `GET /order?email=` — every order the identity owns.
pub async fn list<S, P, N>(
    State(state): State<AppState<S, P, N>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>>
where
    S: RecordStore,
    P: PaymentGateway,
    N: Mailer,
{
    let email = parse_email(&query.email)?;
    require_session(&state, &headers, &email).await?;

    let orders = OrderService::new(state.store(), state.payments(), state.mailer());
    let all = orders.list(&email).await?;
    Ok(Json(json!({ "orders": to_value(&all)? })))
}

/// `DELETE /order?email=&date=` — cancel; idempotent, never refunds.
pub async fn cancel<S, P, N>(
    State(state): State<AppState<S, P, N>>,
    headers: HeaderMap,
    Query(query): Query<CancelQuery>,
) -> Result<Json<Value>>
where
    S: RecordStore,
    P: PaymentGateway,
    N: Mailer,
{
    let email = parse_email(&query.email)?;
    require_session(&state, &headers, &email).await?;

    let id = order_id(email, query.date)?;
    let orders = OrderService::new(state.store(), state.payments(), state.mailer());
    let order = orders.cancel(&id).await?;
    Ok(Json(to_value(&order)?))
}

fn to_value<T: serde::Serialize>(model: &T) -> Result<Value> {
    Ok(serde_json::to_value(model).map_err(crate::store::StoreError::from)?)
}
