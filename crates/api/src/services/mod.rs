//! Business services: sessions, cart aggregation, and the order workflow.
//!
//! Services are constructed per request from [`crate::state::AppState`]
//! borrows, and talk to storage only through the [`crate::store::RecordStore`]
//! contract.

pub mod auth;
pub mod cart;
pub mod mailer;
pub mod order;
pub mod payment;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::store::StoreError;

/// Decode a stored document into a typed model.
pub(crate) fn decode<T: DeserializeOwned>(doc: Value) -> Result<T, StoreError> {
    serde_json::from_value(doc).map_err(StoreError::Codec)
}

/// Encode a typed model into a storable document.
pub(crate) fn encode<T: Serialize>(model: &T) -> Result<Value, StoreError> {
    serde_json::to_value(model).map_err(StoreError::Codec)
}
