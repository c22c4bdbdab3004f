//! Domain models persisted in the record store.
//!
//! Field names match the stored JSON documents one-to-one; the documents
//! are what the services read and write through [`crate::store`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stonefire_core::{Amount, Email, OrderStatus, PayStatus, TokenId};

/// A registered account, stored under `users/<email>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Display name.
    pub name: String,
    /// Unique identity; also the record id.
    pub email: Email,
    /// Postal delivery address.
    pub address: String,
    /// HMAC-SHA256 of the password, hex-encoded.
    pub hashed_password: String,
    /// Ids of this account's active session tokens.
    #[serde(default)]
    pub tokens: Vec<TokenId>,
}

/// A bearer session token, stored under `tokens/<id>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionToken {
    /// The opaque identifier; also the record id.
    pub id: TokenId,
    /// Owning identity.
    pub email: Email,
    /// Absolute expiry, epoch milliseconds on the wire.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires: DateTime<Utc>,
}

impl SessionToken {
    /// Whether the token has passed its expiry.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }
}

/// A priced selection: item name -> positive quantity, plus the total.
///
/// Stored under `carts/<email>` while shopping, and frozen into an
/// [`Order`] at checkout. The selection is a `BTreeMap` so receipts render
/// in a stable order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    /// Item name -> quantity.
    pub order: BTreeMap<String, u32>,
    /// Total in minor units, Σ quantity x catalog price.
    pub amount: Amount,
}

/// An order, stored under `orders/<email>_<ms>`.
///
/// Orders are never deleted; cancellation and completion are status
/// transitions, leaving an audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// The cart frozen at checkout time.
    pub cart: CartSnapshot,
    /// Creation timestamp, epoch milliseconds on the wire.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub date: DateTime<Utc>,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Payment status.
    #[serde(rename = "payStatus")]
    pub pay_status: PayStatus,
}

/// Composite order key: owning identity plus creation time.
///
/// The disambiguator is wall-clock milliseconds, so two orders placed by
/// one account within the same millisecond collide (the second create fails
/// on the existing record). That risk is inherited behavior, kept rather
/// than papered over with an extra nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderId {
    /// Owning identity.
    pub email: Email,
    /// Creation time in epoch milliseconds.
    pub placed_at_ms: i64,
}

impl OrderId {
    /// Key for an order placed by `email` at `date`.
    #[must_use]
    pub fn new(email: Email, date: DateTime<Utc>) -> Self {
        Self {
            email,
            placed_at_ms: date.timestamp_millis(),
        }
    }

    /// The record id under the `orders` collection.
    #[must_use]
    pub fn record_id(&self) -> String {
        format!("{}_{}", self.email, self.placed_at_ms)
    }

    /// The id prefix shared by every order this identity owns.
    #[must_use]
    pub fn prefix(email: &Email) -> String {
        format!("{email}_")
    }
}

/// Card fields for a charge, shape-validated before any store access.
#[derive(Debug, Clone)]
pub struct CardDetails {
    /// 16 digits, spaces stripped.
    pub number: String,
    /// 2-digit expiry month.
    pub exp_month: String,
    /// 4-digit expiry year.
    pub exp_year: String,
    /// 3-digit card verification code.
    pub cvc: String,
}

/// Raw card fields as they arrive in a request body.
#[derive(Debug, Clone, Deserialize)]
pub struct CardForm {
    #[serde(rename = "cardNumber")]
    pub card_number: String,
    #[serde(rename = "expMonth")]
    pub exp_month: String,
    #[serde(rename = "expYear")]
    pub exp_year: String,
    pub cvc: String,
}

impl CardDetails {
    /// Validate the shape of submitted card fields.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first malformed field.
    pub fn parse(form: &CardForm) -> Result<Self, String> {
        let number: String = form.card_number.replace(' ', "");
        if number.len() != 16 || !number.bytes().all(|b| b.is_ascii_digit()) {
            return Err("card number must be 16 digits".to_owned());
        }
        let exp_month = form.exp_month.trim();
        if exp_month.len() != 2 || !exp_month.bytes().all(|b| b.is_ascii_digit()) {
            return Err("expiry month must be 2 digits".to_owned());
        }
        let exp_year = form.exp_year.trim();
        if exp_year.len() != 4 || !exp_year.bytes().all(|b| b.is_ascii_digit()) {
            return Err("expiry year must be 4 digits".to_owned());
        }
        let cvc = form.cvc.trim();
        if cvc.len() != 3 || !cvc.bytes().all(|b| b.is_ascii_digit()) {
            return Err("cvc must be 3 digits".to_owned());
        }
        Ok(Self {
            number,
            exp_month: exp_month.to_owned(),
            exp_year: exp_year.to_owned(),
            cvc: cvc.to_owned(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn card(number: &str, month: &str, year: &str, cvc: &str) -> CardForm {
        CardForm {
            card_number: number.to_owned(),
            exp_month: month.to_owned(),
            exp_year: year.to_owned(),
            cvc: cvc.to_owned(),
        }
    }

    #[test]
    fn card_parse_accepts_spaced_numbers() {
        let parsed = CardDetails::parse(&card("4242 4242 4242 4242", "12", "2030", "314")).unwrap();
        assert_eq!(parsed.number, "4242424242424242");
    }

    #[test]
    fn card_parse_rejects_bad_shapes() {
        assert!(CardDetails::parse(&card("4242", "12", "2030", "314")).is_err());
        assert!(CardDetails::parse(&card("4242424242424242", "1", "2030", "314")).is_err());
        assert!(CardDetails::parse(&card("4242424242424242", "12", "30", "314")).is_err());
        assert!(CardDetails::parse(&card("4242424242424242", "12", "2030", "31")).is_err());
        assert!(CardDetails::parse(&card("4242424242424abc", "12", "2030", "314")).is_err());
    }

    #[test]
    fn order_id_round_trips_through_its_record_id() {
        let email = Email::parse("a@b.c").unwrap();
        let date = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let id = OrderId::new(email.clone(), date);
        assert_eq!(id.record_id(), "a@b.c_1700000000123");
        assert!(id.record_id().starts_with(&OrderId::prefix(&email)));
    }

    #[test]
    fn token_expiry_is_inclusive_at_the_boundary() {
        let now = Utc::now();
        let token = SessionToken {
            id: TokenId::generate(),
            email: Email::parse("a@b.c").unwrap(),
            expires: now,
        };
        assert!(token.is_expired(now));
        assert!(!token.is_expired(now - chrono::Duration::seconds(1)));
    }

    #[test]
    fn stored_order_documents_use_millisecond_timestamps() {
        let date = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let order = Order {
            cart: CartSnapshot {
                order: BTreeMap::from([("Margherita".to_owned(), 1)]),
                amount: Amount::from_minor(50),
            },
            date,
            status: OrderStatus::Active,
            pay_status: PayStatus::Unpaid,
        };
        let doc = serde_json::to_value(&order).unwrap();
        assert_eq!(doc["date"], serde_json::json!(1_700_000_000_123_i64));
        assert_eq!(doc["status"], "active");
        assert_eq!(doc["payStatus"], "unpaid");
        assert!(doc.get("pay_status").is_none());
    }
}
