//! Order placement and lifecycle.
//!
//! Placing an order is a strictly sequential pipeline over the record
//! store, the payment gateway, and the mailer. There is no cross-record
//! transaction, so a failure mid-pipeline leaves the records in their last
//! successfully written state; each such intermediate state is named in
//! the step comments below and surfaced to the caller, never masked.

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use stonefire_core::{Email, OrderStatus, PayStatus};

use crate::models::{CardDetails, CartSnapshot, Order, OrderId};
use crate::services::mailer::{MailError, Mailer};
use crate::services::payment::{PaymentError, PaymentGateway};
use crate::services::{decode, encode};
use crate::store::{RecordStore, StoreError, collections};

#[derive(Debug, Error)]
pub enum OrderError {
    /// No cart stored for this account; nothing to order.
    #[error("could not find the shopping cart")]
    EmptyCart,

    /// No order record for the given identity and date.
    #[error("could not find the specified order")]
    NotFound,

    /// The charge did not go through; the order stays active and unpaid.
    #[error(transparent)]
    Payment(#[from] PaymentError),

    /// The charge went through but the receipt email did not.
    #[error(transparent)]
    Receipt(#[from] MailError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Order workflow service.
pub struct OrderService<'a, S, P, N> {
    store: &'a S,
    payments: &'a P,
    mailer: &'a N,
}

impl<'a, S, P, N> OrderService<'a, S, P, N>
where
    S: RecordStore,
    P: PaymentGateway,
    N: Mailer,
{
    #[must_use]
    pub const fn new(store: &'a S, payments: &'a P, mailer: &'a N) -> Self {
        Self {
            store,
            payments,
            mailer,
        }
    }

    /// Place an order from the account's current cart.
    ///
    /// The pipeline runs in a fixed sequence and stops at the first
    /// failure: load cart, persist the order, clear the cart, charge the
    /// card, mark the order paid, email the receipt. The charge is never
    /// reversed once captured; a failure after it leaves an inconsistency
    /// for out-of-band reconciliation.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::EmptyCart` if no cart is stored, and the
    /// first failing step's error otherwise.
    pub async fn place(&self, email: &Email, card: &CardDetails) -> Result<Order, OrderError> {
        // Cart load.
        let cart = self.cart(email).await?;

        // Order record creation. Nothing has been charged yet, so a write
        // failure here needs no cleanup.
        let placed_at = Utc::now();
        let id = OrderId::new(email.clone(), placed_at);
        let mut order = Order {
            cart,
            date: placed_at,
            status: OrderStatus::Active,
            pay_status: PayStatus::Unpaid,
        };
        self.store
            .create(collections::ORDERS, &id.record_id(), &encode(&order)?)
            .await?;

        // Cart clear. On failure the order record stays; the stale cart is
        // the surfaced inconsistency.
        self.store.delete(collections::CARTS, email.as_str()).await?;

        // Charge. On decline the order stays active and unpaid; the caller
        // must cancel explicitly if it wants the record closed.
        let description = format!("Charge for order {}", id.placed_at_ms);
        self.payments
            .charge(card, order.cart.amount, &description)
            .await?;

        // Payment status update. A failure here means money was captured
        // but the record still says unpaid; reconcile out-of-band.
        order.pay_status = PayStatus::Paid;
        if let Err(e) = self
            .store
            .update(collections::ORDERS, &id.record_id(), &encode(&order)?)
            .await
        {
            warn!(order = %id.record_id(), error = %e, "charge captured but order not marked paid");
            return Err(e.into());
        }

        // Notification. The order is already paid; an email failure is
        // reported without touching the charge or the record.
        self.mailer
            .send(email, "Your receipt", &render_receipt(&order.cart))
            .await?;

        info!(order = %id.record_id(), amount = %order.cart.amount, "order completed");
        Ok(order)
    }

    /// Read one order by its owner and placement timestamp.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if no such order exists.
    pub async fn get(&self, id: &OrderId) -> Result<Order, OrderError> {
        let doc = self
            .store
            .read(collections::ORDERS, &id.record_id())
            .await
            .map_err(|e| match e {
                StoreError::NotFound => OrderError::NotFound,
                other => OrderError::Store(other),
            })?;
        Ok(decode(doc)?)
    }

    /// Overwrite an order's status. Any status may move to any other;
    /// callers must not rely on transition rules that do not exist.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if no such order exists.
    pub async fn update_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<Order, OrderError> {
        let mut order = self.get(id).await?;
        order.status = status;
        self.store
            .update(collections::ORDERS, &id.record_id(), &encode(&order)?)
            .await?;
        Ok(order)
    }

    /// Cancel an order. Idempotent: re-canceling a canceled order
    /// succeeds. Does not refund the charge.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if no such order exists.
    pub async fn cancel(&self, id: &OrderId) -> Result<Order, OrderError> {
        self.update_status(id, OrderStatus::Canceled).await
    }

    /// List every order owned by the identity.
    ///
    /// Scans the collection, filters by key prefix, and reads each match.
    /// Any single read failure discards the whole result; no partial list
    /// is returned.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Store` if the scan or any read fails.
    pub async fn list(&self, email: &Email) -> Result<Vec<Order>, OrderError> {
        let prefix = OrderId::prefix(email);
        let ids = self.store.list(collections::ORDERS).await?;

        let mut orders = Vec::new();
        for record_id in ids.iter().filter(|id| id.starts_with(&prefix)) {
            let doc = self.store.read(collections::ORDERS, record_id).await?;
            orders.push(decode(doc)?);
        }
        Ok(orders)
    }

    async fn cart(&self, email: &Email) -> Result<CartSnapshot, OrderError> {
        let doc = self
            .store
            .read(collections::CARTS, email.as_str())
            .await
            .map_err(|e| match e {
                StoreError::NotFound => OrderError::EmptyCart,
                other => OrderError::Store(other),
            })?;
        Ok(decode(doc)?)
    }
}

/// Plain-text receipt: one line per item, then the total in major units.
fn render_receipt(cart: &CartSnapshot) -> String {
    let mut receipt = String::new();
    for (item, quantity) in &cart.order {
        receipt.push_str(&format!("{item}-{quantity} pcs \n"));
    }
    receipt.push_str(&format!("Amount {} dollars", cart.amount.major_units()));
    receipt
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use stonefire_core::Amount;

    use super::*;
    use crate::store::MemStore;

    /// Gateway stub that records charges and can be told to decline.
    #[derive(Default)]
    struct StubGateway {
        decline: AtomicBool,
        charged: Mutex<Vec<Amount>>,
    }

    impl PaymentGateway for StubGateway {
        async fn charge(
            &self,
            _card: &CardDetails,
            amount: Amount,
            _description: &str,
        ) -> Result<(), PaymentError> {
            if self.decline.load(Ordering::SeqCst) {
                return Err(PaymentError::Declined {
                    status: 402,
                    detail: "card declined".to_owned(),
                });
            }
            self.charged.lock().unwrap().push(amount);
            Ok(())
        }
    }

    /// Mailer stub that records bodies and can be told to bounce.
    #[derive(Default)]
    struct StubMailer {
        bounce: AtomicBool,
        sent: Mutex<Vec<String>>,
    }

    impl Mailer for StubMailer {
        async fn send(&self, _to: &Email, _subject: &str, body: &str) -> Result<(), MailError> {
            if self.bounce.load(Ordering::SeqCst) {
                return Err(MailError::Rejected {
                    status: 500,
                    detail: "bounced".to_owned(),
                });
            }
            self.sent.lock().unwrap().push(body.to_owned());
            Ok(())
        }
    }

    fn email() -> Email {
        Email::parse("ada@example.com").unwrap()
    }

    fn card() -> CardDetails {
        CardDetails::parse(&crate::models::CardForm {
            card_number: "4242 4242 4242 4242".to_owned(),
            exp_month: "03".to_owned(),
            exp_year: "2031".to_owned(),
            cvc: "314".to_owned(),
        })
        .unwrap()
    }

    fn cart_190() -> CartSnapshot {
        let mut order = BTreeMap::new();
        order.insert("Margherita".to_owned(), 1);
        order.insert("Marinara".to_owned(), 2);
        CartSnapshot {
            order,
            amount: Amount::from_minor(190),
        }
    }

    async fn seed_cart(store: &MemStore, cart: &CartSnapshot) {
        store
            .create(collections::CARTS, email().as_str(), &encode(cart).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn happy_path_charges_clears_cart_and_notifies() {
        let store = MemStore::new();
        let gateway = StubGateway::default();
        let mailer = StubMailer::default();
        let service = OrderService::new(&store, &gateway, &mailer);
        seed_cart(&store, &cart_190()).await;

        let order = service.place(&email(), &card()).await.unwrap();
        assert_eq!(order.status, OrderStatus::Active);
        assert_eq!(order.pay_status, PayStatus::Paid);

        assert_eq!(*gateway.charged.lock().unwrap(), vec![Amount::from_minor(190)]);
        assert!(matches!(
            store.read(collections::CARTS, email().as_str()).await,
            Err(StoreError::NotFound)
        ));

        let listed = service.list(&email()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].pay_status, PayStatus::Paid);
    }

    #[test]
    fn receipt_lists_items_then_total_in_major_units() {
        let receipt = render_receipt(&cart_190());
        assert_eq!(
            receipt,
            "Margherita-1 pcs \nMarinara-2 pcs \nAmount 1.9 dollars"
        );
    }

    #[tokio::test]
    async fn missing_cart_aborts_before_any_write() {
        let store = MemStore::new();
        let gateway = StubGateway::default();
        let mailer = StubMailer::default();
        let service = OrderService::new(&store, &gateway, &mailer);

        assert!(matches!(
            service.place(&email(), &card()).await,
            Err(OrderError::EmptyCart)
        ));
        assert!(store.list(collections::ORDERS).await.unwrap().is_empty());
        assert!(gateway.charged.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn declined_charge_leaves_order_active_and_unpaid() {
        let store = MemStore::new();
        let gateway = StubGateway::default();
        gateway.decline.store(true, Ordering::SeqCst);
        let mailer = StubMailer::default();
        let service = OrderService::new(&store, &gateway, &mailer);
        seed_cart(&store, &cart_190()).await;

        assert!(matches!(
            service.place(&email(), &card()).await,
            Err(OrderError::Payment(_))
        ));

        // The order record exists, unpaid; no receipt went out; the cart
        // was already cleared before the charge ran.
        let orders = service.list(&email()).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].status, OrderStatus::Active);
        assert_eq!(orders[0].pay_status, PayStatus::Unpaid);
        assert!(mailer.sent.lock().unwrap().is_empty());
        assert!(matches!(
            store.read(collections::CARTS, email().as_str()).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn bounced_receipt_keeps_the_order_paid() {
        let store = MemStore::new();
        let gateway = StubGateway::default();
        let mailer = StubMailer::default();
        mailer.bounce.store(true, Ordering::SeqCst);
        let service = OrderService::new(&store, &gateway, &mailer);
        seed_cart(&store, &cart_190()).await;

        assert!(matches!(
            service.place(&email(), &card()).await,
            Err(OrderError::Receipt(_))
        ));

        let orders = service.list(&email()).await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].pay_status, PayStatus::Paid);
        assert_eq!(gateway.charged.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cancel_is_an_idempotent_status_overwrite() {
        let store = MemStore::new();
        let gateway = StubGateway::default();
        let mailer = StubMailer::default();
        let service = OrderService::new(&store, &gateway, &mailer);

        let id = OrderId::new(email(), Utc::now());
        let order = Order {
            cart: cart_190(),
            date: Utc::now(),
            status: OrderStatus::Done,
            pay_status: PayStatus::Paid,
        };
        store
            .create(collections::ORDERS, &id.record_id(), &encode(&order).unwrap())
            .await
            .unwrap();

        let first = service.cancel(&id).await.unwrap();
        assert_eq!(first.status, OrderStatus::Canceled);
        let second = service.cancel(&id).await.unwrap();
        assert_eq!(second.status, OrderStatus::Canceled);

        // Any status may overwrite any other.
        let reopened = service.update_status(&id, OrderStatus::Active).await.unwrap();
        assert_eq!(reopened.status, OrderStatus::Active);
    }

    #[tokio::test]
    async fn listing_filters_to_the_identitys_key_prefix() {
        let store = MemStore::new();
        let gateway = StubGateway::default();
        let mailer = StubMailer::default();
        let service = OrderService::new(&store, &gateway, &mailer);

        let mine = OrderId::new(email(), Utc::now());
        let theirs = OrderId::new(Email::parse("eve@example.com").unwrap(), Utc::now());
        let order = Order {
            cart: cart_190(),
            date: Utc::now(),
            status: OrderStatus::Active,
            pay_status: PayStatus::Unpaid,
        };
        for id in [&mine, &theirs] {
            store
                .create(collections::ORDERS, &id.record_id(), &encode(&order).unwrap())
                .await
                .unwrap();
        }

        let orders = service.list(&email()).await.unwrap();
        assert_eq!(orders.len(), 1);
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let store = MemStore::new();
        let gateway = StubGateway::default();
        let mailer = StubMailer::default();
        let service = OrderService::new(&store, &gateway, &mailer);

        let id = OrderId::new(email(), Utc::now());
        assert!(matches!(service.get(&id).await, Err(OrderError::NotFound)));
        assert!(matches!(
            service.cancel(&id).await,
            Err(OrderError::NotFound)
        ));
    }
}
