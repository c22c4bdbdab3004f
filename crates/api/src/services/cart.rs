//! Shopping-cart management.
//!
//! A cart is keyed by the owner's email and holds one priced snapshot at a
//! time; submitting a new selection replaces the previous one wholesale.

use std::collections::BTreeMap;

use stonefire_core::{Amount, Email};
use thiserror::Error;

use crate::catalog::Catalog;
use crate::models::CartSnapshot;
use crate::services::{decode, encode};
use crate::store::{RecordStore, StoreError, collections};

#[derive(Debug, Error)]
pub enum CartError {
    /// Selection names an item the menu does not carry, or a zero quantity.
    #[error("invalid cart payload: {0}")]
    InvalidSelection(String),

    /// No cart stored for this account.
    #[error("could not find the shopping cart")]
    NotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Cart service; prices every selection against the shared menu.
pub struct CartService<'a, S> {
    store: &'a S,
    catalog: &'a Catalog,
}

impl<'a, S: RecordStore> CartService<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S, catalog: &'a Catalog) -> Self {
        Self { store, catalog }
    }

    /// Replace the account's cart with the given selection.
    ///
    /// Every entry is checked against the menu before anything is priced;
    /// the first rejected entry names itself in the error. A quantity of
    /// zero is rejected the same way as an unknown item.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidSelection` naming the offending entry.
    pub async fn submit(
        &self,
        email: &Email,
        selection: &BTreeMap<String, u32>,
    ) -> Result<CartSnapshot, CartError> {
        for (item, &quantity) in selection {
            if self.catalog.get(item).is_none() {
                return Err(CartError::InvalidSelection(format!(
                    "'{item}' is not on the menu"
                )));
            }
            if quantity == 0 {
                return Err(CartError::InvalidSelection(format!(
                    "'{item}' has a zero quantity"
                )));
            }
        }

        let snapshot = CartSnapshot {
            order: selection.clone(),
            amount: self.price(selection),
        };

        // Upsert: replace an existing cart, create one otherwise.
        let doc = encode(&snapshot)?;
        match self
            .store
            .update(collections::CARTS, email.as_str(), &doc)
            .await
        {
            Ok(()) => {}
            Err(StoreError::NotFound) => {
                self.store
                    .create(collections::CARTS, email.as_str(), &doc)
                    .await?;
            }
            Err(other) => return Err(other.into()),
        }
        Ok(snapshot)
    }

    /// Read the account's cart, repriced against the current menu. Items
    /// that have since left the menu are dropped from the view.
    ///
    /// # Errors
    ///
    /// Returns `CartError::NotFound` if no cart is stored.
    pub async fn get(&self, email: &Email) -> Result<CartSnapshot, CartError> {
        let doc = self
            .store
            .read(collections::CARTS, email.as_str())
            .await
            .map_err(|e| match e {
                StoreError::NotFound => CartError::NotFound,
                other => CartError::Store(other),
            })?;
        let stored: CartSnapshot = decode(doc)?;

        let order: BTreeMap<String, u32> = stored
            .order
            .into_iter()
            .filter(|(item, _)| self.catalog.get(item).is_some())
            .collect();
        let amount = self.price(&order);
        Ok(CartSnapshot { order, amount })
    }

    /// Delete the account's cart. Deleting an absent cart is not an error;
    /// the distinction surfaces as accepted-with-nothing-to-do upstream.
    ///
    /// Returns `true` when a cart was actually removed.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Store` on storage failure.
    pub async fn clear(&self, email: &Email) -> Result<bool, CartError> {
        match self.store.delete(collections::CARTS, email.as_str()).await {
            Ok(()) => Ok(true),
            Err(StoreError::NotFound) => Ok(false),
            Err(other) => Err(other.into()),
        }
    }

    fn price(&self, selection: &BTreeMap<String, u32>) -> Amount {
        selection
            .iter()
            .filter_map(|(item, &quantity)| {
                self.catalog
                    .get(item)
                    .map(|entry| Amount::from_minor(entry.price.minor() * i64::from(quantity)))
            })
            .sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemStore;

    fn email() -> Email {
        Email::parse("ada@example.com").unwrap()
    }

    fn selection(entries: &[(&str, u32)]) -> BTreeMap<String, u32> {
        entries
            .iter()
            .map(|&(item, quantity)| (item.to_owned(), quantity))
            .collect()
    }

    #[tokio::test]
    async fn submit_prices_the_selection() {
        let store = MemStore::new();
        let catalog = Catalog::standard();
        let service = CartService::new(&store, &catalog);

        let snapshot = service
            .submit(&email(), &selection(&[("Margherita", 2), ("Carbonara", 1)]))
            .await
            .unwrap();
        assert_eq!(snapshot.amount, Amount::from_minor(190));
        assert_eq!(snapshot.amount.major_units(), "1.9");
    }

    #[tokio::test]
    async fn submit_rejects_unknown_items_before_writing() {
        let store = MemStore::new();
        let catalog = Catalog::standard();
        let service = CartService::new(&store, &catalog);

        let err = service
            .submit(&email(), &selection(&[("Margherita", 1), ("Calzone", 2)]))
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::InvalidSelection(ref m) if m.contains("Calzone")));

        // The valid portion was not persisted either.
        assert!(matches!(service.get(&email()).await, Err(CartError::NotFound)));
    }

    #[tokio::test]
    async fn rejected_submit_leaves_the_prior_cart_untouched() {
        let store = MemStore::new();
        let catalog = Catalog::standard();
        let service = CartService::new(&store, &catalog);

        service
            .submit(&email(), &selection(&[("Margherita", 1), ("Marinara", 2)]))
            .await
            .unwrap();

        let err = service
            .submit(&email(), &selection(&[("Calzone", 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::InvalidSelection(_)));

        let cart = service.get(&email()).await.unwrap();
        assert_eq!(cart.order, selection(&[("Margherita", 1), ("Marinara", 2)]));
        assert_eq!(cart.amount, Amount::from_minor(190));
    }

    #[tokio::test]
    async fn submit_rejects_zero_quantities() {
        let store = MemStore::new();
        let catalog = Catalog::standard();
        let service = CartService::new(&store, &catalog);

        let err = service
            .submit(&email(), &selection(&[("Marinara", 0)]))
            .await
            .unwrap_err();
        assert!(matches!(err, CartError::InvalidSelection(ref m) if m.contains("Marinara")));
    }

    #[tokio::test]
    async fn resubmit_replaces_the_previous_cart() {
        let store = MemStore::new();
        let catalog = Catalog::standard();
        let service = CartService::new(&store, &catalog);

        service
            .submit(&email(), &selection(&[("Margherita", 4)]))
            .await
            .unwrap();
        service
            .submit(&email(), &selection(&[("Frutti di Mare", 1)]))
            .await
            .unwrap();

        let cart = service.get(&email()).await.unwrap();
        assert_eq!(cart.order.len(), 1);
        assert_eq!(cart.order.get("Frutti di Mare"), Some(&1));
        assert_eq!(cart.amount, Amount::from_minor(200));
    }

    #[tokio::test]
    async fn clear_reports_whether_a_cart_existed() {
        let store = MemStore::new();
        let catalog = Catalog::standard();
        let service = CartService::new(&store, &catalog);

        assert!(!service.clear(&email()).await.unwrap());

        service
            .submit(&email(), &selection(&[("Marinara", 1)]))
            .await
            .unwrap();
        assert!(service.clear(&email()).await.unwrap());
        assert!(matches!(service.get(&email()).await, Err(CartError::NotFound)));
    }
}
