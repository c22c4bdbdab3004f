//! The pizza menu: a read-only name -> item mapping.
//!
//! The catalog is an immutable value built once at startup and handed to
//! every component that needs pricing via [`crate::state::AppState`], not a
//! process-wide global.

use std::collections::BTreeMap;

use serde::Serialize;

use stonefire_core::Amount;

/// A single menu entry. Immutable and not persisted.
#[derive(Debug, Clone, Serialize)]
pub struct MenuItem {
    /// What goes on the pizza.
    pub ingredients: &'static str,
    /// Price in US cents.
    pub price: Amount,
}

/// The full menu, keyed by item name.
#[derive(Debug, Clone)]
pub struct Catalog {
    items: BTreeMap<&'static str, MenuItem>,
}

impl Catalog {
    /// The standard Stonefire menu.
    #[must_use]
    pub fn standard() -> Self {
        let items = BTreeMap::from([
            (
                "Margherita",
                MenuItem {
                    ingredients: "Tomato sauce, mozzarella, and oregano",
                    price: Amount::from_minor(50),
                },
            ),
            (
                "Marinara",
                MenuItem {
                    ingredients: "Tomato sauce, garlic and basil",
                    price: Amount::from_minor(70),
                },
            ),
            (
                "Quattro Stagioni",
                MenuItem {
                    ingredients:
                        "Tomato sauce, mozzarella, mushrooms, ham, artichokes, olives, and oregano",
                    price: Amount::from_minor(100),
                },
            ),
            (
                "Carbonara",
                MenuItem {
                    ingredients: "Tomato sauce, mozzarella, parmesan, eggs, and bacon",
                    price: Amount::from_minor(90),
                },
            ),
            (
                "Frutti di Mare",
                MenuItem {
                    ingredients: "Tomato sauce and seafood",
                    price: Amount::from_minor(200),
                },
            ),
        ]);
        Self { items }
    }

    /// Look up an item by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MenuItem> {
        self.items.get(name)
    }

    /// All items, for listing.
    #[must_use]
    pub const fn items(&self) -> &BTreeMap<&'static str, MenuItem> {
        &self.items
    }
}
