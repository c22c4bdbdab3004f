//! Monetary amounts in integer minor currency units.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;

use serde::{Deserialize, Serialize};

/// A monetary amount in minor currency units (US cents).
///
/// All arithmetic happens on integers; the only place a decimal appears is
/// [`Amount::major_units`], which renders receipts.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    /// Zero cents.
    pub const ZERO: Self = Self(0);

    /// Create an amount from minor units (cents).
    #[must_use]
    pub const fn from_minor(cents: i64) -> Self {
        Self(cents)
    }

    /// The amount in minor units (cents).
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Render the amount in major units with the shortest exact decimal,
    /// e.g. 190 -> "1.9", 100 -> "1", 125 -> "1.25".
    #[must_use]
    pub fn major_units(self) -> String {
        let major = self.0 / 100;
        let cents = (self.0 % 100).unsigned_abs();
        if cents == 0 {
            format!("{major}")
        } else if cents % 10 == 0 {
            format!("{major}.{}", cents / 10)
        } else {
            format!("{major}.{cents:02}")
        }
    }
}

impl Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
