//! Balance types for collateral and stake positions.
//!
//! Every position has a `deposited` amount and a `locked` portion reserved
//! against outstanding shield. Only `deposited - locked` can leave the pool.

use serde::{Deserialize, Serialize};

use crate::Denom;

/// Native amount type: integer base units of a denomination.
pub type Amount = u128;

/// A single (pool, holder) balance, used for both collateral and stake.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Position {
    /// Total amount the holder has in the pool.
    pub deposited: Amount,
    /// Portion reserved against outstanding shield. Always `<= deposited`.
    pub locked: Amount,
}

impl Position {
    /// Amount the holder can withdraw right now.
    #[must_use]
    pub fn withdrawable(&self) -> Amount {
        self.deposited.saturating_sub(self.locked)
    }

    /// Whether this position has no balance at all.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.deposited == 0 && self.locked == 0
    }

    /// `locked <= deposited`.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.locked <= self.deposited
    }
}

/// An amount of a single denomination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: Denom,
    pub amount: Amount,
}

impl Coin {
    #[must_use]
    pub fn new(denom: impl Into<Denom>, amount: Amount) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

/// A payment carrying a native portion and any number of foreign coins.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MixedCoins {
    pub native: Amount,
    #[serde(default)]
    pub foreign: Vec<Coin>,
}

impl MixedCoins {
    #[must_use]
    pub fn native(amount: Amount) -> Self {
        Self {
            native: amount,
            foreign: Vec::new(),
        }
    }

    /// Whether the payment carries nothing.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.native == 0 && self.foreign.iter().all(|c| c.amount == 0)
    }
}
