//! Supply conservation invariant checker.
//!
//! Invariant enforced before every commit:
//! ```text
//! ∀ denom: Σ(positions) + Σ(reward bucket balances) == Σ(inflows) - Σ(outflows)
//! ```
//!
//! Inflows are deposits, stakes, premiums and service fees. Outflows are
//! withdrawals, unstakes, reward payouts and reimbursements. A mismatch
//! aborts the staged transition.

use std::collections::BTreeMap;

use shield_types::{math, Amount, Result, ShieldError};

/// Per-denom running totals of funds entering and leaving the engine.
#[derive(Debug, Clone, Default)]
pub struct SupplyConservation {
    inflows: BTreeMap<String, Amount>,
    outflows: BTreeMap<String, Amount>,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record funds entering custody.
    ///
    /// # Errors
    /// `ArithmeticOverflow` if the running total overflows.
    pub fn record_inflow(&mut self, denom: &str, amount: Amount) -> Result<()> {
        let entry = self.inflows.entry(denom.to_string()).or_insert(0);
        *entry = math::add(*entry, amount, "supply inflow")?;
        Ok(())
    }

    /// Record funds leaving custody.
    ///
    /// # Errors
    /// `ArithmeticOverflow` if the running total overflows.
    pub fn record_outflow(&mut self, denom: &str, amount: Amount) -> Result<()> {
        let entry = self.outflows.entry(denom.to_string()).or_insert(0);
        *entry = math::add(*entry, amount, "supply outflow")?;
        Ok(())
    }

    /// Expected custody for a denom: inflows - outflows.
    ///
    /// # Errors
    /// `SupplyInvariantViolation` if more has left than ever entered.
    pub fn expected_supply(&self, denom: &str) -> Result<Amount> {
        let inflow = self.total_inflows(denom);
        let outflow = self.total_outflows(denom);
        inflow
            .checked_sub(outflow)
            .ok_or_else(|| ShieldError::SupplyInvariantViolation {
                reason: format!("Denom {denom}: outflows {outflow} exceed inflows {inflow}"),
            })
    }

    /// Verify that the actual custody matches the expected supply.
    ///
    /// # Errors
    /// Returns [`ShieldError::SupplyInvariantViolation`] if actual ≠ expected.
    pub fn verify(&self, denom: &str, actual_supply: Amount) -> Result<()> {
        let expected = self.expected_supply(denom)?;
        if actual_supply != expected {
            return Err(ShieldError::SupplyInvariantViolation {
                reason: format!(
                    "Denom {denom}: actual supply {actual_supply} != expected {expected} \
                     (inflows={}, outflows={})",
                    self.total_inflows(denom),
                    self.total_outflows(denom),
                ),
            });
        }
        Ok(())
    }

    /// Every denom that ever moved, sorted.
    #[must_use]
    pub fn tracked_denoms(&self) -> Vec<String> {
        let mut denoms: Vec<String> = self
            .inflows
            .keys()
            .chain(self.outflows.keys())
            .cloned()
            .collect();
        denoms.sort();
        denoms.dedup();
        denoms
    }

    #[must_use]
    pub fn total_inflows(&self, denom: &str) -> Amount {
        self.inflows.get(denom).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_outflows(&self, denom: &str) -> Amount {
        self.outflows.get(denom).copied().unwrap_or(0)
    }
}
