//! Shield purchase tracking.
//!
//! ```text
//!   ┌────────┐  expiry sweep  ┌─────────┐
//!   │ Active │ ─────────────► │ Expired │
//!   └───┬────┘                └─────────┘
//!       │ reimbursement drains coverage
//!       ▼
//!   ┌──────────┐
//!   │ Consumed │
//!   └──────────┘
//! ```
//!
//! The tracker only records purchases. Limit checks, locking and premium
//! routing happen in the engine, which keeps
//! `Σ active coverage == pool shield issued == pool locked collateral`.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use shield_types::{
    Address, Amount, BlockContext, PoolId, PurchaseId, PurchaseStatus, Result, ShieldError,
    ShieldPurchase,
};

/// Parameters of a purchase that already passed the pool checks.
#[derive(Debug, Clone)]
pub struct NewPurchase {
    pub pool_id: PoolId,
    pub purchaser: Address,
    pub coverage: Amount,
    pub premium: Amount,
    pub description: String,
}

/// Owns every shield purchase.
#[derive(Debug, Clone)]
pub struct CoverageTracker {
    purchases: BTreeMap<PurchaseId, ShieldPurchase>,
    next_id: PurchaseId,
}

impl CoverageTracker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            purchases: BTreeMap::new(),
            next_id: PurchaseId(1),
        }
    }

    /// Store a new active purchase. `protection_period = None` makes it evergreen.
    ///
    /// # Errors
    /// `EmptyDescription`, `InvalidShieldAmount` for zero coverage.
    pub fn record(
        &mut self,
        ctx: &BlockContext,
        purchase: NewPurchase,
        protection_period: Option<Duration>,
    ) -> Result<PurchaseId> {
        if purchase.description.trim().is_empty() {
            return Err(ShieldError::EmptyDescription);
        }
        if purchase.coverage == 0 {
            return Err(ShieldError::InvalidShieldAmount(0));
        }
        let expires_at = protection_period
            .map(|period| {
                ctx.time
                    .checked_add_signed(period)
                    .ok_or(ShieldError::ArithmeticOverflow("purchase expiry"))
            })
            .transpose()?;

        let id = self.next_id;
        self.next_id = id.next();
        self.purchases.insert(
            id,
            ShieldPurchase {
                id,
                pool_id: purchase.pool_id,
                purchaser: purchase.purchaser,
                coverage: purchase.coverage,
                original_coverage: purchase.coverage,
                premium: purchase.premium,
                description: purchase.description,
                purchased_height: ctx.height,
                purchased_at: ctx.time,
                expires_at,
                status: PurchaseStatus::Active,
            },
        );
        Ok(id)
    }

    /// # Errors
    /// `PurchaseNotFound` if unknown.
    pub fn get(&self, id: PurchaseId) -> Result<&ShieldPurchase> {
        self.purchases.get(&id).ok_or(ShieldError::PurchaseNotFound(id))
    }

    /// Coverage still claimable against a purchase; zero once it is no
    /// longer active.
    ///
    /// # Errors
    /// `PurchaseNotFound` if unknown.
    pub fn claimable(&self, id: PurchaseId) -> Result<Amount> {
        let purchase = self.get(id)?;
        Ok(if purchase.is_active() {
            purchase.coverage
        } else {
            0
        })
    }

    /// Reduce remaining coverage after a payout. A purchase drained to zero
    /// becomes `Consumed`.
    ///
    /// # Errors
    /// `ClaimExceedsCoverage` if `amount` is more than remains.
    pub fn consume(&mut self, id: PurchaseId, amount: Amount) -> Result<PurchaseStatus> {
        if amount == 0 {
            return Ok(self.get(id)?.status);
        }
        let remaining = self.claimable(id)?;
        if amount > remaining {
            return Err(ShieldError::ClaimExceedsCoverage {
                amount,
                coverage: remaining,
            });
        }
        let purchase = self
            .purchases
            .get_mut(&id)
            .ok_or(ShieldError::PurchaseNotFound(id))?;
        purchase.coverage = remaining - amount;
        if purchase.coverage == 0 {
            purchase.status = PurchaseStatus::Consumed;
        }
        Ok(purchase.status)
    }

    /// Active purchases whose protection has run out at `now`, skipping
    /// those in `held` (purchases backing an open claim).
    #[must_use]
    pub fn due_for_expiry(
        &self,
        now: DateTime<Utc>,
        held: &BTreeSet<PurchaseId>,
    ) -> Vec<PurchaseId> {
        self.purchases
            .values()
            .filter(|p| p.is_active() && p.is_expired_at(now) && !held.contains(&p.id))
            .map(|p| p.id)
            .collect()
    }

    /// Mark an active purchase expired. Returns the pool and the coverage
    /// released.
    ///
    /// # Errors
    /// `PurchaseNotFound`, or `InvariantViolation` if it is not active.
    pub fn expire(&mut self, id: PurchaseId) -> Result<(PoolId, Amount)> {
        let purchase = self
            .purchases
            .get_mut(&id)
            .ok_or(ShieldError::PurchaseNotFound(id))?;
        if !purchase.is_active() {
            return Err(ShieldError::InvariantViolation {
                reason: format!("{id} is {} and cannot expire", purchase.status),
            });
        }
        purchase.status = PurchaseStatus::Expired;
        Ok((purchase.pool_id, purchase.coverage))
    }

    /// Σ remaining coverage of a pool's active purchases.
    #[must_use]
    pub fn active_coverage(&self, pool_id: PoolId) -> Amount {
        self.purchases
            .values()
            .filter(|p| p.pool_id == pool_id && p.is_active())
            .map(|p| p.coverage)
            .fold(0, Amount::saturating_add)
    }

    /// Purchases made by `purchaser`, in id order.
    pub fn by_purchaser<'a>(
        &'a self,
        purchaser: &'a Address,
    ) -> impl Iterator<Item = &'a ShieldPurchase> + 'a {
        self.purchases
            .values()
            .filter(move |p| &p.purchaser == purchaser)
    }

    /// Purchases against a pool, in id order.
    pub fn by_pool(&self, pool_id: PoolId) -> impl Iterator<Item = &ShieldPurchase> {
        self.purchases.values().filter(move |p| p.pool_id == pool_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.purchases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.purchases.is_empty()
    }
}

impl Default for CoverageTracker {
    fn default() -> Self {
        Self::new()
    }
}
