//! Pool registry: creation, admin updates, and the pool status machine.
//!
//! ```text
//!   ┌────────┐  pause   ┌────────┐
//!   │ Active │ ───────► │ Paused │
//!   │        │ ◄─────── │        │
//!   └───┬────┘  resume  └───┬────┘
//!       │   drained, no     │
//!       │   open claims     │
//!       ▼                   ▼
//!   ┌────────────────────────────┐
//!   │           Closed           │  (terminal)
//!   └────────────────────────────┘
//! ```
//!
//! Pool totals (`total_collateral`, `total_staked`, `shield_issued`) are
//! mirrors of the ledger and coverage tracker. The engine updates them in
//! the same staged transition and cross-checks them before commit.

use std::collections::BTreeMap;

use shield_types::{
    math, Address, Amount, BlockContext, Pool, PoolId, PoolStatus, Result, ShieldError,
};

/// Parameters for registering a new pool.
#[derive(Debug, Clone)]
pub struct NewPool {
    pub creator: Address,
    pub sponsor: String,
    pub sponsor_addr: Address,
    pub description: String,
    pub sponsored_shield: Amount,
    pub shield_limit: Amount,
}

/// Changes requested by an `UpdatePool`. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct PoolUpdate {
    pub sponsored_shield: Option<Amount>,
    pub shield_limit: Option<Amount>,
    pub description: Option<String>,
}

/// Owns every pool ever created. Closed pools are retained.
#[derive(Debug, Clone)]
pub struct PoolRegistry {
    pools: BTreeMap<PoolId, Pool>,
    next_id: PoolId,
}

impl PoolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pools: BTreeMap::new(),
            next_id: PoolId::FIRST,
        }
    }

    /// Register a pool with zero totals. The caller credits the initial
    /// deposit through the ledger afterwards.
    ///
    /// # Errors
    /// `EmptySponsor`, `InvalidShieldAmount`, or `ArithmeticOverflow` when
    /// the id space is exhausted.
    pub fn create(&mut self, ctx: &BlockContext, params: NewPool) -> Result<PoolId> {
        if params.sponsor.trim().is_empty() || params.sponsor_addr.is_empty() {
            return Err(ShieldError::EmptySponsor);
        }
        if params.sponsored_shield == 0 {
            return Err(ShieldError::InvalidShieldAmount(0));
        }
        if self.next_id.0 == u64::MAX {
            return Err(ShieldError::ArithmeticOverflow("pool id"));
        }

        let id = self.next_id;
        self.next_id = id.next();
        let pool = Pool {
            id,
            sponsor: params.sponsor,
            sponsor_addr: params.sponsor_addr,
            creator: params.creator,
            status: PoolStatus::Active,
            total_collateral: 0,
            total_staked: 0,
            shield_issued: 0,
            shield_limit: params.shield_limit,
            sponsored_shield: params.sponsored_shield,
            description: params.description,
            created_height: ctx.height,
            created_at: ctx.time,
        };
        tracing::debug!(
            pool = %id,
            sponsor = %pool.sponsor,
            limit = pool.shield_limit,
            "Pool registered"
        );
        self.pools.insert(id, pool);
        Ok(id)
    }

    /// Look up a pool.
    ///
    /// # Errors
    /// `InvalidPoolId` for id zero, `PoolNotFound` if unknown.
    pub fn get(&self, id: PoolId) -> Result<&Pool> {
        if id.is_zero() {
            return Err(ShieldError::InvalidPoolId(id));
        }
        self.pools.get(&id).ok_or(ShieldError::PoolNotFound(id))
    }

    fn get_mut(&mut self, id: PoolId) -> Result<&mut Pool> {
        if id.is_zero() {
            return Err(ShieldError::InvalidPoolId(id));
        }
        self.pools.get_mut(&id).ok_or(ShieldError::PoolNotFound(id))
    }

    /// The pool, provided it is not closed.
    ///
    /// # Errors
    /// `PoolClosed` for closed pools, plus the lookup errors of [`Self::get`].
    pub fn get_open(&self, id: PoolId) -> Result<&Pool> {
        let pool = self.get(id)?;
        if pool.is_closed() {
            return Err(ShieldError::PoolClosed(id));
        }
        Ok(pool)
    }

    /// The pool, provided it is accepting new coverage and stake.
    ///
    /// # Errors
    /// `PoolClosed` or `PoolNotActive`.
    pub fn get_active(&self, id: PoolId) -> Result<&Pool> {
        let pool = self.get_open(id)?;
        if !pool.is_active() {
            return Err(ShieldError::PoolNotActive(id));
        }
        Ok(pool)
    }

    /// Creator or engine-wide admin.
    fn ensure_admin(pool: &Pool, caller: &Address, admin: Option<&Address>) -> Result<()> {
        if &pool.creator == caller || admin.is_some_and(|a| a == caller) {
            Ok(())
        } else {
            Err(ShieldError::Unauthorized(caller.clone()))
        }
    }

    /// Apply an admin update.
    ///
    /// # Errors
    /// `Unauthorized`, `PoolClosed`, `InvalidShieldAmount` for a zero
    /// sponsored shield, `EmptyDescription` for a blank description, and
    /// `ShieldLimitExceeded` if the new limit is below what is issued.
    pub fn update(
        &mut self,
        id: PoolId,
        caller: &Address,
        admin: Option<&Address>,
        update: PoolUpdate,
    ) -> Result<&Pool> {
        let pool = self.get(id)?;
        Self::ensure_admin(pool, caller, admin)?;
        if pool.is_closed() {
            return Err(ShieldError::PoolClosed(id));
        }
        if update.sponsored_shield == Some(0) {
            return Err(ShieldError::InvalidShieldAmount(0));
        }
        if update
            .description
            .as_deref()
            .is_some_and(|d| d.trim().is_empty())
        {
            return Err(ShieldError::EmptyDescription);
        }
        if let Some(limit) = update.shield_limit {
            if limit < pool.shield_issued {
                return Err(ShieldError::ShieldLimitExceeded {
                    requested: 0,
                    issued: pool.shield_issued,
                    limit,
                });
            }
        }

        let pool = self.get_mut(id)?;
        if let Some(shield) = update.sponsored_shield {
            pool.sponsored_shield = shield;
        }
        if let Some(limit) = update.shield_limit {
            pool.shield_limit = limit;
        }
        if let Some(description) = update.description {
            pool.description = description;
        }
        Ok(pool)
    }

    fn transition(
        &mut self,
        id: PoolId,
        caller: &Address,
        admin: Option<&Address>,
        target: PoolStatus,
    ) -> Result<()> {
        let pool = self.get(id)?;
        Self::ensure_admin(pool, caller, admin)?;
        if pool.is_closed() {
            return Err(ShieldError::PoolClosed(id));
        }
        if !pool.status.can_transition_to(target) {
            return Err(ShieldError::InvalidPoolStatus {
                from: pool.status,
                to: target,
            });
        }
        self.get_mut(id)?.status = target;
        Ok(())
    }

    /// Active → Paused.
    ///
    /// # Errors
    /// `Unauthorized`, `PoolClosed`, or `InvalidPoolStatus` if already paused.
    pub fn pause(&mut self, id: PoolId, caller: &Address, admin: Option<&Address>) -> Result<()> {
        self.transition(id, caller, admin, PoolStatus::Paused)
    }

    /// Paused → Active.
    ///
    /// # Errors
    /// `Unauthorized`, `PoolClosed`, or `InvalidPoolStatus` if already active.
    pub fn resume(&mut self, id: PoolId, caller: &Address, admin: Option<&Address>) -> Result<()> {
        self.transition(id, caller, admin, PoolStatus::Active)
    }

    /// Hand the sponsorship to a new name and address. Only the current
    /// sponsor address may do this.
    ///
    /// # Errors
    /// `Unauthorized`, `EmptySponsor`, `PoolClosed`.
    pub fn update_sponsor(
        &mut self,
        id: PoolId,
        caller: &Address,
        sponsor: String,
        sponsor_addr: Address,
    ) -> Result<()> {
        let pool = self.get(id)?;
        if &pool.sponsor_addr != caller {
            return Err(ShieldError::Unauthorized(caller.clone()));
        }
        if pool.is_closed() {
            return Err(ShieldError::PoolClosed(id));
        }
        if sponsor.trim().is_empty() || sponsor_addr.is_empty() {
            return Err(ShieldError::EmptySponsor);
        }
        let pool = self.get_mut(id)?;
        pool.sponsor = sponsor;
        pool.sponsor_addr = sponsor_addr;
        Ok(())
    }

    pub fn add_collateral(&mut self, id: PoolId, amount: Amount) -> Result<()> {
        let pool = self.get_mut(id)?;
        pool.total_collateral = math::add(pool.total_collateral, amount, "pool collateral")?;
        Ok(())
    }

    pub fn sub_collateral(&mut self, id: PoolId, amount: Amount) -> Result<()> {
        let pool = self.get_mut(id)?;
        pool.total_collateral = math::sub(pool.total_collateral, amount, "pool collateral")?;
        Ok(())
    }

    pub fn add_stake(&mut self, id: PoolId, amount: Amount) -> Result<()> {
        let pool = self.get_mut(id)?;
        pool.total_staked = math::add(pool.total_staked, amount, "pool stake")?;
        Ok(())
    }

    pub fn sub_stake(&mut self, id: PoolId, amount: Amount) -> Result<()> {
        let pool = self.get_mut(id)?;
        pool.total_staked = math::sub(pool.total_staked, amount, "pool stake")?;
        Ok(())
    }

    /// Record newly sold coverage.
    ///
    /// # Errors
    /// `ShieldLimitExceeded` if `issued + amount > limit`.
    pub fn issue_shield(&mut self, id: PoolId, amount: Amount) -> Result<()> {
        let pool = self.get_mut(id)?;
        let issued = math::add(pool.shield_issued, amount, "shield issued")?;
        if issued > pool.shield_limit {
            return Err(ShieldError::ShieldLimitExceeded {
                requested: amount,
                issued: pool.shield_issued,
                limit: pool.shield_limit,
            });
        }
        pool.shield_issued = issued;
        Ok(())
    }

    /// Record coverage leaving the pool (expiry or reimbursement).
    pub fn release_shield(&mut self, id: PoolId, amount: Amount) -> Result<()> {
        let pool = self.get_mut(id)?;
        pool.shield_issued = math::sub(pool.shield_issued, amount, "shield issued")?;
        Ok(())
    }

    /// Close the pool if its collateral is gone and nothing is pending
    /// against it. Returns whether it was closed.
    pub fn close_if_drained(&mut self, id: PoolId, has_open_claims: bool) -> Result<bool> {
        let pool = self.get_mut(id)?;
        if pool.is_closed() || pool.total_collateral != 0 || has_open_claims {
            return Ok(false);
        }
        pool.status = PoolStatus::Closed;
        tracing::info!(pool = %id, "Pool drained and closed");
        Ok(true)
    }

    /// All pools in id order.
    pub fn pools(&self) -> impl Iterator<Item = &Pool> {
        self.pools.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Check every pool's shield bounds.
    ///
    /// # Errors
    /// `InvariantViolation` naming the first offending pool.
    pub fn verify(&self) -> Result<()> {
        self.pools.values().try_for_each(Self::check_bounds)
    }

    /// Bounds check for a single pool.
    ///
    /// # Errors
    /// Lookup errors, or `InvariantViolation` as for [`Self::verify`].
    pub fn verify_pool(&self, id: PoolId) -> Result<()> {
        Self::check_bounds(self.get(id)?)
    }

    fn check_bounds(pool: &Pool) -> Result<()> {
        if pool.shield_within_bounds() {
            return Ok(());
        }
        Err(ShieldError::InvariantViolation {
            reason: format!(
                "{}: issued {} exceeds limit {} or collateral {}",
                pool.id, pool.shield_issued, pool.shield_limit, pool.total_collateral
            ),
        })
    }
}

impl Default for PoolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
