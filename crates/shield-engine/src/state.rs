//! The full engine state, staged and verified as one value.

use std::collections::BTreeSet;

use shield_coverage::{CoverageTracker, RewardDistributor};
use shield_ledger::{BalanceLedger, PoolRegistry, SupplyConservation};
use shield_settlement::{ClaimRegistry, SettlementState};
use shield_types::{Address, Amount, PoolId, Result, ShieldError};

/// Every store the engine owns. Cloned before each transition; the clone
/// is mutated, verified, then swapped in.
#[derive(Debug, Clone, Default)]
pub struct ShieldState {
    pub pools: PoolRegistry,
    pub ledger: BalanceLedger,
    pub coverage: CoverageTracker,
    pub rewards: RewardDistributor,
    pub claims: ClaimRegistry,
    pub supply: SupplyConservation,
}

impl ShieldState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reward weight of `holder` in `pool_id`.
    #[must_use]
    pub fn weight(&self, pool_id: PoolId, holder: &Address) -> Amount {
        self.ledger.weight(pool_id, holder)
    }

    /// Σ weight of a pool as mirrored on the pool record.
    ///
    /// # Errors
    /// Pool lookup errors.
    pub fn total_weight(&self, pool_id: PoolId) -> Result<Amount> {
        Ok(self.pools.get(pool_id)?.total_weight())
    }

    /// Settle `holder`'s rewards in a pool at their current weight. Call
    /// before anything changes that weight.
    pub(crate) fn settle_holder(&mut self, pool_id: PoolId, holder: &Address) -> Result<()> {
        let weight = self.ledger.weight(pool_id, holder);
        self.rewards.settle(holder, pool_id, weight)
    }

    pub(crate) fn settlement<'a>(&'a mut self, denom: &'a str) -> SettlementState<'a> {
        SettlementState {
            ledger: &mut self.ledger,
            pools: &mut self.pools,
            coverage: &mut self.coverage,
            rewards: &mut self.rewards,
            claims: &mut self.claims,
            supply: &mut self.supply,
            denom,
        }
    }

    /// Cheap checks scoped to `pool_ids`: shield bounds on each pool record
    /// and reward reserves of each pool's buckets. Cost does not depend on
    /// how many holders a pool has.
    ///
    /// # Errors
    /// Pool lookup errors or `InvariantViolation`.
    pub fn verify_pools(&self, pool_ids: &[PoolId]) -> Result<()> {
        for pool_id in pool_ids {
            self.pools.verify_pool(*pool_id)?;
            self.rewards.verify_pool(*pool_id)?;
        }
        Ok(())
    }

    /// Cross-check every store against the others. Walks every position,
    /// purchase and reward checkpoint.
    ///
    /// # Errors
    /// `InvariantViolation` or `SupplyInvariantViolation` describing the
    /// first broken invariant.
    pub fn verify(&self, native_denom: &str) -> Result<()> {
        self.pools.verify()?;

        if let Some((pool, holder, pos)) = self.ledger.find_inconsistent() {
            return Err(ShieldError::InvariantViolation {
                reason: format!(
                    "{pool}: position of {holder} has locked {} > deposited {}",
                    pos.locked, pos.deposited
                ),
            });
        }

        for pool in self.pools.pools() {
            let id = pool.id;
            let collateral = self.ledger.total_collateral(id);
            let staked = self.ledger.total_staked(id);
            let locked = self.ledger.locked_collateral(id);
            let covered = self.coverage.active_coverage(id);
            if collateral != pool.total_collateral || staked != pool.total_staked {
                return Err(ShieldError::InvariantViolation {
                    reason: format!(
                        "{id}: ledger holds collateral {collateral} / stake {staked}, \
                         pool records {} / {}",
                        pool.total_collateral, pool.total_staked
                    ),
                });
            }
            if locked != pool.shield_issued || covered != pool.shield_issued {
                return Err(ShieldError::InvariantViolation {
                    reason: format!(
                        "{id}: locked {locked}, active coverage {covered}, shield issued {}",
                        pool.shield_issued
                    ),
                });
            }
        }

        let mut denoms: BTreeSet<String> = self.supply.tracked_denoms().into_iter().collect();
        denoms.extend(self.rewards.denoms());
        denoms.insert(native_denom.to_string());
        for denom in &denoms {
            let mut actual = self.rewards.total_balance(denom);
            if denom == native_denom {
                actual = actual.saturating_add(self.ledger.total_supply());
            }
            self.supply.verify(denom, actual)?;
        }

        self.rewards
            .verify(|pool, holder| self.ledger.weight(pool, holder))
    }
}
