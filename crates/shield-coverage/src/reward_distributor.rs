//! Lazy pull-based reward distribution.
//!
//! Each (pool, denom) has a [`RewardBucket`] with a fixed-point reward
//! index. Crediting income is O(1):
//!
//! ```text
//! index += (carry × SCALE + remainder) / total_weight
//! remainder = (carry × SCALE + remainder) mod total_weight
//! ```
//!
//! and each holder owns a checkpoint per (pool, denom). A holder's claim is
//! `accrued + weight × (index − snapshot) / SCALE`. The engine settles a
//! holder *before* changing their weight, so the old weight is always the
//! one applied to the interval since their snapshot.
//!
//! Every division floors. Income received while the pool has no weight
//! waits in `carry`; the part of a credit too small for one index unit is
//! kept in `remainder`, in scaled units, and joins the next spread. Since
//! `Σ credited × SCALE = Σ Δindex × weight + remainder + carry × SCALE`,
//! the bucket always covers `owed + carry + ⌈remainder / SCALE⌉`.
//! Products go through a 256-bit intermediate; the index itself overflows
//! only once income per unit of weight passes `u128::MAX / SCALE`.

use std::collections::{BTreeMap, BTreeSet};

use shield_types::constants::REWARD_INDEX_SCALE;
use shield_types::{
    math, Address, Amount, BlockContext, Denom, ForeignRewardClaim, PoolId, Result, ShieldError,
};

/// Accumulator for one (pool, denom).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewardBucket {
    /// Cumulative reward per unit of weight, scaled by [`REWARD_INDEX_SCALE`].
    pub index: u128,
    /// Funds held: credited minus paid out.
    pub balance: Amount,
    /// Credited while the pool had no weight.
    pub carry: Amount,
    /// Residue of the last spread, scaled by [`REWARD_INDEX_SCALE`].
    /// Always below the total weight it was spread over.
    pub remainder: u128,
}

impl RewardBucket {
    /// Units the bucket must keep back for income not yet in the index.
    fn reserved(&self) -> Result<Amount> {
        math::add(
            self.carry,
            self.remainder.div_ceil(REWARD_INDEX_SCALE),
            "reward reserve",
        )
    }
}

/// A holder's position in one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Checkpoint {
    pub snapshot: u128,
    /// Settled but not yet withdrawn.
    pub accrued: Amount,
}

type BucketKey = (PoolId, Denom);

/// Owns reward buckets, holder checkpoints, and the foreign payout outbox.
///
/// A holder with no checkpoint for a bucket of a pool they belong to has
/// held constant weight since that bucket was created, so a missing
/// checkpoint reads as snapshot zero.
#[derive(Debug, Clone, Default)]
pub struct RewardDistributor {
    buckets: BTreeMap<BucketKey, RewardBucket>,
    /// Pools each holder has been settled in at least once.
    members: BTreeMap<Address, BTreeSet<PoolId>>,
    checkpoints: BTreeMap<Address, BTreeMap<BucketKey, Checkpoint>>,
    foreign_outbox: Vec<ForeignRewardClaim>,
}

fn earned(weight: Amount, index: u128, snapshot: u128) -> Result<Amount> {
    let delta = math::sub(index, snapshot, "reward index delta")?;
    if delta == 0 || weight == 0 {
        return Ok(0);
    }
    math::mul_div_floor(weight, delta, REWARD_INDEX_SCALE, "reward earned")
}

impl RewardDistributor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` of `denom` income to a pool whose holders weigh
    /// `total_weight` in sum.
    ///
    /// # Errors
    /// `ArithmeticOverflow` if the index or balance overflows.
    pub fn credit(
        &mut self,
        pool_id: PoolId,
        denom: &str,
        amount: Amount,
        total_weight: Amount,
    ) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        let bucket = self
            .buckets
            .entry((pool_id, denom.to_string()))
            .or_default();
        bucket.balance = math::add(bucket.balance, amount, "reward balance")?;
        bucket.carry = math::add(bucket.carry, amount, "reward carry")?;
        Self::spread(bucket, total_weight)?;
        tracing::debug!(
            pool = %pool_id,
            denom,
            amount,
            index = bucket.index,
            carry = bucket.carry,
            "Reward credited"
        );
        Ok(())
    }

    /// Fold carry and remainder into the index of every bucket of a pool,
    /// once the pool has weight again.
    ///
    /// # Errors
    /// `ArithmeticOverflow` if the index overflows.
    pub fn flush(&mut self, pool_id: PoolId, total_weight: Amount) -> Result<()> {
        for (_, bucket) in self.pool_buckets_mut(pool_id) {
            Self::spread(bucket, total_weight)?;
        }
        Ok(())
    }

    fn spread(bucket: &mut RewardBucket, total_weight: Amount) -> Result<()> {
        if total_weight == 0 || (bucket.carry == 0 && bucket.remainder == 0) {
            return Ok(());
        }
        let (delta, remainder) = math::mul_add_div_rem(
            bucket.carry,
            REWARD_INDEX_SCALE,
            bucket.remainder,
            total_weight,
            "reward index",
        )?;
        bucket.index = math::add(bucket.index, delta, "reward index")?;
        bucket.carry = 0;
        bucket.remainder = remainder;
        Ok(())
    }

    fn pool_buckets(&self, pool_id: PoolId) -> impl Iterator<Item = (&BucketKey, &RewardBucket)> {
        self.buckets
            .range((pool_id, String::new())..)
            .take_while(move |((pool, _), _)| *pool == pool_id)
    }

    fn pool_buckets_mut(
        &mut self,
        pool_id: PoolId,
    ) -> impl Iterator<Item = (&BucketKey, &mut RewardBucket)> {
        self.buckets
            .range_mut((pool_id, String::new())..)
            .take_while(move |((pool, _), _)| *pool == pool_id)
    }

    fn checkpoint(&self, holder: &Address, key: &BucketKey) -> Checkpoint {
        self.checkpoints
            .get(holder)
            .and_then(|cps| cps.get(key))
            .copied()
            .unwrap_or_default()
    }

    /// What `holder` is owed from one bucket at `weight`.
    fn owed(
        &self,
        holder: &Address,
        key: &BucketKey,
        bucket: &RewardBucket,
        weight: Amount,
    ) -> Result<Amount> {
        let cp = self.checkpoint(holder, key);
        math::add(cp.accrued, earned(weight, bucket.index, cp.snapshot)?, "reward owed")
    }

    /// Pools `holder` has joined, in id order.
    #[must_use]
    pub fn pools_of(&self, holder: &Address) -> Vec<PoolId> {
        self.members
            .get(holder)
            .map(|pools| pools.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Bring a holder's checkpoints in `pool_id` up to the current index,
    /// using `weight` for the interval since the last settle. Must run
    /// before the holder's weight changes.
    ///
    /// # Errors
    /// `ArithmeticOverflow` on overflow.
    pub fn settle(&mut self, holder: &Address, pool_id: PoolId, weight: Amount) -> Result<()> {
        self.members.entry(holder.clone()).or_default().insert(pool_id);
        let indices: Vec<(BucketKey, u128)> = self
            .pool_buckets(pool_id)
            .map(|(key, bucket)| (key.clone(), bucket.index))
            .collect();
        if indices.is_empty() {
            return Ok(());
        }
        let checkpoints = self.checkpoints.entry(holder.clone()).or_default();
        for (key, index) in indices {
            let cp = checkpoints.entry(key).or_default();
            let gained = earned(weight, index, cp.snapshot)?;
            cp.accrued = math::add(cp.accrued, gained, "reward accrued")?;
            cp.snapshot = index;
        }
        Ok(())
    }

    /// What `holder` could withdraw in `denom` right now, given their
    /// current weight per pool.
    ///
    /// # Errors
    /// `ArithmeticOverflow` on overflow.
    pub fn pending(
        &self,
        holder: &Address,
        denom: &str,
        weight_of: impl Fn(PoolId) -> Amount,
    ) -> Result<Amount> {
        let mut total: Amount = 0;
        for pool_id in self.pools_of(holder) {
            let weight = weight_of(pool_id);
            let buckets = self.pool_buckets(pool_id).filter(|((_, d), _)| d == denom);
            for (key, bucket) in buckets {
                let owed = self.owed(holder, key, bucket, weight)?;
                total = math::add(total, owed, "reward pending")?;
            }
        }
        Ok(total)
    }

    /// Settle and pay out everything `holder` is owed in `denom` across all
    /// pools. Returns the amount paid, zero if nothing is owed.
    ///
    /// # Errors
    /// `ArithmeticOverflow` on overflow, `InvariantViolation` if a bucket
    /// holds less than it owes.
    pub fn withdraw(
        &mut self,
        holder: &Address,
        denom: &str,
        weight_of: impl Fn(PoolId) -> Amount,
    ) -> Result<Amount> {
        let mut paid: Amount = 0;
        for pool_id in self.pools_of(holder) {
            self.settle(holder, pool_id, weight_of(pool_id))?;
            let key = (pool_id, denom.to_string());
            let Some(cp) = self
                .checkpoints
                .get_mut(holder)
                .and_then(|cps| cps.get_mut(&key))
            else {
                continue;
            };
            let amount = std::mem::take(&mut cp.accrued);
            if amount == 0 {
                continue;
            }
            let bucket = self
                .buckets
                .get_mut(&key)
                .ok_or_else(|| ShieldError::InvariantViolation {
                    reason: format!("checkpoint without bucket: {pool_id}/{denom}"),
                })?;
            bucket.balance = bucket
                .balance
                .checked_sub(amount)
                .ok_or_else(|| ShieldError::InvariantViolation {
                    reason: format!(
                        "bucket {pool_id}/{denom} holds {} but owes {amount}",
                        bucket.balance
                    ),
                })?;
            paid = math::add(paid, amount, "reward paid")?;
        }
        Ok(paid)
    }

    /// Append a foreign payout to the outbox.
    pub fn record_foreign_claim(
        &mut self,
        ctx: &BlockContext,
        holder: &Address,
        denom: &str,
        to_addr: &str,
        amount: Amount,
    ) {
        self.foreign_outbox.push(ForeignRewardClaim {
            holder: holder.clone(),
            denom: denom.to_string(),
            to_addr: to_addr.to_string(),
            amount,
            height: ctx.height,
            claimed_at: ctx.time,
        });
    }

    /// Foreign payouts recorded so far, oldest first.
    #[must_use]
    pub fn foreign_outbox(&self) -> &[ForeignRewardClaim] {
        &self.foreign_outbox
    }

    #[must_use]
    pub fn bucket(&self, pool_id: PoolId, denom: &str) -> Option<&RewardBucket> {
        self.buckets.get(&(pool_id, denom.to_string()))
    }

    /// Σ bucket balances of `denom` across pools.
    #[must_use]
    pub fn total_balance(&self, denom: &str) -> Amount {
        self.buckets
            .iter()
            .filter(|((_, d), _)| d == denom)
            .map(|(_, b)| b.balance)
            .fold(0, Amount::saturating_add)
    }

    /// Every denom with a bucket, sorted.
    #[must_use]
    pub fn denoms(&self) -> Vec<Denom> {
        let mut denoms: Vec<Denom> = self.buckets.keys().map(|(_, d)| d.clone()).collect();
        denoms.sort();
        denoms.dedup();
        denoms
    }

    /// Check that the buckets of `pool_id` still hold what they reserve for
    /// unspread income. Costs one step per bucket, not per holder.
    ///
    /// # Errors
    /// `InvariantViolation` naming the first short bucket.
    pub fn verify_pool(&self, pool_id: PoolId) -> Result<()> {
        for ((pool, denom), bucket) in self.pool_buckets(pool_id) {
            let reserved = bucket.reserved()?;
            if reserved > bucket.balance {
                return Err(ShieldError::InvariantViolation {
                    reason: format!(
                        "bucket {pool}/{denom} reserves {reserved} but holds {}",
                        bucket.balance
                    ),
                });
            }
        }
        Ok(())
    }

    /// Check that every bucket can pay what its holders are owed plus what
    /// it reserves for unspread income.
    ///
    /// # Errors
    /// `InvariantViolation` naming the first insolvent bucket.
    pub fn verify(&self, weight_of: impl Fn(PoolId, &Address) -> Amount) -> Result<()> {
        let mut owed: BTreeMap<&BucketKey, Amount> = BTreeMap::new();
        for (holder, pools) in &self.members {
            for pool_id in pools {
                let weight = weight_of(*pool_id, holder);
                for (key, bucket) in self.pool_buckets(*pool_id) {
                    let due = self.owed(holder, key, bucket, weight)?;
                    let entry = owed.entry(key).or_insert(0);
                    *entry = math::add(*entry, due, "reward owed")?;
                }
            }
        }
        for (key, bucket) in &self.buckets {
            let due = owed.get(key).copied().unwrap_or(0);
            let reserved = bucket.reserved()?;
            if math::add(due, reserved, "reward owed")? > bucket.balance {
                return Err(ShieldError::InvariantViolation {
                    reason: format!(
                        "bucket {}/{} owes {due} + reserved {reserved} but holds {}",
                        key.0, key.1, bucket.balance
                    ),
                });
            }
        }
        Ok(())
    }
}
