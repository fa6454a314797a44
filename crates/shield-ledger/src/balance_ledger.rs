//! Balance ledger for collateral and stake positions.
//!
//! Tracks per-(pool, holder) positions in two namespaces: collateral, which
//! can be locked against outstanding shield, and stake, which is never
//! locked. All mutations validate first: either the whole operation
//! succeeds or the ledger is unchanged.
//!
//! Locks are pool-level requests spread over the pool's providers pro-rata
//! (see [`math::allocate_pro_rata`]), so no single provider's `locked` can
//! exceed their `deposited`.

use std::collections::BTreeMap;

use shield_types::{math, Address, Amount, PoolId, Position, Result, ShieldError};

/// Which balance namespace a position lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionKind {
    Collateral,
    Stake,
}

/// Per-holder debit produced when locked collateral is consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Debit {
    pub provider: Address,
    pub amount: Amount,
}

/// Source of truth for every collateral and stake position.
#[derive(Debug, Clone, Default)]
pub struct BalanceLedger {
    collateral: BTreeMap<PoolId, BTreeMap<Address, Position>>,
    stakes: BTreeMap<PoolId, BTreeMap<Address, Position>>,
}

impl BalanceLedger {
    /// Create a new empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn namespace(&self, kind: PositionKind) -> &BTreeMap<PoolId, BTreeMap<Address, Position>> {
        match kind {
            PositionKind::Collateral => &self.collateral,
            PositionKind::Stake => &self.stakes,
        }
    }

    fn namespace_mut(
        &mut self,
        kind: PositionKind,
    ) -> &mut BTreeMap<PoolId, BTreeMap<Address, Position>> {
        match kind {
            PositionKind::Collateral => &mut self.collateral,
            PositionKind::Stake => &mut self.stakes,
        }
    }

    /// Credit a position. Creates it on first deposit.
    ///
    /// # Errors
    /// `InvalidDeposit` for a zero amount, `ArithmeticOverflow` on overflow.
    pub fn credit(
        &mut self,
        kind: PositionKind,
        pool_id: PoolId,
        holder: &Address,
        amount: Amount,
    ) -> Result<Position> {
        if amount == 0 {
            return Err(ShieldError::InvalidDeposit(amount));
        }
        let current = self.position(kind, pool_id, holder);
        let deposited = math::add(current.deposited, amount, "ledger credit")?;

        let entry = self
            .namespace_mut(kind)
            .entry(pool_id)
            .or_default()
            .entry(holder.clone())
            .or_default();
        entry.deposited = deposited;
        Ok(*entry)
    }

    /// Debit the unlocked part of a position. Removes it when it reaches zero.
    ///
    /// # Errors
    /// `InsufficientUnlockedCollateral` if `amount > deposited - locked`,
    /// `InvalidDeposit` for a zero amount.
    pub fn debit(
        &mut self,
        kind: PositionKind,
        pool_id: PoolId,
        holder: &Address,
        amount: Amount,
    ) -> Result<Position> {
        if amount == 0 {
            return Err(ShieldError::InvalidDeposit(amount));
        }
        let current = self.position(kind, pool_id, holder);
        if current.withdrawable() < amount {
            return Err(ShieldError::InsufficientUnlockedCollateral {
                needed: amount,
                available: current.withdrawable(),
            });
        }

        let updated = Position {
            deposited: current.deposited - amount,
            locked: current.locked,
        };
        self.store(kind, pool_id, holder, updated);
        Ok(updated)
    }

    /// Deposit collateral.
    pub fn deposit(
        &mut self,
        pool_id: PoolId,
        provider: &Address,
        amount: Amount,
    ) -> Result<Position> {
        self.credit(PositionKind::Collateral, pool_id, provider, amount)
    }

    /// Withdraw unlocked collateral.
    pub fn withdraw(
        &mut self,
        pool_id: PoolId,
        provider: &Address,
        amount: Amount,
    ) -> Result<Position> {
        self.debit(PositionKind::Collateral, pool_id, provider, amount)
    }

    /// Stake into a pool.
    pub fn stake(&mut self, pool_id: PoolId, staker: &Address, amount: Amount) -> Result<Position> {
        self.credit(PositionKind::Stake, pool_id, staker, amount)
    }

    /// Unstake from a pool.
    pub fn unstake(
        &mut self,
        pool_id: PoolId,
        staker: &Address,
        amount: Amount,
    ) -> Result<Position> {
        self.debit(PositionKind::Stake, pool_id, staker, amount)
    }

    fn store(&mut self, kind: PositionKind, pool_id: PoolId, holder: &Address, position: Position) {
        let ns = self.namespace_mut(kind);
        if position.is_zero() {
            if let Some(holders) = ns.get_mut(&pool_id) {
                holders.remove(holder);
                if holders.is_empty() {
                    ns.remove(&pool_id);
                }
            }
        } else {
            ns.entry(pool_id)
                .or_default()
                .insert(holder.clone(), position);
        }
    }

    /// Reserve `amount` of the pool's free collateral.
    ///
    /// # Errors
    /// `InsufficientCollateral` if the pool's unlocked collateral is short.
    pub fn lock(&mut self, pool_id: PoolId, amount: Amount) -> Result<()> {
        let free = self.free_collateral(pool_id);
        if free < amount {
            return Err(ShieldError::InsufficientCollateral {
                needed: amount,
                available: free,
            });
        }
        self.redistribute(pool_id, amount, Position::withdrawable, |pos, share| {
            pos.locked += share;
        })?;
        tracing::debug!(pool = %pool_id, amount, "Collateral locked");
        Ok(())
    }

    /// Release `amount` of the pool's locked collateral.
    ///
    /// # Errors
    /// `InsufficientLocked` if less than `amount` is locked.
    pub fn unlock(&mut self, pool_id: PoolId, amount: Amount) -> Result<()> {
        let locked = self.locked_collateral(pool_id);
        if locked < amount {
            return Err(ShieldError::InsufficientLocked {
                needed: amount,
                locked,
            });
        }
        self.redistribute(pool_id, amount, |pos| pos.locked, |pos, share| {
            pos.locked -= share;
        })?;
        tracing::debug!(pool = %pool_id, amount, "Collateral unlocked");
        Ok(())
    }

    /// Pay out `amount` of locked collateral: both `locked` and `deposited`
    /// shrink, pro-rata over the providers carrying the lock.
    ///
    /// # Errors
    /// `InsufficientLocked` if less than `amount` is locked.
    pub fn consume_locked(&mut self, pool_id: PoolId, amount: Amount) -> Result<Vec<Debit>> {
        let locked = self.locked_collateral(pool_id);
        if locked < amount {
            return Err(ShieldError::InsufficientLocked {
                needed: amount,
                locked,
            });
        }
        let debits = self.redistribute(pool_id, amount, |pos| pos.locked, |pos, share| {
            pos.locked -= share;
            pos.deposited -= share;
        })?;
        tracing::debug!(
            pool = %pool_id,
            amount,
            providers = debits.len(),
            "Locked collateral consumed"
        );
        Ok(debits)
    }

    /// Spread `amount` over the pool's collateral positions in proportion to
    /// `capacity`, applying `apply` to each touched position.
    fn redistribute(
        &mut self,
        pool_id: PoolId,
        amount: Amount,
        capacity: impl Fn(&Position) -> Amount,
        apply: impl Fn(&mut Position, Amount),
    ) -> Result<Vec<Debit>> {
        if amount == 0 {
            return Ok(Vec::new());
        }
        let Some(holders) = self.collateral.get_mut(&pool_id) else {
            return Err(ShieldError::InsufficientCollateral {
                needed: amount,
                available: 0,
            });
        };
        let capacities: Vec<Amount> = holders.values().map(&capacity).collect();
        let shares = math::allocate_pro_rata(amount, &capacities)?;

        let mut touched = Vec::new();
        for ((provider, position), share) in holders.iter_mut().zip(shares) {
            if share > 0 {
                apply(position, share);
                touched.push(Debit {
                    provider: provider.clone(),
                    amount: share,
                });
            }
        }
        holders.retain(|_, pos| !pos.is_zero());
        if holders.is_empty() {
            self.collateral.remove(&pool_id);
        }
        Ok(touched)
    }

    /// Collateral position of a provider (zero if none).
    #[must_use]
    pub fn collateral_position(&self, pool_id: PoolId, provider: &Address) -> Position {
        self.position(PositionKind::Collateral, pool_id, provider)
    }

    /// Stake position of a staker (zero if none).
    #[must_use]
    pub fn stake_position(&self, pool_id: PoolId, staker: &Address) -> Position {
        self.position(PositionKind::Stake, pool_id, staker)
    }

    #[must_use]
    pub fn position(&self, kind: PositionKind, pool_id: PoolId, holder: &Address) -> Position {
        self.namespace(kind)
            .get(&pool_id)
            .and_then(|holders| holders.get(holder))
            .copied()
            .unwrap_or_default()
    }

    /// Reward weight of a holder in a pool: collateral plus stake.
    #[must_use]
    pub fn weight(&self, pool_id: PoolId, holder: &Address) -> Amount {
        self.collateral_position(pool_id, holder)
            .deposited
            .saturating_add(self.stake_position(pool_id, holder).deposited)
    }

    /// All positions of one kind in a pool, in address order.
    pub fn positions(
        &self,
        kind: PositionKind,
        pool_id: PoolId,
    ) -> impl Iterator<Item = (&Address, &Position)> {
        self.namespace(kind)
            .get(&pool_id)
            .into_iter()
            .flat_map(|holders| holders.iter())
    }

    /// Providers currently carrying part of the pool's lock.
    #[must_use]
    pub fn providers_with_locked(&self, pool_id: PoolId) -> Vec<Address> {
        self.positions(PositionKind::Collateral, pool_id)
            .filter(|(_, pos)| pos.locked > 0)
            .map(|(addr, _)| addr.clone())
            .collect()
    }

    fn sum(
        &self,
        kind: PositionKind,
        pool_id: PoolId,
        field: impl Fn(&Position) -> Amount,
    ) -> Amount {
        self.positions(kind, pool_id)
            .map(|(_, pos)| field(pos))
            .fold(0, Amount::saturating_add)
    }

    /// Σ deposited collateral in a pool.
    #[must_use]
    pub fn total_collateral(&self, pool_id: PoolId) -> Amount {
        self.sum(PositionKind::Collateral, pool_id, |p| p.deposited)
    }

    /// Σ locked collateral in a pool.
    #[must_use]
    pub fn locked_collateral(&self, pool_id: PoolId) -> Amount {
        self.sum(PositionKind::Collateral, pool_id, |p| p.locked)
    }

    /// Σ (deposited − locked) in a pool.
    #[must_use]
    pub fn free_collateral(&self, pool_id: PoolId) -> Amount {
        self.sum(PositionKind::Collateral, pool_id, Position::withdrawable)
    }

    /// Σ stake in a pool.
    #[must_use]
    pub fn total_staked(&self, pool_id: PoolId) -> Amount {
        self.sum(PositionKind::Stake, pool_id, |p| p.deposited)
    }

    /// Σ of every position across all pools (collateral + stake).
    #[must_use]
    pub fn total_supply(&self) -> Amount {
        self.collateral
            .values()
            .chain(self.stakes.values())
            .flat_map(BTreeMap::values)
            .map(|pos| pos.deposited)
            .fold(0, Amount::saturating_add)
    }

    /// First position (if any) with `locked > deposited`, or a stake with a lock.
    #[must_use]
    pub fn find_inconsistent(&self) -> Option<(PoolId, Address, Position)> {
        let bad_collateral = self.collateral.iter().flat_map(|(pool, holders)| {
            holders
                .iter()
                .filter(|(_, pos)| !pos.is_consistent())
                .map(move |(addr, pos)| (*pool, addr.clone(), *pos))
        });
        let bad_stake = self.stakes.iter().flat_map(|(pool, holders)| {
            holders
                .iter()
                .filter(|(_, pos)| pos.locked != 0)
                .map(move |(addr, pos)| (*pool, addr.clone(), *pos))
        });
        bad_collateral.chain(bad_stake).next()
    }
}
