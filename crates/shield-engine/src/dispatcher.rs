//! Routes each [`Operation`] to the stores it touches.
//!
//! Handlers mutate the staged [`ShieldState`] freely and may fail half way;
//! the engine discards the staged copy on any error.

use shield_coverage::{utilization, NewPurchase, PremiumPolicy};
use shield_ledger::{NewPool, PoolUpdate};
use shield_settlement::settle_reimbursement;
use shield_types::{
    math, Address, AddressValidator, Amount, BlockContext, EngineConfig, MixedCoins, Operation,
    OperationOutcome, PoolId, Result, ShieldError,
};

use crate::state::ShieldState;

/// Read-only collaborators for one dispatch.
pub(crate) struct DispatchEnv<'a> {
    pub config: &'a EngineConfig,
    pub premium: &'a dyn PremiumPolicy,
    pub validator: &'a dyn AddressValidator,
}

impl DispatchEnv<'_> {
    fn native(&self) -> &str {
        &self.config.native_denom
    }

    fn admin(&self) -> Option<&Address> {
        self.config.admin.as_ref()
    }

    /// Parse a sponsor address. A blank one is `EmptySponsor`.
    fn sponsor_addr(&self, raw: &str) -> Result<Address> {
        if raw.trim().is_empty() {
            return Err(ShieldError::EmptySponsor);
        }
        self.validator.validate(raw)?;
        Ok(Address::new(raw))
    }
}

pub(crate) fn dispatch(
    state: &mut ShieldState,
    env: &DispatchEnv<'_>,
    ctx: &BlockContext,
    op: Operation,
) -> Result<OperationOutcome> {
    match op {
        Operation::CreatePool {
            from,
            shield,
            deposit,
            sponsor,
            sponsor_addr,
            description,
            shield_limit,
        } => {
            if sponsor.trim().is_empty() {
                return Err(ShieldError::EmptySponsor);
            }
            let sponsor_addr = env.sponsor_addr(&sponsor_addr)?;
            let pool_id = state.pools.create(
                ctx,
                NewPool {
                    creator: from.clone(),
                    sponsor,
                    sponsor_addr,
                    description,
                    sponsored_shield: shield,
                    shield_limit,
                },
            )?;
            if deposit == 0 {
                return Err(ShieldError::InvalidDeposit(deposit));
            }
            deposit_collateral(state, env, pool_id, &from, deposit)?;
            Ok(OperationOutcome::PoolCreated { pool_id })
        }

        Operation::UpdatePool {
            from,
            pool_id,
            shield,
            shield_limit,
            service_fees,
            description,
        } => {
            state.pools.update(
                pool_id,
                &from,
                env.admin(),
                PoolUpdate {
                    sponsored_shield: shield,
                    shield_limit,
                    description,
                },
            )?;
            credit_service_fees(state, env, pool_id, &service_fees)?;
            Ok(OperationOutcome::PoolUpdated { pool_id })
        }

        Operation::PausePool { from, pool_id } => {
            state.pools.pause(pool_id, &from, env.admin())?;
            Ok(OperationOutcome::PoolPaused { pool_id })
        }

        Operation::ResumePool { from, pool_id } => {
            state.pools.resume(pool_id, &from, env.admin())?;
            Ok(OperationOutcome::PoolResumed { pool_id })
        }

        Operation::DepositCollateral {
            from,
            pool_id,
            amount,
        } => {
            state.pools.get_open(pool_id)?;
            deposit_collateral(state, env, pool_id, &from, amount)?;
            Ok(OperationOutcome::CollateralDeposited {
                pool_id,
                deposited: amount,
            })
        }

        Operation::WithdrawCollateral {
            from,
            pool_id,
            amount,
        } => {
            state.pools.get(pool_id)?;
            state.settle_holder(pool_id, &from)?;
            state.ledger.withdraw(pool_id, &from, amount)?;
            state.pools.sub_collateral(pool_id, amount)?;
            state.supply.record_outflow(env.native(), amount)?;
            let open_claims = state.claims.has_open_claims(pool_id, &state.coverage);
            let pool_closed = state.pools.close_if_drained(pool_id, open_claims)?;
            Ok(OperationOutcome::CollateralWithdrawn {
                pool_id,
                withdrawn: amount,
                pool_closed,
            })
        }

        Operation::WithdrawRewards { from } => {
            let amount = withdraw_rewards(state, &from, env.native())?;
            Ok(OperationOutcome::RewardsWithdrawn { amount })
        }

        Operation::WithdrawForeignRewards {
            from,
            denom,
            to_addr,
        } => {
            if denom.trim().is_empty() || denom == env.native() {
                return Err(ShieldError::InvalidDenom(denom));
            }
            if env.validator.validate(&to_addr).is_err() {
                return Err(ShieldError::InvalidDestinationAddress(to_addr));
            }
            let amount = withdraw_rewards(state, &from, &denom)?;
            if amount > 0 {
                state
                    .rewards
                    .record_foreign_claim(ctx, &from, &denom, &to_addr, amount);
            }
            Ok(OperationOutcome::ForeignRewardsWithdrawn {
                denom,
                to_addr,
                amount,
            })
        }

        Operation::PurchaseShield {
            from,
            pool_id,
            shield,
            description,
        } => purchase_shield(state, env, ctx, from, pool_id, shield, description),

        Operation::WithdrawReimbursement { from, proposal_id } => {
            let payout = settle_reimbursement(state.settlement(env.native()), proposal_id, &from)?;
            Ok(OperationOutcome::ReimbursementPaid {
                proposal_id,
                amount: payout.amount,
            })
        }

        Operation::StakeForShield {
            from,
            pool_id,
            amount,
        } => {
            let pool = state.pools.get_active(pool_id)?;
            if amount == 0 {
                return Err(ShieldError::InvalidDeposit(amount));
            }
            let headroom = math::add(pool.shield_issued, amount, "stake headroom")?;
            if headroom > pool.shield_limit {
                return Err(ShieldError::ShieldLimitExceeded {
                    requested: amount,
                    issued: pool.shield_issued,
                    limit: pool.shield_limit,
                });
            }
            state.settle_holder(pool_id, &from)?;
            state.ledger.stake(pool_id, &from, amount)?;
            state.pools.add_stake(pool_id, amount)?;
            state.supply.record_inflow(env.native(), amount)?;
            let total_weight = state.total_weight(pool_id)?;
            state.rewards.flush(pool_id, total_weight)?;
            Ok(OperationOutcome::Staked {
                pool_id,
                staked: amount,
            })
        }

        Operation::UnstakeFromShield {
            from,
            pool_id,
            amount,
        } => {
            state.pools.get(pool_id)?;
            state.settle_holder(pool_id, &from)?;
            state.ledger.unstake(pool_id, &from, amount)?;
            state.pools.sub_stake(pool_id, amount)?;
            state.supply.record_outflow(env.native(), amount)?;
            Ok(OperationOutcome::Unstaked {
                pool_id,
                unstaked: amount,
            })
        }

        Operation::UpdateSponsor {
            from,
            pool_id,
            sponsor,
            sponsor_addr,
        } => {
            state.pools.get(pool_id)?;
            let sponsor_addr = env.sponsor_addr(&sponsor_addr)?;
            state
                .pools
                .update_sponsor(pool_id, &from, sponsor, sponsor_addr)?;
            Ok(OperationOutcome::SponsorUpdated { pool_id })
        }
    }
}

/// Credit collateral to a provider, settling their rewards first.
fn deposit_collateral(
    state: &mut ShieldState,
    env: &DispatchEnv<'_>,
    pool_id: PoolId,
    provider: &Address,
    amount: Amount,
) -> Result<()> {
    if amount == 0 {
        return Err(ShieldError::InvalidDeposit(amount));
    }
    state.settle_holder(pool_id, provider)?;
    state.ledger.deposit(pool_id, provider, amount)?;
    state.pools.add_collateral(pool_id, amount)?;
    state.supply.record_inflow(env.native(), amount)?;
    let total_weight = state.total_weight(pool_id)?;
    state.rewards.flush(pool_id, total_weight)
}

fn credit_service_fees(
    state: &mut ShieldState,
    env: &DispatchEnv<'_>,
    pool_id: PoolId,
    fees: &MixedCoins,
) -> Result<()> {
    for coin in &fees.foreign {
        if coin.denom.trim().is_empty() || coin.denom == env.native() {
            return Err(ShieldError::InvalidDenom(coin.denom.clone()));
        }
    }
    let total_weight = state.total_weight(pool_id)?;
    let native = std::iter::once((env.native(), fees.native));
    let foreign = fees.foreign.iter().map(|c| (c.denom.as_str(), c.amount));
    for (denom, amount) in native.chain(foreign) {
        if amount == 0 {
            continue;
        }
        state.rewards.credit(pool_id, denom, amount, total_weight)?;
        state.supply.record_inflow(denom, amount)?;
    }
    if !fees.is_zero() {
        tracing::debug!(
            pool = %pool_id,
            native = fees.native,
            foreign = fees.foreign.len(),
            "Service fees credited"
        );
    }
    Ok(())
}

fn withdraw_rewards(state: &mut ShieldState, holder: &Address, denom: &str) -> Result<Amount> {
    let ledger = &state.ledger;
    let amount = state
        .rewards
        .withdraw(holder, denom, |pool| ledger.weight(pool, holder))?;
    state.supply.record_outflow(denom, amount)?;
    Ok(amount)
}

fn purchase_shield(
    state: &mut ShieldState,
    env: &DispatchEnv<'_>,
    ctx: &BlockContext,
    purchaser: Address,
    pool_id: PoolId,
    coverage: Amount,
    description: String,
) -> Result<OperationOutcome> {
    let pool = state.pools.get_active(pool_id)?;
    if description.trim().is_empty() {
        return Err(ShieldError::EmptyDescription);
    }
    if coverage == 0 {
        return Err(ShieldError::InvalidShieldAmount(coverage));
    }
    let issued = math::add(pool.shield_issued, coverage, "shield issued")?;
    if issued > pool.shield_limit {
        return Err(ShieldError::ShieldLimitExceeded {
            requested: coverage,
            issued: pool.shield_issued,
            limit: pool.shield_limit,
        });
    }
    if issued > pool.total_collateral {
        return Err(ShieldError::InsufficientCollateral {
            needed: coverage,
            available: pool.total_collateral.saturating_sub(pool.shield_issued),
        });
    }
    let premium = env
        .premium
        .premium(coverage, utilization(pool.shield_issued, pool.shield_limit)?)?;
    let total_weight = pool.total_weight();

    state.ledger.lock(pool_id, coverage)?;
    state.pools.issue_shield(pool_id, coverage)?;
    let purchase_id = state.coverage.record(
        ctx,
        NewPurchase {
            pool_id,
            purchaser,
            coverage,
            premium,
            description,
        },
        env.config.protection_period(),
    )?;
    state
        .rewards
        .credit(pool_id, env.native(), premium, total_weight)?;
    state.supply.record_inflow(env.native(), premium)?;

    Ok(OperationOutcome::ShieldPurchased {
        pool_id,
        purchase_id,
        premium,
    })
}
