//! The shield engine: the single writer over all pool state.
//!
//! Every entry point follows the same commit protocol:
//!
//! ```text
//!   clone ──▶ apply to staged copy ──▶ verify touched pools ──▶ swap in + receipt
//!                    │                        │
//!                    └──── any error ─────────┴──▶ staged copy dropped
//! ```
//!
//! so an error never leaves partial state behind. The commit check covers
//! only the pools an operation touched and costs one step per pool and
//! reward bucket. Debug builds also run the full cross-store check
//! ([`ShieldEngine::verify_invariants`]) before every commit.

use std::collections::BTreeSet;

use serde::Serialize;
use shield_coverage::{LinearPremiumPolicy, PremiumPolicy};
use shield_types::{
    constants, Address, AddressValidator, Amount, BasicAddressValidator, BlockContext,
    EngineConfig, ForeignRewardClaim, Operation, OperationOutcome, Pool, PoolId, Position,
    ProposalId, PurchaseId, ReceiptType, ReimbursementClaim, Result, ShieldError,
    ShieldPurchase,
};

use crate::dispatcher::{self, DispatchEnv};
use crate::receipts::ReceiptLog;
use crate::state::ShieldState;

/// Payload of the expiry sweep receipt.
#[derive(Debug, Serialize)]
struct ExpiredPurchases<'a> {
    purchases: &'a [PurchaseId],
    released: Amount,
}

/// Pools whose records or reward buckets an outcome may have changed.
fn touched_pools(
    state: &ShieldState,
    sender: &Address,
    outcome: &OperationOutcome,
) -> Vec<PoolId> {
    match outcome {
        OperationOutcome::RewardsWithdrawn { .. }
        | OperationOutcome::ForeignRewardsWithdrawn { .. } => state.rewards.pools_of(sender),
        OperationOutcome::ReimbursementPaid { proposal_id, .. } => state
            .claims
            .get(*proposal_id)
            .and_then(|claim| state.coverage.get(claim.purchase_id))
            .map(|purchase| vec![purchase.pool_id])
            .unwrap_or_default(),
        other => other.pool_id().into_iter().collect(),
    }
}

/// Single-writer accounting engine for shield pools.
#[derive(Debug)]
pub struct ShieldEngine {
    config: EngineConfig,
    premium: Box<dyn PremiumPolicy>,
    validator: Box<dyn AddressValidator>,
    state: ShieldState,
    receipts: ReceiptLog,
}

impl ShieldEngine {
    /// Build an engine with the default linear premium policy and basic
    /// address validation.
    ///
    /// # Errors
    /// `Configuration` if the config does not validate.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let premium = Box::new(LinearPremiumPolicy::from(&config.premium));
        let receipts = ReceiptLog::new(config.receipt_log_capacity);
        tracing::info!(
            engine = constants::ENGINE_NAME,
            version = constants::VERSION,
            native_denom = %config.native_denom,
            admin = ?config.admin.as_ref().map(Address::as_str),
            protection_period_secs = ?config.protection_period_secs,
            "Shield engine initialized"
        );
        Ok(Self {
            config,
            premium,
            validator: Box::new(BasicAddressValidator),
            state: ShieldState::new(),
            receipts,
        })
    }

    /// Replace the premium policy.
    #[must_use]
    pub fn with_premium_policy(mut self, policy: Box<dyn PremiumPolicy>) -> Self {
        self.premium = policy;
        self
    }

    /// Replace the address validator.
    #[must_use]
    pub fn with_address_validator(mut self, validator: Box<dyn AddressValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Apply one operation atomically.
    ///
    /// # Errors
    /// `EmptySender` / `InvalidAddress` for a bad sender, otherwise whatever
    /// the operation rejects with. State is unchanged on error.
    pub fn execute(&mut self, ctx: &BlockContext, op: Operation) -> Result<OperationOutcome> {
        let kind = op.kind();
        let sender = op.sender().clone();
        let result = self.stage(
            |state, env| {
                if sender.is_empty() {
                    return Err(ShieldError::EmptySender);
                }
                env.validator.validate(sender.as_str())?;
                dispatcher::dispatch(state, env, ctx, op)
            },
            |state, outcome| touched_pools(state, &sender, outcome),
        );

        match result {
            Ok((staged, outcome)) => {
                let pool_id = outcome.pool_id();
                self.commit(staged, ReceiptType::Operation(kind), ctx, pool_id, &outcome)?;
                tracing::info!(
                    op = %kind,
                    sender = %sender,
                    pool = ?pool_id.map(|p| p.0),
                    height = ctx.height,
                    outcome = ?outcome,
                    "Operation committed"
                );
                Ok(outcome)
            }
            Err(err) => {
                tracing::warn!(
                    op = %kind,
                    sender = %sender,
                    code = err.code(),
                    error = %err,
                    "Operation rejected"
                );
                Err(err)
            }
        }
    }

    /// Run `apply` on a staged copy and verify the pools `touched` names.
    /// Returns the staged state for the caller to commit.
    fn stage<T>(
        &self,
        apply: impl FnOnce(&mut ShieldState, &DispatchEnv<'_>) -> Result<T>,
        touched: impl FnOnce(&ShieldState, &T) -> Vec<PoolId>,
    ) -> Result<(ShieldState, T)> {
        let env = DispatchEnv {
            config: &self.config,
            premium: self.premium.as_ref(),
            validator: self.validator.as_ref(),
        };
        let mut staged = self.state.clone();
        let value = apply(&mut staged, &env)?;
        staged.verify_pools(&touched(&staged, &value))?;
        if cfg!(debug_assertions) {
            staged.verify(&self.config.native_denom)?;
        }
        Ok((staged, value))
    }

    fn commit<P: Serialize>(
        &mut self,
        staged: ShieldState,
        receipt_type: ReceiptType,
        ctx: &BlockContext,
        pool_id: Option<PoolId>,
        payload: &P,
    ) -> Result<()> {
        let payload = serde_json::to_vec(payload)?;
        self.state = staged;
        let receipt = self.receipts.append(receipt_type, ctx, pool_id, payload);
        tracing::debug!(
            sequence = receipt.sequence,
            receipt_type = %receipt.receipt_type,
            hash = %receipt.payload_hash_hex(),
            "Receipt issued"
        );
        Ok(())
    }

    fn pool_of_purchase(&self, purchase_id: PurchaseId) -> Option<PoolId> {
        self.state.coverage.get(purchase_id).ok().map(|p| p.pool_id)
    }

    // ── Governance hooks ───────────────────────────────────────────────

    /// File a reimbursement claim for a governance proposal.
    ///
    /// # Errors
    /// `DuplicateClaim`, `InvalidShieldAmount`, `PurchaseNotFound`,
    /// `ClaimExceedsCoverage`, `InvalidAddress` for a bad beneficiary.
    pub fn register_claim(
        &mut self,
        ctx: &BlockContext,
        proposal_id: ProposalId,
        purchase_id: PurchaseId,
        beneficiary: Address,
        amount: Amount,
    ) -> Result<ReimbursementClaim> {
        let (staged, claim) = self.stage(
            |state, env| {
                env.validator.validate(beneficiary.as_str())?;
                state
                    .claims
                    .register(&state.coverage, proposal_id, purchase_id, beneficiary, amount)
                    .cloned()
            },
            |_, _| Vec::new(),
        )?;
        let pool_id = self.pool_of_purchase(purchase_id);
        self.commit(staged, ReceiptType::ClaimRegistered, ctx, pool_id, &claim)?;
        tracing::info!(
            proposal = %proposal_id,
            purchase = %purchase_id,
            amount,
            "Claim registered"
        );
        Ok(claim)
    }

    /// Approve a pending claim.
    ///
    /// # Errors
    /// `ClaimNotFound`, `InvalidClaimStatus`, `ClaimExceedsCoverage`.
    pub fn approve_claim(
        &mut self,
        ctx: &BlockContext,
        proposal_id: ProposalId,
    ) -> Result<ReimbursementClaim> {
        let (staged, claim) = self.stage(
            |state, _| {
                state
                    .claims
                    .approve(&state.coverage, proposal_id)
                    .cloned()
            },
            |_, _| Vec::new(),
        )?;
        let pool_id = self.pool_of_purchase(claim.purchase_id);
        self.commit(staged, ReceiptType::ClaimApproved, ctx, pool_id, &claim)?;
        tracing::info!(proposal = %proposal_id, amount = claim.amount, "Claim approved");
        Ok(claim)
    }

    /// Reject a pending or approved claim.
    ///
    /// # Errors
    /// `ClaimNotFound`, `InvalidClaimStatus`.
    pub fn reject_claim(
        &mut self,
        ctx: &BlockContext,
        proposal_id: ProposalId,
    ) -> Result<ReimbursementClaim> {
        let (staged, claim) = self.stage(
            |state, _| state.claims.reject(proposal_id).cloned(),
            |_, _| Vec::new(),
        )?;
        let pool_id = self.pool_of_purchase(claim.purchase_id);
        self.commit(staged, ReceiptType::ClaimRejected, ctx, pool_id, &claim)?;
        tracing::info!(proposal = %proposal_id, "Claim rejected");
        Ok(claim)
    }

    // ── End-of-block ───────────────────────────────────────────────────

    /// Expire every active purchase whose protection ended at or before
    /// `ctx.time`, releasing its locked collateral. Purchases backing an
    /// open claim are skipped until the claim resolves.
    ///
    /// # Errors
    /// Only on internal invariant failures.
    pub fn process_expirations(&mut self, ctx: &BlockContext) -> Result<Vec<PurchaseId>> {
        let (staged, (expired, released)) = self.stage(
            |state, _| {
                let held = state.claims.held_purchases();
                let due = state.coverage.due_for_expiry(ctx.time, &held);
                let mut released: Amount = 0;
                for id in &due {
                    let (pool_id, coverage) = state.coverage.expire(*id)?;
                    state.ledger.unlock(pool_id, coverage)?;
                    state.pools.release_shield(pool_id, coverage)?;
                    released = released.saturating_add(coverage);
                }
                Ok((due, released))
            },
            |state, (due, _)| {
                let pools: BTreeSet<PoolId> = due
                    .iter()
                    .filter_map(|id| state.coverage.get(*id).ok().map(|p| p.pool_id))
                    .collect();
                pools.into_iter().collect()
            },
        )?;
        if expired.is_empty() {
            return Ok(expired);
        }
        let payload = ExpiredPurchases {
            purchases: &expired,
            released,
        };
        self.commit(staged, ReceiptType::PurchasesExpired, ctx, None, &payload)?;
        tracing::info!(count = expired.len(), released, height = ctx.height, "Purchases expired");
        Ok(expired)
    }

    // ── Queries ────────────────────────────────────────────────────────

    /// # Errors
    /// `InvalidPoolId` or `PoolNotFound`.
    pub fn pool(&self, pool_id: PoolId) -> Result<&Pool> {
        self.state.pools.get(pool_id)
    }

    /// All pools in id order, closed ones included.
    pub fn pools(&self) -> impl Iterator<Item = &Pool> {
        self.state.pools.pools()
    }

    #[must_use]
    pub fn collateral_position(&self, pool_id: PoolId, provider: &Address) -> Position {
        self.state.ledger.collateral_position(pool_id, provider)
    }

    #[must_use]
    pub fn stake_position(&self, pool_id: PoolId, staker: &Address) -> Position {
        self.state.ledger.stake_position(pool_id, staker)
    }

    /// # Errors
    /// `PurchaseNotFound`.
    pub fn purchase(&self, purchase_id: PurchaseId) -> Result<&ShieldPurchase> {
        self.state.coverage.get(purchase_id)
    }

    pub fn purchases_by<'a>(
        &'a self,
        purchaser: &'a Address,
    ) -> impl Iterator<Item = &'a ShieldPurchase> + 'a {
        self.state.coverage.by_purchaser(purchaser)
    }

    /// # Errors
    /// `ClaimNotFound`.
    pub fn claim(&self, proposal_id: ProposalId) -> Result<&ReimbursementClaim> {
        self.state.claims.get(proposal_id)
    }

    /// Rewards `holder` could withdraw now in `denom`.
    ///
    /// # Errors
    /// `ArithmeticOverflow` on overflow.
    pub fn pending_rewards(&self, holder: &Address, denom: &str) -> Result<Amount> {
        let ledger = &self.state.ledger;
        self.state
            .rewards
            .pending(holder, denom, |pool| ledger.weight(pool, holder))
    }

    /// Foreign reward payouts for the host to execute, oldest first.
    #[must_use]
    pub fn foreign_outbox(&self) -> &[ForeignRewardClaim] {
        self.state.rewards.foreign_outbox()
    }

    #[must_use]
    pub fn receipts(&self) -> &ReceiptLog {
        &self.receipts
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Re-run the pre-commit invariant checks against committed state.
    ///
    /// # Errors
    /// The first violated invariant.
    pub fn verify_invariants(&self) -> Result<()> {
        self.state.verify(&self.config.native_denom)
    }
}
