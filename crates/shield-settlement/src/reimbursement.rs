//! Reimbursement claims and their settlement.
//!
//! Governance files claims through [`ClaimRegistry::register`] and decides
//! them with `approve` / `reject`:
//!
//! ```text
//!   ┌─────────┐ approve ┌──────────┐ withdraw ┌──────┐
//!   │ Pending │ ──────► │ Approved │ ───────► │ Paid │
//!   └────┬────┘         └────┬─────┘          └──────┘
//!        │ reject            │ reject
//!        ▼                   ▼
//!   ┌──────────────────────────┐
//!   │         Rejected         │
//!   └──────────────────────────┘
//! ```
//!
//! Settlement ([`settle_reimbursement`]) is the only path by which
//! collateral leaves a pool other than a provider's own withdrawal:
//! 1. Check the claim is Approved, unpaid, and the caller is the beneficiary
//! 2. Size the payout: `min(claim amount, remaining coverage)`
//! 3. Settle rewards of every provider carrying the lock
//! 4. Consume locked collateral pro-rata
//! 5. Reduce pool collateral and shield issued, and the purchase's coverage
//! 6. Mark the claim Paid and record the outflow

use std::collections::{BTreeMap, BTreeSet};

use shield_coverage::{CoverageTracker, RewardDistributor};
use shield_ledger::{BalanceLedger, Debit, PoolRegistry, SupplyConservation};
use shield_types::{
    Address, Amount, ClaimStatus, PoolId, ProposalId, PurchaseId, PurchaseStatus,
    ReimbursementClaim, Result, ShieldError,
};

/// Owns every reimbursement claim, keyed by governance proposal.
#[derive(Debug, Clone, Default)]
pub struct ClaimRegistry {
    claims: BTreeMap<ProposalId, ReimbursementClaim>,
}

impl ClaimRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// File a Pending claim against a purchase.
    ///
    /// # Errors
    /// - `DuplicateClaim` if the proposal already has a claim
    /// - `InvalidShieldAmount` for a zero amount
    /// - `PurchaseNotFound` if the purchase is unknown
    /// - `ClaimExceedsCoverage` if the amount exceeds remaining coverage
    pub fn register(
        &mut self,
        coverage: &CoverageTracker,
        proposal_id: ProposalId,
        purchase_id: PurchaseId,
        beneficiary: Address,
        amount: Amount,
    ) -> Result<&ReimbursementClaim> {
        if self.claims.contains_key(&proposal_id) {
            return Err(ShieldError::DuplicateClaim(proposal_id));
        }
        if amount == 0 {
            return Err(ShieldError::InvalidShieldAmount(0));
        }
        Self::check_coverage(coverage, purchase_id, amount)?;

        let claim = ReimbursementClaim::new(proposal_id, purchase_id, beneficiary, amount);
        Ok(self.claims.entry(proposal_id).or_insert(claim))
    }

    fn check_coverage(
        coverage: &CoverageTracker,
        purchase_id: PurchaseId,
        amount: Amount,
    ) -> Result<()> {
        let remaining = coverage.claimable(purchase_id)?;
        if amount > remaining {
            return Err(ShieldError::ClaimExceedsCoverage {
                amount,
                coverage: remaining,
            });
        }
        Ok(())
    }

    /// Pending → Approved, re-checking coverage.
    ///
    /// # Errors
    /// `ClaimNotFound`, `InvalidClaimStatus`, `ClaimExceedsCoverage`.
    pub fn approve(
        &mut self,
        coverage: &CoverageTracker,
        proposal_id: ProposalId,
    ) -> Result<&ReimbursementClaim> {
        let claim = self.get(proposal_id)?;
        if !claim.status.can_transition_to(ClaimStatus::Approved) {
            return Err(ShieldError::InvalidClaimStatus {
                from: claim.status,
                to: ClaimStatus::Approved,
            });
        }
        Self::check_coverage(coverage, claim.purchase_id, claim.amount)?;
        let claim = self.get_mut(proposal_id)?;
        claim.mark_approved()?;
        Ok(claim)
    }

    /// Pending | Approved → Rejected.
    ///
    /// # Errors
    /// `ClaimNotFound`, `InvalidClaimStatus`.
    pub fn reject(&mut self, proposal_id: ProposalId) -> Result<&ReimbursementClaim> {
        let claim = self.get_mut(proposal_id)?;
        claim.mark_rejected()?;
        Ok(claim)
    }

    /// # Errors
    /// `ClaimNotFound` if no claim is filed under the proposal.
    pub fn get(&self, proposal_id: ProposalId) -> Result<&ReimbursementClaim> {
        self.claims
            .get(&proposal_id)
            .ok_or(ShieldError::ClaimNotFound(proposal_id))
    }

    fn get_mut(&mut self, proposal_id: ProposalId) -> Result<&mut ReimbursementClaim> {
        self.claims
            .get_mut(&proposal_id)
            .ok_or(ShieldError::ClaimNotFound(proposal_id))
    }

    /// Purchases referenced by a Pending or Approved claim.
    #[must_use]
    pub fn held_purchases(&self) -> BTreeSet<PurchaseId> {
        self.claims
            .values()
            .filter(|c| c.status.is_open())
            .map(|c| c.purchase_id)
            .collect()
    }

    /// Whether any open claim targets a purchase of `pool_id`.
    #[must_use]
    pub fn has_open_claims(&self, pool_id: PoolId, coverage: &CoverageTracker) -> bool {
        self.claims.values().any(|c| {
            c.status.is_open()
                && coverage
                    .get(c.purchase_id)
                    .is_ok_and(|p| p.pool_id == pool_id)
        })
    }

    pub fn claims(&self) -> impl Iterator<Item = &ReimbursementClaim> {
        self.claims.values()
    }
}

/// Mutable view of the state touched by a reimbursement.
pub struct SettlementState<'a> {
    pub ledger: &'a mut BalanceLedger,
    pub pools: &'a mut PoolRegistry,
    pub coverage: &'a mut CoverageTracker,
    pub rewards: &'a mut RewardDistributor,
    pub claims: &'a mut ClaimRegistry,
    pub supply: &'a mut SupplyConservation,
    /// Denom the payout is made in.
    pub denom: &'a str,
}

/// Result of a successful reimbursement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payout {
    pub proposal_id: ProposalId,
    pub purchase_id: PurchaseId,
    pub pool_id: PoolId,
    pub beneficiary: Address,
    pub amount: Amount,
    pub purchase_status: PurchaseStatus,
    /// Per-provider share of the payout.
    pub debits: Vec<Debit>,
}

/// Pay an approved claim out of the locked collateral backing its purchase.
///
/// Mutates `state` step by step; callers run it on a staged copy and
/// discard the copy on error.
///
/// # Errors
/// - `ClaimNotFound` if no claim exists for the proposal
/// - `AlreadyPaid` if the claim was paid before
/// - `ClaimNotApproved` if it is Pending or Rejected
/// - `Unauthorized` if `caller` is not the beneficiary
pub fn settle_reimbursement(
    state: SettlementState<'_>,
    proposal_id: ProposalId,
    caller: &Address,
) -> Result<Payout> {
    // 1. Claim checks
    let claim = state.claims.get(proposal_id)?;
    if claim.status == ClaimStatus::Paid {
        return Err(ShieldError::AlreadyPaid(proposal_id));
    }
    if claim.status != ClaimStatus::Approved {
        return Err(ShieldError::ClaimNotApproved {
            proposal_id,
            status: claim.status,
        });
    }
    if &claim.beneficiary != caller {
        return Err(ShieldError::Unauthorized(caller.clone()));
    }
    let purchase_id = claim.purchase_id;
    let beneficiary = claim.beneficiary.clone();

    // 2. Payout size
    let pool_id = state.coverage.get(purchase_id)?.pool_id;
    let amount = claim.amount.min(state.coverage.claimable(purchase_id)?);

    // 3. Providers' weight is about to shrink
    for provider in state.ledger.providers_with_locked(pool_id) {
        let weight = state.ledger.weight(pool_id, &provider);
        state.rewards.settle(&provider, pool_id, weight)?;
    }

    // 4. Collateral leaves the providers
    let debits = state.ledger.consume_locked(pool_id, amount)?;

    // 5. Pool totals and coverage
    state.pools.sub_collateral(pool_id, amount)?;
    state.pools.release_shield(pool_id, amount)?;
    let purchase_status = state.coverage.consume(purchase_id, amount)?;

    // 6. Claim and supply
    state.claims.get_mut(proposal_id)?.mark_paid(amount)?;
    state.supply.record_outflow(state.denom, amount)?;

    tracing::info!(
        proposal = %proposal_id,
        pool = %pool_id,
        amount,
        providers = debits.len(),
        "Reimbursement paid"
    );

    Ok(Payout {
        proposal_id,
        purchase_id,
        pool_id,
        beneficiary,
        amount,
        purchase_status,
        debits,
    })
}
