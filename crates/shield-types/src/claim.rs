//! # Reimbursement claims
//!
//! Governance decides *whether* a claim is paid; this engine only settles it.
//!
//! ```text
//!   ┌─────────┐ approve ┌──────────┐ withdraw ┌──────┐
//!   │ PENDING ├────────▶│ APPROVED ├─────────▶│ PAID │
//!   └────┬────┘         └────┬─────┘          └──────┘
//!        │ reject            │ reject
//!        ▼                   ▼
//!   ┌──────────────────────────┐
//!   │         REJECTED         │
//!   └──────────────────────────┘
//! ```
//!
//! Transitions are monotonic. `Paid` is what prevents double payout.

use serde::{Deserialize, Serialize};

use crate::{Address, Amount, ProposalId, PurchaseId, Result, ShieldError};

/// Lifecycle status of a reimbursement claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimStatus {
    Pending,
    Approved,
    /// Settled. **Irreversible.**
    Paid,
    Rejected,
}

impl ClaimStatus {
    /// Can a claim in this status move to `target`?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Approved | Self::Rejected)
                | (Self::Approved, Self::Paid | Self::Rejected)
        )
    }

    /// Whether the claim still holds coverage in place.
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }
}

impl std::fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Approved => write!(f, "APPROVED"),
            Self::Paid => write!(f, "PAID"),
            Self::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// A reimbursement claim against a specific shield purchase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReimbursementClaim {
    pub proposal_id: ProposalId,
    pub purchase_id: PurchaseId,
    pub beneficiary: Address,
    /// Amount approved by governance.
    pub amount: Amount,
    /// Amount actually paid out; set on settlement.
    pub paid: Amount,
    pub status: ClaimStatus,
}

impl ReimbursementClaim {
    #[must_use]
    pub fn new(
        proposal_id: ProposalId,
        purchase_id: PurchaseId,
        beneficiary: Address,
        amount: Amount,
    ) -> Self {
        Self {
            proposal_id,
            purchase_id,
            beneficiary,
            amount,
            paid: 0,
            status: ClaimStatus::Pending,
        }
    }

    fn transition(&mut self, target: ClaimStatus) -> Result<()> {
        if !self.status.can_transition_to(target) {
            return Err(ShieldError::InvalidClaimStatus {
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        Ok(())
    }

    /// # Errors
    /// `InvalidClaimStatus` unless the claim is Pending.
    pub fn mark_approved(&mut self) -> Result<()> {
        self.transition(ClaimStatus::Approved)
    }

    /// # Errors
    /// `InvalidClaimStatus` unless the claim is Pending or Approved.
    pub fn mark_rejected(&mut self) -> Result<()> {
        self.transition(ClaimStatus::Rejected)
    }

    /// Record the payout and move to Paid.
    ///
    /// # Errors
    /// `InvalidClaimStatus` unless the claim is Approved.
    pub fn mark_paid(&mut self, paid: Amount) -> Result<()> {
        self.transition(ClaimStatus::Paid)?;
        self.paid = paid;
        Ok(())
    }
}
