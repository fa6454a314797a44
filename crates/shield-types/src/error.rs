//! Error types for the shield accounting engine.
//!
//! All errors use the `SH_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Pool registry errors
//! - 2xx: Collateral / stake / shield errors
//! - 3xx: Sender and authorization errors
//! - 4xx: Reimbursement claim errors
//! - 5xx: Reward errors
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{Address, Amount, ClaimStatus, PoolId, PoolStatus, ProposalId, PurchaseId};

/// Central error enum for all shield engine operations.
///
/// Every variant is a terminal rejection of a single operation. Nothing is
/// retried internally and the state is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShieldError {
    // =================================================================
    // Pool Registry Errors (1xx)
    // =================================================================
    /// Pool id zero is reserved and never assigned.
    #[error("SH_ERR_100: Invalid pool id: {0}")]
    InvalidPoolId(PoolId),

    /// No pool is registered under this id.
    #[error("SH_ERR_101: Pool not found: {0}")]
    PoolNotFound(PoolId),

    /// The pool is paused and rejects new coverage.
    #[error("SH_ERR_102: Pool {0} is not active")]
    PoolNotActive(PoolId),

    /// The pool is closed; only historical settlement remains.
    #[error("SH_ERR_103: Pool {0} is closed")]
    PoolClosed(PoolId),

    /// The pool is already in the requested status.
    #[error("SH_ERR_104: Invalid pool status transition: {from} -> {to}")]
    InvalidPoolStatus { from: PoolStatus, to: PoolStatus },

    /// The sponsor name is blank.
    #[error("SH_ERR_105: Sponsor must not be empty")]
    EmptySponsor,

    /// A purchase description is blank.
    #[error("SH_ERR_106: Description must not be empty")]
    EmptyDescription,

    // =================================================================
    // Collateral / Stake / Shield Errors (2xx)
    // =================================================================
    /// Shield amount is zero where coverage is required.
    #[error("SH_ERR_200: Invalid shield amount: {0}")]
    InvalidShieldAmount(Amount),

    /// Deposit or stake amount is not positive.
    #[error("SH_ERR_201: Invalid deposit amount: {0}")]
    InvalidDeposit(Amount),

    /// Issuing this coverage would exceed the pool's shield limit.
    #[error("SH_ERR_202: Shield limit exceeded: requested {requested}, issued {issued}, limit {limit}")]
    ShieldLimitExceeded {
        requested: Amount,
        issued: Amount,
        limit: Amount,
    },

    /// The pool does not have enough free collateral to lock.
    #[error("SH_ERR_203: Insufficient collateral: need {needed}, free {available}")]
    InsufficientCollateral { needed: Amount, available: Amount },

    /// The position's unlocked balance is smaller than the withdrawal.
    #[error("SH_ERR_204: Insufficient unlocked collateral: need {needed}, withdrawable {available}")]
    InsufficientUnlockedCollateral { needed: Amount, available: Amount },

    /// Not enough locked collateral to unlock or consume.
    #[error("SH_ERR_205: Insufficient locked collateral: need {needed}, locked {locked}")]
    InsufficientLocked { needed: Amount, locked: Amount },

    /// The referenced shield purchase does not exist.
    #[error("SH_ERR_206: Shield purchase not found: {0}")]
    PurchaseNotFound(PurchaseId),

    // =================================================================
    // Sender / Authorization Errors (3xx)
    // =================================================================
    /// The operation carries no sender.
    #[error("SH_ERR_300: Sender must not be empty")]
    EmptySender,

    /// The sender is not allowed to perform this operation.
    #[error("SH_ERR_301: Unauthorized: {0}")]
    Unauthorized(Address),

    /// An address failed the validity predicate.
    #[error("SH_ERR_302: Invalid address: {0:?}")]
    InvalidAddress(String),

    /// The foreign payout destination is not a valid address.
    #[error("SH_ERR_303: Invalid destination address: {0:?}")]
    InvalidDestinationAddress(String),

    // =================================================================
    // Reimbursement Claim Errors (4xx)
    // =================================================================
    /// No claim is registered for this proposal.
    #[error("SH_ERR_400: Claim not found for proposal {0}")]
    ClaimNotFound(ProposalId),

    /// The claim exists but has not been approved.
    #[error("SH_ERR_401: Claim for proposal {proposal_id} is {status}, not APPROVED")]
    ClaimNotApproved {
        proposal_id: ProposalId,
        status: ClaimStatus,
    },

    /// The claim was already paid out.
    #[error("SH_ERR_402: Claim for proposal {0} already paid")]
    AlreadyPaid(ProposalId),

    /// A claim is already registered for this proposal.
    #[error("SH_ERR_403: Duplicate claim for proposal {0}")]
    DuplicateClaim(ProposalId),

    /// The claim amount exceeds the locked coverage of its purchase.
    #[error("SH_ERR_404: Claim amount {amount} exceeds remaining coverage {coverage}")]
    ClaimExceedsCoverage { amount: Amount, coverage: Amount },

    /// The claim cannot move from its current status to the target.
    #[error("SH_ERR_405: Invalid claim transition: {from} -> {to}")]
    InvalidClaimStatus { from: ClaimStatus, to: ClaimStatus },

    // =================================================================
    // Reward Errors (5xx)
    // =================================================================
    /// The denomination is blank or names the native denom where a foreign one is expected.
    #[error("SH_ERR_500: Invalid denom: {0:?}")]
    InvalidDenom(String),

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Supply conservation invariant violated. Critical.
    #[error("SH_ERR_900: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    /// A pool or position invariant failed verification before commit.
    #[error("SH_ERR_901: Invariant violation: {reason}")]
    InvariantViolation { reason: String },

    /// Checked arithmetic overflowed or underflowed.
    #[error("SH_ERR_902: Arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),

    /// Configuration error (invalid config file, bad values, etc.).
    #[error("SH_ERR_903: Configuration error: {0}")]
    Configuration(String),

    /// Serialization / deserialization error.
    #[error("SH_ERR_904: Serialization error: {0}")]
    Serialization(String),
}

impl ShieldError {
    /// The numeric `SH_ERR_` code, used as a structured log field.
    #[must_use]
    pub fn code(&self) -> u16 {
        match self {
            Self::InvalidPoolId(_) => 100,
            Self::PoolNotFound(_) => 101,
            Self::PoolNotActive(_) => 102,
            Self::PoolClosed(_) => 103,
            Self::InvalidPoolStatus { .. } => 104,
            Self::EmptySponsor => 105,
            Self::EmptyDescription => 106,
            Self::InvalidShieldAmount(_) => 200,
            Self::InvalidDeposit(_) => 201,
            Self::ShieldLimitExceeded { .. } => 202,
            Self::InsufficientCollateral { .. } => 203,
            Self::InsufficientUnlockedCollateral { .. } => 204,
            Self::InsufficientLocked { .. } => 205,
            Self::PurchaseNotFound(_) => 206,
            Self::EmptySender => 300,
            Self::Unauthorized(_) => 301,
            Self::InvalidAddress(_) => 302,
            Self::InvalidDestinationAddress(_) => 303,
            Self::ClaimNotFound(_) => 400,
            Self::ClaimNotApproved { .. } => 401,
            Self::AlreadyPaid(_) => 402,
            Self::DuplicateClaim(_) => 403,
            Self::ClaimExceedsCoverage { .. } => 404,
            Self::InvalidClaimStatus { .. } => 405,
            Self::InvalidDenom(_) => 500,
            Self::SupplyInvariantViolation { .. } => 900,
            Self::InvariantViolation { .. } => 901,
            Self::ArithmeticOverflow(_) => 902,
            Self::Configuration(_) => 903,
            Self::Serialization(_) => 904,
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, ShieldError>;

impl From<serde_json::Error> for ShieldError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = ShieldError::PoolNotFound(PoolId(7));
        let msg = format!("{err}");
        assert!(msg.starts_with("SH_ERR_101"), "Got: {msg}");
        assert!(msg.contains("pool:7"));
    }

    #[test]
    fn shield_limit_display() {
        let err = ShieldError::ShieldLimitExceeded {
            requested: 500,
            issued: 600,
            limit: 1000,
        };
        let msg = format!("{err}");
        assert!(msg.contains("SH_ERR_202"));
        assert!(msg.contains("500"));
        assert!(msg.contains("1000"));
    }

    #[test]
    fn claim_not_approved_display() {
        let err = ShieldError::ClaimNotApproved {
            proposal_id: ProposalId(3),
            status: ClaimStatus::Pending,
        };
        let msg = format!("{err}");
        assert!(msg.contains("SH_ERR_401"));
        assert!(msg.contains("PENDING"));
    }

    #[test]
    fn code_matches_display_prefix() {
        let errors = vec![
            ShieldError::EmptySender,
            ShieldError::EmptySponsor,
            ShieldError::AlreadyPaid(ProposalId(1)),
            ShieldError::InvalidDenom("uctk".into()),
            ShieldError::ArithmeticOverflow("lock"),
            ShieldError::InsufficientUnlockedCollateral {
                needed: 2,
                available: 1,
            },
        ];
        for err in errors {
            let msg = format!("{err}");
            let prefix = format!("SH_ERR_{}", err.code());
            assert!(msg.starts_with(&prefix), "{msg} should start with {prefix}");
        }
    }

    #[test]
    fn serde_json_error_converts() {
        let err: ShieldError = serde_json::from_str::<u64>("nope").unwrap_err().into();
        assert!(matches!(err, ShieldError::Serialization(_)));
    }
}
