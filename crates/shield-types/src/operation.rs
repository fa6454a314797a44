//! The closed set of operations the host hands to the engine, and their outcomes.
//!
//! Every operation carries the already-authenticated sender as `from`.
//! Anything beyond that (limits, balances, authorization against pool
//! records) is checked by the engine.

use serde::{Deserialize, Serialize};

use crate::{Address, Amount, Denom, MixedCoins, PoolId, ProposalId, PurchaseId};

/// One of the thirteen operation kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    CreatePool {
        from: Address,
        /// Coverage the sponsor asks for. Must be non-zero.
        shield: Amount,
        /// Initial collateral, credited to the creator's position.
        deposit: Amount,
        sponsor: String,
        sponsor_addr: String,
        description: String,
        shield_limit: Amount,
    },
    UpdatePool {
        from: Address,
        pool_id: PoolId,
        /// New sponsored shield, if changing.
        shield: Option<Amount>,
        shield_limit: Option<Amount>,
        /// Fees distributed to the pool's collateral and stake holders.
        service_fees: MixedCoins,
        description: Option<String>,
    },
    PausePool {
        from: Address,
        pool_id: PoolId,
    },
    ResumePool {
        from: Address,
        pool_id: PoolId,
    },
    DepositCollateral {
        from: Address,
        pool_id: PoolId,
        amount: Amount,
    },
    WithdrawCollateral {
        from: Address,
        pool_id: PoolId,
        amount: Amount,
    },
    WithdrawRewards {
        from: Address,
    },
    WithdrawForeignRewards {
        from: Address,
        denom: Denom,
        to_addr: String,
    },
    PurchaseShield {
        from: Address,
        pool_id: PoolId,
        shield: Amount,
        description: String,
    },
    WithdrawReimbursement {
        from: Address,
        proposal_id: ProposalId,
    },
    StakeForShield {
        from: Address,
        pool_id: PoolId,
        amount: Amount,
    },
    UnstakeFromShield {
        from: Address,
        pool_id: PoolId,
        amount: Amount,
    },
    UpdateSponsor {
        from: Address,
        pool_id: PoolId,
        sponsor: String,
        sponsor_addr: String,
    },
}

/// Discriminant of [`Operation`], used in receipts and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    CreatePool,
    UpdatePool,
    PausePool,
    ResumePool,
    DepositCollateral,
    WithdrawCollateral,
    WithdrawRewards,
    WithdrawForeignRewards,
    PurchaseShield,
    WithdrawReimbursement,
    StakeForShield,
    UnstakeFromShield,
    UpdateSponsor,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::CreatePool => "create_pool",
            Self::UpdatePool => "update_pool",
            Self::PausePool => "pause_pool",
            Self::ResumePool => "resume_pool",
            Self::DepositCollateral => "deposit_collateral",
            Self::WithdrawCollateral => "withdraw_collateral",
            Self::WithdrawRewards => "withdraw_rewards",
            Self::WithdrawForeignRewards => "withdraw_foreign_rewards",
            Self::PurchaseShield => "purchase_shield",
            Self::WithdrawReimbursement => "withdraw_reimbursement",
            Self::StakeForShield => "stake_for_shield",
            Self::UnstakeFromShield => "unstake_from_shield",
            Self::UpdateSponsor => "update_sponsor",
        };
        f.write_str(name)
    }
}

impl Operation {
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::CreatePool { .. } => OperationKind::CreatePool,
            Self::UpdatePool { .. } => OperationKind::UpdatePool,
            Self::PausePool { .. } => OperationKind::PausePool,
            Self::ResumePool { .. } => OperationKind::ResumePool,
            Self::DepositCollateral { .. } => OperationKind::DepositCollateral,
            Self::WithdrawCollateral { .. } => OperationKind::WithdrawCollateral,
            Self::WithdrawRewards { .. } => OperationKind::WithdrawRewards,
            Self::WithdrawForeignRewards { .. } => OperationKind::WithdrawForeignRewards,
            Self::PurchaseShield { .. } => OperationKind::PurchaseShield,
            Self::WithdrawReimbursement { .. } => OperationKind::WithdrawReimbursement,
            Self::StakeForShield { .. } => OperationKind::StakeForShield,
            Self::UnstakeFromShield { .. } => OperationKind::UnstakeFromShield,
            Self::UpdateSponsor { .. } => OperationKind::UpdateSponsor,
        }
    }

    /// The authenticated sender.
    #[must_use]
    pub fn sender(&self) -> &Address {
        match self {
            Self::CreatePool { from, .. }
            | Self::UpdatePool { from, .. }
            | Self::PausePool { from, .. }
            | Self::ResumePool { from, .. }
            | Self::DepositCollateral { from, .. }
            | Self::WithdrawCollateral { from, .. }
            | Self::WithdrawRewards { from }
            | Self::WithdrawForeignRewards { from, .. }
            | Self::PurchaseShield { from, .. }
            | Self::WithdrawReimbursement { from, .. }
            | Self::StakeForShield { from, .. }
            | Self::UnstakeFromShield { from, .. }
            | Self::UpdateSponsor { from, .. } => from,
        }
    }

    /// The pool the operation targets, when it names one.
    #[must_use]
    pub fn pool_id(&self) -> Option<PoolId> {
        match self {
            Self::UpdatePool { pool_id, .. }
            | Self::PausePool { pool_id, .. }
            | Self::ResumePool { pool_id, .. }
            | Self::DepositCollateral { pool_id, .. }
            | Self::WithdrawCollateral { pool_id, .. }
            | Self::PurchaseShield { pool_id, .. }
            | Self::StakeForShield { pool_id, .. }
            | Self::UnstakeFromShield { pool_id, .. }
            | Self::UpdateSponsor { pool_id, .. } => Some(*pool_id),
            Self::CreatePool { .. }
            | Self::WithdrawRewards { .. }
            | Self::WithdrawForeignRewards { .. }
            | Self::WithdrawReimbursement { .. } => None,
        }
    }
}

/// Successful result of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationOutcome {
    PoolCreated {
        pool_id: PoolId,
    },
    PoolUpdated {
        pool_id: PoolId,
    },
    PoolPaused {
        pool_id: PoolId,
    },
    PoolResumed {
        pool_id: PoolId,
    },
    CollateralDeposited {
        pool_id: PoolId,
        deposited: Amount,
    },
    CollateralWithdrawn {
        pool_id: PoolId,
        withdrawn: Amount,
        /// Set when this withdrawal drained the pool and closed it.
        pool_closed: bool,
    },
    RewardsWithdrawn {
        amount: Amount,
    },
    ForeignRewardsWithdrawn {
        denom: Denom,
        to_addr: String,
        amount: Amount,
    },
    ShieldPurchased {
        pool_id: PoolId,
        purchase_id: PurchaseId,
        premium: Amount,
    },
    ReimbursementPaid {
        proposal_id: ProposalId,
        amount: Amount,
    },
    Staked {
        pool_id: PoolId,
        staked: Amount,
    },
    Unstaked {
        pool_id: PoolId,
        unstaked: Amount,
    },
    SponsorUpdated {
        pool_id: PoolId,
    },
}

impl OperationOutcome {
    /// The pool touched, when there is a single one.
    #[must_use]
    pub fn pool_id(&self) -> Option<PoolId> {
        match self {
            Self::PoolCreated { pool_id }
            | Self::PoolUpdated { pool_id }
            | Self::PoolPaused { pool_id }
            | Self::PoolResumed { pool_id }
            | Self::CollateralDeposited { pool_id, .. }
            | Self::CollateralWithdrawn { pool_id, .. }
            | Self::ShieldPurchased { pool_id, .. }
            | Self::Staked { pool_id, .. }
            | Self::Unstaked { pool_id, .. }
            | Self::SponsorUpdated { pool_id } => Some(*pool_id),
            Self::RewardsWithdrawn { .. }
            | Self::ForeignRewardsWithdrawn { .. }
            | Self::ReimbursementPaid { .. } => None,
        }
    }
}
