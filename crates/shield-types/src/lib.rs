//! # shield-types
//!
//! Shared types, errors, and configuration for the **shield** pool and
//! collateral accounting engine.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`PoolId`], [`PurchaseId`], [`ProposalId`], [`ReceiptId`], [`Address`]
//! - **Pool model**: [`Pool`], [`PoolStatus`]
//! - **Balance model**: [`Position`], [`Amount`], [`Coin`], [`MixedCoins`]
//! - **Coverage model**: [`ShieldPurchase`], [`PurchaseStatus`]
//! - **Claim model**: [`ReimbursementClaim`], [`ClaimStatus`]
//! - **Rewards**: [`ForeignRewardClaim`]
//! - **Operations**: [`Operation`], [`OperationKind`], [`OperationOutcome`], [`BlockContext`]
//! - **Audit trail**: [`Receipt`], [`ReceiptType`]
//! - **Configuration**: [`EngineConfig`], [`PremiumRateConfig`]
//! - **Errors**: [`ShieldError`] with `SH_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod address;
pub mod balance;
pub mod block;
pub mod claim;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod math;
pub mod operation;
pub mod pool;
pub mod purchase;
pub mod receipt;
pub mod reward;

pub use address::*;
pub use balance::*;
pub use block::*;
pub use claim::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use operation::*;
pub use pool::*;
pub use purchase::*;
pub use receipt::*;
pub use reward::*;

// Constants and checked math are accessed via `shield_types::constants::FOO`
// and `shield_types::math::*`
// (not re-exported to avoid name collisions).
