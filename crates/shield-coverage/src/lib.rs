//! # shield-coverage
//!
//! **Coverage and income**: what was sold, what it cost, and who earns it.
//!
//! - [`CoverageTracker`]: shield purchases and their Active → Expired /
//!   Consumed lifecycle
//! - [`PremiumPolicy`]: pluggable pricing, with [`LinearPremiumPolicy`] as
//!   the default
//! - [`RewardDistributor`]: per (pool, denom) reward index with lazy holder
//!   checkpoints, plus the foreign payout outbox

pub mod coverage_tracker;
pub mod premium;
pub mod reward_distributor;

pub use coverage_tracker::{CoverageTracker, NewPurchase};
pub use premium::{utilization, LinearPremiumPolicy, PremiumPolicy};
pub use reward_distributor::{Checkpoint, RewardBucket, RewardDistributor};
