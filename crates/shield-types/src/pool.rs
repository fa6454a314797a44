//! # Pool: a named collateral bucket backing shield coverage
//!
//! ## State Machine
//!
//! ```text
//!   ┌────────┐  pause   ┌────────┐
//!   │ ACTIVE ├─────────▶│ PAUSED │
//!   │        │◀─────────┤        │
//!   └───┬────┘  resume  └───┬────┘
//!       │ collateral drained │
//!       ▼                    ▼
//!   ┌──────────────────────────┐
//!   │          CLOSED          │
//!   └──────────────────────────┘
//! ```
//!
//! Closed is terminal. Closed pools are retained so historical claims and
//! rewards can still settle against them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, Amount, PoolId};

/// Lifecycle status of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoolStatus {
    /// Accepting purchases, stakes, and deposits.
    Active,
    /// Rejects new purchases and stakes; everything else continues.
    Paused,
    /// Collateral fully withdrawn. **Terminal.**
    Closed,
}

impl PoolStatus {
    /// Can a pool in this status move to `target`?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Active, Self::Paused | Self::Closed)
                | (Self::Paused, Self::Active | Self::Closed)
        )
    }
}

impl std::fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Paused => write!(f, "PAUSED"),
            Self::Closed => write!(f, "CLOSED"),
        }
    }
}

/// A shield pool record. Owned exclusively by the pool registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pool {
    pub id: PoolId,
    /// Human-readable sponsor (the protected project).
    pub sponsor: String,
    /// Address allowed to change the sponsor.
    pub sponsor_addr: Address,
    /// Address that created the pool; acts as pool admin.
    pub creator: Address,
    pub status: PoolStatus,
    /// Sum of all collateral positions' `deposited`.
    pub total_collateral: Amount,
    /// Sum of all stake positions.
    pub total_staked: Amount,
    /// Outstanding coverage. Equals the pool's locked collateral.
    pub shield_issued: Amount,
    /// Maximum coverage the pool may issue.
    pub shield_limit: Amount,
    /// Coverage requested by the sponsor at creation / last update.
    pub sponsored_shield: Amount,
    pub description: String,
    pub created_height: u64,
    pub created_at: DateTime<Utc>,
}

impl Pool {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == PoolStatus::Active
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.status == PoolStatus::Closed
    }

    /// Remaining coverage before the shield limit is hit.
    #[must_use]
    pub fn limit_headroom(&self) -> Amount {
        self.shield_limit.saturating_sub(self.shield_issued)
    }

    /// Reward weight backing this pool: collateral plus stake.
    #[must_use]
    pub fn total_weight(&self) -> Amount {
        self.total_collateral.saturating_add(self.total_staked)
    }

    /// `issued <= limit` and `issued <= total collateral`.
    #[must_use]
    pub fn shield_within_bounds(&self) -> bool {
        self.shield_issued <= self.shield_limit && self.shield_issued <= self.total_collateral
    }
}
