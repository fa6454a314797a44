//! Shield purchase records.
//!
//! A purchase locks `coverage` worth of pool collateral for as long as it is
//! active. Coverage shrinks when a reimbursement is paid against it.
//!
//! ```text
//!   ┌────────┐  protection period over   ┌─────────┐
//!   │ ACTIVE ├──────────────────────────▶│ EXPIRED │
//!   └───┬────┘                           └─────────┘
//!       │ reimbursements consume all coverage
//!       ▼
//!   ┌──────────┐
//!   │ CONSUMED │
//!   └──────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, Amount, PoolId, PurchaseId};

/// Lifecycle status of a shield purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PurchaseStatus {
    /// Coverage is live and its collateral locked.
    Active,
    /// Protection period elapsed; remaining collateral unlocked.
    Expired,
    /// Reimbursements used up the entire coverage.
    Consumed,
}

impl std::fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Expired => write!(f, "EXPIRED"),
            Self::Consumed => write!(f, "CONSUMED"),
        }
    }
}

/// A single shield purchase against a pool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShieldPurchase {
    pub id: PurchaseId,
    pub pool_id: PoolId,
    pub purchaser: Address,
    /// Remaining coverage; equals the collateral locked for this purchase.
    pub coverage: Amount,
    /// Coverage at purchase time.
    pub original_coverage: Amount,
    /// Premium paid into the pool's reward bucket.
    pub premium: Amount,
    pub description: String,
    pub purchased_height: u64,
    pub purchased_at: DateTime<Utc>,
    /// `None` means evergreen: coverage never lapses on its own.
    pub expires_at: Option<DateTime<Utc>>,
    pub status: PurchaseStatus,
}

impl ShieldPurchase {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == PurchaseStatus::Active
    }

    #[must_use]
    pub fn is_evergreen(&self) -> bool {
        self.expires_at.is_none()
    }

    /// Whether the protection period has elapsed at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|end| end <= now)
    }
}
