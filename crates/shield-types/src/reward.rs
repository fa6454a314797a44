//! Reward payout records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, Amount, Denom};

/// A foreign-denom reward payout bound for an external (cross-chain) address.
///
/// The engine only records the payout; the host relays it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForeignRewardClaim {
    /// Holder whose accrued rewards were paid.
    pub holder: Address,
    pub denom: Denom,
    /// Destination on the foreign chain, as given by the holder.
    pub to_addr: String,
    pub amount: Amount,
    pub height: u64,
    pub claimed_at: DateTime<Utc>,
}
