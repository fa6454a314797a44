//! Execution context supplied by the host ledger for each operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Height and time of the block an operation executes in.
///
/// The engine never reads the wall clock; all timestamps come from here so
/// every replica applies the same operation identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockContext {
    pub height: u64,
    pub time: DateTime<Utc>,
}

impl BlockContext {
    #[must_use]
    pub fn new(height: u64, time: DateTime<Utc>) -> Self {
        Self { height, time }
    }

    /// The context one block later, `secs` seconds on.
    #[must_use]
    pub fn advance(self, secs: i64) -> Self {
        Self {
            height: self.height + 1,
            time: self.time + chrono::Duration::seconds(secs),
        }
    }
}

/// Deterministic starting context for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl BlockContext {
    pub fn genesis() -> Self {
        use chrono::TimeZone;
        Self {
            height: 1,
            time: Utc
                .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
                .single()
                .expect("valid genesis timestamp"),
        }
    }
}
