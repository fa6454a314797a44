//! System-wide constants for the shield accounting engine.

/// Default native denomination (collateral, premiums, native rewards).
pub const DEFAULT_NATIVE_DENOM: &str = "uctk";

/// Fixed-point scale of the per-pool reward index (1e18).
pub const REWARD_INDEX_SCALE: u128 = 1_000_000_000_000_000_000;

/// Default protection period for a shield purchase (21 days).
pub const DEFAULT_PROTECTION_PERIOD_SECS: i64 = 21 * 24 * 60 * 60;

/// Default base premium rate: 2% of coverage.
pub const DEFAULT_BASE_RATE_BPS: i64 = 200;

/// Default utilization slope: +3% of coverage at full utilization.
pub const DEFAULT_UTILIZATION_SLOPE_BPS: i64 = 300;

/// Receipts retained in memory before the oldest are evicted.
pub const DEFAULT_RECEIPT_LOG_CAPACITY: usize = 100_000;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "ShieldEngine";
