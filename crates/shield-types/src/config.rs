//! Configuration for the shield engine.
//!
//! Loaded from JSON by the host (`EngineConfig::from_json_str`) and checked
//! with [`EngineConfig::validate`] before the engine is constructed.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{constants, Address, Result, ShieldError};

/// Parameters of the default linear premium policy.
///
/// `premium = floor(coverage × (base_rate + utilization_slope × utilization))`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumRateConfig {
    /// Rate charged on an empty pool (e.g. `0.02`).
    pub base_rate: Decimal,
    /// Extra rate at 100% utilization.
    pub utilization_slope: Decimal,
}

impl Default for PremiumRateConfig {
    fn default() -> Self {
        Self {
            base_rate: Decimal::new(constants::DEFAULT_BASE_RATE_BPS, 4),
            utilization_slope: Decimal::new(constants::DEFAULT_UTILIZATION_SLOPE_BPS, 4),
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Denomination of collateral, premiums, and native rewards.
    pub native_denom: String,
    /// Global shield admin allowed to administer every pool.
    #[serde(default)]
    pub admin: Option<Address>,
    /// Protection period of a purchase. `None` makes purchases evergreen.
    #[serde(default)]
    pub protection_period_secs: Option<i64>,
    #[serde(default)]
    pub premium: PremiumRateConfig,
    /// Receipts kept in memory before the oldest are evicted.
    pub receipt_log_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            native_denom: constants::DEFAULT_NATIVE_DENOM.to_string(),
            admin: None,
            protection_period_secs: Some(constants::DEFAULT_PROTECTION_PERIOD_SECS),
            premium: PremiumRateConfig::default(),
            receipt_log_capacity: constants::DEFAULT_RECEIPT_LOG_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON config and validate it.
    ///
    /// # Errors
    /// `Serialization` for malformed JSON, `Configuration` for bad values.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with.
    ///
    /// # Errors
    /// Returns `Configuration` describing the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.native_denom.trim().is_empty() {
            return Err(ShieldError::Configuration(
                "native_denom must not be empty".into(),
            ));
        }
        if let Some(admin) = &self.admin {
            if admin.is_empty() {
                return Err(ShieldError::Configuration("admin must not be blank".into()));
            }
        }
        if let Some(secs) = self.protection_period_secs {
            if secs <= 0 {
                return Err(ShieldError::Configuration(format!(
                    "protection_period_secs must be positive, got {secs}"
                )));
            }
        }
        if self.premium.base_rate.is_sign_negative()
            || self.premium.utilization_slope.is_sign_negative()
        {
            return Err(ShieldError::Configuration(
                "premium rates must not be negative".into(),
            ));
        }
        if self.receipt_log_capacity == 0 {
            return Err(ShieldError::Configuration(
                "receipt_log_capacity must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// The protection period as a duration, if purchases expire.
    #[must_use]
    pub fn protection_period(&self) -> Option<chrono::Duration> {
        self.protection_period_secs.map(chrono::Duration::seconds)
    }
}
