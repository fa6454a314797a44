//! Premium pricing.
//!
//! The engine asks a [`PremiumPolicy`] for the premium of each purchase,
//! passing the coverage and the pool's utilization *before* the purchase.
//! The default [`LinearPremiumPolicy`] charges
//!
//! ```text
//! premium = floor(coverage × (base_rate + utilization_slope × issued / limit))
//! ```

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use shield_types::{Amount, PremiumRateConfig, Result, ShieldError};

/// Pluggable premium pricing.
pub trait PremiumPolicy: Send + Sync + std::fmt::Debug {
    /// Premium owed for `coverage` at the given pool `utilization` (0..=1).
    ///
    /// # Errors
    /// `ArithmeticOverflow` if the premium cannot be represented.
    fn premium(&self, coverage: Amount, utilization: Decimal) -> Result<Amount>;
}

/// `issued / limit`, or zero for a pool without a limit.
///
/// # Errors
/// `ArithmeticOverflow` if either amount exceeds `Decimal` range.
pub fn utilization(issued: Amount, limit: Amount) -> Result<Decimal> {
    if limit == 0 {
        return Ok(Decimal::ZERO);
    }
    let issued = to_decimal(issued)?;
    let limit = to_decimal(limit)?;
    issued
        .checked_div(limit)
        .ok_or(ShieldError::ArithmeticOverflow("utilization"))
}

fn to_decimal(amount: Amount) -> Result<Decimal> {
    Decimal::from_u128(amount).ok_or(ShieldError::ArithmeticOverflow("amount to decimal"))
}

/// Premium rate rising linearly with utilization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearPremiumPolicy {
    base_rate: Decimal,
    utilization_slope: Decimal,
}

impl LinearPremiumPolicy {
    #[must_use]
    pub fn new(base_rate: Decimal, utilization_slope: Decimal) -> Self {
        Self {
            base_rate,
            utilization_slope,
        }
    }

    /// Effective rate at `utilization`.
    #[must_use]
    pub fn rate(&self, utilization: Decimal) -> Decimal {
        self.base_rate + self.utilization_slope * utilization
    }
}

impl From<&PremiumRateConfig> for LinearPremiumPolicy {
    fn from(config: &PremiumRateConfig) -> Self {
        Self::new(config.base_rate, config.utilization_slope)
    }
}

impl Default for LinearPremiumPolicy {
    fn default() -> Self {
        Self::from(&PremiumRateConfig::default())
    }
}

impl PremiumPolicy for LinearPremiumPolicy {
    fn premium(&self, coverage: Amount, utilization: Decimal) -> Result<Amount> {
        let premium = to_decimal(coverage)?
            .checked_mul(self.rate(utilization))
            .ok_or(ShieldError::ArithmeticOverflow("premium"))?;
        premium
            .floor()
            .to_u128()
            .ok_or(ShieldError::ArithmeticOverflow("premium"))
    }
}
