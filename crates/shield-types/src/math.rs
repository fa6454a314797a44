//! Checked integer arithmetic on [`Amount`]s.
//!
//! All amounts are integer base units. Every division floors, so any
//! rounding residue stays with whoever holds the dividend (the pool or the
//! reward bucket), never with the payee.

use primitive_types::U256;

use crate::{Amount, Result, ShieldError};

/// `a + b`, failing on overflow.
pub fn add(a: Amount, b: Amount, ctx: &'static str) -> Result<Amount> {
    a.checked_add(b).ok_or(ShieldError::ArithmeticOverflow(ctx))
}

/// `a - b`, failing on underflow.
pub fn sub(a: Amount, b: Amount, ctx: &'static str) -> Result<Amount> {
    a.checked_sub(b).ok_or(ShieldError::ArithmeticOverflow(ctx))
}

fn narrow(value: U256, ctx: &'static str) -> Result<Amount> {
    if value > U256::from(Amount::MAX) {
        return Err(ShieldError::ArithmeticOverflow(ctx));
    }
    Ok(value.low_u128())
}

/// `floor(a * b / c)` with a 256-bit intermediate product. Fails when `c`
/// is zero or the quotient does not fit an [`Amount`].
pub fn mul_div_floor(a: Amount, b: Amount, c: Amount, ctx: &'static str) -> Result<Amount> {
    if c == 0 {
        return Err(ShieldError::ArithmeticOverflow(ctx));
    }
    narrow(U256::from(a) * U256::from(b) / U256::from(c), ctx)
}

/// `(a * b + c) / d` as quotient and remainder, with a 256-bit
/// intermediate. The remainder is always below `d`.
///
/// # Errors
/// `ArithmeticOverflow` when `d` is zero or the quotient does not fit.
pub fn mul_add_div_rem(
    a: Amount,
    b: Amount,
    c: Amount,
    d: Amount,
    ctx: &'static str,
) -> Result<(Amount, Amount)> {
    if d == 0 {
        return Err(ShieldError::ArithmeticOverflow(ctx));
    }
    let numerator = U256::from(a) * U256::from(b) + U256::from(c);
    let (quotient, remainder) = numerator.div_mod(U256::from(d));
    Ok((narrow(quotient, ctx)?, remainder.low_u128()))
}

/// Split `total` across `capacities` pro-rata, never giving a slot more
/// than its capacity.
///
/// Each slot first gets `floor(total * cap / Σcap)`; the few units lost to
/// flooring are then handed out in slot order to slots with spare capacity.
/// The result has the same length as `capacities` and sums to `total`.
///
/// # Errors
/// `ArithmeticOverflow` if `total` exceeds the summed capacity or a product
/// overflows.
pub fn allocate_pro_rata(total: Amount, capacities: &[Amount]) -> Result<Vec<Amount>> {
    let capacity = capacities
        .iter()
        .try_fold(0u128, |acc, c| acc.checked_add(*c))
        .ok_or(ShieldError::ArithmeticOverflow("allocate capacity"))?;
    if total > capacity {
        return Err(ShieldError::ArithmeticOverflow("allocate beyond capacity"));
    }
    if total == 0 {
        return Ok(vec![0; capacities.len()]);
    }

    let mut shares = Vec::with_capacity(capacities.len());
    let mut assigned: Amount = 0;
    for cap in capacities {
        let share = mul_div_floor(total, *cap, capacity, "allocate share")?;
        assigned += share;
        shares.push(share);
    }

    let mut remainder = total - assigned;
    for (share, cap) in shares.iter_mut().zip(capacities) {
        if remainder == 0 {
            break;
        }
        let extra = remainder.min(cap - *share);
        *share += extra;
        remainder -= extra;
    }
    debug_assert_eq!(remainder, 0);
    Ok(shares)
}
