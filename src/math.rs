//! Fixed-point helpers.
//!
//! Amounts are raw `u128` integers scaled by a power of ten. Products of two
//! 18-decimal values overflow `u128` long before the result does, so every
//! multiply-then-divide goes through a 256-bit intermediate.

use primitive_types::U256;
use rust_decimal::Decimal;

/// Decimal places of the engine's internal fixed-point scale.
pub const WAD_DECIMALS: u32 = 18;

/// 1.0 at the internal scale.
pub const WAD: u128 = 1_000_000_000_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    #[error("arithmetic overflow")]
    Overflow,

    #[error("division by zero")]
    DivisionByZero,
}

/// `a * b / denominator`, floored, with a 256-bit intermediate product.
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Result<u128, MathError> {
    if denominator == 0 {
        return Err(MathError::DivisionByZero);
    }
    let product = U256::from(a)
        .checked_mul(U256::from(b))
        .ok_or(MathError::Overflow)?;
    narrow(product / U256::from(denominator))
}

/// `a * b * c / denominator`, floored. all multiplication happens before the division.
pub fn mul_mul_div(a: u128, b: u128, c: u128, denominator: u128) -> Result<u128, MathError> {
    if denominator == 0 {
        return Err(MathError::DivisionByZero);
    }
    let product = U256::from(a)
        .checked_mul(U256::from(b))
        .and_then(|p| p.checked_mul(U256::from(c)))
        .ok_or(MathError::Overflow)?;
    narrow(product / U256::from(denominator))
}

/// `a * b / (c * d)`, floored.
pub fn mul_div_product(a: u128, b: u128, c: u128, d: u128) -> Result<u128, MathError> {
    let numerator = U256::from(a)
        .checked_mul(U256::from(b))
        .ok_or(MathError::Overflow)?;
    let denominator = U256::from(c)
        .checked_mul(U256::from(d))
        .ok_or(MathError::Overflow)?;
    if denominator.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    narrow(numerator / denominator)
}

pub fn pow10(exp: u32) -> Result<u128, MathError> {
    10u128.checked_pow(exp).ok_or(MathError::Overflow)
}

fn narrow(value: U256) -> Result<u128, MathError> {
    if value > U256::from(u128::MAX) {
        return Err(MathError::Overflow);
    }
    Ok(value.low_u128())
}

/// Raw fixed-point integer to a human `Decimal`. `None` past Decimal's 96-bit mantissa.
pub fn raw_to_decimal(raw: u128, decimals: u32) -> Option<Decimal> {
    let mantissa = i128::try_from(raw).ok()?;
    Decimal::try_from_i128_with_scale(mantissa, decimals).ok()
}

/// Human `Decimal` to a raw fixed-point integer. digits past `decimals` are truncated.
pub fn decimal_to_raw(value: Decimal, decimals: u32) -> Option<u128> {
    if value.is_sign_negative() && !value.is_zero() {
        return None;
    }
    let mantissa = u128::try_from(value.mantissa()).ok()?;
    let scale = value.scale();
    if decimals >= scale {
        mantissa.checked_mul(10u128.checked_pow(decimals - scale)?)
    } else {
        Some(mantissa / 10u128.checked_pow(scale - decimals)?)
    }
}
