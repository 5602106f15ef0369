use integer_sqrt::IntegerSquareRoot;

use crate::error::AmmError;

// 0.3% fee
pub const FEE_NUMERATOR: u128 = 997;
pub const FEE_DENOMINATOR: u128 = 1000;

/// `amount_out = amount_in * 997 * reserve_out / (reserve_in * 1000 + amount_in * 997)`
pub fn quote_swap_output(
    amount_in: u64,
    reserve_in: u64,
    reserve_out: u64,
) -> Result<u64, AmmError> {
    if amount_in == 0 {
        return Err(AmmError::InvalidAmount);
    }

    let amount_in_with_fee = (amount_in as u128)
        .checked_mul(FEE_NUMERATOR)
        .ok_or(AmmError::ArithmeticOverflow)?;

    let numerator = amount_in_with_fee
        .checked_mul(reserve_out as u128)
        .ok_or(AmmError::ArithmeticOverflow)?;

    let denominator = (reserve_in as u128)
        .checked_mul(FEE_DENOMINATOR)
        .and_then(|scaled| scaled.checked_add(amount_in_with_fee))
        .ok_or(AmmError::ArithmeticOverflow)?;

    to_u64(numerator / denominator)
}

pub fn initial_liquidity(amount_a: u64, amount_b: u64) -> Result<u64, AmmError> {
    let product = (amount_a as u128)
        .checked_mul(amount_b as u128)
        .ok_or(AmmError::ArithmeticOverflow)?;

    to_u64(product.integer_sqrt())
}

pub fn matching_amount(amount_a: u64, reserve_a: u64, reserve_b: u64) -> Result<u64, AmmError> {
    mul_div(amount_a, reserve_b, reserve_a)
}

pub fn proportional_liquidity(
    amount_a: u64,
    total_liquidity: u64,
    reserve_a: u64,
) -> Result<u64, AmmError> {
    mul_div(amount_a, total_liquidity, reserve_a)
}

pub fn withdrawal_amounts(
    share: u64,
    reserve_a: u64,
    reserve_b: u64,
    total_liquidity: u64,
) -> Result<(u64, u64), AmmError> {
    Ok((
        mul_div(share, reserve_a, total_liquidity)?,
        mul_div(share, reserve_b, total_liquidity)?,
    ))
}

fn mul_div(a: u64, b: u64, divisor: u64) -> Result<u64, AmmError> {
    let product = (a as u128)
        .checked_mul(b as u128)
        .ok_or(AmmError::ArithmeticOverflow)?;

    let quotient = product
        .checked_div(divisor as u128)
        .ok_or(AmmError::ArithmeticOverflow)?;

    to_u64(quotient)
}

fn to_u64(value: u128) -> Result<u64, AmmError> {
    u64::try_from(value).map_err(|_| AmmError::ArithmeticOverflow)
}
