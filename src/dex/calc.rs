use crate::dex::state::PoolTokens;
use crate::errors::{AppError, Result};
use crate::utils::{decimal_to_u256, pow10, u256_to_decimal};
use bigdecimal::BigDecimal;
use ethers::types::U256;
use num_traits::Zero;

/// Lowest sqrtPriceX96 a swap may target (TickMath.MIN_SQRT_RATIO).
pub const MIN_SQRT_RATIO: U256 = U256([4_295_128_739, 0, 0, 0]);
/// Highest sqrtPriceX96 a swap may target (TickMath.MAX_SQRT_RATIO).
pub const MAX_SQRT_RATIO: U256 = U256([0x5d95_1d52_6398_8d26, 0xefd1_fc6a_5064_8849, 0xfffd_8963, 0]);

fn q96() -> BigDecimal {
    u256_to_decimal(U256::from(2u8).pow(U256::from(96u8)))
}

/// Spot price from a Q64.96 square-root price.
///
/// `(sqrt / 2^96)^2` is token1-per-token0 in raw units; scaling by
/// `10^(token0_decimals - token1_decimals)` gives human units. When token0
/// is not the base asset the result is inverted so the returned value is
/// always quote-per-base. Returns `None` for a zero sqrt price.
pub fn derive_price(
    sqrt_price_x96: U256,
    token0_decimals: u8,
    token1_decimals: u8,
    token0_is_base: bool,
) -> Option<BigDecimal> {
    if sqrt_price_x96.is_zero() {
        return None;
    }
    let sqrt = u256_to_decimal(sqrt_price_x96) / q96();
    let raw = &sqrt * &sqrt;
    let token1_per_token0 = raw * pow10(token0_decimals as i64 - token1_decimals as i64);
    if token0_is_base {
        Some(token1_per_token0)
    } else {
        Some(token1_per_token0.inverse())
    }
}

/// [`derive_price`] for a known pool.
pub fn price_from_sqrt_x96(sqrt_price_x96: U256, pool: &PoolTokens) -> Option<BigDecimal> {
    derive_price(
        sqrt_price_x96,
        pool.token0_decimals,
        pool.token1_decimals,
        pool.token0_is_base(),
    )
}

/// Inverse of [`price_from_sqrt_x96`]: encode a quote-per-base price as a
/// sqrtPriceX96, clamped strictly inside (MIN_SQRT_RATIO, MAX_SQRT_RATIO).
pub fn encode_sqrt_price_x96(price: &BigDecimal, pool: &PoolTokens) -> Result<U256> {
    if *price <= BigDecimal::zero() {
        return Err(AppError::Decimal(format!("cannot encode non-positive price {price}")));
    }
    encode_pool_price_x96(&pool_price(price, pool), pool)
}

/// Quote-per-base price expressed in the pool's own orientation
/// (token1 per token0, human units).
pub fn pool_price(quote_per_base: &BigDecimal, pool: &PoolTokens) -> BigDecimal {
    if pool.token0_is_base() {
        quote_per_base.clone()
    } else {
        quote_per_base.inverse()
    }
}

/// Encode a token1-per-token0 price (human units) as a clamped sqrtPriceX96.
pub fn encode_pool_price_x96(token1_per_token0: &BigDecimal, pool: &PoolTokens) -> Result<U256> {
    if *token1_per_token0 <= BigDecimal::zero() {
        return Err(AppError::Decimal(format!(
            "cannot encode non-positive pool price {token1_per_token0}"
        )));
    }
    let raw = token1_per_token0 * pow10(pool.token1_decimals as i64 - pool.token0_decimals as i64);
    let sqrt = raw
        .sqrt()
        .ok_or_else(|| AppError::Decimal(format!("no square root for {token1_per_token0}")))?;
    let encoded = decimal_to_u256(&(sqrt * q96())).unwrap_or(MAX_SQRT_RATIO);
    let lo = MIN_SQRT_RATIO + U256::one();
    let hi = MAX_SQRT_RATIO - U256::one();
    Ok(encoded.clamp(lo, hi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::Address;
    use std::str::FromStr;

    fn close(a: &BigDecimal, b: &BigDecimal, tol: &str) -> bool {
        (a - b).abs() < BigDecimal::from_str(tol).unwrap()
    }

    fn pool(token0_is_base: bool) -> PoolTokens {
        let weth = Address::repeat_byte(0xaa);
        let usdt = Address::repeat_byte(0xbb);
        let (token0, token1, d0, d1) = if token0_is_base {
            (weth, usdt, 18, 6)
        } else {
            (usdt, weth, 6, 18)
        };
        PoolTokens {
            pool: Address::zero(),
            token0,
            token1,
            token0_decimals: d0,
            token1_decimals: d1,
            fee: 3000,
            base: weth,
        }
    }

    #[test]
    fn unit_sqrt_price_scales_by_decimal_difference() {
        let one = U256::from(2u8).pow(U256::from(96u8));
        assert_eq!(derive_price(one, 18, 6, true).unwrap(), pow10(12));
    }

    #[test]
    fn reversed_token_order_yields_reciprocal() {
        let sqrt = U256::from_dec_str("3543191142285914205922034").unwrap();
        let p = derive_price(sqrt, 18, 6, true).unwrap();
        let reversed = derive_price(sqrt, 18, 6, false).unwrap();
        assert!(close(&(p * reversed), &BigDecimal::from(1), "1e-40"));
    }

    #[test]
    fn known_weth_usdt_sqrt_price_is_about_2000() {
        let sqrt = U256::from_dec_str("3543191142285914205922034").unwrap();
        let p = price_from_sqrt_x96(sqrt, &pool(true)).unwrap();
        assert!(close(&p, &BigDecimal::from(2000), "0.000001"), "got {p}");
    }

    #[test]
    fn zero_sqrt_price_has_no_price() {
        assert!(derive_price(U256::zero(), 18, 6, true).is_none());
    }

    #[test]
    fn encoding_is_consistent_with_derivation_for_both_orders() {
        let target = BigDecimal::from(1990);
        for token0_is_base in [true, false] {
            let pool = pool(token0_is_base);
            let sqrt = encode_sqrt_price_x96(&target, &pool).unwrap();
            let back = price_from_sqrt_x96(sqrt, &pool).unwrap();
            assert!(close(&back, &target, "0.000001"), "order {token0_is_base}: {back}");
        }
    }

    #[test]
    fn encoding_clamps_to_tick_math_bounds() {
        let huge = BigDecimal::from_str("1e80").unwrap();
        let tiny = BigDecimal::from_str("1e-80").unwrap();
        let pool = pool(true);
        assert_eq!(encode_sqrt_price_x96(&huge, &pool).unwrap(), MAX_SQRT_RATIO - U256::one());
        assert_eq!(encode_sqrt_price_x96(&tiny, &pool).unwrap(), MIN_SQRT_RATIO + U256::one());
    }

    #[test]
    fn encoding_rejects_non_positive_price() {
        assert!(encode_sqrt_price_x96(&BigDecimal::zero(), &pool(true)).is_err());
    }
}
