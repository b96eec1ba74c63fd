//! Miscellaneous helper utilities.

use crate::errors::{AppError, Result};
use bigdecimal::BigDecimal;
use ethers::types::U256;
use num_bigint::{BigInt, Sign};
use tracing_subscriber::{EnvFilter, fmt};

/// Initialize `tracing` subscriber with env-based filter.
///
/// If `RUST_LOG` is not set, defaults to `info` level.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// `10^exp` as an exact decimal. Negative exponents are allowed.
pub fn pow10(exp: i64) -> BigDecimal {
    BigDecimal::new(BigInt::from(1u8), -exp)
}

/// Exact U256 -> decimal conversion.
pub fn u256_to_decimal(value: U256) -> BigDecimal {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    BigDecimal::new(BigInt::from_bytes_be(Sign::Plus, &buf), 0)
}

/// Decimal -> U256, truncating any fractional part toward zero.
pub fn decimal_to_u256(value: &BigDecimal) -> Result<U256> {
    let (int, _) = value.with_scale(0).into_bigint_and_exponent();
    if int.sign() == Sign::Minus {
        return Err(AppError::Decimal(format!("negative amount {value}")));
    }
    let (_, bytes) = int.to_bytes_be();
    if bytes.len() > 32 {
        return Err(AppError::Decimal(format!("{value} overflows 256 bits")));
    }
    Ok(U256::from_big_endian(&bytes))
}

/// Human amount -> smallest units for a token with `decimals` decimals.
pub fn to_base_units(amount: &BigDecimal, decimals: u8) -> Result<U256> {
    decimal_to_u256(&(amount * pow10(decimals as i64)))
}

/// Smallest units -> human amount.
pub fn from_base_units(amount: U256, decimals: u8) -> BigDecimal {
    u256_to_decimal(amount) / pow10(decimals as i64)
}

/// Wei -> gwei string for logs.
pub fn format_gwei(wei: U256) -> String {
    from_base_units(wei, 9).round(3).to_string()
}
