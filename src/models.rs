//! Shared data structures used throughout the application.

use bigdecimal::BigDecimal;
use ethers::types::{Address, U256};
use std::fmt;
use std::time::SystemTime;

/// Which venue a price was observed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Venue {
    Cex,
    Dex,
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Venue::Cex => f.write_str("CEX"),
            Venue::Dex => f.write_str("DEX"),
        }
    }
}

/// A single price observation, always quoted as quote-per-base.
#[derive(Debug, Clone, PartialEq)]
pub struct Price {
    pub value: BigDecimal,
    pub venue: Venue,
    pub observed_at: SystemTime,
}

impl Price {
    pub fn new(venue: Venue, value: BigDecimal) -> Self {
        Self {
            value,
            venue,
            observed_at: SystemTime::now(),
        }
    }
}

/// Both legs of one iteration, fetched jointly.
#[derive(Debug, Clone)]
pub struct PricePair {
    pub cex: Price,
    pub dex: Price,
}

/// Direction of the on-chain leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Spend quote token for base token on the pool.
    BuyOnDex,
    /// Spend native/base token for quote token on the pool.
    SellOnDex,
}

impl Direction {
    pub fn from_buy_on_dex(buy_on_dex: bool) -> Self {
        if buy_on_dex {
            Direction::BuyOnDex
        } else {
            Direction::SellOnDex
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::BuyOnDex => f.write_str("buy_on_dex"),
            Direction::SellOnDex => f.write_str("sell_on_dex"),
        }
    }
}

/// Wallet balances and their minimums, in each token's smallest unit.
/// Re-read every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Balances {
    pub native: U256,
    pub quote: U256,
    pub native_min: U256,
    pub quote_min: U256,
}

impl Balances {
    pub fn is_sufficient(&self) -> bool {
        self.native >= self.native_min && self.quote >= self.quote_min
    }
}

/// EIP-1559 fee parameters for one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasParams {
    pub gas_limit: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

impl GasParams {
    /// Max fee tracks the observed fee level; the tip is 10% of it.
    pub fn from_fee_level(fee_level: U256, gas_limit: U256) -> Self {
        Self {
            gas_limit,
            max_fee_per_gas: fee_level,
            max_priority_fee_per_gas: fee_level / U256::from(10u8),
        }
    }
}

/// A fully specified swap attempt. Built fresh for every attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeIntent {
    pub direction: Direction,
    pub token_in: Address,
    pub token_out: Address,
    pub amount_in: U256,
    pub min_amount_out: U256,
    /// Worst acceptable pool price, quote-per-base.
    pub price_limit: BigDecimal,
    /// `price_limit` in the pool's Q64.96 square-root encoding.
    pub sqrt_price_limit_x96: U256,
    /// Native value attached to the transaction.
    pub value: U256,
    pub gas: GasParams,
    pub nonce: U256,
}

/// Result of a submitted trade whose receipt was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Confirmed { tx_hash: ethers::types::TxHash },
    Failed { tx_hash: ethers::types::TxHash },
}
