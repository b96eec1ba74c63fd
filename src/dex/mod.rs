//! DEX integration for Uniswap V3 pools.

pub mod calc;
pub mod client;
pub mod state;

pub use calc::{derive_price, encode_pool_price_x96, encode_sqrt_price_x96, pool_price, price_from_sqrt_x96};
pub use client::Dex;
pub use state::PoolTokens;
