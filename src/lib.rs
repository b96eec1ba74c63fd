//! Core library for the CEX/DEX arbitrage bot.
//!
//! The binary wires concrete venues into [`monitor::ArbitrageLoop`]; every
//! seam the loop touches is a trait in [`traits`] so it can be driven by
//! in-memory doubles in tests.

pub mod arbitrage;
pub mod cex;
pub mod chain;
pub mod config;
pub mod dex;
pub mod errors;
pub mod executor;
pub mod gate;
pub mod models;
pub mod monitor;
pub mod traits;
pub mod utils;
