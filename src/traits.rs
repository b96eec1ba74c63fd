//! Async seams between the loop and the outside world.

use crate::errors::Result;
use crate::gate::GateSnapshot;
use crate::models::{Direction, ExecutionOutcome, Price, PricePair};
use async_trait::async_trait;
use ethers::types::{Address, U256};

/// Something that can produce the latest quote-per-base price for one venue.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fails with `AppError::PriceUnavailable`; never retries internally.
    async fn fetch_latest_price(&self) -> Result<Price>;
}

/// Read-only chain state needed by the balance gate.
#[async_trait]
pub trait ChainState: Send + Sync {
    async fn native_balance(&self, owner: Address) -> Result<U256>;
    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256>;
    /// Current network fee level in wei.
    async fn fee_level(&self) -> Result<U256>;
}

/// Builds, signs, submits and confirms one swap.
#[async_trait]
pub trait Execute: Send + Sync {
    async fn execute(
        &self,
        direction: Direction,
        prices: &PricePair,
        snapshot: &GateSnapshot,
    ) -> Result<ExecutionOutcome>;
}
