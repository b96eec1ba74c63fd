//! Ethers-backed chain reads shared by the gate and the executor.

use crate::errors::Result;
use crate::traits::ChainState;
use async_trait::async_trait;
use ethers::{
    contract::abigen,
    providers::{Http, Middleware, Provider},
    types::{Address, U256},
};
use std::sync::Arc;

abigen!(
    Erc20,
    r#"[
        function decimals() view returns (uint8)
        function balanceOf(address account) view returns (uint256)
        function allowance(address owner, address spender) view returns (uint256)
        function approve(address spender, uint256 amount) returns (bool)
    ]"#,
);

/// Thin handle over an HTTP provider.
#[derive(Clone)]
pub struct Chain {
    provider: Arc<Provider<Http>>,
}

impl Chain {
    pub fn new(provider: Arc<Provider<Http>>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ChainState for Chain {
    async fn native_balance(&self, owner: Address) -> Result<U256> {
        Ok(self.provider.get_balance(owner, None).await?)
    }

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256> {
        let erc20 = Erc20::new(token, self.provider.clone());
        Ok(erc20.balance_of(owner).call().await?)
    }

    async fn fee_level(&self) -> Result<U256> {
        Ok(self.provider.get_gas_price().await?)
    }
}
