use crate::chain::Erc20;
use crate::dex::calc::derive_price;
use crate::dex::state::PoolTokens;
use crate::errors::{AppError, Result};
use crate::models::{Price, Venue};
use crate::traits::PriceSource;
use async_trait::async_trait;
use ethers::{
    contract::abigen,
    providers::{Http, Provider},
    types::Address,
};
use std::sync::Arc;
use tracing::{debug, info};

abigen!(
    UniswapV3Pool,
    r#"[
        function slot0() view returns (uint160 sqrtPriceX96, int24 tick, uint16 observationIndex, uint16 observationCardinality, uint16 observationCardinalityNext, uint8 feeProtocol, bool unlocked)
        function token0() view returns (address)
        function token1() view returns (address)
        function fee() view returns (uint24)
    ]"#,
);

/// Handle for reading spot prices from a specific Uniswap V3 pool.
#[derive(Clone)]
pub struct Dex {
    pool: UniswapV3Pool<Provider<Http>>,
    tokens: PoolTokens,
}

impl Dex {
    /// Reads the pool's token pair, fee tier and both tokens' decimals.
    /// `base_token` must be one of the pool's tokens.
    pub async fn connect(
        provider: Arc<Provider<Http>>,
        pool_addr: Address,
        base_token: Address,
    ) -> Result<Self> {
        let pool = UniswapV3Pool::new(pool_addr, provider.clone());
        let token0 = pool.token_0().call().await?;
        let token1 = pool.token_1().call().await?;
        let fee = pool.fee().call().await?;

        if base_token != token0 && base_token != token1 {
            return Err(AppError::Config(format!(
                "base token {base_token:?} is not part of pool {pool_addr:?} ({token0:?}/{token1:?})"
            )));
        }

        let token0_decimals = Erc20::new(token0, provider.clone()).decimals().call().await?;
        let token1_decimals = Erc20::new(token1, provider).decimals().call().await?;

        let tokens = PoolTokens {
            pool: pool_addr,
            token0,
            token1,
            token0_decimals,
            token1_decimals,
            fee,
            base: base_token,
        };
        info!(
            pool = ?pool_addr,
            token0 = ?token0,
            token1 = ?token1,
            token0_decimals,
            token1_decimals,
            fee,
            token0_is_base = tokens.token0_is_base(),
            "[DEX] pool metadata loaded"
        );
        Ok(Self { pool, tokens })
    }

    pub fn tokens(&self) -> &PoolTokens {
        &self.tokens
    }

    /// Current quote-per-base price. `slot0` and `token0` are re-read on
    /// every call; decimals come from the cached metadata.
    pub async fn fetch_price(&self) -> Result<Price> {
        let slot0 = self.pool.slot_0();
        let token0_call = self.pool.token_0();
        let ((sqrt_price_x96, ..), token0) = futures::try_join!(slot0.call(), token0_call.call())
            .map_err(|e| AppError::price_unavailable(Venue::Dex, e))?;

        let value = derive_price(
            sqrt_price_x96,
            self.tokens.token0_decimals,
            self.tokens.token1_decimals,
            token0 == self.tokens.base,
        )
        .ok_or_else(|| AppError::price_unavailable(Venue::Dex, "pool reports zero sqrt price"))?;
        debug!(%sqrt_price_x96, price = %value.round(6), "[DEX] spot price");
        Ok(Price::new(Venue::Dex, value))
    }
}

#[async_trait]
impl PriceSource for Dex {
    async fn fetch_latest_price(&self) -> Result<Price> {
        self.fetch_price().await
    }
}
