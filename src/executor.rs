//! Slippage-protected swap construction, signing and confirmation.

use crate::chain::{ApproveCall, Erc20};
use crate::config::AppConfig;
use crate::dex::{PoolTokens, encode_pool_price_x96, pool_price};
use crate::errors::{AppError, Result};
use crate::gate::GateSnapshot;
use crate::models::{Balances, Direction, ExecutionOutcome, GasParams, PricePair, TradeIntent};
use crate::traits::Execute;
use crate::utils::{format_gwei, from_base_units, to_base_units};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use num_traits::Zero;
use ethers::{
    abi::AbiEncode,
    contract::abigen,
    providers::{Http, Middleware, Provider},
    signers::{LocalWallet, Signer},
    types::{
        Address, BlockNumber, Bytes, Eip1559TransactionRequest, TransactionReceipt, U64, U256,
        transaction::eip2718::TypedTransaction,
    },
};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{error, info, warn};

abigen!(
    SwapRouter,
    r#"[
        struct ExactInputSingleParams { address tokenIn; address tokenOut; uint24 fee; address recipient; uint256 deadline; uint256 amountIn; uint256 amountOutMinimum; uint160 sqrtPriceLimitX96; }
        function exactInputSingle(ExactInputSingleParams calldata params) external payable returns (uint256 amountOut)
    ]"#,
);

/// Per-trade caps and transaction parameters, in smallest units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeSettings {
    pub gas_limit: U256,
    pub slippage_bps: u32,
    pub max_quote_in: U256,
    pub max_native_in: U256,
    pub receipt_timeout: Duration,
    pub tx_deadline: Duration,
}

impl TradeSettings {
    pub fn from_config(cfg: &AppConfig, pool: &PoolTokens) -> Result<Self> {
        Ok(Self {
            gas_limit: U256::from(cfg.gas_limit),
            slippage_bps: cfg.slippage_bps,
            max_quote_in: to_base_units(&cfg.max_quote_in, pool.quote_decimals())?,
            max_native_in: to_base_units(&cfg.max_native_in, pool.base_decimals())?,
            receipt_timeout: cfg.receipt_timeout,
            tx_deadline: cfg.tx_deadline,
        })
    }

    fn slippage_down(&self) -> BigDecimal {
        BigDecimal::from(10_000 - self.slippage_bps as i64) / BigDecimal::from(10_000)
    }

    fn slippage_up(&self) -> BigDecimal {
        BigDecimal::from(10_000 + self.slippage_bps as i64) / BigDecimal::from(10_000)
    }
}

/// Amount spent on the pool: the relevant balance, capped per trade.
pub fn input_amount(direction: Direction, balances: &Balances, settings: &TradeSettings) -> U256 {
    match direction {
        Direction::BuyOnDex => balances.quote.min(settings.max_quote_in),
        Direction::SellOnDex => balances.native.min(settings.max_native_in),
    }
}

/// Build the swap intent for one attempt.
///
/// Buying on the DEX spends quote for base: `min_out = in / price * (1 - slip)`.
/// Selling spends the native coin for quote: `min_out = in * price * (1 - slip)`.
/// Amounts are converted through each token's decimals.
///
/// The price limit is set in the pool's own orientation, on the side the
/// swap pushes the price: `pool_price * (1 - slip)` when spending token0,
/// `pool_price * (1 + slip)` when spending token1. `price_limit` reports the
/// same bound as quote-per-base.
pub fn build_intent(
    direction: Direction,
    dex_price: &BigDecimal,
    balances: &Balances,
    fee_level: U256,
    nonce: U256,
    pool: &PoolTokens,
    settings: &TradeSettings,
) -> Result<TradeIntent> {
    if *dex_price <= BigDecimal::zero() {
        return Err(AppError::Execution(format!("{direction}: non-positive DEX price {dex_price}")));
    }
    let amount_in = input_amount(direction, balances, settings);
    if amount_in.is_zero() {
        return Err(AppError::Execution(format!("{direction}: nothing to spend")));
    }

    let (token_in, token_out, min_out, value) = match direction {
        Direction::BuyOnDex => {
            let spend = from_base_units(amount_in, pool.quote_decimals());
            let out = spend / dex_price * settings.slippage_down();
            (
                pool.quote(),
                pool.base,
                to_base_units(&out, pool.base_decimals())?,
                U256::zero(),
            )
        }
        Direction::SellOnDex => {
            let spend = from_base_units(amount_in, pool.base_decimals());
            let out = spend * dex_price * settings.slippage_down();
            (
                pool.base,
                pool.quote(),
                to_base_units(&out, pool.quote_decimals())?,
                amount_in,
            )
        }
    };

    let current = pool_price(dex_price, pool);
    let pool_limit = if pool.zero_for_one(token_in) {
        current * settings.slippage_down()
    } else {
        current * settings.slippage_up()
    };
    let price_limit = if pool.token0_is_base() {
        pool_limit.clone()
    } else {
        pool_limit.inverse()
    };

    Ok(TradeIntent {
        direction,
        token_in,
        token_out,
        amount_in,
        min_amount_out: min_out,
        sqrt_price_limit_x96: encode_pool_price_x96(&pool_limit, pool)?,
        price_limit,
        value,
        gas: GasParams::from_fee_level(fee_level, settings.gas_limit),
        nonce,
    })
}

/// `exactInputSingle` calldata for an intent.
pub fn swap_calldata(intent: &TradeIntent, pool: &PoolTokens, recipient: Address, deadline: U256) -> Bytes {
    let params = ExactInputSingleParams {
        token_in: intent.token_in,
        token_out: intent.token_out,
        fee: pool.fee,
        recipient,
        deadline,
        amount_in: intent.amount_in,
        amount_out_minimum: intent.min_amount_out,
        sqrt_price_limit_x96: intent.sqrt_price_limit_x96,
    };
    ExactInputSingleCall { params }.encode().into()
}

fn eip1559_request(
    from: Address,
    to: Address,
    data: Bytes,
    value: U256,
    gas: &GasParams,
    nonce: U256,
    chain_id: u64,
) -> Eip1559TransactionRequest {
    Eip1559TransactionRequest::new()
        .from(from)
        .to(to)
        .data(data)
        .value(value)
        .gas(gas.gas_limit)
        .max_fee_per_gas(gas.max_fee_per_gas)
        .max_priority_fee_per_gas(gas.max_priority_fee_per_gas)
        .nonce(nonce)
        .chain_id(chain_id)
}

fn succeeded(receipt: &TransactionReceipt) -> bool {
    receipt.status == Some(U64::from(1))
}

/// Submits swaps through the Uniswap V3 SwapRouter.
pub struct TradeExecutor {
    provider: Arc<Provider<Http>>,
    signer: Option<LocalWallet>,
    pool: PoolTokens,
    router: Address,
    settings: TradeSettings,
}

impl TradeExecutor {
    pub fn new(
        provider: Arc<Provider<Http>>,
        signer: Option<LocalWallet>,
        pool: PoolTokens,
        router: Address,
        settings: TradeSettings,
    ) -> Self {
        Self {
            provider,
            signer,
            pool,
            router,
            settings,
        }
    }

    fn signer(&self) -> Result<&LocalWallet> {
        self.signer
            .as_ref()
            .ok_or_else(|| AppError::Execution("no signing key configured".into()))
    }

    /// Pending-inclusive nonce, read immediately before each signature.
    async fn next_nonce(&self, owner: Address) -> Result<U256> {
        Ok(self
            .provider
            .get_transaction_count(owner, Some(BlockNumber::Pending.into()))
            .await?)
    }

    async fn sign_and_send(&self, request: Eip1559TransactionRequest) -> Result<TransactionReceipt> {
        let wallet = self.signer()?;
        let typed: TypedTransaction = request.into();
        let signature = wallet.sign_transaction(&typed).await?;
        let raw = typed.rlp_signed(&signature);

        let pending = self.provider.send_raw_transaction(raw).await?;
        let tx_hash = pending.tx_hash();
        info!(?tx_hash, "[TRADE] transaction submitted");

        tokio::time::timeout(self.settings.receipt_timeout, pending)
            .await
            .map_err(|_| {
                AppError::Execution(format!(
                    "no receipt for {tx_hash:?} after {}s",
                    self.settings.receipt_timeout.as_secs()
                ))
            })??
            .ok_or_else(|| AppError::Execution(format!("transaction {tx_hash:?} was dropped")))
    }

    async fn approve(&self, owner: Address, amount: U256, fee_level: U256) -> Result<()> {
        let data: Bytes = ApproveCall {
            spender: self.router,
            amount,
        }
        .encode()
        .into();
        let gas = GasParams::from_fee_level(fee_level, self.settings.gas_limit);
        let nonce = self.next_nonce(owner).await?;
        let chain_id = self.signer()?.chain_id();
        let request = eip1559_request(owner, self.pool.quote(), data, U256::zero(), &gas, nonce, chain_id);
        let receipt = self.sign_and_send(request).await?;
        if !succeeded(&receipt) {
            return Err(AppError::Execution(format!(
                "approve({amount}) reverted in {:?}",
                receipt.transaction_hash
            )));
        }
        info!(tx_hash = ?receipt.transaction_hash, %amount, "[TRADE] router allowance updated");
        Ok(())
    }

    /// Approves the router for the quote token when the allowance is short.
    /// A non-zero allowance is reset to zero first (USDT-style tokens reject
    /// changing one non-zero allowance to another).
    async fn ensure_allowance(&self, owner: Address, needed: U256, fee_level: U256) -> Result<()> {
        let erc20 = Erc20::new(self.pool.quote(), self.provider.clone());
        let allowance = erc20.allowance(owner, self.router).call().await?;
        if allowance >= needed {
            return Ok(());
        }
        info!(%allowance, %needed, router = ?self.router, "[TRADE] router allowance too low");
        if !allowance.is_zero() {
            self.approve(owner, U256::zero(), fee_level).await?;
        }
        self.approve(owner, U256::MAX, fee_level).await
    }

    async fn try_execute(
        &self,
        direction: Direction,
        prices: &PricePair,
        snapshot: &GateSnapshot,
    ) -> Result<ExecutionOutcome> {
        let wallet = self.signer()?;
        let owner = snapshot.wallet;
        if wallet.address() != owner {
            return Err(AppError::Execution(format!(
                "signing key controls {:?}, not wallet {owner:?}",
                wallet.address()
            )));
        }

        if direction == Direction::BuyOnDex {
            let needed = input_amount(direction, &snapshot.balances, &self.settings);
            self.ensure_allowance(owner, needed, snapshot.fee_level).await?;
        }

        let nonce = self.next_nonce(owner).await?;
        let intent = build_intent(
            direction,
            &prices.dex.value,
            &snapshot.balances,
            snapshot.fee_level,
            nonce,
            &self.pool,
            &self.settings,
        )?;
        info!(
            %direction,
            amount_in = %intent.amount_in,
            min_amount_out = %intent.min_amount_out,
            dex_price = %prices.dex.value,
            cex_price = %prices.cex.value,
            price_limit = %intent.price_limit.round(6),
            sqrt_price_limit_x96 = %intent.sqrt_price_limit_x96,
            max_fee_gwei = %format_gwei(intent.gas.max_fee_per_gas),
            %nonce,
            "[TRADE] submitting swap"
        );

        let deadline = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default()
            + self.settings.tx_deadline.as_secs();
        let data = swap_calldata(&intent, &self.pool, owner, U256::from(deadline));
        let request = eip1559_request(
            owner,
            self.router,
            data,
            intent.value,
            &intent.gas,
            intent.nonce,
            wallet.chain_id(),
        );

        let receipt = self.sign_and_send(request).await?;
        let tx_hash = receipt.transaction_hash;
        if succeeded(&receipt) {
            info!(?tx_hash, gas_used = ?receipt.gas_used, "[TRADE] swap confirmed");
            Ok(ExecutionOutcome::Confirmed { tx_hash })
        } else {
            error!(
                ?tx_hash,
                %direction,
                amount_in = %intent.amount_in,
                min_amount_out = %intent.min_amount_out,
                "[TRADE] swap reverted"
            );
            Ok(ExecutionOutcome::Failed { tx_hash })
        }
    }
}

#[async_trait]
impl Execute for TradeExecutor {
    async fn execute(
        &self,
        direction: Direction,
        prices: &PricePair,
        snapshot: &GateSnapshot,
    ) -> Result<ExecutionOutcome> {
        self.try_execute(direction, prices, snapshot).await.map_err(|e| {
            let e = e.into_execution();
            error!(
                %direction,
                dex_price = %prices.dex.value,
                cex_price = %prices.cex.value,
                native = %snapshot.balances.native,
                quote = %snapshot.balances.quote,
                error = %e,
                "[TRADE] execution failed"
            );
            e
        })
    }
}

/// Parses the signing key and binds it to `chain_id`. Warns when the key
/// does not control the configured wallet.
pub fn load_signer(
    private_key: Option<&str>,
    wallet: Option<Address>,
    chain_id: u64,
) -> Result<Option<LocalWallet>> {
    let Some(key) = private_key else {
        warn!("[INIT] PRIVATE_KEY not set, trades will fail until it is configured");
        return Ok(None);
    };
    let signer = key.trim().parse::<LocalWallet>()?.with_chain_id(chain_id);
    if wallet.is_some_and(|w| w != signer.address()) {
        warn!(
            signer = ?signer.address(),
            wallet = ?wallet,
            "[INIT] PRIVATE_KEY does not control WALLET_ADDRESS"
        );
    }
    Ok(Some(signer))
}
