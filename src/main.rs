use anyhow::Result;
use cex_dex_arb::{
    cex::OkxTicker,
    chain::Chain,
    config::AppConfig,
    dex::Dex,
    executor::{TradeExecutor, TradeSettings, load_signer},
    gate::{BalanceGate, GateLimits},
    monitor::{ArbitrageLoop, LoopSettings},
    utils,
};
use ethers::providers::{Http, Middleware, Provider};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    utils::init_logging();

    let cfg = AppConfig::from_env()?;
    tracing::info!(
        pool = ?cfg.pool_address,
        instrument = %cfg.instrument,
        min_profit_bps = %cfg.thresholds.min_profit_bps,
        max_loss_bps = %cfg.thresholds.max_loss_bps,
        "[INIT] cex-dex-arb starting"
    );

    let provider = Arc::new(Provider::<Http>::try_from(cfg.rpc_url.as_str())?.interval(Duration::from_millis(500)));
    let chain_id = provider.get_chainid().await?.as_u64();

    let dex = Dex::connect(provider.clone(), cfg.pool_address, cfg.base_token).await?;
    let pool = dex.tokens().clone();
    if pool.quote() != cfg.quote_token {
        anyhow::bail!(
            "QUOTE_TOKEN_ADDRESS {:?} does not match the pool's other token {:?}",
            cfg.quote_token,
            pool.quote()
        );
    }

    let cex = OkxTicker::new(cfg.cex_ws_url.clone(), cfg.instrument.clone(), cfg.price_timeout);

    let limits = GateLimits::from_config(&cfg, pool.quote_decimals())?;
    let gate = BalanceGate::new(Chain::new(provider.clone()), pool.quote(), limits);

    let signer = load_signer(cfg.private_key.as_deref(), cfg.wallet_address, chain_id)?;
    let settings = TradeSettings::from_config(&cfg, &pool)?;
    let executor = TradeExecutor::new(provider, signer, pool, cfg.router_address, settings);

    tracing::info!(chain_id, router = ?cfg.router_address, "[INIT] components ready");

    let bot = ArbitrageLoop::new(cex, dex, gate, executor, LoopSettings::from_config(&cfg));
    let state = bot
        .run(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    tracing::info!(?state, "[INIT] exiting");
    Ok(())
}
