//! Configuration loader and application settings.

use crate::errors::{AppError, Result};
use bigdecimal::BigDecimal;
use ethers::types::Address;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

/// OKX public market-data channel.
pub const DEFAULT_CEX_WS_URL: &str = "wss://ws.okx.com:8443/ws/v5/public";
pub const DEFAULT_INSTRUMENT: &str = "ETH-USDT-SWAP";
/// Uniswap V3 SwapRouter (mainnet).
pub const DEFAULT_SWAP_ROUTER: &str = "0xE592427A0AEce92De3Edee1F18E0157C05861564";

/// Spread thresholds in basis points.
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    pub min_profit_bps: BigDecimal,
    pub max_loss_bps: BigDecimal,
}

/// Consolidated application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// RPC endpoint for the Ethereum-compatible node.
    pub rpc_url: String,
    /// WebSocket endpoint for the CEX public feed.
    pub cex_ws_url: String,
    /// CEX instrument id (e.g. "ETH-USDT-SWAP").
    pub instrument: String,
    pub pool_address: Address,
    pub router_address: Address,
    /// Base asset of the pair (WETH for the calibrated pair).
    pub base_token: Address,
    /// Quote asset of the pair (a 6-decimal stablecoin for the calibrated pair).
    pub quote_token: Address,
    /// Trading wallet. `None` keeps the bot in monitor-only mode.
    pub wallet_address: Option<Address>,
    pub private_key: Option<String>,
    pub gas_limit: u64,
    pub thresholds: Thresholds,
    pub max_fee_gwei: BigDecimal,
    pub slippage_bps: u32,
    /// Per-trade input caps, in human units.
    pub max_quote_in: BigDecimal,
    pub max_native_in: BigDecimal,
    /// Balance floors, in human units.
    pub min_native_balance: BigDecimal,
    pub min_quote_balance: BigDecimal,
    pub poll_interval: Duration,
    pub backoff: Duration,
    pub price_timeout: Duration,
    pub receipt_timeout: Duration,
    pub tx_deadline: Duration,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |keys: &[&str]| -> Result<String> {
            keys.iter()
                .find_map(|k| get(*k))
                .ok_or_else(|| AppError::Config(format!("set {} in the environment", keys[0])))
        };

        let rpc_url = required(&["RPC_URL", "INFURA_URL"])?;
        let pool_address = parse_value("POOL_ADDRESS", &required(&["POOL_ADDRESS", "UNISWAP_POOL"])?)?;
        let base_token =
            parse_value("BASE_TOKEN_ADDRESS", &required(&["BASE_TOKEN_ADDRESS", "WETH_ADDRESS"])?)?;
        let quote_token =
            parse_value("QUOTE_TOKEN_ADDRESS", &required(&["QUOTE_TOKEN_ADDRESS", "USDT_ADDRESS"])?)?;

        let wallet_address = get("WALLET_ADDRESS")
            .map(|raw| parse_value::<Address>("WALLET_ADDRESS", &raw))
            .transpose()?;

        let or_default = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());
        let parsed = |key: &str, default: &str| -> Result<BigDecimal> {
            parse_value(key, &or_default(key, default))
        };
        let secs = |key: &str, default: u64| -> Result<Duration> {
            match get(key) {
                Some(raw) => parse_value(key, &raw).map(Duration::from_secs),
                None => Ok(Duration::from_secs(default)),
            }
        };

        let slippage_bps: u32 = parse_value("SLIPPAGE_BPS", &or_default("SLIPPAGE_BPS", "50"))?;
        if slippage_bps >= 10_000 {
            return Err(AppError::Config(format!(
                "SLIPPAGE_BPS={slippage_bps} must be below 10000"
            )));
        }

        Ok(Self {
            rpc_url,
            cex_ws_url: or_default("CEX_WS_URL", DEFAULT_CEX_WS_URL),
            instrument: or_default("CEX_INSTRUMENT", DEFAULT_INSTRUMENT),
            pool_address,
            router_address: parse_value(
                "SWAP_ROUTER_ADDRESS",
                &or_default("SWAP_ROUTER_ADDRESS", DEFAULT_SWAP_ROUTER),
            )?,
            base_token,
            quote_token,
            wallet_address,
            private_key: get("PRIVATE_KEY"),
            gas_limit: parse_value("GAS_LIMIT", &or_default("GAS_LIMIT", "300000"))?,
            thresholds: Thresholds {
                min_profit_bps: parsed("MIN_PROFIT_BPS", "5")?,
                max_loss_bps: parsed("MAX_LOSS_BPS", "50")?,
            },
            max_fee_gwei: parsed("MAX_FEE_GWEI", "100")?,
            slippage_bps,
            max_quote_in: parsed("MAX_QUOTE_IN", "1000")?,
            max_native_in: parsed("MAX_NATIVE_IN", "0.1")?,
            min_native_balance: parsed("MIN_NATIVE_BALANCE", "0.1")?,
            min_quote_balance: parsed("MIN_QUOTE_BALANCE", "100")?,
            poll_interval: secs("POLL_INTERVAL_SECS", 3)?,
            backoff: secs("BACKOFF_SECS", 8)?,
            price_timeout: secs("PRICE_TIMEOUT_SECS", 10)?,
            receipt_timeout: secs("RECEIPT_TIMEOUT_SECS", 180)?,
            tx_deadline: secs("TX_DEADLINE_SECS", 300)?,
        })
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|e| AppError::Config(format!("{key}={raw:?} is invalid: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const POOL: &str = "0x88e6a0c2ddd26feeb64f039a2c41296fcb3f5640";
    const WETH: &str = "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2";
    const USDT: &str = "0xdac17f958d2ee523a2206206994597c13d831ec7";

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            ("RPC_URL", "http://localhost:8545"),
            ("POOL_ADDRESS", POOL),
            ("BASE_TOKEN_ADDRESS", WETH),
            ("QUOTE_TOKEN_ADDRESS", USDT),
        ]
    }

    #[test]
    fn defaults_apply_when_only_required_vars_set() {
        let cfg = AppConfig::from_lookup(lookup(&minimal())).expect("config should load");
        assert_eq!(cfg.cex_ws_url, DEFAULT_CEX_WS_URL);
        assert_eq!(cfg.instrument, DEFAULT_INSTRUMENT);
        assert_eq!(cfg.gas_limit, 300_000);
        assert_eq!(cfg.thresholds.min_profit_bps, BigDecimal::from(5));
        assert_eq!(cfg.thresholds.max_loss_bps, BigDecimal::from(50));
        assert_eq!(cfg.max_fee_gwei, BigDecimal::from(100));
        assert_eq!(cfg.slippage_bps, 50);
        assert_eq!(cfg.poll_interval, Duration::from_secs(3));
        assert_eq!(cfg.backoff, Duration::from_secs(8));
        assert!(cfg.wallet_address.is_none());
        assert!(cfg.private_key.is_none());
    }

    #[test]
    fn missing_wallet_is_tolerated_but_malformed_wallet_is_not() {
        let mut vars = minimal();
        vars.push(("WALLET_ADDRESS", "  "));
        let cfg = AppConfig::from_lookup(lookup(&vars)).unwrap();
        assert!(cfg.wallet_address.is_none());

        let mut vars = minimal();
        vars.push(("WALLET_ADDRESS", "0xnot-an-address"));
        let err = AppConfig::from_lookup(lookup(&vars)).unwrap_err();
        assert!(err.to_string().contains("WALLET_ADDRESS"), "Got: {}", err);
    }

    #[test]
    fn legacy_variable_names_are_accepted() {
        let vars = [
            ("INFURA_URL", "http://localhost:8545"),
            ("UNISWAP_POOL", POOL),
            ("WETH_ADDRESS", WETH),
            ("USDT_ADDRESS", USDT),
        ];
        let cfg = AppConfig::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(cfg.rpc_url, "http://localhost:8545");
        assert_eq!(cfg.base_token, WETH.parse::<Address>().unwrap());
    }

    #[test]
    fn missing_rpc_url_is_a_config_error() {
        let vars: Vec<_> = minimal().into_iter().filter(|(k, _)| *k != "RPC_URL").collect();
        let err = AppConfig::from_lookup(lookup(&vars)).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("RPC_URL"));
    }

    #[test]
    fn overrides_are_parsed() {
        let mut vars = minimal();
        vars.push(("MIN_PROFIT_BPS", "7.5"));
        vars.push(("POLL_INTERVAL_SECS", "1"));
        vars.push(("GAS_LIMIT", "250000"));
        let cfg = AppConfig::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(cfg.thresholds.min_profit_bps, "7.5".parse::<BigDecimal>().unwrap());
        assert_eq!(cfg.poll_interval, Duration::from_secs(1));
        assert_eq!(cfg.gas_limit, 250_000);
    }

    #[test]
    fn slippage_of_a_whole_trade_is_rejected() {
        for bad in ["10000", "12000"] {
            let mut vars = minimal();
            vars.push(("SLIPPAGE_BPS", bad));
            let err = AppConfig::from_lookup(lookup(&vars)).unwrap_err();
            assert!(matches!(err, AppError::Config(_)), "{bad}: {err}");
            assert!(err.to_string().contains("SLIPPAGE_BPS"));
        }

        let mut vars = minimal();
        vars.push(("SLIPPAGE_BPS", "9999"));
        assert_eq!(AppConfig::from_lookup(lookup(&vars)).unwrap().slippage_bps, 9999);
    }
}
