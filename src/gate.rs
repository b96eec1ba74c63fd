//! Trading preconditions: wallet balances and network fee level.

use crate::config::AppConfig;
use crate::errors::Result;
use crate::models::Balances;
use crate::traits::ChainState;
use crate::utils::{format_gwei, to_base_units};
use ethers::types::{Address, U256};
use tracing::{debug, warn};

/// Floors and ceiling the gate enforces, in smallest units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateLimits {
    pub native_min: U256,
    pub quote_min: U256,
    pub fee_ceiling: U256,
}

impl GateLimits {
    /// Native token is assumed to carry 18 decimals.
    pub fn from_config(cfg: &AppConfig, quote_decimals: u8) -> Result<Self> {
        Ok(Self {
            native_min: to_base_units(&cfg.min_native_balance, 18)?,
            quote_min: to_base_units(&cfg.min_quote_balance, quote_decimals)?,
            fee_ceiling: to_base_units(&cfg.max_fee_gwei, 9)?,
        })
    }
}

/// Everything the executor needs from a passing gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateSnapshot {
    pub wallet: Address,
    pub balances: Balances,
    pub fee_level: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    Ok(GateSnapshot),
    Insufficient(Balances),
    FeeTooHigh { fee_level: U256, ceiling: U256 },
}

impl Precondition {
    pub fn is_ok(&self) -> bool {
        matches!(self, Precondition::Ok(_))
    }
}

pub struct BalanceGate<S> {
    chain: S,
    quote_token: Address,
    limits: GateLimits,
}

impl<S: ChainState> BalanceGate<S> {
    pub fn new(chain: S, quote_token: Address, limits: GateLimits) -> Self {
        Self {
            chain,
            quote_token,
            limits,
        }
    }

    pub fn limits(&self) -> &GateLimits {
        &self.limits
    }

    /// Reads balances and fee level for `wallet`. Without a wallet the gate
    /// fails closed with zero balances and performs no reads.
    pub async fn check_preconditions(&self, wallet: Option<Address>) -> Result<Precondition> {
        let Some(wallet) = wallet else {
            warn!("[GATE] WALLET_ADDRESS not set, balances default to zero");
            return Ok(Precondition::Insufficient(Balances {
                native_min: self.limits.native_min,
                quote_min: self.limits.quote_min,
                ..Balances::default()
            }));
        };

        let (native, quote, fee_level) = futures::try_join!(
            self.chain.native_balance(wallet),
            self.chain.token_balance(self.quote_token, wallet),
            self.chain.fee_level(),
        )?;

        let balances = Balances {
            native,
            quote,
            native_min: self.limits.native_min,
            quote_min: self.limits.quote_min,
        };
        let verdict = assess(wallet, balances, fee_level, &self.limits);
        match &verdict {
            Precondition::Ok(_) => debug!(%native, %quote, fee_gwei = %format_gwei(fee_level), "[GATE] preconditions met"),
            Precondition::Insufficient(b) => warn!(
                native = %b.native,
                quote = %b.quote,
                native_min = %b.native_min,
                quote_min = %b.quote_min,
                "[GATE] insufficient balance, skipping trade"
            ),
            Precondition::FeeTooHigh { fee_level, ceiling } => warn!(
                fee_gwei = %format_gwei(*fee_level),
                ceiling_gwei = %format_gwei(*ceiling),
                "[GATE] fee level too high, skipping trade"
            ),
        }
        Ok(verdict)
    }
}

/// Balance floors are checked before the fee ceiling.
pub fn assess(wallet: Address, balances: Balances, fee_level: U256, limits: &GateLimits) -> Precondition {
    if !balances.is_sufficient() {
        return Precondition::Insufficient(balances);
    }
    if fee_level > limits.fee_ceiling {
        return Precondition::FeeTooHigh {
            fee_level,
            ceiling: limits.fee_ceiling,
        };
    }
    Precondition::Ok(GateSnapshot {
        wallet,
        balances,
        fee_level,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) const GWEI: u64 = 1_000_000_000;

    /// In-memory chain that counts every read.
    #[derive(Clone)]
    pub(crate) struct MockChain {
        pub native: U256,
        pub quote: U256,
        pub fee: U256,
        pub reads: Arc<AtomicUsize>,
    }

    impl MockChain {
        pub(crate) fn funded() -> Self {
            Self {
                native: U256::exp10(18),
                quote: U256::from(5_000_000_000u64),
                fee: U256::from(20 * GWEI),
                reads: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl ChainState for MockChain {
        async fn native_balance(&self, _owner: Address) -> Result<U256> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.native)
        }
        async fn token_balance(&self, _token: Address, _owner: Address) -> Result<U256> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.quote)
        }
        async fn fee_level(&self) -> Result<U256> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(self.fee)
        }
    }

    pub(crate) fn limits() -> GateLimits {
        GateLimits {
            native_min: U256::exp10(17),
            quote_min: U256::from(100_000_000u64),
            fee_ceiling: U256::from(100 * GWEI),
        }
    }

    #[tokio::test]
    async fn unconfigured_wallet_is_insufficient_without_reads() {
        let chain = MockChain::funded();
        let reads = chain.reads.clone();
        let gate = BalanceGate::new(chain, Address::zero(), limits());
        let res = gate.check_preconditions(None).await.unwrap();
        match res {
            Precondition::Insufficient(b) => {
                assert!(b.native.is_zero());
                assert!(b.quote.is_zero());
                assert_eq!(b.native_min, U256::exp10(17));
            }
            other => panic!("expected Insufficient, got {other:?}"),
        }
        assert_eq!(reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn funded_wallet_with_normal_fee_passes() {
        let gate = BalanceGate::new(MockChain::funded(), Address::zero(), limits());
        let wallet = Address::repeat_byte(0x11);
        let res = gate.check_preconditions(Some(wallet)).await.unwrap();
        match res {
            Precondition::Ok(snap) => {
                assert_eq!(snap.wallet, wallet);
                assert_eq!(snap.fee_level, U256::from(20 * GWEI));
                assert_eq!(snap.balances.quote, U256::from(5_000_000_000u64));
            }
            other => panic!("expected Ok, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn low_quote_balance_is_insufficient() {
        let mut chain = MockChain::funded();
        chain.quote = U256::from(99_999_999u64);
        let gate = BalanceGate::new(chain, Address::zero(), limits());
        let res = gate.check_preconditions(Some(Address::repeat_byte(1))).await.unwrap();
        assert!(matches!(res, Precondition::Insufficient(_)));
    }

    #[tokio::test]
    async fn fee_above_ceiling_is_rejected() {
        let mut chain = MockChain::funded();
        chain.fee = U256::from(101 * GWEI);
        let gate = BalanceGate::new(chain, Address::zero(), limits());
        let res = gate.check_preconditions(Some(Address::repeat_byte(1))).await.unwrap();
        assert_eq!(
            res,
            Precondition::FeeTooHigh {
                fee_level: U256::from(101 * GWEI),
                ceiling: U256::from(100 * GWEI),
            }
        );
    }

    #[test]
    fn fee_exactly_at_ceiling_is_allowed() {
        let balances = Balances {
            native: U256::exp10(17),
            quote: U256::from(100_000_000u64),
            native_min: U256::exp10(17),
            quote_min: U256::from(100_000_000u64),
        };
        let res = assess(Address::zero(), balances, U256::from(100 * GWEI), &limits());
        assert!(res.is_ok());
    }

    #[test]
    fn limits_follow_config_units() {
        let cfg = AppConfig::from_lookup(|k| match k {
            "RPC_URL" => Some("http://localhost:8545".into()),
            "POOL_ADDRESS" | "BASE_TOKEN_ADDRESS" | "QUOTE_TOKEN_ADDRESS" => {
                Some(format!("{:?}", Address::repeat_byte(7)))
            }
            _ => None,
        })
        .unwrap();
        assert_eq!(GateLimits::from_config(&cfg, 6).unwrap(), limits());
    }
}
