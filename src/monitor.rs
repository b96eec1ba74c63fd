//! The polling loop: fetch both prices, evaluate, gate, execute.
//!
//! Iterations never overlap, so a balance snapshot is never spent by two
//! trades. A halt is only observed between iterations: a swap already
//! waiting for its receipt runs to completion even if the breaker or a
//! shutdown fires meanwhile.

use crate::arbitrage::{Verdict, evaluate};
use crate::config::{AppConfig, Thresholds};
use crate::errors::{AppError, Result};
use crate::gate::{BalanceGate, Precondition};
use crate::models::{Direction, ExecutionOutcome, Price, PricePair, Venue};
use crate::traits::{ChainState, Execute, PriceSource};
use ethers::types::Address;
use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, timeout_at};
use tracing::{error, info, warn};

/// Two-state run flag. `Halted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Halted,
}

/// What the loop should do after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    /// Normal polling interval.
    Poll,
    /// Longer sleep after a failed iteration.
    Backoff,
    /// Loop is halted; nothing more to do.
    Stop,
}

#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub thresholds: Thresholds,
    pub wallet: Option<Address>,
    pub poll_interval: Duration,
    pub backoff: Duration,
    /// Shared deadline for the joint price fetch.
    pub fetch_deadline: Duration,
}

impl LoopSettings {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            thresholds: cfg.thresholds.clone(),
            wallet: cfg.wallet_address,
            poll_interval: cfg.poll_interval,
            backoff: cfg.backoff,
            fetch_deadline: cfg.price_timeout,
        }
    }
}

pub struct ArbitrageLoop<C, D, S, E> {
    cex: C,
    dex: D,
    gate: BalanceGate<S>,
    executor: E,
    settings: LoopSettings,
}

impl<C, D, S, E> ArbitrageLoop<C, D, S, E>
where
    C: PriceSource,
    D: PriceSource,
    S: ChainState,
    E: Execute,
{
    pub fn new(cex: C, dex: D, gate: BalanceGate<S>, executor: E, settings: LoopSettings) -> Self {
        Self {
            cex,
            dex,
            gate,
            executor,
            settings,
        }
    }

    /// Runs until the breaker trips or `shutdown` resolves.
    pub async fn run<F>(&self, shutdown: F) -> RunState
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut state = RunState::Running;
        info!(
            min_profit_bps = %self.settings.thresholds.min_profit_bps,
            max_loss_bps = %self.settings.thresholds.max_loss_bps,
            wallet = ?self.settings.wallet,
            "[LOOP] started"
        );
        loop {
            let (next, pace) = self.step(state).await;
            state = next;
            let delay = match pace {
                Pace::Poll => self.settings.poll_interval,
                Pace::Backoff => self.settings.backoff,
                Pace::Stop => break,
            };
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = &mut shutdown => {
                    info!("[LOOP] shutdown requested");
                    state = RunState::Halted;
                    break;
                }
            }
        }
        info!(?state, "[LOOP] stopped");
        state
    }

    /// One iteration. A `Halted` state returns immediately without I/O.
    pub async fn step(&self, state: RunState) -> (RunState, Pace) {
        if state == RunState::Halted {
            return (RunState::Halted, Pace::Stop);
        }
        match self.iterate().await {
            Ok(true) => (RunState::Running, Pace::Poll),
            Ok(false) => (RunState::Halted, Pace::Stop),
            Err(e) => {
                error!(kind = %e.kind(), error = %e, "[LOOP] iteration failed, backing off");
                (RunState::Running, Pace::Backoff)
            }
        }
    }

    /// Both prices or neither, within one shared deadline. A leg that misses
    /// the deadline is reported against its own venue.
    async fn fetch_prices(&self) -> Result<PricePair> {
        let deadline = Instant::now() + self.settings.fetch_deadline;
        let (cex, dex) = futures::try_join!(
            before(deadline, Venue::Cex, self.cex.fetch_latest_price()),
            before(deadline, Venue::Dex, self.dex.fetch_latest_price()),
        )?;
        Ok(PricePair { cex, dex })
    }

    /// Returns `Ok(false)` when the breaker trips.
    async fn iterate(&self) -> Result<bool> {
        let prices = self.fetch_prices().await?;
        let t = &self.settings.thresholds;
        let verdict = evaluate(&prices.dex.value, &prices.cex.value, &t.min_profit_bps, &t.max_loss_bps);

        match verdict {
            Verdict::CircuitBreak { signed_spread_bps } => {
                error!(
                    severity = "critical",
                    spread_bps = %signed_spread_bps.round(2),
                    dex_price = %prices.dex.value,
                    cex_price = %prices.cex.value,
                    max_loss_bps = %t.max_loss_bps,
                    "[BREAKER] anomalous spread, halting"
                );
                Ok(false)
            }
            Verdict::Tradeable { buy_on_dex, spread_bps } => {
                let direction = Direction::from_buy_on_dex(buy_on_dex);
                info!(
                    %direction,
                    spread_bps = %spread_bps.round(2),
                    dex_price = %prices.dex.value,
                    cex_price = %prices.cex.value,
                    "[OPP] spread above threshold"
                );
                self.try_trade(direction, &prices).await?;
                Ok(true)
            }
            Verdict::NoOp { spread_bps } => {
                info!(
                    spread_bps = %spread_bps.round(2),
                    dex_price = %prices.dex.value,
                    cex_price = %prices.cex.value,
                    "[HEARTBEAT] no trade"
                );
                Ok(true)
            }
        }
    }

    /// Gate failures propagate; execution failures are logged and absorbed.
    async fn try_trade(&self, direction: Direction, prices: &PricePair) -> Result<()> {
        let snapshot = match self.gate.check_preconditions(self.settings.wallet).await? {
            Precondition::Ok(snapshot) => snapshot,
            Precondition::Insufficient(_) | Precondition::FeeTooHigh { .. } => return Ok(()),
        };
        match self.executor.execute(direction, prices, &snapshot).await {
            Ok(ExecutionOutcome::Confirmed { tx_hash }) => {
                info!(%direction, ?tx_hash, "[TRADE] arbitrage leg confirmed");
            }
            Ok(ExecutionOutcome::Failed { tx_hash }) => {
                error!(%direction, ?tx_hash, "[TRADE] arbitrage leg failed on-chain");
            }
            Err(e) => {
                warn!(%direction, kind = %e.kind(), error = %e, "[TRADE] attempt abandoned");
            }
        }
        Ok(())
    }
}

async fn before<F>(deadline: Instant, venue: Venue, fetch: F) -> Result<Price>
where
    F: Future<Output = Result<Price>>,
{
    timeout_at(deadline, fetch)
        .await
        .map_err(|_| AppError::price_unavailable(venue, "no price before the iteration deadline"))?
}
