use super::types::Verdict;
use bigdecimal::BigDecimal;
use num_traits::Zero;

/// `(dex - cex) / dex * 10_000`. Positive when the DEX is the dearer venue.
pub fn signed_spread_bps(dex_price: &BigDecimal, cex_price: &BigDecimal) -> BigDecimal {
    (dex_price - cex_price) / dex_price * BigDecimal::from(10_000)
}

/// Classify a price pair. Pure; both thresholds use strict inequality.
///
/// The breaker only trips when the DEX sits below the CEX by more than
/// `max_loss_bps`. A DEX premium of any size is a sell-on-DEX signal.
/// A non-positive DEX price never trades.
pub fn evaluate(
    dex_price: &BigDecimal,
    cex_price: &BigDecimal,
    min_profit_bps: &BigDecimal,
    max_loss_bps: &BigDecimal,
) -> Verdict {
    if *dex_price <= BigDecimal::zero() {
        return Verdict::NoOp {
            spread_bps: BigDecimal::zero(),
        };
    }

    let signed = signed_spread_bps(dex_price, cex_price);
    let loss_floor = -max_loss_bps.clone();
    if signed < loss_floor {
        return Verdict::CircuitBreak {
            signed_spread_bps: signed,
        };
    }

    let spread_bps = signed.abs();
    if spread_bps > *min_profit_bps {
        Verdict::Tradeable {
            buy_on_dex: dex_price < cex_price,
            spread_bps,
        }
    } else {
        Verdict::NoOp { spread_bps }
    }
}
