use bigdecimal::BigDecimal;

/// Outcome of comparing the two venue prices.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// DEX is below CEX by more than the loss ceiling. Halts the loop.
    CircuitBreak { signed_spread_bps: BigDecimal },
    /// Spread exceeds the profit threshold.
    Tradeable { buy_on_dex: bool, spread_bps: BigDecimal },
    NoOp { spread_bps: BigDecimal },
}
