use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Per-symbol risk policy. Defaults mirror the reference configuration.
#[derive(Debug, Clone)]
pub struct RiskSettings {
    pub risk_per_trade_pct: Decimal,
    pub max_portfolio_heat_pct: Decimal,
    pub max_drawdown_pct: Decimal,
    pub max_daily_drawdown_pct: Decimal,
    pub atr_stop_multiplier: Decimal,
    pub take_profit_multiplier: Decimal,
    pub minimum_equity: Decimal,
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            risk_per_trade_pct: dec!(1.5),
            max_portfolio_heat_pct: dec!(15),
            max_drawdown_pct: dec!(20),
            max_daily_drawdown_pct: dec!(3),
            atr_stop_multiplier: dec!(2.5),
            take_profit_multiplier: dec!(1.5),
            minimum_equity: dec!(100),
        }
    }
}

/// Portfolio-wide caps layered on top of per-symbol [`RiskSettings`].
#[derive(Debug, Clone)]
pub struct PortfolioRiskSettings {
    pub max_total_drawdown_pct: Decimal,
    pub max_correlated_risk_pct: Decimal,
    pub max_concurrent_positions: usize,
    pub correlation_groups: HashMap<String, Vec<String>>,
}

impl Default for PortfolioRiskSettings {
    fn default() -> Self {
        Self {
            max_total_drawdown_pct: dec!(25),
            max_correlated_risk_pct: dec!(10),
            max_concurrent_positions: 5,
            correlation_groups: HashMap::new(),
        }
    }
}

/// The drawdown-adjusted risk ladder applied on top of `risk_per_trade_pct`.
pub fn drawdown_ladder_multiplier(current_drawdown_pct: Decimal) -> Decimal {
    if current_drawdown_pct >= dec!(20) {
        dec!(0.25)
    } else if current_drawdown_pct >= dec!(15) {
        dec!(0.50)
    } else if current_drawdown_pct >= dec!(10) {
        dec!(0.75)
    } else if current_drawdown_pct >= dec!(5) {
        dec!(0.90)
    } else {
        dec!(1.00)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladder_steps_down_with_drawdown() {
        assert_eq!(drawdown_ladder_multiplier(dec!(25)), dec!(0.25));
        assert_eq!(drawdown_ladder_multiplier(dec!(17)), dec!(0.50));
        assert_eq!(drawdown_ladder_multiplier(dec!(12)), dec!(0.75));
        assert_eq!(drawdown_ladder_multiplier(dec!(6)), dec!(0.90));
        assert_eq!(drawdown_ladder_multiplier(dec!(1)), dec!(1.00));
    }
}
