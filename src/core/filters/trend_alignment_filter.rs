use crate::core::types::{SignalKind, StrategyState, TradeSignal};

use super::{FilterMode, FilterOutcome, SignalFilter};

/// Approves an entry only when the strategy's own last-published signal
/// agrees with the direction being requested and `is_trending` holds.
pub struct TrendAlignmentFilter {
    pub mode: FilterMode,
    pub require_strict: bool,
}

impl TrendAlignmentFilter {
    pub fn new(mode: FilterMode, require_strict: bool) -> Self {
        Self { mode, require_strict }
    }
}

impl SignalFilter for TrendAlignmentFilter {
    fn mode(&self) -> FilterMode {
        self.mode
    }

    fn evaluate(&self, signal: &TradeSignal, state: &StrategyState) -> FilterOutcome {
        let aligned = match signal.kind {
            SignalKind::Buy => state.last_signal == Some(SignalKind::Buy) && state.is_trending,
            SignalKind::Sell => state.last_signal == Some(SignalKind::Sell) && state.is_trending,
            _ => true,
        };

        match self.mode {
            FilterMode::Confirm | FilterMode::Veto => {
                if aligned {
                    FilterOutcome::approve("trend aligned")
                } else if self.require_strict {
                    FilterOutcome::reject("trend misaligned")
                } else {
                    FilterOutcome::approve("non-strict: trend misalignment tolerated")
                }
            }
            FilterMode::Score => {
                let confidence = if aligned {
                    rust_decimal_macros::dec!(1.0)
                } else {
                    rust_decimal_macros::dec!(0.5)
                };
                FilterOutcome::score(confidence, "trend alignment score")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rejects_buy_when_last_signal_was_sell() {
        let filter = TrendAlignmentFilter::new(FilterMode::Confirm, true);
        let buy = TradeSignal::new("BTCUSDT", SignalKind::Buy, dec!(100), "x").unwrap();
        let mut state = StrategyState::default();
        state.last_signal = Some(SignalKind::Sell);
        state.is_trending = true;
        assert!(!filter.evaluate(&buy, &state).approved);
    }

    #[test]
    fn approves_buy_when_aligned() {
        let filter = TrendAlignmentFilter::new(FilterMode::Confirm, true);
        let buy = TradeSignal::new("BTCUSDT", SignalKind::Buy, dec!(100), "x").unwrap();
        let mut state = StrategyState::default();
        state.last_signal = Some(SignalKind::Buy);
        state.is_trending = true;
        assert!(filter.evaluate(&buy, &state).approved);
    }
}
