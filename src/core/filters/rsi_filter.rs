use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::core::types::{SignalKind, StrategyState, TradeSignal};

use super::{FilterMode, FilterOutcome, SignalFilter};

/// Gates or scores a Buy/Sell against the contributing strategy's published
/// `rsi` reading (via [`StrategyState::custom`]).
pub struct RsiSignalFilter {
    pub overbought: Decimal,
    pub oversold: Decimal,
    pub mode: FilterMode,
}

impl RsiSignalFilter {
    pub fn new(oversold: Decimal, overbought: Decimal, mode: FilterMode) -> Self {
        Self {
            overbought,
            oversold,
            mode,
        }
    }

    fn score_long(&self, rsi: Decimal) -> Decimal {
        if rsi <= self.oversold {
            return dec!(1.2);
        }
        if rsi >= self.overbought {
            return dec!(0.5);
        }
        // Linear interpolation across the neutral span: 1.0 near oversold, 0.5 near overbought.
        let span = self.overbought - self.oversold;
        if span.is_zero() {
            return dec!(0.75);
        }
        let frac = (rsi - self.oversold) / span;
        dec!(1.0) - frac * dec!(0.5)
    }

    fn score_short(&self, rsi: Decimal) -> Decimal {
        self.score_long(self.overbought + self.oversold - rsi)
    }
}

impl SignalFilter for RsiSignalFilter {
    fn mode(&self) -> FilterMode {
        self.mode
    }

    fn evaluate(&self, signal: &TradeSignal, state: &StrategyState) -> FilterOutcome {
        let Some(rsi) = state.get("rsi") else {
            return FilterOutcome::reject("rsi value missing");
        };

        match self.mode {
            FilterMode::Confirm => match signal.kind {
                SignalKind::Buy if rsi <= self.oversold => FilterOutcome::approve("RSI confirms oversold buy"),
                SignalKind::Sell if rsi >= self.overbought => {
                    FilterOutcome::approve("RSI confirms overbought sell")
                }
                SignalKind::Buy | SignalKind::Sell => FilterOutcome::reject("RSI does not confirm"),
                _ => FilterOutcome::approve("not gated by RSI"),
            },
            FilterMode::Veto => match signal.kind {
                SignalKind::Buy if rsi >= self.overbought => FilterOutcome::reject("RSI overbought, veto buy"),
                SignalKind::Sell if rsi <= self.oversold => FilterOutcome::reject("RSI oversold, veto sell"),
                _ => FilterOutcome::approve("no RSI veto"),
            },
            FilterMode::Score => {
                let confidence = match signal.kind {
                    SignalKind::Sell => self.score_short(rsi),
                    _ => self.score_long(rsi),
                };
                FilterOutcome::score(confidence, "RSI confidence score")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_rsi(rsi: Decimal) -> StrategyState {
        let mut s = StrategyState::default();
        s.custom.insert("rsi".to_string(), rsi);
        s
    }

    #[test]
    fn confirm_mode_approves_buy_only_when_oversold() {
        let filter = RsiSignalFilter::new(dec!(30), dec!(70), FilterMode::Confirm);
        let buy = TradeSignal::new("BTCUSDT", SignalKind::Buy, dec!(100), "x").unwrap();
        assert!(filter.evaluate(&buy, &state_with_rsi(dec!(25))).approved);
        assert!(!filter.evaluate(&buy, &state_with_rsi(dec!(50))).approved);
    }

    #[test]
    fn missing_rsi_rejects_with_specific_reason() {
        let filter = RsiSignalFilter::new(dec!(30), dec!(70), FilterMode::Confirm);
        let buy = TradeSignal::new("BTCUSDT", SignalKind::Buy, dec!(100), "x").unwrap();
        let outcome = filter.evaluate(&buy, &StrategyState::default());
        assert!(!outcome.approved);
        assert_eq!(outcome.reason, "rsi value missing");
    }

    #[test]
    fn score_mode_peaks_at_oversold() {
        let filter = RsiSignalFilter::new(dec!(30), dec!(70), FilterMode::Score);
        let buy = TradeSignal::new("BTCUSDT", SignalKind::Buy, dec!(100), "x").unwrap();
        let outcome = filter.evaluate(&buy, &state_with_rsi(dec!(30)));
        assert_eq!(outcome.confidence_adjustment, Some(dec!(1.2)));
    }
}
