use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::core::types::{SignalKind, StrategyState, TradeSignal};

use super::{FilterMode, FilterOutcome, SignalFilter};

/// Gates or scores a signal against the contributing strategy's published
/// `adx` reading (via [`StrategyState::custom`]).
pub struct AdxSignalFilter {
    pub threshold_weak: Decimal,
    pub threshold_strong: Decimal,
    pub mode: FilterMode,
}

impl AdxSignalFilter {
    pub fn new(threshold_weak: Decimal, threshold_strong: Decimal, mode: FilterMode) -> Self {
        Self {
            threshold_weak,
            threshold_strong,
            mode,
        }
    }

    fn score(&self, adx: Decimal) -> Decimal {
        if adx <= self.threshold_weak {
            return dec!(0.5);
        }
        let span = self.threshold_strong - self.threshold_weak;
        if span.is_zero() {
            return dec!(1.0);
        }
        let frac = (adx - self.threshold_weak) / span;
        (dec!(0.5) + frac * dec!(0.5)).min(dec!(1.0))
    }
}

impl SignalFilter for AdxSignalFilter {
    fn mode(&self) -> FilterMode {
        self.mode
    }

    fn evaluate(&self, signal: &TradeSignal, state: &StrategyState) -> FilterOutcome {
        let Some(adx) = state.get("adx") else {
            return FilterOutcome::reject("adx value missing");
        };

        match self.mode {
            FilterMode::Confirm => {
                if adx >= self.threshold_strong {
                    FilterOutcome::approve("ADX confirms strong trend")
                } else {
                    FilterOutcome::reject("ADX below strong threshold")
                }
            }
            FilterMode::Veto => {
                if matches!(signal.kind, SignalKind::Buy | SignalKind::Sell) && adx < self.threshold_weak {
                    FilterOutcome::reject("ADX too weak, veto entry")
                } else {
                    FilterOutcome::approve("no ADX veto")
                }
            }
            FilterMode::Score => FilterOutcome::score(self.score(adx), "ADX confidence score"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_adx(adx: Decimal) -> StrategyState {
        let mut s = StrategyState::default();
        s.custom.insert("adx".to_string(), adx);
        s
    }

    #[test]
    fn confirm_mode_requires_strong_threshold() {
        let filter = AdxSignalFilter::new(dec!(20), dec!(30), FilterMode::Confirm);
        let buy = TradeSignal::new("BTCUSDT", SignalKind::Buy, dec!(100), "x").unwrap();
        assert!(!filter.evaluate(&buy, &state_with_adx(dec!(25))).approved);
        assert!(filter.evaluate(&buy, &state_with_adx(dec!(35))).approved);
    }

    #[test]
    fn score_saturates_at_one() {
        let filter = AdxSignalFilter::new(dec!(20), dec!(30), FilterMode::Score);
        let buy = TradeSignal::new("BTCUSDT", SignalKind::Buy, dec!(100), "x").unwrap();
        let outcome = filter.evaluate(&buy, &state_with_adx(dec!(60)));
        assert_eq!(outcome.confidence_adjustment, Some(dec!(1.0)));
    }
}
