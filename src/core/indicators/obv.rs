use rust_decimal::Decimal;

use crate::core::types::Candle;

use super::{Indicator, Sma};

/// On-balance volume: a running signed sum of volume, +volume on an up close,
/// -volume on a down close, unchanged on a flat close. Ready immediately (it has
/// no warmup), but `is_bullish`/`is_bearish` need the internal SMA lookback warm.
#[derive(Debug, Clone)]
pub struct Obv {
    prev_close: Option<Decimal>,
    cumulative: Decimal,
    trend_sma: Sma,
}

impl Obv {
    pub fn new(trend_lookback: usize) -> Self {
        Self {
            prev_close: None,
            cumulative: Decimal::ZERO,
            trend_sma: Sma::new(trend_lookback),
        }
    }

    pub fn is_bullish(&self) -> bool {
        self.trend_sma
            .value()
            .is_some_and(|avg| self.cumulative > avg)
    }

    pub fn is_bearish(&self) -> bool {
        self.trend_sma
            .value()
            .is_some_and(|avg| self.cumulative < avg)
    }
}

impl Indicator for Obv {
    type Input = Candle;

    fn update(&mut self, candle: Candle) -> Option<Decimal> {
        let signed_volume = match self.prev_close {
            None => Decimal::ZERO,
            Some(prev) if candle.close > prev => candle.volume,
            Some(prev) if candle.close < prev => -candle.volume,
            Some(_) => Decimal::ZERO,
        };
        self.prev_close = Some(candle.close);
        self.cumulative += signed_volume;
        self.trend_sma.update(self.cumulative);
        Some(self.cumulative)
    }

    fn value(&self) -> Option<Decimal> {
        Some(self.cumulative)
    }

    fn is_ready(&self) -> bool {
        self.prev_close.is_some()
    }

    fn reset(&mut self) {
        self.prev_close = None;
        self.cumulative = Decimal::ZERO;
        self.trend_sma.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn candle(i: i64, close: Decimal) -> Candle {
        let t0 = Utc.timestamp_opt(i * 3600, 0).unwrap();
        let t1 = Utc.timestamp_opt((i + 1) * 3600, 0).unwrap();
        Candle::new(t0, close, close, close, close, dec!(100), t1).unwrap()
    }

    #[test]
    fn accumulates_signed_volume() {
        let mut obv = Obv::new(3);
        obv.update(candle(0, dec!(10)));
        assert_eq!(obv.value(), Some(dec!(0)));
        obv.update(candle(1, dec!(11))); // up
        assert_eq!(obv.value(), Some(dec!(100)));
        obv.update(candle(2, dec!(9))); // down
        assert_eq!(obv.value(), Some(dec!(0)));
        obv.update(candle(3, dec!(9))); // flat
        assert_eq!(obv.value(), Some(dec!(0)));
    }

    #[test]
    fn reset_matches_fresh_instance() {
        let mut obv = Obv::new(3);
        let mut fresh = Obv::new(3);
        for i in 0..6 {
            obv.update(candle(i, Decimal::from(10 + (i % 3))));
        }
        obv.reset();
        for i in 0..6 {
            assert_eq!(
                obv.update(candle(i, Decimal::from(10 + (i % 3)))),
                fresh.update(candle(i, Decimal::from(10 + (i % 3))))
            );
        }
    }
}
