use std::collections::VecDeque;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::core::types::Candle;

use super::Indicator;

/// Wilder average directional index, plus its directional indicators `+DI`/`-DI`.
///
/// `+DM`/`-DM`/`TR` are accumulated as Wilder running totals (not averages — the
/// ratio `+DM/TR` that defines `+DI` is scale-invariant, so carrying the sum saves
/// a division on every update). The smoothed DI becomes available after `period+1`
/// candles, mirroring [`super::Rsi`]/[`super::Atr`]'s seeding rule. The candle where
/// the DI seed completes is excluded from the ADX seed average (its DX reading is
/// one Wilder-smoothing step less mature than every subsequent one), which is what
/// pushes full readiness to `2*period + 1` candles rather than `2*period`.
#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
    prev_high: Option<Decimal>,
    prev_low: Option<Decimal>,
    prev_close: Option<Decimal>,
    dm_seed_count: usize,
    dm_plus_sum: Decimal,
    dm_minus_sum: Decimal,
    tr_sum: Decimal,
    smoothed_dm_plus: Option<Decimal>,
    smoothed_dm_minus: Option<Decimal>,
    smoothed_tr: Option<Decimal>,
    dx_seed_count: usize,
    dx_seed_sum: Decimal,
    adx: Option<Decimal>,
    plus_di: Option<Decimal>,
    minus_di: Option<Decimal>,
    recent_adx: VecDeque<Decimal>,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "ADX period must be positive");
        Self {
            period,
            prev_high: None,
            prev_low: None,
            prev_close: None,
            dm_seed_count: 0,
            dm_plus_sum: Decimal::ZERO,
            dm_minus_sum: Decimal::ZERO,
            tr_sum: Decimal::ZERO,
            smoothed_dm_plus: None,
            smoothed_dm_minus: None,
            smoothed_tr: None,
            dx_seed_count: 0,
            dx_seed_sum: Decimal::ZERO,
            adx: None,
            plus_di: None,
            minus_di: None,
            recent_adx: VecDeque::new(),
        }
    }

    pub fn plus_di(&self) -> Option<Decimal> {
        self.plus_di
    }

    pub fn minus_di(&self) -> Option<Decimal> {
        self.minus_di
    }

    /// True once ready and the current ADX exceeds the average of the last
    /// `lookback` ADX values (excluding the current one).
    pub fn is_rising(&self, lookback: usize) -> bool {
        let Some(current) = self.adx else { return false };
        if self.recent_adx.len() < lookback || lookback == 0 {
            return false;
        }
        let sum: Decimal = self.recent_adx.iter().rev().take(lookback).sum();
        let avg = sum / Decimal::from(lookback as u64);
        current > avg
    }
}

impl Indicator for Adx {
    type Input = Candle;

    fn update(&mut self, candle: Candle) -> Option<Decimal> {
        let (high, low, close) = (candle.high, candle.low, candle.close);

        let (prev_high, prev_low) = match (self.prev_high, self.prev_low) {
            (Some(h), Some(l)) => (h, l),
            _ => {
                self.prev_high = Some(high);
                self.prev_low = Some(low);
                self.prev_close = Some(close);
                return None;
            }
        };

        let up_move = high - prev_high;
        let down_move = prev_low - low;
        let dm_plus = if up_move > down_move && up_move > Decimal::ZERO {
            up_move
        } else {
            Decimal::ZERO
        };
        let dm_minus = if down_move > up_move && down_move > Decimal::ZERO {
            down_move
        } else {
            Decimal::ZERO
        };
        let tr = candle.true_range(self.prev_close);

        self.prev_high = Some(high);
        self.prev_low = Some(low);
        self.prev_close = Some(close);

        let n = Decimal::from(self.period as u64);
        let just_seeded_di;

        if self.smoothed_tr.is_none() {
            self.dm_seed_count += 1;
            self.dm_plus_sum += dm_plus;
            self.dm_minus_sum += dm_minus;
            self.tr_sum += tr;
            if self.dm_seed_count == self.period {
                self.smoothed_dm_plus = Some(self.dm_plus_sum);
                self.smoothed_dm_minus = Some(self.dm_minus_sum);
                self.smoothed_tr = Some(self.tr_sum);
                just_seeded_di = true;
            } else {
                return None;
            }
        } else {
            just_seeded_di = false;
            let s_plus = self.smoothed_dm_plus.unwrap();
            let s_minus = self.smoothed_dm_minus.unwrap();
            let s_tr = self.smoothed_tr.unwrap();
            self.smoothed_dm_plus = Some(s_plus - s_plus / n + dm_plus);
            self.smoothed_dm_minus = Some(s_minus - s_minus / n + dm_minus);
            self.smoothed_tr = Some(s_tr - s_tr / n + tr);
        }

        let s_tr = self.smoothed_tr.unwrap();
        let plus_di = if s_tr.is_zero() {
            Decimal::ZERO
        } else {
            dec!(100) * self.smoothed_dm_plus.unwrap() / s_tr
        };
        let minus_di = if s_tr.is_zero() {
            Decimal::ZERO
        } else {
            dec!(100) * self.smoothed_dm_minus.unwrap() / s_tr
        };
        self.plus_di = Some(plus_di);
        self.minus_di = Some(minus_di);

        let di_sum = plus_di + minus_di;
        let dx = if di_sum.is_zero() {
            Decimal::ZERO
        } else {
            dec!(100) * (plus_di - minus_di).abs() / di_sum
        };

        let new_adx = if self.adx.is_none() {
            if just_seeded_di {
                return None;
            }
            self.dx_seed_count += 1;
            self.dx_seed_sum += dx;
            if self.dx_seed_count == self.period {
                self.dx_seed_sum / n
            } else {
                return None;
            }
        } else {
            let prev_adx = self.adx.unwrap();
            (prev_adx * (n - Decimal::ONE) + dx) / n
        };

        // Record the pre-update value in history before overwriting it, so
        // `is_rising` compares the new reading against strictly preceding ones.
        if let Some(prev) = self.adx {
            self.recent_adx.push_back(prev);
            if self.recent_adx.len() > 64 {
                self.recent_adx.pop_front();
            }
        }
        self.adx = Some(new_adx);

        self.adx
    }

    fn value(&self) -> Option<Decimal> {
        self.adx
    }

    fn reset(&mut self) {
        *self = Adx::new(self.period);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn candle(i: i64, h: Decimal, l: Decimal, c: Decimal) -> Candle {
        let t0 = Utc.timestamp_opt(i * 3600, 0).unwrap();
        let t1 = Utc.timestamp_opt((i + 1) * 3600, 0).unwrap();
        Candle::new(t0, c, h, l, c, dec!(1), t1).unwrap()
    }

    fn monotone_uptrend(n: usize) -> Vec<Candle> {
        (0..n as i64)
            .map(|i| {
                let base = Decimal::from(100 + i * 2);
                candle(i, base + dec!(2), base - dec!(1), base + dec!(1))
            })
            .collect()
    }

    #[test]
    fn ready_after_2n_plus_1_candles() {
        let period = 3;
        let mut adx = Adx::new(period);
        let candles = monotone_uptrend(2 * period + 1 + 2);
        let mut ready_at = None;
        for (i, c) in candles.iter().enumerate() {
            if adx.update(*c).is_some() && ready_at.is_none() {
                ready_at = Some(i + 1);
            }
        }
        assert_eq!(ready_at, Some(2 * period + 1));
    }

    #[test]
    fn uptrend_has_plus_di_above_minus_di() {
        let mut adx = Adx::new(3);
        for c in monotone_uptrend(15) {
            adx.update(c);
        }
        assert!(adx.is_ready());
        assert!(adx.plus_di().unwrap() > adx.minus_di().unwrap());
    }

    #[test]
    fn reset_matches_fresh_instance() {
        let mut adx = Adx::new(3);
        let mut fresh = Adx::new(3);
        let candles = monotone_uptrend(12);
        for c in &candles {
            adx.update(*c);
        }
        adx.reset();
        for c in &candles {
            assert_eq!(adx.update(*c), fresh.update(*c));
        }
    }
}
