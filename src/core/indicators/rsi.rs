use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::Indicator;

/// Wilder-smoothed relative strength index. Needs a previous price to compute a
/// delta, so it becomes ready one sample later than its averaging period: `n+1`
/// total samples.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    prev_price: Option<Decimal>,
    delta_count: usize,
    gain_sum: Decimal,
    loss_sum: Decimal,
    avg_gain: Option<Decimal>,
    avg_loss: Option<Decimal>,
    value: Option<Decimal>,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "RSI period must be positive");
        Self {
            period,
            prev_price: None,
            delta_count: 0,
            gain_sum: Decimal::ZERO,
            loss_sum: Decimal::ZERO,
            avg_gain: None,
            avg_loss: None,
            value: None,
        }
    }

    fn compute_value(&self) -> Decimal {
        let (gain, loss) = (self.avg_gain.unwrap(), self.avg_loss.unwrap());
        if loss.is_zero() {
            return dec!(100);
        }
        let rs = gain / loss;
        dec!(100) - dec!(100) / (Decimal::ONE + rs)
    }

    pub fn is_oversold(&self, threshold: Decimal) -> bool {
        self.value.is_some_and(|v| v <= threshold)
    }

    pub fn is_overbought(&self, threshold: Decimal) -> bool {
        self.value.is_some_and(|v| v >= threshold)
    }
}

impl Indicator for Rsi {
    type Input = Decimal;

    fn update(&mut self, price: Decimal) -> Option<Decimal> {
        let prev = match self.prev_price {
            None => {
                self.prev_price = Some(price);
                return None;
            }
            Some(p) => p,
        };
        self.prev_price = Some(price);

        let delta = price - prev;
        let gain = if delta > Decimal::ZERO { delta } else { Decimal::ZERO };
        let loss = if delta < Decimal::ZERO { -delta } else { Decimal::ZERO };

        self.delta_count += 1;
        let n = Decimal::from(self.period as u64);

        if self.delta_count < self.period {
            self.gain_sum += gain;
            self.loss_sum += loss;
            return None;
        }
        if self.delta_count == self.period {
            self.gain_sum += gain;
            self.loss_sum += loss;
            self.avg_gain = Some(self.gain_sum / n);
            self.avg_loss = Some(self.loss_sum / n);
            self.value = Some(self.compute_value());
            return self.value;
        }

        let prev_gain = self.avg_gain.unwrap();
        let prev_loss = self.avg_loss.unwrap();
        self.avg_gain = Some((prev_gain * (n - Decimal::ONE) + gain) / n);
        self.avg_loss = Some((prev_loss * (n - Decimal::ONE) + loss) / n);
        self.value = Some(self.compute_value());
        self.value
    }

    fn value(&self) -> Option<Decimal> {
        self.value
    }

    fn reset(&mut self) {
        self.prev_price = None;
        self.delta_count = 0;
        self.gain_sum = Decimal::ZERO;
        self.loss_sum = Decimal::ZERO;
        self.avg_gain = None;
        self.avg_loss = None;
        self.value = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_only_after_n_plus_one_samples() {
        let mut rsi = Rsi::new(3);
        // 1 seed price + 3 deltas = 4 updates needed
        assert_eq!(rsi.update(dec!(10)), None);
        assert_eq!(rsi.update(dec!(11)), None);
        assert_eq!(rsi.update(dec!(12)), None);
        assert!(rsi.update(dec!(13)).is_some());
    }

    #[test]
    fn all_gains_saturates_at_100() {
        let mut rsi = Rsi::new(2);
        rsi.update(dec!(10));
        rsi.update(dec!(11));
        let v = rsi.update(dec!(12)).unwrap();
        assert_eq!(v, dec!(100));
    }

    #[test]
    fn reset_matches_fresh_instance() {
        let mut rsi = Rsi::new(4);
        let mut fresh = Rsi::new(4);
        let series = [dec!(10), dec!(12), dec!(11), dec!(13), dec!(9), dec!(14)];
        for p in series {
            rsi.update(p);
        }
        rsi.reset();
        for p in series {
            assert_eq!(rsi.update(p), fresh.update(p));
        }
    }
}
