use rust_decimal::Decimal;

use super::Indicator;

/// Exponential moving average. The first `period` samples are averaged (an SMA
/// seed) to produce the value at sample `period`; every sample after that applies
/// the exponential recurrence with `alpha = 2 / (period + 1)`.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    alpha: Decimal,
    count: usize,
    seed_sum: Decimal,
    value: Option<Decimal>,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "EMA period must be positive");
        let alpha = Decimal::TWO / Decimal::from((period + 1) as u64);
        Self {
            period,
            alpha,
            count: 0,
            seed_sum: Decimal::ZERO,
            value: None,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Ema {
    type Input = Decimal;

    fn update(&mut self, input: Decimal) -> Option<Decimal> {
        self.count += 1;
        if self.count < self.period {
            self.seed_sum += input;
            return None;
        }
        if self.count == self.period {
            self.seed_sum += input;
            self.value = Some(self.seed_sum / Decimal::from(self.period as u64));
            return self.value;
        }
        if let Some(prev) = self.value {
            self.value = Some(self.alpha * input + (Decimal::ONE - self.alpha) * prev);
        }
        self.value
    }

    fn value(&self) -> Option<Decimal> {
        self.value
    }

    fn reset(&mut self) {
        self.count = 0;
        self.seed_sum = Decimal::ZERO;
        self.value = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn seeds_with_sma_of_first_n_samples() {
        // classic EMA(3) seed-then-recur worked example
        let prices = [dec!(22.27), dec!(22.19), dec!(22.08), dec!(22.17), dec!(22.18)];
        let mut ema = Ema::new(3);
        let outputs: Vec<Option<Decimal>> = prices.iter().map(|p| ema.update(*p)).collect();

        assert_eq!(outputs[0], None);
        assert_eq!(outputs[1], None);
        assert_eq!(outputs[2], Some(dec!(22.18))); // SMA(22.27, 22.19, 22.08)
        assert_eq!(outputs[3].unwrap().round_dp(4), dec!(22.175));
        assert_eq!(outputs[4].unwrap().round_dp(4), dec!(22.1775));
    }

    #[test]
    fn reset_matches_fresh_instance() {
        let mut ema = Ema::new(5);
        let mut fresh = Ema::new(5);
        for p in [dec!(1), dec!(2), dec!(3), dec!(4), dec!(5), dec!(6)] {
            ema.update(p);
        }
        ema.reset();
        for p in [dec!(1), dec!(2), dec!(3), dec!(4), dec!(5), dec!(6)] {
            assert_eq!(ema.update(p), fresh.update(p));
        }
    }

    #[test]
    fn not_ready_before_warmup() {
        let mut ema = Ema::new(4);
        ema.update(dec!(1));
        ema.update(dec!(2));
        assert!(!ema.is_ready());
    }
}
