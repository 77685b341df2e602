use std::collections::VecDeque;

use rust_decimal::Decimal;

use super::Indicator;

/// Simple moving average over a ring buffer of the last `period` samples.
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    window: VecDeque<Decimal>,
    sum: Decimal,
    value: Option<Decimal>,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "SMA period must be positive");
        Self {
            period,
            window: VecDeque::with_capacity(period),
            sum: Decimal::ZERO,
            value: None,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Sma {
    type Input = Decimal;

    fn update(&mut self, input: Decimal) -> Option<Decimal> {
        self.window.push_back(input);
        self.sum += input;
        if self.window.len() > self.period {
            if let Some(oldest) = self.window.pop_front() {
                self.sum -= oldest;
            }
        }
        if self.window.len() == self.period {
            self.value = Some(self.sum / Decimal::from(self.period as u64));
        }
        self.value
    }

    fn value(&self) -> Option<Decimal> {
        self.value
    }

    fn reset(&mut self) {
        self.window.clear();
        self.sum = Decimal::ZERO;
        self.value = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn warms_up_after_exactly_n_samples() {
        let mut sma = Sma::new(3);
        assert_eq!(sma.update(dec!(10)), None);
        assert_eq!(sma.update(dec!(20)), None);
        assert_eq!(sma.update(dec!(30)), Some(dec!(20)));
    }

    #[test]
    fn rolls_the_window() {
        let mut sma = Sma::new(3);
        for v in [dec!(10), dec!(20), dec!(30), dec!(25), dec!(15)] {
            sma.update(v);
        }
        // window is now [30, 25, 15] -> 70/3 = 23.33...
        assert_eq!(sma.value().unwrap().round_dp(2), dec!(23.33));
    }

    #[test]
    fn reset_matches_fresh_instance() {
        let mut sma = Sma::new(3);
        for v in [dec!(10), dec!(20), dec!(30), dec!(25)] {
            sma.update(v);
        }
        sma.reset();
        let mut fresh = Sma::new(3);
        for v in [dec!(10), dec!(20), dec!(30), dec!(25)] {
            assert_eq!(sma.update(v), fresh.update(v));
        }
    }
}
