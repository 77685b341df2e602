use rust_decimal::Decimal;

use super::{Ema, Indicator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacdOutput {
    pub macd_line: Decimal,
    pub signal_line: Decimal,
    pub histogram: Decimal,
}

/// MACD = EMA(fast) - EMA(slow), with `signal` the EMA of that difference.
/// Defaults to the canonical 12/26/9 periods.
#[derive(Debug, Clone)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    signal: Ema,
    output: Option<MacdOutput>,
}

impl Macd {
    pub fn new(fast_period: usize, slow_period: usize, signal_period: usize) -> Self {
        Self {
            fast: Ema::new(fast_period),
            slow: Ema::new(slow_period),
            signal: Ema::new(signal_period),
            output: None,
        }
    }

    pub fn default_params() -> Self {
        Self::new(12, 26, 9)
    }

    pub fn output(&self) -> Option<MacdOutput> {
        self.output
    }
}

impl Indicator for Macd {
    type Input = Decimal;

    fn update(&mut self, price: Decimal) -> Option<Decimal> {
        let fast = self.fast.update(price);
        let slow = self.slow.update(price);
        self.output = None;

        let (fast, slow) = (fast?, slow?);
        let macd_line = fast - slow;
        let signal_line = self.signal.update(macd_line)?;
        let histogram = macd_line - signal_line;
        self.output = Some(MacdOutput {
            macd_line,
            signal_line,
            histogram,
        });
        Some(macd_line)
    }

    fn value(&self) -> Option<Decimal> {
        self.output.map(|o| o.macd_line)
    }

    fn is_ready(&self) -> bool {
        self.output.is_some()
    }

    fn reset(&mut self) {
        self.fast.reset();
        self.slow.reset();
        self.signal.reset();
        self.output = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn default_params_are_12_26_9() {
        let macd = Macd::default_params();
        assert_eq!(macd.fast.period(), 12);
        assert_eq!(macd.slow.period(), 26);
    }

    #[test]
    fn not_ready_until_signal_ema_warms_up() {
        let mut macd = Macd::new(2, 3, 2);
        // slow EMA(3) warms at sample 3, signal EMA(2) of macd_line warms one more sample later
        let prices = [dec!(10), dec!(11), dec!(12), dec!(13)];
        let mut ready_idx = None;
        for (i, p) in prices.iter().enumerate() {
            if macd.update(*p).is_some() && macd.is_ready() {
                ready_idx = Some(i);
                break;
            }
        }
        assert_eq!(ready_idx, Some(3));
    }

    #[test]
    fn reset_matches_fresh_instance() {
        let mut macd = Macd::new(2, 3, 2);
        let mut fresh = Macd::new(2, 3, 2);
        let prices = [dec!(10), dec!(11), dec!(12), dec!(13), dec!(12), dec!(14)];
        for p in prices {
            macd.update(p);
        }
        macd.reset();
        for p in prices {
            assert_eq!(macd.update(p), fresh.update(p));
            assert_eq!(macd.output(), fresh.output());
        }
    }
}
