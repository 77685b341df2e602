use rust_decimal::Decimal;

use super::{Indicator, Sma};

/// Rolling mean volume over `n` candles, exposing the current candle's ratio
/// to that mean and a spike flag at a configurable threshold.
#[derive(Debug, Clone)]
pub struct VolumeIndicator {
    avg: Sma,
    current: Option<Decimal>,
}

impl VolumeIndicator {
    pub fn new(period: usize) -> Self {
        Self {
            avg: Sma::new(period),
            current: None,
        }
    }

    pub fn ratio(&self) -> Option<Decimal> {
        let avg = self.avg.value()?;
        if avg.is_zero() {
            return None;
        }
        Some(self.current? / avg)
    }

    pub fn is_spike(&self, threshold: Decimal) -> bool {
        self.ratio().is_some_and(|r| r >= threshold)
    }
}

impl Indicator for VolumeIndicator {
    type Input = Decimal;

    fn update(&mut self, volume: Decimal) -> Option<Decimal> {
        self.current = Some(volume);
        self.avg.update(volume)
    }

    fn value(&self) -> Option<Decimal> {
        self.avg.value()
    }

    fn reset(&mut self) {
        self.avg.reset();
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn ready_after_n_samples_and_computes_ratio() {
        let mut vol = VolumeIndicator::new(3);
        assert_eq!(vol.update(dec!(100)), None);
        assert_eq!(vol.update(dec!(200)), None);
        let avg = vol.update(dec!(300)).unwrap();
        assert_eq!(avg, dec!(200));
        assert_eq!(vol.ratio(), Some(dec!(1.5)));
    }

    #[test]
    fn spike_detection_uses_threshold() {
        let mut vol = VolumeIndicator::new(2);
        vol.update(dec!(100));
        vol.update(dec!(100));
        assert!(!vol.is_spike(dec!(2)));
        vol.update(dec!(400));
        // avg now (100+400)/2 = 250, current 400, ratio 1.6
        assert!(!vol.is_spike(dec!(2)));
        vol.update(dec!(1000));
        // avg (400+1000)/2 = 700, ratio 1000/700 ~= 1.428
        assert!(vol.is_spike(dec!(1.4)));
    }

    #[test]
    fn reset_matches_fresh_instance() {
        let mut vol = VolumeIndicator::new(3);
        let mut fresh = VolumeIndicator::new(3);
        let series = [dec!(100), dec!(200), dec!(300), dec!(150)];
        for v in series {
            vol.update(v);
        }
        vol.reset();
        for v in series {
            assert_eq!(vol.update(v), fresh.update(v));
        }
    }
}
