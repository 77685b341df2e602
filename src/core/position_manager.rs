//! Per-strategy position lifecycle state: entry price, ratchet stop, and the
//! running favorable/adverse excursion needed for partial-exit R-multiples.

use rust_decimal::Decimal;

use crate::core::types::Direction;

/// Holds the bookkeeping a strategy needs to manage a single open position.
/// A strategy owns exactly one of these; it never outlives the position.
#[derive(Debug, Clone, Default)]
pub struct PositionManager {
    pub direction: Option<Direction>,
    pub entry_price: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub initial_stop: Option<Decimal>,
    pub highest_since_entry: Option<Decimal>,
    pub lowest_since_entry: Option<Decimal>,
    pub bars_since_entry: u32,
    pub breakeven_moved: bool,
}

impl PositionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_position(&self) -> bool {
        self.entry_price.is_some()
    }

    pub fn enter_long(&mut self, price: Decimal, stop: Decimal) {
        self.direction = Some(Direction::Long);
        self.entry_price = Some(price);
        self.stop_loss = Some(stop);
        self.initial_stop = Some(stop);
        self.highest_since_entry = Some(price);
        self.lowest_since_entry = Some(price);
        self.bars_since_entry = 0;
        self.breakeven_moved = false;
    }

    pub fn enter_short(&mut self, price: Decimal, stop: Decimal) {
        self.direction = Some(Direction::Short);
        self.entry_price = Some(price);
        self.stop_loss = Some(stop);
        self.initial_stop = Some(stop);
        self.highest_since_entry = Some(price);
        self.lowest_since_entry = Some(price);
        self.bars_since_entry = 0;
        self.breakeven_moved = false;
    }

    /// Ratchet the long stop up and track the highest price seen since entry.
    /// The stop never moves down.
    pub fn update_long_stop(&mut self, new_stop: Decimal, latest_high: Option<Decimal>) {
        if let Some(high) = latest_high {
            self.highest_since_entry = Some(
                self.highest_since_entry
                    .map_or(high, |h| h.max(high)),
            );
        }
        self.stop_loss = Some(self.stop_loss.map_or(new_stop, |s| s.max(new_stop)));
    }

    /// Ratchet the short stop down and track the lowest price seen since entry.
    /// The stop never moves up.
    pub fn update_short_stop(&mut self, new_stop: Decimal, latest_low: Option<Decimal>) {
        if let Some(low) = latest_low {
            self.lowest_since_entry = Some(self.lowest_since_entry.map_or(low, |l| l.min(low)));
        }
        self.stop_loss = Some(self.stop_loss.map_or(new_stop, |s| s.min(new_stop)));
    }

    pub fn move_to_breakeven(&mut self) {
        if let Some(entry) = self.entry_price {
            self.stop_loss = Some(entry);
            self.breakeven_moved = true;
        }
    }

    pub fn increment_bars(&mut self) {
        self.bars_since_entry += 1;
    }

    /// The favorable excursion since entry, in price terms, given the direction.
    pub fn favorable_excursion(&self) -> Option<Decimal> {
        match self.direction? {
            Direction::Long => Some(self.highest_since_entry? - self.entry_price?),
            Direction::Short => Some(self.entry_price? - self.lowest_since_entry?),
        }
    }

    /// Achieved R-multiple: favorable excursion divided by the initial risk distance.
    pub fn achieved_r_multiple(&self) -> Option<Decimal> {
        let excursion = self.favorable_excursion()?;
        let initial_risk = (self.entry_price? - self.initial_stop?).abs();
        if initial_risk.is_zero() {
            return None;
        }
        Some(excursion / initial_risk)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn long_stop_never_decreases() {
        let mut pm = PositionManager::new();
        pm.enter_long(dec!(100), dec!(95));
        pm.update_long_stop(dec!(98), Some(dec!(105)));
        assert_eq!(pm.stop_loss, Some(dec!(98)));
        pm.update_long_stop(dec!(96), Some(dec!(104)));
        assert_eq!(pm.stop_loss, Some(dec!(98)), "stop must not decrease");
        assert_eq!(pm.highest_since_entry, Some(dec!(105)));
    }

    #[test]
    fn short_stop_never_increases() {
        let mut pm = PositionManager::new();
        pm.enter_short(dec!(100), dec!(105));
        pm.update_short_stop(dec!(102), Some(dec!(95)));
        assert_eq!(pm.stop_loss, Some(dec!(102)));
        pm.update_short_stop(dec!(103), Some(dec!(96)));
        assert_eq!(pm.stop_loss, Some(dec!(102)), "stop must not increase");
        assert_eq!(pm.lowest_since_entry, Some(dec!(95)));
    }

    #[test]
    fn move_to_breakeven_sets_stop_to_entry() {
        let mut pm = PositionManager::new();
        pm.enter_long(dec!(100), dec!(95));
        pm.move_to_breakeven();
        assert_eq!(pm.stop_loss, Some(dec!(100)));
        assert!(pm.breakeven_moved);
    }

    #[test]
    fn achieved_r_multiple_tracks_favorable_excursion() {
        let mut pm = PositionManager::new();
        pm.enter_long(dec!(100), dec!(95)); // initial risk = 5
        pm.update_long_stop(dec!(95), Some(dec!(110))); // MFE = 10
        assert_eq!(pm.achieved_r_multiple(), Some(dec!(2)));
    }

    #[test]
    fn reset_clears_all_fields() {
        let mut pm = PositionManager::new();
        pm.enter_long(dec!(100), dec!(95));
        pm.increment_bars();
        pm.reset();
        assert!(!pm.has_position());
        assert_eq!(pm.bars_since_entry, 0);
    }
}
