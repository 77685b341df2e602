use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::core::indicators::{Atr, Ema, Indicator, VolumeIndicator};
use crate::core::position_manager::PositionManager;
use crate::core::types::{Candle, Direction, SignalKind, StrategyState, TradeSignal};

use super::{Strategy, StrategyCore};

#[derive(Debug, Clone)]
pub struct MaCrossoverConfig {
    pub fast_ema_period: usize,
    pub slow_ema_period: usize,
    pub atr_period: usize,
    pub atr_stop_multiplier: Decimal,
    pub take_profit_multiplier: Decimal,
    pub require_volume_confirmation: bool,
    pub volume_period: usize,
    pub volume_threshold: Decimal,
}

impl Default for MaCrossoverConfig {
    fn default() -> Self {
        Self {
            fast_ema_period: 9,
            slow_ema_period: 21,
            atr_period: 14,
            atr_stop_multiplier: dec!(2.0),
            take_profit_multiplier: dec!(1.5),
            require_volume_confirmation: false,
            volume_period: 20,
            volume_threshold: dec!(1.2),
        }
    }
}

/// Entry on a fast/slow EMA crossover, exit on a trailing ATR stop or the
/// opposite crossover.
pub struct MaCrossoverStrategy {
    config: MaCrossoverConfig,
    fast_ema: Ema,
    slow_ema: Ema,
    atr: Atr,
    volume: VolumeIndicator,
    position: PositionManager,
    prev_fast: Option<Decimal>,
    prev_slow: Option<Decimal>,
}

impl MaCrossoverStrategy {
    pub fn new(config: MaCrossoverConfig) -> Self {
        Self {
            fast_ema: Ema::new(config.fast_ema_period),
            slow_ema: Ema::new(config.slow_ema_period),
            atr: Atr::new(config.atr_period),
            volume: VolumeIndicator::new(config.volume_period),
            position: PositionManager::new(),
            prev_fast: None,
            prev_slow: None,
            config,
        }
    }

    fn volume_confirms(&self) -> bool {
        !self.config.require_volume_confirmation || self.volume.is_spike(self.config.volume_threshold)
    }
}

impl StrategyCore for MaCrossoverStrategy {
    fn update_indicators(&mut self, candle: &Candle) {
        self.fast_ema.update(candle.close);
        self.slow_ema.update(candle.close);
        self.atr.update(*candle);
        self.volume.update(candle.volume);
    }

    fn indicators_ready(&self) -> bool {
        self.fast_ema.is_ready() && self.slow_ema.is_ready() && self.atr.is_ready()
    }

    fn check_entry(&mut self, candle: &Candle, symbol: &str) -> Option<TradeSignal> {
        let fast = self.fast_ema.value()?;
        let slow = self.slow_ema.value()?;
        let atr = self.atr.value()?;
        let close = candle.close;

        let (prev_fast, prev_slow) = match (self.prev_fast, self.prev_slow) {
            (Some(f), Some(s)) => (f, s),
            _ => {
                self.prev_fast = Some(fast);
                self.prev_slow = Some(slow);
                return None;
            }
        };
        self.prev_fast = Some(fast);
        self.prev_slow = Some(slow);

        let bullish_cross = prev_fast <= prev_slow && fast > slow;
        let bearish_cross = prev_fast >= prev_slow && fast < slow;

        if bullish_cross && self.volume_confirms() {
            let stop = close - atr * self.config.atr_stop_multiplier;
            let take_profit = close + atr * self.config.atr_stop_multiplier * self.config.take_profit_multiplier;
            self.position.enter_long(close, stop);
            return Some(
                TradeSignal::new(symbol, SignalKind::Buy, close, "EMA bullish crossover")
                    .ok()?
                    .with_stop(stop)
                    .with_take_profit(take_profit),
            );
        }

        if bearish_cross && self.volume_confirms() {
            let stop = close + atr * self.config.atr_stop_multiplier;
            let take_profit = close - atr * self.config.atr_stop_multiplier * self.config.take_profit_multiplier;
            self.position.enter_short(close, stop);
            return Some(
                TradeSignal::new(symbol, SignalKind::Sell, close, "EMA bearish crossover")
                    .ok()?
                    .with_stop(stop)
                    .with_take_profit(take_profit),
            );
        }

        None
    }

    fn check_exit(&mut self, candle: &Candle, symbol: &str) -> Option<TradeSignal> {
        let fast = self.fast_ema.value()?;
        let slow = self.slow_ema.value()?;
        let atr = self.atr.value()?;
        let direction = self.position.direction?;
        self.position.increment_bars();

        let (prev_fast, prev_slow) = (self.prev_fast, self.prev_slow);
        self.prev_fast = Some(fast);
        self.prev_slow = Some(slow);

        match direction {
            Direction::Long => {
                let candidate = candle.close - atr * self.config.atr_stop_multiplier;
                self.position.update_long_stop(candidate, Some(candle.high));
                let stop = self.position.stop_loss?;
                if candle.low <= stop {
                    return TradeSignal::new(symbol, SignalKind::Exit, stop, "trailing stop hit").ok();
                }
                if let (Some(pf), Some(ps)) = (prev_fast, prev_slow) {
                    if pf >= ps && fast < slow {
                        return TradeSignal::new(symbol, SignalKind::Exit, candle.close, "opposite crossover")
                            .ok();
                    }
                }
            }
            Direction::Short => {
                let candidate = candle.close + atr * self.config.atr_stop_multiplier;
                self.position.update_short_stop(candidate, Some(candle.low));
                let stop = self.position.stop_loss?;
                if candle.high >= stop {
                    return TradeSignal::new(symbol, SignalKind::Exit, stop, "trailing stop hit").ok();
                }
                if let (Some(pf), Some(ps)) = (prev_fast, prev_slow) {
                    if pf <= ps && fast > slow {
                        return TradeSignal::new(symbol, SignalKind::Exit, candle.close, "opposite crossover")
                            .ok();
                    }
                }
            }
        }

        None
    }

    fn position_manager(&self) -> &PositionManager {
        &self.position
    }

    fn position_manager_mut(&mut self) -> &mut PositionManager {
        &mut self.position
    }

    fn after_signal(&mut self, signal: &TradeSignal) {
        if signal.kind == SignalKind::Exit {
            self.position.reset();
        }
    }
}

impl Strategy for MaCrossoverStrategy {
    fn analyze(&mut self, candle: &Candle, symbol: &str) -> Option<TradeSignal> {
        super::run(self, candle, symbol)
    }

    fn current_stop_loss(&self) -> Option<Decimal> {
        self.position.stop_loss
    }

    fn current_atr(&self) -> Option<Decimal> {
        self.atr.value()
    }

    fn state(&self) -> StrategyState {
        let mut custom = std::collections::HashMap::new();
        if let Some(fast) = self.fast_ema.value() {
            custom.insert("fast_ema".to_string(), fast);
        }
        if let Some(slow) = self.slow_ema.value() {
            custom.insert("slow_ema".to_string(), slow);
        }
        StrategyState {
            last_signal: None,
            primary_indicator_value: self.fast_ema.value(),
            is_overbought: false,
            is_oversold: false,
            is_trending: self
                .fast_ema
                .value()
                .zip(self.slow_ema.value())
                .is_some_and(|(f, s)| f != s),
            custom,
        }
    }

    fn reset(&mut self) {
        self.fast_ema.reset();
        self.slow_ema.reset();
        self.atr.reset();
        self.volume.reset();
        self.position.reset();
        self.prev_fast = None;
        self.prev_slow = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn candle(i: i64, c: Decimal) -> Candle {
        let t0 = Utc.timestamp_opt(i * 3600, 0).unwrap();
        let t1 = Utc.timestamp_opt((i + 1) * 3600, 0).unwrap();
        Candle::new(t0, c + dec!(1), c + dec!(2), c - dec!(2), c, dec!(100), t1).unwrap()
    }

    #[test]
    fn never_emits_entry_while_in_position() {
        let mut strat = MaCrossoverStrategy::new(MaCrossoverConfig::default());
        for i in 0..80 {
            let price = dec!(100) + Decimal::from(i) + Decimal::from((i % 5) as i64 - 2);
            if let Some(sig) = strat.analyze(&candle(i, price), "BTCUSDT") {
                if strat.position.has_position() {
                    assert!(matches!(sig.kind, SignalKind::Exit | SignalKind::PartialExit));
                }
            }
        }
    }

    #[test]
    fn reset_restores_pristine_state() {
        let mut strat = MaCrossoverStrategy::new(MaCrossoverConfig::default());
        for i in 0..40 {
            strat.analyze(&candle(i, dec!(100) + Decimal::from(i)), "BTCUSDT");
        }
        strat.reset();
        assert!(!strat.position.has_position());
        assert!(!strat.fast_ema.is_ready());
    }
}
