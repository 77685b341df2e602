use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::core::indicators::{Atr, Ema, Indicator, Rsi, VolumeIndicator};
use crate::core::position_manager::PositionManager;
use crate::core::types::{Candle, Direction, SignalKind, StrategyState, TradeSignal};

use super::{Strategy, StrategyCore};

#[derive(Debug, Clone)]
pub struct RsiMeanReversionConfig {
    pub rsi_period: usize,
    pub oversold_level: Decimal,
    pub overbought_level: Decimal,
    pub neutral_lower: Decimal,
    pub neutral_upper: Decimal,
    pub exit_on_neutral: bool,
    pub require_trend_filter: bool,
    pub trend_ema_period: usize,
    pub require_volume_confirmation: bool,
    pub volume_period: usize,
    pub volume_threshold: Decimal,
    pub atr_period: usize,
    pub atr_stop_multiplier: Decimal,
    pub take_profit_multiplier: Decimal,
}

impl Default for RsiMeanReversionConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            oversold_level: dec!(30),
            overbought_level: dec!(70),
            neutral_lower: dec!(45),
            neutral_upper: dec!(55),
            exit_on_neutral: false,
            require_trend_filter: false,
            trend_ema_period: 50,
            require_volume_confirmation: false,
            volume_period: 20,
            volume_threshold: dec!(1.2),
            atr_period: 14,
            atr_stop_multiplier: dec!(2.0),
            take_profit_multiplier: dec!(1.5),
        }
    }
}

/// Mean-reversion entry on an RSI oversold/overbought recovery crossing.
pub struct RsiMeanReversionStrategy {
    config: RsiMeanReversionConfig,
    rsi: Rsi,
    trend_ema: Ema,
    atr: Atr,
    volume: VolumeIndicator,
    position: PositionManager,
    prev_rsi: Option<Decimal>,
}

impl RsiMeanReversionStrategy {
    pub fn new(config: RsiMeanReversionConfig) -> Self {
        Self {
            rsi: Rsi::new(config.rsi_period),
            trend_ema: Ema::new(config.trend_ema_period),
            atr: Atr::new(config.atr_period),
            volume: VolumeIndicator::new(config.volume_period),
            position: PositionManager::new(),
            prev_rsi: None,
            config,
        }
    }

    fn volume_confirms(&self) -> bool {
        !self.config.require_volume_confirmation || self.volume.is_spike(self.config.volume_threshold)
    }

    fn trend_allows_long(&self, close: Decimal) -> bool {
        if !self.config.require_trend_filter {
            return true;
        }
        self.trend_ema.value().is_some_and(|ema| close >= ema)
    }

    fn trend_allows_short(&self, close: Decimal) -> bool {
        if !self.config.require_trend_filter {
            return true;
        }
        self.trend_ema.value().is_some_and(|ema| close <= ema)
    }

    fn in_neutral_band(&self, rsi: Decimal) -> bool {
        rsi >= self.config.neutral_lower && rsi <= self.config.neutral_upper
    }
}

impl StrategyCore for RsiMeanReversionStrategy {
    fn update_indicators(&mut self, candle: &Candle) {
        self.rsi.update(candle.close);
        self.trend_ema.update(candle.close);
        self.atr.update(*candle);
        self.volume.update(candle.volume);
    }

    fn indicators_ready(&self) -> bool {
        self.rsi.is_ready() && self.atr.is_ready() && (!self.config.require_trend_filter || self.trend_ema.is_ready())
    }

    fn check_entry(&mut self, candle: &Candle, symbol: &str) -> Option<TradeSignal> {
        let rsi = self.rsi.value()?;
        let atr = self.atr.value()?;
        let close = candle.close;
        let prev_rsi = self.prev_rsi;
        self.prev_rsi = Some(rsi);

        let Some(prev) = prev_rsi else { return None };

        let oversold_recovery = prev <= self.config.oversold_level && rsi > self.config.oversold_level;
        let overbought_reversal = prev >= self.config.overbought_level && rsi < self.config.overbought_level;

        if oversold_recovery && self.volume_confirms() && self.trend_allows_long(close) {
            let stop = close - atr * self.config.atr_stop_multiplier;
            let take_profit = close + atr * self.config.atr_stop_multiplier * self.config.take_profit_multiplier;
            self.position.enter_long(close, stop);
            return Some(
                TradeSignal::new(symbol, SignalKind::Buy, close, "RSI oversold recovery")
                    .ok()?
                    .with_stop(stop)
                    .with_take_profit(take_profit),
            );
        }

        if overbought_reversal && self.volume_confirms() && self.trend_allows_short(close) {
            let stop = close + atr * self.config.atr_stop_multiplier;
            let take_profit = close - atr * self.config.atr_stop_multiplier * self.config.take_profit_multiplier;
            self.position.enter_short(close, stop);
            return Some(
                TradeSignal::new(symbol, SignalKind::Sell, close, "RSI overbought reversal")
                    .ok()?
                    .with_stop(stop)
                    .with_take_profit(take_profit),
            );
        }

        None
    }

    fn check_exit(&mut self, candle: &Candle, symbol: &str) -> Option<TradeSignal> {
        let rsi = self.rsi.value()?;
        self.prev_rsi = Some(rsi);
        let direction = self.position.direction?;
        self.position.increment_bars();
        let stop = self.position.stop_loss?;

        match direction {
            Direction::Long => {
                if candle.low <= stop {
                    return TradeSignal::new(symbol, SignalKind::Exit, stop, "stop hit").ok();
                }
                if rsi >= self.config.overbought_level {
                    return TradeSignal::new(symbol, SignalKind::Exit, candle.close, "mean reversion complete")
                        .ok();
                }
            }
            Direction::Short => {
                if candle.high >= stop {
                    return TradeSignal::new(symbol, SignalKind::Exit, stop, "stop hit").ok();
                }
                if rsi <= self.config.oversold_level {
                    return TradeSignal::new(symbol, SignalKind::Exit, candle.close, "mean reversion complete")
                        .ok();
                }
            }
        }

        if self.config.exit_on_neutral && self.in_neutral_band(rsi) {
            return TradeSignal::new(symbol, SignalKind::Exit, candle.close, "RSI returned to neutral").ok();
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

impl Strategy for RsiMeanReversionStrategy {
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
        let rsi = self.rsi.value();
        let mut custom = std::collections::HashMap::new();
        if let Some(rsi) = rsi {
            custom.insert("rsi".to_string(), rsi);
        }
        StrategyState {
            last_signal: None,
            primary_indicator_value: rsi,
            is_overbought: self.rsi.is_overbought(self.config.overbought_level),
            is_oversold: self.rsi.is_oversold(self.config.oversold_level),
            is_trending: false,
            custom,
        }
    }

    fn reset(&mut self) {
        self.rsi.reset();
        self.trend_ema.reset();
        self.atr.reset();
        self.volume.reset();
        self.position.reset();
        self.prev_rsi = None;
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
        let mut strat = RsiMeanReversionStrategy::new(RsiMeanReversionConfig::default());
        let prices: Vec<Decimal> = (0..60)
            .map(|i| dec!(100) + Decimal::from(i % 7) - dec!(3))
            .collect();
        for (i, p) in prices.iter().enumerate() {
            if let Some(sig) = strat.analyze(&candle(i as i64, *p), "BTCUSDT") {
                if strat.position.has_position() {
                    assert!(matches!(sig.kind, SignalKind::Exit | SignalKind::PartialExit));
                }
            }
        }
    }

    #[test]
    fn reset_restores_pristine_state() {
        let mut strat = RsiMeanReversionStrategy::new(RsiMeanReversionConfig::default());
        for i in 0..30 {
            strat.analyze(&candle(i, dec!(100) + Decimal::from(i % 5)), "BTCUSDT");
        }
        strat.reset();
        assert!(!strat.position.has_position());
        assert!(!strat.rsi.is_ready());
    }
}
