use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::core::indicators::{Adx, Ema, Indicator, Obv, VolumeIndicator};
use crate::core::position_manager::PositionManager;
use crate::core::types::{Candle, Direction, SignalKind, StrategyState, TradeSignal};

use super::{Strategy, StrategyCore};

#[derive(Debug, Clone)]
pub struct AdxTrendConfig {
    pub adx_period: usize,
    pub adx_threshold: Decimal,
    pub adx_exit_threshold: Decimal,
    pub fast_ema_period: usize,
    pub slow_ema_period: usize,
    pub atr_period: usize,
    pub atr_stop_multiplier: Decimal,
    pub take_profit_multiplier: Decimal,
    pub require_volume_confirmation: bool,
    pub volume_period: usize,
    pub volume_threshold: Decimal,
    pub require_obv_confirmation: bool,
    pub obv_lookback: usize,
    pub min_atr_pct: Decimal,
    pub max_atr_pct: Decimal,
    pub require_fresh_trend: bool,
    pub require_adx_rising: bool,
    pub slope_lookback: usize,
    pub partial_exit_r_multiple: Decimal,
    pub partial_exit_fraction: Decimal,
    pub max_bars_in_trade: u32,
    pub adx_falling_exit_bars: u32,
}

impl Default for AdxTrendConfig {
    fn default() -> Self {
        Self {
            adx_period: 14,
            adx_threshold: dec!(25),
            adx_exit_threshold: dec!(20),
            fast_ema_period: 9,
            slow_ema_period: 21,
            atr_period: 14,
            atr_stop_multiplier: dec!(2.5),
            take_profit_multiplier: dec!(1.5),
            require_volume_confirmation: false,
            volume_period: 20,
            volume_threshold: dec!(1.2),
            require_obv_confirmation: false,
            obv_lookback: 20,
            min_atr_pct: dec!(0),
            max_atr_pct: dec!(100),
            require_fresh_trend: false,
            require_adx_rising: false,
            slope_lookback: 5,
            partial_exit_r_multiple: dec!(2),
            partial_exit_fraction: dec!(0.5),
            max_bars_in_trade: 0,
            adx_falling_exit_bars: 0,
        }
    }
}

/// Trend-following entry on an ADX/DI/EMA confluence, with a trailing-stop,
/// partial-exit-to-breakeven, time-stop and trend-weakening exit ladder.
pub struct AdxTrendStrategy {
    config: AdxTrendConfig,
    fast_ema: Ema,
    slow_ema: Ema,
    atr: crate::core::indicators::Atr,
    adx: Adx,
    obv: Obv,
    volume: VolumeIndicator,
    position: PositionManager,
    was_below_threshold: bool,
    adx_falling_streak: u32,
    prev_adx: Option<Decimal>,
}

impl AdxTrendStrategy {
    pub fn new(config: AdxTrendConfig) -> Self {
        Self {
            fast_ema: Ema::new(config.fast_ema_period),
            slow_ema: Ema::new(config.slow_ema_period),
            atr: crate::core::indicators::Atr::new(config.atr_period),
            adx: Adx::new(config.adx_period),
            obv: Obv::new(config.obv_lookback),
            volume: VolumeIndicator::new(config.volume_period),
            position: PositionManager::new(),
            was_below_threshold: true,
            adx_falling_streak: 0,
            prev_adx: None,
            config,
        }
    }

    fn volume_confirms(&self) -> bool {
        !self.config.require_volume_confirmation || self.volume.is_spike(self.config.volume_threshold)
    }

    fn obv_confirms(&self, bullish: bool) -> bool {
        if !self.config.require_obv_confirmation {
            return true;
        }
        if bullish {
            self.obv.is_bullish()
        } else {
            self.obv.is_bearish()
        }
    }

    fn atr_pct_in_range(&self, close: Decimal, atr: Decimal) -> bool {
        if close.is_zero() {
            return false;
        }
        let atr_pct = atr / close * dec!(100);
        atr_pct >= self.config.min_atr_pct && atr_pct <= self.config.max_atr_pct
    }

    fn fresh_trend(&self, adx: Decimal) -> bool {
        !self.config.require_fresh_trend || (self.was_below_threshold && adx >= self.config.adx_threshold)
    }

    fn adx_rising_ok(&self) -> bool {
        !self.config.require_adx_rising || self.adx.is_rising(self.config.slope_lookback)
    }
}

impl StrategyCore for AdxTrendStrategy {
    fn update_indicators(&mut self, candle: &Candle) {
        self.fast_ema.update(candle.close);
        self.slow_ema.update(candle.close);
        self.atr.update(*candle);
        self.adx.update(*candle);
        self.obv.update(*candle);
        self.volume.update(candle.volume);
    }

    fn indicators_ready(&self) -> bool {
        self.fast_ema.is_ready()
            && self.slow_ema.is_ready()
            && self.atr.is_ready()
            && self.adx.is_ready()
    }

    fn check_entry(&mut self, candle: &Candle, symbol: &str) -> Option<TradeSignal> {
        let adx = self.adx.value()?;
        let plus_di = self.adx.plus_di()?;
        let minus_di = self.adx.minus_di()?;
        let fast = self.fast_ema.value()?;
        let slow = self.slow_ema.value()?;
        let atr = self.atr.value()?;
        let close = candle.close;

        let atr_ok = self.atr_pct_in_range(close, atr);
        let fresh_ok = self.fresh_trend(adx);
        let rising_ok = self.adx_rising_ok();
        let adx_ok = adx >= self.config.adx_threshold;
        self.was_below_threshold = adx < self.config.adx_threshold;

        let bullish_trend = fast > slow && plus_di > minus_di;
        let bearish_trend = fast < slow && minus_di > plus_di;

        let signal = if adx_ok
            && bullish_trend
            && self.volume_confirms()
            && self.obv_confirms(true)
            && atr_ok
            && fresh_ok
            && rising_ok
        {
            let stop = close - atr * self.config.atr_stop_multiplier;
            let take_profit =
                close + atr * self.config.atr_stop_multiplier * self.config.take_profit_multiplier;
            self.position.enter_long(close, stop);
            Some(
                TradeSignal::new(symbol, SignalKind::Buy, close, "ADX trend entry (long)")
                    .ok()?
                    .with_stop(stop)
                    .with_take_profit(take_profit),
            )
        } else if adx_ok
            && bearish_trend
            && self.volume_confirms()
            && self.obv_confirms(false)
            && atr_ok
            && fresh_ok
            && rising_ok
        {
            let stop = close + atr * self.config.atr_stop_multiplier;
            let take_profit =
                close - atr * self.config.atr_stop_multiplier * self.config.take_profit_multiplier;
            self.position.enter_short(close, stop);
            Some(
                TradeSignal::new(symbol, SignalKind::Sell, close, "ADX trend entry (short)")
                    .ok()?
                    .with_stop(stop)
                    .with_take_profit(take_profit),
            )
        } else {
            None
        };

        signal
    }

    fn check_exit(&mut self, candle: &Candle, symbol: &str) -> Option<TradeSignal> {
        let atr = self.atr.value()?;
        let adx = self.adx.value()?;
        let direction = self.position.direction?;
        self.position.increment_bars();

        if let Some(prev) = self.prev_adx {
            if adx < prev {
                self.adx_falling_streak += 1;
            } else {
                self.adx_falling_streak = 0;
            }
        }
        self.prev_adx = Some(adx);

        match direction {
            Direction::Long => {
                let candidate = candle.high - atr * self.config.atr_stop_multiplier;
                self.position.update_long_stop(candidate, Some(candle.high));
                let stop = self.position.stop_loss?;
                if candle.low <= stop {
                    return self.emit_exit(symbol, stop, "trailing stop hit");
                }
            }
            Direction::Short => {
                let candidate = candle.low + atr * self.config.atr_stop_multiplier;
                self.position.update_short_stop(candidate, Some(candle.low));
                let stop = self.position.stop_loss?;
                if candle.high >= stop {
                    return self.emit_exit(symbol, stop, "trailing stop hit");
                }
            }
        }

        if !self.position.breakeven_moved {
            if let Some(r) = self.position.achieved_r_multiple() {
                if r >= self.config.partial_exit_r_multiple {
                    let signal = TradeSignal::new(symbol, SignalKind::PartialExit, candle.close, "partial exit at target R")
                        .ok()?
                        .with_partial_exit_fraction(self.config.partial_exit_fraction)
                        .ok()?
                        .with_breakeven();
                    return Some(signal);
                }
            }
        }

        if self.config.max_bars_in_trade > 0 && self.position.bars_since_entry >= self.config.max_bars_in_trade {
            return self.emit_exit(symbol, candle.close, "time stop");
        }

        if self.config.adx_falling_exit_bars > 0 && self.adx_falling_streak >= self.config.adx_falling_exit_bars {
            return self.emit_exit(symbol, candle.close, "ADX falling streak");
        }

        if adx < self.config.adx_exit_threshold {
            return self.emit_exit(symbol, candle.close, "trend weakening");
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
        match signal.kind {
            SignalKind::Exit => {
                self.position.reset();
                self.adx_falling_streak = 0;
            }
            SignalKind::PartialExit if signal.move_stop_to_breakeven => {
                self.position.move_to_breakeven();
            }
            _ => {}
        }
    }
}

impl AdxTrendStrategy {
    fn emit_exit(&self, symbol: &str, price: Decimal, reason: &str) -> Option<TradeSignal> {
        TradeSignal::new(symbol, SignalKind::Exit, price, reason).ok()
    }
}

impl Strategy for AdxTrendStrategy {
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
        if let Some(adx) = self.adx.value() {
            custom.insert("adx".to_string(), adx);
        }
        if let Some(plus_di) = self.adx.plus_di() {
            custom.insert("plus_di".to_string(), plus_di);
        }
        if let Some(minus_di) = self.adx.minus_di() {
            custom.insert("minus_di".to_string(), minus_di);
        }
        StrategyState {
            last_signal: None,
            primary_indicator_value: self.adx.value(),
            is_overbought: false,
            is_oversold: false,
            is_trending: self
                .adx
                .value()
                .is_some_and(|v| v >= self.config.adx_threshold),
            custom,
        }
    }

    fn reset(&mut self) {
        self.fast_ema.reset();
        self.slow_ema.reset();
        self.atr.reset();
        self.adx.reset();
        self.obv.reset();
        self.volume.reset();
        self.position.reset();
        self.was_below_threshold = true;
        self.adx_falling_streak = 0;
        self.prev_adx = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn candle(i: i64, h: Decimal, l: Decimal, c: Decimal, v: Decimal) -> Candle {
        let t0 = Utc.timestamp_opt(i * 3600, 0).unwrap();
        let t1 = Utc.timestamp_opt((i + 1) * 3600, 0).unwrap();
        Candle::new(t0, c, h, l, c, v, t1).unwrap()
    }

    fn uptrend_candles(n: usize) -> Vec<Candle> {
        (0..n as i64)
            .map(|i| {
                let base = Decimal::from(100 + i * 3);
                candle(i, base + dec!(3), base - dec!(1), base + dec!(2), dec!(1000))
            })
            .collect()
    }

    #[test]
    fn never_emits_entry_while_in_position() {
        let mut strat = AdxTrendStrategy::new(AdxTrendConfig::default());
        for c in uptrend_candles(60) {
            if let Some(sig) = strat.analyze(&c, "BTCUSDT") {
                if strat.position.has_position() {
                    assert!(matches!(
                        sig.kind,
                        SignalKind::Exit | SignalKind::PartialExit
                    ));
                }
            }
        }
    }

    #[test]
    fn reset_clears_position_and_indicators() {
        let mut strat = AdxTrendStrategy::new(AdxTrendConfig::default());
        for c in uptrend_candles(40) {
            strat.analyze(&c, "BTCUSDT");
        }
        strat.reset();
        assert!(!strat.position.has_position());
        assert!(!strat.adx.is_ready());
    }
}
