//! Strategy state machines over position lifecycle.
//!
//! Strategies are composed, not inherited: [`StrategyCore`] exposes the hooks a
//! concrete strategy implements, and the free function [`run`] is the shared
//! template that sequences them identically for every strategy. A strategy is a
//! value implementing both [`StrategyCore`] and [`Strategy`]; the ensemble holds
//! a heterogeneous weighted list of `Box<dyn Strategy>`.

pub mod adx_trend;
pub mod ma_crossover;
pub mod rsi_mean_reversion;

pub use adx_trend::AdxTrendStrategy;
pub use ma_crossover::MaCrossoverStrategy;
pub use rsi_mean_reversion::RsiMeanReversionStrategy;

use rust_decimal::Decimal;

use crate::core::position_manager::PositionManager;
use crate::core::types::{Candle, StrategyState, TradeSignal};

/// The hooks a concrete strategy implements; [`run`] sequences them into the
/// common analyze template described for every strategy in this module.
pub trait StrategyCore {
    fn update_indicators(&mut self, candle: &Candle);
    fn indicators_ready(&self) -> bool;
    fn check_entry(&mut self, candle: &Candle, symbol: &str) -> Option<TradeSignal>;
    fn check_exit(&mut self, candle: &Candle, symbol: &str) -> Option<TradeSignal>;
    fn position_manager(&self) -> &PositionManager;
    fn position_manager_mut(&mut self) -> &mut PositionManager;

    fn on_not_ready(&mut self) {}
    fn after_signal(&mut self, _signal: &TradeSignal) {}
    fn after_no_signal(&mut self) {}
}

/// The shared per-candle template every strategy runs through:
/// update indicators, bail out during warmup, check exit before entry, and
/// never emit an entry while a position is open.
pub fn run<S: StrategyCore>(core: &mut S, candle: &Candle, symbol: &str) -> Option<TradeSignal> {
    core.update_indicators(candle);
    if !core.indicators_ready() {
        core.on_not_ready();
        return None;
    }

    let has_position = core.position_manager().has_position();
    let outcome = if has_position {
        core.check_exit(candle, symbol)
    } else {
        core.check_entry(candle, symbol)
    };

    match outcome {
        Some(signal) => {
            core.after_signal(&signal);
            Some(signal)
        }
        None => {
            core.after_no_signal();
            None
        }
    }
}

/// The dyn-compatible surface the ensemble and backtest engine consume. Every
/// concrete strategy implements this by delegating to [`run`].
pub trait Strategy {
    fn analyze(&mut self, candle: &Candle, symbol: &str) -> Option<TradeSignal>;
    fn current_stop_loss(&self) -> Option<Decimal>;
    /// The strategy's own ATR reading, if it tracks one. Feeds the risk
    /// manager's stop-distance floor so a too-tight stop never undersizes risk.
    fn current_atr(&self) -> Option<Decimal>;
    fn state(&self) -> StrategyState;
    fn reset(&mut self);
}
