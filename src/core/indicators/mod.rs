//! Streaming, incremental technical indicators.
//!
//! Every indicator consumes one sample at a time and never stores its full input
//! history unless the recurrence genuinely requires it (ADX's internal DI/TR
//! smoothing is the only indicator here that keeps more than a handful of scalars).
//! A value is `None` until warmup completes, then `Some` forever after.

mod adx;
mod atr;
mod ema;
mod macd;
mod obv;
mod rsi;
mod sma;
mod volume;

pub use adx::Adx;
pub use atr::Atr;
pub use ema::Ema;
pub use macd::{Macd, MacdOutput};
pub use obv::Obv;
pub use rsi::Rsi;
pub use sma::Sma;
pub use volume::VolumeIndicator;

use rust_decimal::Decimal;

/// Common contract for all indicators. `update` advances the indicator by one
/// sample and returns the new value if warmed up; `reset` restores the pristine
/// pre-first-sample state.
pub trait Indicator {
    type Input;

    fn update(&mut self, input: Self::Input) -> Option<Decimal>;

    fn value(&self) -> Option<Decimal>;

    fn is_ready(&self) -> bool {
        self.value().is_some()
    }

    fn reset(&mut self);
}
