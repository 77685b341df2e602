//! Deterministic single-symbol backtest replay.

pub mod engine;
pub mod metrics;

pub use engine::{BacktestEngine, BacktestResults, BacktestSettings};
pub use metrics::PerformanceMetrics;
