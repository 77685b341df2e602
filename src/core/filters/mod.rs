//! Signal filter chain: Confirm / Veto / Score gates evaluated against a
//! strategy's immutable per-candle [`StrategyState`].

pub mod adx_filter;
pub mod rsi_filter;
pub mod trend_alignment_filter;

pub use adx_filter::AdxSignalFilter;
pub use rsi_filter::RsiSignalFilter;
pub use trend_alignment_filter::TrendAlignmentFilter;

use rust_decimal::Decimal;

use crate::core::types::{StrategyState, TradeSignal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Approve only when the predicate holds.
    Confirm,
    /// Approve unless an explicit blocker holds (default-allow).
    Veto,
    /// Always approves; contributes a confidence scalar.
    Score,
}

#[derive(Debug, Clone)]
pub struct FilterOutcome {
    pub approved: bool,
    pub confidence_adjustment: Option<Decimal>,
    pub reason: String,
}

impl FilterOutcome {
    pub fn approve(reason: impl Into<String>) -> Self {
        Self {
            approved: true,
            confidence_adjustment: None,
            reason: reason.into(),
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            approved: false,
            confidence_adjustment: None,
            reason: reason.into(),
        }
    }

    pub fn score(confidence: Decimal, reason: impl Into<String>) -> Self {
        Self {
            approved: true,
            confidence_adjustment: Some(confidence),
            reason: reason.into(),
        }
    }
}

pub trait SignalFilter {
    fn mode(&self) -> FilterMode;
    fn evaluate(&self, signal: &TradeSignal, state: &StrategyState) -> FilterOutcome;
}

/// Left-to-right filter composition. Exit and PartialExit signals bypass every
/// filter (always approved). A Confirm/Veto non-approval short-circuits the
/// chain; Score filters never block but their adjustments accumulate.
pub struct FilterChain {
    filters: Vec<Box<dyn SignalFilter>>,
}

impl FilterChain {
    pub fn new(filters: Vec<Box<dyn SignalFilter>>) -> Self {
        Self { filters }
    }

    pub fn apply(&self, signal: &TradeSignal, state: &StrategyState) -> FilterOutcome {
        if signal.is_exit_like() {
            return FilterOutcome::approve("exit-like signals are never filtered");
        }

        let mut confidence = Decimal::ONE;
        for filter in &self.filters {
            let outcome = filter.evaluate(signal, state);
            match filter.mode() {
                FilterMode::Confirm | FilterMode::Veto => {
                    if !outcome.approved {
                        return outcome;
                    }
                }
                FilterMode::Score => {
                    if let Some(adj) = outcome.confidence_adjustment {
                        confidence = adj;
                    }
                }
            }
        }

        FilterOutcome {
            approved: true,
            confidence_adjustment: Some(confidence),
            reason: "all filters approved".to_string(),
        }
    }
}
