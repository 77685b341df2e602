//! Error taxonomy for the decision core.
//!
//! There is no "indicator not ready" variant here: an indicator that hasn't
//! warmed up yet returns `None`, not an error. Everything below is a genuine
//! validation or policy failure.

use rust_decimal::Decimal;
use thiserror::Error;

/// Fatal-to-construction failures: a record was built with a non-positive field
/// where the data model requires one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} must be positive")]
    NonPositive { field: &'static str },
}

/// A risk-policy decision that results in the signal being discarded rather than
/// propagated as an error. Callers log this and move on; it never panics or bubbles
/// out of the core.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RiskPolicyDenied {
    #[error("equity {equity} is at or below the minimum required {minimum}")]
    BelowMinimumEquity { equity: Decimal, minimum: Decimal },
    #[error("daily drawdown {daily_drawdown_pct}% at or above limit {limit_pct}%")]
    DailyDrawdownExceeded {
        daily_drawdown_pct: Decimal,
        limit_pct: Decimal,
    },
    #[error("total drawdown {drawdown_pct}% at or above limit {limit_pct}%")]
    TotalDrawdownExceeded {
        drawdown_pct: Decimal,
        limit_pct: Decimal,
    },
    #[error("portfolio heat {heat_pct}% at or above limit {limit_pct}%")]
    PortfolioHeatExceeded { heat_pct: Decimal, limit_pct: Decimal },
    #[error("correlated risk {correlated_pct}% for group '{group}' at or above limit {limit_pct}%")]
    CorrelatedRiskExceeded {
        group: String,
        correlated_pct: Decimal,
        limit_pct: Decimal,
    },
    #[error("open position count {count} at or above limit {limit}")]
    MaxConcurrentPositions { count: usize, limit: usize },
    #[error("position size resolved to zero quantity")]
    ZeroQuantity,
}

/// A discrepancy surfaced by [`crate::core::reconcile::reconcile`]. Never auto-fixed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReconciliationError {
    #[error("direction mismatch for {symbol}: saved={saved:?} live={live:?}")]
    DirectionMismatch {
        symbol: String,
        saved: crate::core::types::Direction,
        live: crate::core::types::Direction,
    },
    #[error("quantity diff for {symbol} exceeds tolerance: saved={saved} live={live}")]
    QuantityDrift {
        symbol: String,
        saved: Decimal,
        live: Decimal,
    },
    #[error("entry price diff for {symbol} exceeds tolerance: saved={saved} live={live}")]
    EntryPriceDrift {
        symbol: String,
        saved: Decimal,
        live: Decimal,
    },
    #[error("position for {symbol} present in saved state but absent live")]
    MissingLive { symbol: String },
    #[error("position for {symbol} present live but absent in saved state")]
    MissingSaved { symbol: String },
}

/// Configuration load/validation failures at the ambient-stack boundary.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse {field}: {source}")]
    Parse {
        field: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// The contract a collaborator's order executor must surface back to the core.
/// Non-success never creates a local position.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("order for {symbol} rejected: {reason}")]
    Rejected { symbol: String, reason: String },
    #[error("order for {symbol} timed out after {attempts} attempts")]
    TimedOut { symbol: String, attempts: u32 },
}
