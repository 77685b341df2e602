//! Position sizing and portfolio-level risk gating.

pub mod manager;
pub mod portfolio;
pub mod settings;

pub use manager::{PositionSize, RiskManager};
pub use portfolio::PortfolioRiskManager;
pub use settings::{drawdown_ladder_multiplier, PortfolioRiskSettings, RiskSettings};
