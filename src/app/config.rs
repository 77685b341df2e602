//! Environment-driven configuration loading: every field has a sensible
//! default, parse failures are wrapped with `anyhow::Context` naming the
//! offending variable.

use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};
use rust_decimal::Decimal;

use crate::core::errors::ConfigError;
use crate::core::risk::{PortfolioRiskSettings, RiskSettings};
use crate::core::backtest::BacktestSettings;
use crate::core::ensemble::EnsembleSettings;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub symbol: String,
    pub candle_path: String,
    pub backtest: BacktestSettings,
    pub risk: RiskSettings,
    pub portfolio_risk: PortfolioRiskSettings,
    pub ensemble: EnsembleSettings,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let symbol = env::var("SYMBOL").unwrap_or_else(|_| "BTCUSDT".to_string());
        let candle_path = env::var("CANDLE_PATH").unwrap_or_else(|_| "candles.csv".to_string());

        let backtest = BacktestSettings {
            initial_capital: env_decimal("INITIAL_CAPITAL", BacktestSettings::default().initial_capital)?,
            commission_pct: env_decimal("COMMISSION_PCT", BacktestSettings::default().commission_pct)?,
            slippage_pct: env_decimal("SLIPPAGE_PCT", BacktestSettings::default().slippage_pct)?,
        };

        let risk = RiskSettings {
            risk_per_trade_pct: env_decimal("RISK_PER_TRADE_PCT", RiskSettings::default().risk_per_trade_pct)?,
            max_portfolio_heat_pct: env_decimal(
                "MAX_PORTFOLIO_HEAT_PCT",
                RiskSettings::default().max_portfolio_heat_pct,
            )?,
            max_drawdown_pct: env_decimal("MAX_DRAWDOWN_PCT", RiskSettings::default().max_drawdown_pct)?,
            max_daily_drawdown_pct: env_decimal(
                "MAX_DAILY_DRAWDOWN_PCT",
                RiskSettings::default().max_daily_drawdown_pct,
            )?,
            atr_stop_multiplier: env_decimal("ATR_STOP_MULTIPLIER", RiskSettings::default().atr_stop_multiplier)?,
            take_profit_multiplier: env_decimal(
                "TAKE_PROFIT_MULTIPLIER",
                RiskSettings::default().take_profit_multiplier,
            )?,
            minimum_equity: env_decimal("MINIMUM_EQUITY", RiskSettings::default().minimum_equity)?,
        };

        let portfolio_risk = PortfolioRiskSettings {
            max_concurrent_positions: env_usize(
                "MAX_CONCURRENT_POSITIONS",
                PortfolioRiskSettings::default().max_concurrent_positions,
            )?,
            ..PortfolioRiskSettings::default()
        };

        let ensemble = EnsembleSettings {
            min_agreement: env_decimal("MIN_AGREEMENT", EnsembleSettings::default().min_agreement)?,
            ..EnsembleSettings::default()
        };

        Ok(Self {
            symbol,
            candle_path,
            backtest,
            risk,
            portfolio_risk,
            ensemble,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backtest.initial_capital <= Decimal::ZERO {
            return Err(ConfigError::Invalid {
                field: "INITIAL_CAPITAL",
                reason: "must be positive".to_string(),
            });
        }
        if self.risk.risk_per_trade_pct <= Decimal::ZERO || self.risk.risk_per_trade_pct > Decimal::from(100) {
            return Err(ConfigError::Invalid {
                field: "RISK_PER_TRADE_PCT",
                reason: "must be in (0, 100]".to_string(),
            });
        }
        if self.portfolio_risk.max_concurrent_positions == 0 {
            return Err(ConfigError::Invalid {
                field: "MAX_CONCURRENT_POSITIONS",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn env_decimal(key: &'static str, default: Decimal) -> Result<Decimal> {
    match env::var(key) {
        Ok(raw) => Decimal::from_str(&raw).with_context(|| format!("failed to parse {key}")),
        Err(_) => Ok(default),
    }
}

fn env_usize(key: &'static str, default: usize) -> Result<usize> {
    match env::var(key) {
        Ok(raw) => raw.parse::<usize>().with_context(|| format!("failed to parse {key}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_non_positive_capital() {
        let mut config = AppConfig {
            symbol: "BTCUSDT".to_string(),
            candle_path: "candles.csv".to_string(),
            backtest: BacktestSettings::default(),
            risk: RiskSettings::default(),
            portfolio_risk: PortfolioRiskSettings::default(),
            ensemble: EnsembleSettings::default(),
        };
        config.backtest.initial_capital = Decimal::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_config_validates() {
        let config = AppConfig {
            symbol: "BTCUSDT".to_string(),
            candle_path: "candles.csv".to_string(),
            backtest: BacktestSettings::default(),
            risk: RiskSettings::default(),
            portfolio_risk: PortfolioRiskSettings::default(),
            ensemble: EnsembleSettings::default(),
        };
        assert!(config.validate().is_ok());
    }
}
