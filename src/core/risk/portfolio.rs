//! Portfolio-wide risk aggregation layered on top of per-symbol [`RiskManager`]s.
//!
//! The `Mutex` here is the only concurrency primitive this crate's core permits:
//! it guards cross-symbol bookkeeping (total equity, correlation exposure) that
//! multiple adapter-side tasks may update concurrently, without pulling async
//! runtime concerns into the decision core itself.

use std::collections::HashMap;
use std::sync::Mutex;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::warn;

use crate::core::errors::RiskPolicyDenied;
use crate::core::types::OpenPosition;

use super::manager::RiskManager;
use super::settings::{PortfolioRiskSettings, RiskSettings};

struct Inner {
    managers: HashMap<String, RiskManager>,
    total_equity: Decimal,
    total_peak_equity: Decimal,
}

/// Coordinates per-symbol [`RiskManager`]s under portfolio-level caps: total
/// drawdown, correlated-group exposure, and max concurrent open positions.
pub struct PortfolioRiskManager {
    inner: Mutex<Inner>,
    settings: PortfolioRiskSettings,
    per_symbol_settings: RiskSettings,
}

impl PortfolioRiskManager {
    pub fn new(settings: PortfolioRiskSettings, per_symbol_settings: RiskSettings, initial_equity: Decimal) -> Self {
        Self {
            inner: Mutex::new(Inner {
                managers: HashMap::new(),
                total_equity: initial_equity,
                total_peak_equity: initial_equity,
            }),
            settings,
            per_symbol_settings,
        }
    }

    fn group_for(&self, symbol: &str) -> Option<&str> {
        self.settings
            .correlation_groups
            .iter()
            .find(|(_, members)| members.iter().any(|m| m == symbol))
            .map(|(group, _)| group.as_str())
    }

    /// Registers a symbol's manager if absent, seeding it at the portfolio's
    /// current total equity.
    pub fn ensure_symbol(&self, symbol: &str) {
        let mut inner = self.inner.lock().expect("portfolio risk mutex poisoned");
        let equity = inner.total_equity;
        inner
            .managers
            .entry(symbol.to_string())
            .or_insert_with(|| RiskManager::new(self.per_symbol_settings.clone(), equity));
    }

    pub fn update_total_equity(&self, equity: Decimal) {
        let mut inner = self.inner.lock().expect("portfolio risk mutex poisoned");
        inner.total_equity = equity;
        if equity > inner.total_peak_equity {
            inner.total_peak_equity = equity;
        }
    }

    pub fn total_drawdown(&self) -> Decimal {
        let inner = self.inner.lock().expect("portfolio risk mutex poisoned");
        if inner.total_peak_equity.is_zero() {
            return Decimal::ZERO;
        }
        ((inner.total_peak_equity - inner.total_equity) / inner.total_peak_equity * dec!(100)).max(Decimal::ZERO)
    }

    /// Percent of total equity currently at risk within `symbol`'s correlation
    /// group, including `candidate_risk` for a prospective new entry.
    fn correlated_risk_pct(
        &self,
        symbol: &str,
        open_positions: &HashMap<String, Vec<OpenPosition>>,
        candidate_risk: Decimal,
    ) -> Decimal {
        let inner = self.inner.lock().expect("portfolio risk mutex poisoned");
        if inner.total_equity.is_zero() {
            return Decimal::ZERO;
        }
        let Some(group) = self.group_for(symbol) else {
            return Decimal::ZERO;
        };
        let members = &self.settings.correlation_groups[group];
        let existing: Decimal = open_positions
            .iter()
            .filter(|(sym, _)| members.iter().any(|m| m == *sym))
            .flat_map(|(_, positions)| positions.iter())
            .map(|p| p.risk_amount)
            .sum();
        (existing + candidate_risk) / inner.total_equity * dec!(100)
    }

    /// Gates a prospective entry for `symbol` against every portfolio-level cap:
    /// total drawdown, max concurrent positions, then correlated-group exposure.
    /// Per-symbol gates (`RiskManager::can_open_position`) must be checked by the
    /// caller first; this only adds the cross-symbol checks.
    pub fn can_open_position(
        &self,
        symbol: &str,
        open_positions: &HashMap<String, Vec<OpenPosition>>,
        candidate_risk: Decimal,
    ) -> Result<(), RiskPolicyDenied> {
        let dd = self.total_drawdown();
        if dd >= self.settings.max_total_drawdown_pct {
            warn!(drawdown = %dd, "portfolio total drawdown limit reached");
            return Err(RiskPolicyDenied::TotalDrawdownExceeded {
                drawdown_pct: dd,
                limit_pct: self.settings.max_total_drawdown_pct,
            });
        }

        let open_count = open_positions.values().map(|v| v.len()).sum::<usize>();
        if open_count >= self.settings.max_concurrent_positions {
            warn!(open_count, limit = self.settings.max_concurrent_positions, "max concurrent positions reached");
            return Err(RiskPolicyDenied::MaxConcurrentPositions {
                count: open_count,
                limit: self.settings.max_concurrent_positions,
            });
        }

        let correlated = self.correlated_risk_pct(symbol, open_positions, candidate_risk);
        if correlated >= self.settings.max_correlated_risk_pct {
            if let Some(group) = self.group_for(symbol) {
                warn!(correlated = %correlated, group, "correlated risk limit reached");
                return Err(RiskPolicyDenied::CorrelatedRiskExceeded {
                    group: group.to_string(),
                    correlated_pct: correlated,
                    limit_pct: self.settings.max_correlated_risk_pct,
                });
            }
        }

        Ok(())
    }

    /// Runs `f` against the named symbol's manager, registering one first if needed.
    pub fn with_manager<R>(&self, symbol: &str, f: impl FnOnce(&mut RiskManager) -> R) -> R {
        self.ensure_symbol(symbol);
        let mut inner = self.inner.lock().expect("portfolio risk mutex poisoned");
        let manager = inner.managers.get_mut(symbol).expect("registered above");
        f(manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Direction;

    fn groups() -> HashMap<String, Vec<String>> {
        let mut g = HashMap::new();
        g.insert("majors".to_string(), vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()]);
        g
    }

    #[test]
    fn correlated_risk_aggregates_across_group_members() {
        let settings = PortfolioRiskSettings {
            correlation_groups: groups(),
            ..PortfolioRiskSettings::default()
        };
        let portfolio = PortfolioRiskManager::new(settings, RiskSettings::default(), dec!(10_000));
        let mut open = HashMap::new();
        open.insert(
            "ETHUSDT".to_string(),
            vec![OpenPosition::new("ETHUSDT", Direction::Long, dec!(10), dec!(100), dec!(92)).unwrap()],
        );
        // existing risk = 80, candidate = 900 -> (80+900)/10000*100 = 9.8% < 10% default limit
        assert!(portfolio.can_open_position("BTCUSDT", &open, dec!(900)).is_ok());
        // candidate pushes past the limit
        assert!(matches!(
            portfolio.can_open_position("BTCUSDT", &open, dec!(1000)),
            Err(RiskPolicyDenied::CorrelatedRiskExceeded { .. })
        ));
    }

    #[test]
    fn max_concurrent_positions_enforced() {
        let settings = PortfolioRiskSettings {
            max_concurrent_positions: 1,
            ..PortfolioRiskSettings::default()
        };
        let portfolio = PortfolioRiskManager::new(settings, RiskSettings::default(), dec!(10_000));
        let mut open = HashMap::new();
        open.insert(
            "BTCUSDT".to_string(),
            vec![OpenPosition::new("BTCUSDT", Direction::Long, dec!(1), dec!(100), dec!(95)).unwrap()],
        );
        assert!(matches!(
            portfolio.can_open_position("ETHUSDT", &open, dec!(0)),
            Err(RiskPolicyDenied::MaxConcurrentPositions { .. })
        ));
    }
}
