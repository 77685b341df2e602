//! Per-symbol risk manager: equity tracking, drawdown-adjusted position sizing,
//! and the entry gate a strategy's `Buy`/`Sell` signal must clear before it is
//! allowed to open a position.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info, warn};

use crate::core::errors::RiskPolicyDenied;
use crate::core::types::OpenPosition;

use super::settings::{drawdown_ladder_multiplier, RiskSettings};

/// The resolved outcome of [`RiskManager::calculate_position_size`]: the
/// quantity to enter, the dollar risk it commits, and the stop distance that
/// risk was sized against (after any ATR floor was applied).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionSize {
    pub quantity: Decimal,
    pub risk_amount: Decimal,
    pub stop_distance: Decimal,
}

#[derive(Debug, Clone)]
pub struct RiskManager {
    settings: RiskSettings,
    equity: Decimal,
    peak_equity: Decimal,
    daily_start_equity: Decimal,
}

impl RiskManager {
    pub fn new(settings: RiskSettings, initial_equity: Decimal) -> Self {
        Self {
            settings,
            equity: initial_equity,
            peak_equity: initial_equity,
            daily_start_equity: initial_equity,
        }
    }

    pub fn equity(&self) -> Decimal {
        self.equity
    }

    /// Marks a new equity reading. Updates the running peak used by
    /// `current_drawdown`; never moves the daily baseline.
    pub fn update_equity(&mut self, equity: Decimal) {
        self.equity = equity;
        if equity > self.peak_equity {
            self.peak_equity = equity;
        }
        debug!(equity = %equity, peak_equity = %self.peak_equity, "equity updated");
    }

    /// Resets the daily drawdown baseline. Callers invoke this once per trading day.
    pub fn reset_daily_tracking(&mut self, equity: Decimal) {
        self.daily_start_equity = equity;
        info!(equity = %equity, "daily tracking reset");
    }

    /// Percent drawdown from the highest equity ever observed.
    pub fn current_drawdown(&self) -> Decimal {
        if self.peak_equity.is_zero() {
            return Decimal::ZERO;
        }
        ((self.peak_equity - self.equity) / self.peak_equity * dec!(100)).max(Decimal::ZERO)
    }

    /// Percent drawdown from the start-of-day equity.
    pub fn daily_drawdown(&self) -> Decimal {
        if self.daily_start_equity.is_zero() {
            return Decimal::ZERO;
        }
        ((self.daily_start_equity - self.equity) / self.daily_start_equity * dec!(100)).max(Decimal::ZERO)
    }

    /// Sum of open risk (stop-distance * quantity) as a percent of current equity.
    pub fn portfolio_heat(&self, open_positions: &[OpenPosition]) -> Decimal {
        if self.equity.is_zero() {
            return Decimal::ZERO;
        }
        let total_risk: Decimal = open_positions.iter().map(|p| p.risk_amount).sum();
        total_risk / self.equity * dec!(100)
    }

    /// Position size in base-asset quantity for a new entry at `entry_price` with
    /// protective `stop_loss`, after applying the drawdown-adjusted risk ladder and
    /// the remaining portfolio-heat budget given `open_positions`.
    ///
    /// `atr`, when supplied, floors the stop distance at `atr * atr_stop_multiplier`
    /// so a strategy's too-tight stop never inflates size beyond what the
    /// instrument's volatility supports. Denies the size outright if equity is at
    /// or below the configured minimum, or if the resolved stop distance is zero.
    pub fn calculate_position_size(
        &self,
        entry_price: Decimal,
        stop_loss: Decimal,
        atr: Option<Decimal>,
        open_positions: &[OpenPosition],
    ) -> Result<PositionSize, RiskPolicyDenied> {
        if self.equity <= self.settings.minimum_equity {
            warn!(equity = %self.equity, minimum = %self.settings.minimum_equity, "equity at or below minimum");
            return Err(RiskPolicyDenied::BelowMinimumEquity {
                equity: self.equity,
                minimum: self.settings.minimum_equity,
            });
        }

        let requested_distance = (entry_price - stop_loss).abs();
        let stop_distance = match atr {
            Some(atr) => {
                let floor = atr * self.settings.atr_stop_multiplier;
                if requested_distance < floor {
                    debug!(%requested_distance, clamped_to = %floor, "stop distance clamped to ATR floor");
                    floor
                } else {
                    requested_distance
                }
            }
            None => requested_distance,
        };
        if stop_distance.is_zero() {
            warn!("stop distance is zero, cannot size position");
            return Err(RiskPolicyDenied::ZeroQuantity);
        }

        let ladder = drawdown_ladder_multiplier(self.current_drawdown());
        let risk_pct = self.settings.risk_per_trade_pct * ladder;
        let mut risk_amount = self.equity * risk_pct / dec!(100);

        let current_heat = self.portfolio_heat(open_positions);
        let available_heat_pct = (self.settings.max_portfolio_heat_pct - current_heat).max(Decimal::ZERO);
        let heat_budget = self.equity * available_heat_pct / dec!(100);
        if risk_amount > heat_budget {
            debug!(
                requested = %risk_amount,
                heat_budget = %heat_budget,
                current_heat = %current_heat,
                "risk amount clamped to remaining portfolio heat budget"
            );
            risk_amount = heat_budget;
        }

        let quantity = risk_amount / stop_distance;
        if quantity.is_zero() {
            return Err(RiskPolicyDenied::ZeroQuantity);
        }

        info!(
            equity = %self.equity,
            drawdown_ladder = %ladder,
            risk_amount = %risk_amount,
            stop_distance = %stop_distance,
            quantity = %quantity,
            "position size calculated"
        );
        Ok(PositionSize {
            quantity,
            risk_amount,
            stop_distance,
        })
    }

    /// Gates whether a new entry may open at all, independent of sizing. Checked
    /// in order: equity floor, daily loss, drawdown, then heat.
    pub fn can_open_position(&self, open_positions: &[OpenPosition]) -> Result<(), RiskPolicyDenied> {
        if self.equity <= self.settings.minimum_equity {
            return Err(RiskPolicyDenied::BelowMinimumEquity {
                equity: self.equity,
                minimum: self.settings.minimum_equity,
            });
        }

        let daily_dd = self.daily_drawdown();
        if daily_dd >= self.settings.max_daily_drawdown_pct {
            warn!(daily_drawdown = %daily_dd, "daily drawdown limit reached");
            return Err(RiskPolicyDenied::DailyDrawdownExceeded {
                daily_drawdown_pct: daily_dd,
                limit_pct: self.settings.max_daily_drawdown_pct,
            });
        }

        let dd = self.current_drawdown();
        if dd >= self.settings.max_drawdown_pct {
            warn!(drawdown = %dd, "max drawdown limit reached");
            return Err(RiskPolicyDenied::TotalDrawdownExceeded {
                drawdown_pct: dd,
                limit_pct: self.settings.max_drawdown_pct,
            });
        }

        let heat = self.portfolio_heat(open_positions);
        if heat >= self.settings.max_portfolio_heat_pct {
            warn!(heat = %heat, "portfolio heat limit reached");
            return Err(RiskPolicyDenied::PortfolioHeatExceeded {
                heat_pct: heat,
                limit_pct: self.settings.max_portfolio_heat_pct,
            });
        }

        Ok(())
    }

    /// Recomputes the risk contribution of an open position after a partial exit
    /// has already mutated its `remaining_quantity`/`stop_loss` in place.
    pub fn note_partial_exit(&self, position: &OpenPosition) {
        debug!(
            symbol = %position.symbol,
            remaining = %position.remaining_quantity,
            risk_amount = %position.risk_amount,
            "partial exit applied"
        );
    }
}
