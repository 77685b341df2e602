//! Terminal performance statistics computed once over a finished equity curve
//! and trade ledger. `f64` is used here (never upstream) because these values
//! are display/diagnostic outputs, not inputs to further money arithmetic.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::core::types::{Trade, TradeResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_trades: u64,
    pub winning_trades: u64,
    pub losing_trades: u64,
    pub breakeven_trades: u64,
    pub win_rate: Decimal,
    pub total_net_pnl: Decimal,
    pub profit_factor: f64,
    pub sharpe: f64,
    pub sortino: f64,
    pub max_drawdown_pct: Decimal,
    pub annualized_return: Decimal,
    pub largest_win: Decimal,
    pub largest_loss: Decimal,
    pub total_return: Decimal,
}

impl PerformanceMetrics {
    pub fn calculate(
        trades: &[Trade],
        equity_curve: &[(DateTime<Utc>, Decimal)],
        initial_capital: Decimal,
    ) -> Self {
        let total_trades = trades.len() as u64;
        let wins: Vec<&Trade> = trades.iter().filter(|t| t.result == Some(TradeResult::Win)).collect();
        let losses: Vec<&Trade> = trades.iter().filter(|t| t.result == Some(TradeResult::Loss)).collect();
        let breakeven = trades.iter().filter(|t| t.result == Some(TradeResult::Breakeven)).count() as u64;

        let winning_trades = wins.len() as u64;
        let losing_trades = losses.len() as u64;

        let win_rate = if total_trades > 0 {
            Decimal::from(winning_trades) / Decimal::from(total_trades) * dec!(100)
        } else {
            Decimal::ZERO
        };

        let gross_profit: Decimal = wins.iter().filter_map(|t| t.net_pnl).sum();
        let gross_loss: Decimal = losses.iter().filter_map(|t| t.net_pnl).map(|p| p.abs()).sum();
        let total_net_pnl: Decimal = trades.iter().filter_map(|t| t.net_pnl).sum();

        let profit_factor = if !gross_loss.is_zero() {
            to_f64(gross_profit) / to_f64(gross_loss)
        } else if gross_profit > Decimal::ZERO {
            f64::INFINITY
        } else {
            0.0
        };

        let largest_win = wins.iter().filter_map(|t| t.net_pnl).max().unwrap_or(Decimal::ZERO);
        let largest_loss = losses
            .iter()
            .filter_map(|t| t.net_pnl)
            .map(|p| p.abs())
            .max()
            .unwrap_or(Decimal::ZERO);

        let final_equity = equity_curve.last().map(|(_, e)| *e).unwrap_or(initial_capital);
        let total_return = final_equity - initial_capital;

        let max_drawdown_pct = max_drawdown(equity_curve);
        let annualized_return = annualized_return(equity_curve, initial_capital, final_equity);

        let daily_returns = daily_returns(equity_curve);
        let (sharpe, sortino) = sharpe_sortino(&daily_returns);

        Self {
            total_trades,
            winning_trades,
            losing_trades,
            breakeven_trades: breakeven,
            win_rate,
            total_net_pnl,
            profit_factor,
            sharpe,
            sortino,
            max_drawdown_pct,
            annualized_return,
            largest_win,
            largest_loss,
            total_return,
        }
    }
}

fn to_f64(d: Decimal) -> f64 {
    d.try_into().unwrap_or(0.0)
}

/// Peak-to-trough decline observed on the equity curve, as a percent.
fn max_drawdown(equity_curve: &[(DateTime<Utc>, Decimal)]) -> Decimal {
    let mut peak = Decimal::MIN;
    let mut worst = Decimal::ZERO;
    for (_, equity) in equity_curve {
        if *equity > peak {
            peak = *equity;
        }
        if peak > Decimal::ZERO {
            let dd = (peak - *equity) / peak * dec!(100);
            if dd > worst {
                worst = dd;
            }
        }
    }
    worst
}

fn annualized_return(
    equity_curve: &[(DateTime<Utc>, Decimal)],
    initial_capital: Decimal,
    final_equity: Decimal,
) -> Decimal {
    if initial_capital.is_zero() {
        return Decimal::ZERO;
    }
    let (Some(first), Some(last)) = (equity_curve.first(), equity_curve.last()) else {
        return Decimal::ZERO;
    };
    let days = (last.0 - first.0).num_days().max(1) as f64;
    let years = days / 365.0;
    if years <= 0.0 {
        return Decimal::ZERO;
    }
    let total_return_factor = to_f64(final_equity / initial_capital);
    if total_return_factor <= 0.0 {
        return Decimal::ZERO;
    }
    let annual_factor = total_return_factor.powf(1.0 / years) - 1.0;
    Decimal::try_from(annual_factor * 100.0).unwrap_or(Decimal::ZERO)
}

/// Collapses the equity curve to one sample per UTC calendar day, then returns
/// the day-over-day fractional returns.
fn daily_returns(equity_curve: &[(DateTime<Utc>, Decimal)]) -> Vec<f64> {
    if equity_curve.is_empty() {
        return Vec::new();
    }
    let mut daily: Vec<f64> = Vec::new();
    let mut last_date = None;
    for (timestamp, equity) in equity_curve {
        let date = timestamp.date_naive();
        let eq = to_f64(*equity);
        if last_date.map_or(true, |d| d != date) {
            daily.push(eq);
            last_date = Some(date);
        } else if let Some(last) = daily.last_mut() {
            *last = eq;
        }
    }
    daily
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect()
}

fn sharpe_sortino(returns: &[f64]) -> (f64, f64) {
    if returns.len() < 2 {
        return (0.0, 0.0);
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();

    let annualization = 365.0_f64.sqrt();
    let sharpe = if std_dev > 0.0 { (mean / std_dev) * annualization } else { 0.0 };

    let downside_variance = returns.iter().map(|r| if *r < 0.0 { r.powi(2) } else { 0.0 }).sum::<f64>() / (n - 1.0);
    let downside_dev = downside_variance.sqrt();
    let sortino = if downside_dev > 0.0 {
        (mean / downside_dev) * annualization
    } else if mean > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };

    (sharpe, sortino)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Direction;
    use chrono::TimeZone;

    fn t(day: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(day * 86_400, 0).unwrap()
    }

    fn winning_trade() -> Trade {
        let mut trade = Trade::open("BTCUSDT", t(0), dec!(100), dec!(1), Direction::Long, dec!(95), None).unwrap();
        trade.close(t(1), dec!(110), dec!(0), crate::core::types::ExitReason::Signal, dec!(5), 1);
        trade
    }

    fn losing_trade() -> Trade {
        let mut trade = Trade::open("BTCUSDT", t(1), dec!(100), dec!(1), Direction::Long, dec!(95), None).unwrap();
        trade.close(t(2), dec!(90), dec!(0), crate::core::types::ExitReason::StopLoss, dec!(5), 1);
        trade
    }

    #[test]
    fn win_rate_and_profit_factor_match_trade_mix() {
        let trades = vec![winning_trade(), losing_trade()];
        let curve = vec![(t(0), dec!(10_000)), (t(1), dec!(10_010)), (t(2), dec!(10_000))];
        let metrics = PerformanceMetrics::calculate(&trades, &curve, dec!(10_000));
        assert_eq!(metrics.total_trades, 2);
        assert_eq!(metrics.winning_trades, 1);
        assert_eq!(metrics.losing_trades, 1);
        assert_eq!(metrics.win_rate, dec!(50));
        assert!(metrics.profit_factor > 0.0);
    }

    #[test]
    fn no_losses_gives_infinite_profit_factor() {
        let trades = vec![winning_trade()];
        let curve = vec![(t(0), dec!(10_000)), (t(1), dec!(10_010))];
        let metrics = PerformanceMetrics::calculate(&trades, &curve, dec!(10_000));
        assert!(metrics.profit_factor.is_infinite());
    }

    #[test]
    fn max_drawdown_tracks_peak_to_trough() {
        let curve = vec![
            (t(0), dec!(10_000)),
            (t(1), dec!(12_000)),
            (t(2), dec!(9_000)),
            (t(3), dec!(11_000)),
        ];
        // peak 12000, trough 9000: (12000-9000)/12000*100 = 25%
        assert_eq!(max_drawdown(&curve), dec!(25));
    }
}
