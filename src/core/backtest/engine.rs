//! Deterministic, single-symbol replay of a strategy over a fixed slice of
//! candles. No suspension points: every step is synchronous in-memory state.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::risk::{RiskManager, RiskSettings};
use crate::core::strategies::Strategy;
use crate::core::types::{Candle, Direction, ExitReason, OpenPosition, SignalKind, Trade};

use super::metrics::PerformanceMetrics;

#[derive(Debug, Clone)]
pub struct BacktestSettings {
    pub initial_capital: Decimal,
    pub commission_pct: Decimal,
    pub slippage_pct: Decimal,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            initial_capital: dec!(10_000),
            commission_pct: dec!(0.1),
            slippage_pct: dec!(0.05),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BacktestResults {
    pub symbol: String,
    pub final_equity: Decimal,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<(DateTime<Utc>, Decimal)>,
    pub metrics: PerformanceMetrics,
}

impl BacktestResults {
    pub fn print_summary(&self) {
        println!("{}", "=".repeat(60));
        println!("BACKTEST RESULTS: {}", self.symbol);
        println!("{}", "=".repeat(60));
        println!("Final equity:       {:.2}", self.final_equity);
        println!("Total return:        {:.2}", self.metrics.total_return);
        println!("Annualized return:   {:.2}%", self.metrics.annualized_return);
        println!("Max drawdown:        {:.2}%", self.metrics.max_drawdown_pct);
        println!("Sharpe:              {:.2}", self.metrics.sharpe);
        println!("Sortino:             {:.2}", self.metrics.sortino);
        println!("{}", "-".repeat(60));
        println!(
            "Trades: {} ({} won, {} lost, {} breakeven), win rate {:.1}%",
            self.metrics.total_trades,
            self.metrics.winning_trades,
            self.metrics.losing_trades,
            self.metrics.breakeven_trades,
            self.metrics.win_rate
        );
        println!("Profit factor:       {:.2}", self.metrics.profit_factor);
        println!("Largest win:         {:.2}", self.metrics.largest_win);
        println!("Largest loss:        {:.2}", self.metrics.largest_loss);
        println!("{}", "=".repeat(60));
    }
}

struct ActiveTrade {
    trade: Trade,
    position: OpenPosition,
    initial_risk_amount: Decimal,
    bars: u32,
}

pub struct BacktestEngine {
    settings: BacktestSettings,
    risk: RiskManager,
    equity: Decimal,
    active: Option<ActiveTrade>,
    trades: Vec<Trade>,
    equity_curve: Vec<(DateTime<Utc>, Decimal)>,
    last_candle_date: Option<chrono::NaiveDate>,
}

impl BacktestEngine {
    pub fn new(settings: BacktestSettings, risk_settings: RiskSettings) -> Self {
        let risk = RiskManager::new(risk_settings, settings.initial_capital);
        Self {
            equity: settings.initial_capital,
            risk,
            active: None,
            trades: Vec::new(),
            equity_curve: Vec::new(),
            last_candle_date: None,
            settings,
        }
    }

    pub fn run(&mut self, strategy: &mut dyn Strategy, candles: &[Candle], symbol: &str) -> BacktestResults {
        info!(symbol, candles = candles.len(), "starting backtest run");
        for candle in candles {
            self.process_candle(strategy, candle, symbol);
        }

        if let Some(active) = self.active.take() {
            if let Some(last) = candles.last() {
                self.close_trade(active, last.close, last.close_time, ExitReason::EndOfBacktest);
            }
        }

        let metrics = PerformanceMetrics::calculate(&self.trades, &self.equity_curve, self.settings.initial_capital);
        info!(
            symbol,
            total_trades = metrics.total_trades,
            total_net_pnl = %metrics.total_net_pnl,
            "backtest run complete"
        );

        BacktestResults {
            symbol: symbol.to_string(),
            final_equity: self.equity,
            trades: self.trades.clone(),
            equity_curve: self.equity_curve.clone(),
            metrics,
        }
    }

    fn process_candle(&mut self, strategy: &mut dyn Strategy, candle: &Candle, symbol: &str) {
        let today = candle.close_time.date_naive();
        let rolled_over = self.last_candle_date.is_none_or(|prev| prev != today);
        if rolled_over {
            let baseline = self.equity_curve.last().map(|(_, equity)| *equity).unwrap_or(self.equity);
            self.risk.reset_daily_tracking(baseline);
        }
        self.last_candle_date = Some(today);

        let signal = strategy.analyze(candle, symbol);

        if let Some(signal) = signal {
            match signal.kind {
                SignalKind::Buy | SignalKind::Sell if self.active.is_none() => {
                    let atr = strategy.current_atr();
                    self.open_trade(&signal, candle, symbol, atr);
                }
                SignalKind::Exit => {
                    if let Some(active) = self.active.take() {
                        let fill = self.exit_fill_price(candle.close, active.position.direction);
                        self.close_trade(active, fill, candle.close_time, ExitReason::Signal);
                    }
                }
                SignalKind::PartialExit => {
                    if let Some(fraction) = signal.partial_exit_fraction {
                        self.partial_exit(fraction, signal.stop_loss, signal.move_stop_to_breakeven, candle);
                    }
                }
                _ => {}
            }
        }

        if let Some(active) = &mut self.active {
            active.position.current_price = candle.close;
            active.bars += 1;
        }

        let unrealized = self.active.as_ref().map(|a| a.position.unrealized_pnl()).unwrap_or(Decimal::ZERO);
        let mark_equity = self.equity + unrealized;
        self.risk.update_equity(mark_equity);
        self.equity_curve.push((candle.close_time, mark_equity));
    }

    fn entry_fill_price(&self, close: Decimal, direction: Direction) -> Decimal {
        let slip = self.settings.slippage_pct / dec!(100);
        match direction {
            Direction::Long => close * (Decimal::ONE + slip),
            Direction::Short => close * (Decimal::ONE - slip),
        }
    }

    fn exit_fill_price(&self, close: Decimal, direction: Direction) -> Decimal {
        let slip = self.settings.slippage_pct / dec!(100);
        match direction {
            Direction::Long => close * (Decimal::ONE - slip),
            Direction::Short => close * (Decimal::ONE + slip),
        }
    }

    fn open_trade(&mut self, signal: &crate::core::types::TradeSignal, candle: &Candle, symbol: &str, atr: Option<Decimal>) {
        let direction = match signal.kind {
            SignalKind::Buy => Direction::Long,
            SignalKind::Sell => Direction::Short,
            _ => return,
        };

        let Some(stop_loss) = signal.stop_loss else {
            debug!(symbol, "entry signal without a stop loss, skipping");
            return;
        };

        let fill_price = self.entry_fill_price(candle.close, direction);

        // This engine holds at most one position at a time: `open_trade` only runs
        // while `self.active` is `None`, so the currently-open-positions slice is
        // threaded through explicitly rather than hardcoded empty.
        let open_positions: Vec<OpenPosition> = self.active.iter().map(|a| a.position.clone()).collect();

        if let Err(e) = self.risk.can_open_position(&open_positions) {
            warn!(symbol, error = %e, "risk policy denied entry");
            return;
        }

        let size = match self.risk.calculate_position_size(fill_price, stop_loss, atr, &open_positions) {
            Ok(s) => s,
            Err(e) => {
                warn!(symbol, error = %e, "position sizing denied entry");
                return;
            }
        };
        let quantity = size.quantity;
        if quantity <= Decimal::ZERO {
            warn!(symbol, "position size resolved to zero, skipping entry");
            return;
        }

        let commission = fill_price * quantity * self.settings.commission_pct / dec!(100);
        self.equity -= commission;

        let position = match OpenPosition::new(symbol, direction, quantity, fill_price, stop_loss) {
            Ok(p) => p,
            Err(e) => {
                warn!(symbol, error = %e, "could not open position record");
                return;
            }
        };
        let trade = match Trade::open(symbol, candle.open_time, fill_price, quantity, direction, stop_loss, signal.take_profit)
        {
            Ok(t) => t,
            Err(e) => {
                warn!(symbol, error = %e, "could not open trade record");
                return;
            }
        };

        let initial_risk_amount = position.risk_amount;
        info!(symbol, %fill_price, %quantity, %commission, "entry filled");

        self.active = Some(ActiveTrade {
            trade,
            position,
            initial_risk_amount,
            bars: 0,
        });
    }

    fn partial_exit(&mut self, fraction: Decimal, new_stop: Option<Decimal>, move_breakeven: bool, candle: &Candle) {
        let Some(active) = &mut self.active else { return };
        let direction = active.position.direction;
        let fill_price = self.exit_fill_price(candle.close, direction);

        let stop = new_stop.unwrap_or(active.position.stop_loss);
        let closed_qty = active.position.apply_partial_exit(fraction, stop, move_breakeven);

        let gross_pnl = match direction {
            Direction::Long => (fill_price - active.trade.entry_price) * closed_qty,
            Direction::Short => (active.trade.entry_price - fill_price) * closed_qty,
        };
        let commission = fill_price * closed_qty * self.settings.commission_pct / dec!(100);
        let net_pnl = gross_pnl - commission;
        self.equity += net_pnl;

        let child_risk = active.initial_risk_amount * fraction;
        if let Ok(mut child) = Trade::open(
            &active.trade.symbol,
            active.trade.entry_time,
            active.trade.entry_price,
            closed_qty,
            direction,
            active.trade.stop_loss,
            active.trade.take_profit,
        ) {
            child.close(candle.close_time, fill_price, commission, ExitReason::PartialExit, child_risk, active.bars);
            info!(symbol = %active.trade.symbol, %closed_qty, %net_pnl, "partial exit filled");
            self.trades.push(child);
        }

        active.trade.quantity = active.position.remaining_quantity;
        active.trade.stop_loss = stop;
    }

    fn close_trade(&mut self, mut active: ActiveTrade, fill_price: Decimal, exit_time: DateTime<Utc>, reason: ExitReason) {
        let quantity = active.position.remaining_quantity;
        let commission = fill_price * quantity * self.settings.commission_pct / dec!(100);

        let gross_pnl = match active.position.direction {
            Direction::Long => (fill_price - active.trade.entry_price) * quantity,
            Direction::Short => (active.trade.entry_price - fill_price) * quantity,
        };
        self.equity += gross_pnl - commission;

        active.trade.quantity = quantity;
        active.trade.close(exit_time, fill_price, commission, reason, active.initial_risk_amount, active.bars);
        info!(symbol = %active.trade.symbol, ?reason, net_pnl = ?active.trade.net_pnl, "trade closed");
        self.trades.push(active.trade);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::strategies::ma_crossover::MaCrossoverConfig;
    use crate::core::strategies::MaCrossoverStrategy;
    use chrono::TimeZone;

    fn candle(i: i64, close: Decimal) -> Candle {
        let t0 = Utc.timestamp_opt(i * 3600, 0).unwrap();
        let t1 = Utc.timestamp_opt((i + 1) * 3600, 0).unwrap();
        Candle::new(t0, close, close + dec!(1), close - dec!(1), close, dec!(1000), t1).unwrap()
    }

    #[test]
    fn flat_series_produces_no_trades_and_preserves_equity() {
        let mut engine = BacktestEngine::new(BacktestSettings::default(), RiskSettings::default());
        let mut strategy = MaCrossoverStrategy::new(MaCrossoverConfig::default());
        let candles: Vec<Candle> = (0..30).map(|i| candle(i, dec!(100))).collect();
        let results = engine.run(&mut strategy, &candles, "BTCUSDT");
        assert_eq!(results.metrics.total_trades, 0);
        assert_eq!(results.final_equity, dec!(10_000));
    }

    #[test]
    fn commission_free_run_never_increases_cost_basis() {
        let settings = BacktestSettings {
            commission_pct: Decimal::ZERO,
            ..BacktestSettings::default()
        };
        let mut engine = BacktestEngine::new(settings, RiskSettings::default());
        let mut strategy = MaCrossoverStrategy::new(MaCrossoverConfig::default());
        let candles: Vec<Candle> = (0..10).map(|i| candle(i, dec!(100) + Decimal::from(i))).collect();
        let results = engine.run(&mut strategy, &candles, "BTCUSDT");
        assert!(results.final_equity >= Decimal::ZERO);
    }
}
