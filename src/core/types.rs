//! Shared data model for the decision pipeline: candles, signals, positions and trades.
//!
//! Every monetary or quantity field is `Decimal`. Floating point never appears in this
//! module; see [`crate::core::errors`] for the validation that enforces it at construction.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::errors::ValidationError;

/// A single OHLCV bar. Candles are immutable once built and arrive in ascending
/// `open_time` order; the host is responsible for dropping duplicate `open_time`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub close_time: DateTime<Utc>,
}

impl Candle {
    pub fn new(
        open_time: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
        close_time: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if close_time <= open_time {
            return Err(ValidationError::NonPositive {
                field: "close_time",
            });
        }
        Ok(Self {
            open_time,
            open,
            high,
            low,
            close,
            volume,
            close_time,
        })
    }

    /// Gap-inclusive true range against the previous candle's close.
    pub fn true_range(&self, prev_close: Option<Decimal>) -> Decimal {
        let hl = self.high - self.low;
        match prev_close {
            None => hl,
            Some(prev) => {
                let h_pc = (self.high - prev).abs();
                let pc_l = (prev - self.low).abs();
                hl.max(h_pc).max(pc_l)
            }
        }
    }
}

/// Position direction. `Long` profits when price rises, `Short` when it falls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

/// The kind of decision a strategy, filter or ensemble emits for a given candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalKind {
    Buy,
    Sell,
    Exit,
    PartialExit,
    None,
}

/// A strategy's (or ensemble's) decision for the current candle.
///
/// `price` must be strictly positive. A `PartialExit` signal must carry a
/// `partial_exit_fraction` in `(0, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeSignal {
    pub symbol: String,
    pub kind: SignalKind,
    pub price: Decimal,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub reason: String,
    pub partial_exit_fraction: Option<Decimal>,
    pub move_stop_to_breakeven: bool,
}

impl TradeSignal {
    pub fn new(
        symbol: impl Into<String>,
        kind: SignalKind,
        price: Decimal,
        reason: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        if price <= Decimal::ZERO {
            return Err(ValidationError::NonPositive { field: "Price" });
        }
        Ok(Self {
            symbol: symbol.into(),
            kind,
            price,
            stop_loss: None,
            take_profit: None,
            reason: reason.into(),
            partial_exit_fraction: None,
            move_stop_to_breakeven: false,
        })
    }

    pub fn with_stop(mut self, stop_loss: Decimal) -> Self {
        self.stop_loss = Some(stop_loss);
        self
    }

    pub fn with_take_profit(mut self, take_profit: Decimal) -> Self {
        self.take_profit = Some(take_profit);
        self
    }

    pub fn with_partial_exit_fraction(
        mut self,
        fraction: Decimal,
    ) -> Result<Self, ValidationError> {
        if fraction <= Decimal::ZERO || fraction > Decimal::ONE {
            return Err(ValidationError::NonPositive {
                field: "Partial exit quantity",
            });
        }
        self.partial_exit_fraction = Some(fraction);
        Ok(self)
    }

    pub fn with_breakeven(mut self) -> Self {
        self.move_stop_to_breakeven = true;
        self
    }

    pub fn none(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            kind: SignalKind::None,
            price: Decimal::ZERO,
            stop_loss: None,
            take_profit: None,
            reason: String::new(),
            partial_exit_fraction: None,
            move_stop_to_breakeven: false,
        }
    }

    pub fn is_exit_like(&self) -> bool {
        matches!(self.kind, SignalKind::Exit | SignalKind::PartialExit)
    }
}

/// An immutable, per-candle snapshot of a strategy's indicator readings, exposed to
/// the filter chain. Filters never see a strategy's internals beyond this struct.
#[derive(Debug, Clone, Default)]
pub struct StrategyState {
    pub last_signal: Option<SignalKind>,
    pub primary_indicator_value: Option<Decimal>,
    pub is_overbought: bool,
    pub is_oversold: bool,
    pub is_trending: bool,
    pub custom: HashMap<String, Decimal>,
}

impl StrategyState {
    pub fn get(&self, key: &str) -> Option<Decimal> {
        self.custom.get(key).copied()
    }
}

/// A live, possibly partially closed, position owned by a [`crate::core::risk::RiskManager`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenPosition {
    pub symbol: String,
    pub direction: Direction,
    pub initial_quantity: Decimal,
    pub remaining_quantity: Decimal,
    pub entry_price: Decimal,
    pub stop_loss: Decimal,
    pub risk_amount: Decimal,
    pub breakeven_moved: bool,
    pub current_price: Decimal,
}

impl OpenPosition {
    pub fn new(
        symbol: impl Into<String>,
        direction: Direction,
        quantity: Decimal,
        entry_price: Decimal,
        stop_loss: Decimal,
    ) -> Result<Self, ValidationError> {
        if quantity <= Decimal::ZERO {
            return Err(ValidationError::NonPositive { field: "Quantity" });
        }
        if entry_price <= Decimal::ZERO {
            return Err(ValidationError::NonPositive {
                field: "Entry price",
            });
        }
        let risk_amount = (entry_price - stop_loss).abs() * quantity;
        Ok(Self {
            symbol: symbol.into(),
            direction,
            initial_quantity: quantity,
            remaining_quantity: quantity,
            entry_price,
            stop_loss,
            risk_amount,
            breakeven_moved: false,
            current_price: entry_price,
        })
    }

    /// Reduce the remaining quantity by `fraction` and recompute `risk_amount`
    /// against the (possibly updated) stop. Returns the quantity closed.
    pub fn apply_partial_exit(
        &mut self,
        fraction: Decimal,
        new_stop: Decimal,
        move_to_breakeven: bool,
    ) -> Decimal {
        let closed_qty = self.remaining_quantity * fraction;
        self.remaining_quantity -= closed_qty;
        self.stop_loss = new_stop;
        self.breakeven_moved = self.breakeven_moved || move_to_breakeven;
        self.risk_amount = (self.entry_price - self.stop_loss).abs() * self.remaining_quantity;
        closed_qty
    }

    pub fn unrealized_pnl(&self) -> Decimal {
        match self.direction {
            Direction::Long => (self.current_price - self.entry_price) * self.remaining_quantity,
            Direction::Short => (self.entry_price - self.current_price) * self.remaining_quantity,
        }
    }
}

/// Outcome classification of a closed [`Trade`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeResult {
    Win,
    Loss,
    Breakeven,
}

/// Why a trade (or partial trade) was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    Signal,
    StopLoss,
    TakeProfit,
    PartialExit,
    EndOfBacktest,
}

/// A journal entry: created on entry, mutated to closed on exit. Partial exits
/// produce a child `Trade` carrying only the closed slice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    pub entry_price: Decimal,
    pub exit_price: Option<Decimal>,
    pub quantity: Decimal,
    pub direction: Direction,
    pub stop_loss: Decimal,
    pub take_profit: Option<Decimal>,
    pub exit_reason: Option<ExitReason>,
    pub result: Option<TradeResult>,
    pub r_multiple: Option<Decimal>,
    pub net_pnl: Option<Decimal>,
    pub gross_pnl: Option<Decimal>,
    pub bars_in_trade: Option<u32>,
    pub mae: Option<Decimal>,
    pub mfe: Option<Decimal>,
}

impl Trade {
    pub fn open(
        symbol: impl Into<String>,
        entry_time: DateTime<Utc>,
        entry_price: Decimal,
        quantity: Decimal,
        direction: Direction,
        stop_loss: Decimal,
        take_profit: Option<Decimal>,
    ) -> Result<Self, ValidationError> {
        if quantity <= Decimal::ZERO {
            return Err(ValidationError::NonPositive { field: "Quantity" });
        }
        if entry_price <= Decimal::ZERO {
            return Err(ValidationError::NonPositive {
                field: "Entry price",
            });
        }
        Ok(Self {
            symbol: symbol.into(),
            entry_time,
            exit_time: None,
            entry_price,
            exit_price: None,
            quantity,
            direction,
            stop_loss,
            take_profit,
            exit_reason: None,
            result: None,
            r_multiple: None,
            net_pnl: None,
            gross_pnl: None,
            bars_in_trade: None,
            mae: None,
            mfe: None,
        })
    }

    pub fn is_open(&self) -> bool {
        self.exit_time.is_none()
    }

    /// Close this trade (or the fully-closed tail of it) at `exit_price`, charging
    /// `commission` against the gross PnL and dividing by `initial_risk_amount` for
    /// the r-multiple.
    pub fn close(
        &mut self,
        exit_time: DateTime<Utc>,
        exit_price: Decimal,
        commission: Decimal,
        exit_reason: ExitReason,
        initial_risk_amount: Decimal,
        bars_in_trade: u32,
    ) {
        let gross_pnl = match self.direction {
            Direction::Long => (exit_price - self.entry_price) * self.quantity,
            Direction::Short => (self.entry_price - exit_price) * self.quantity,
        };
        let net_pnl = gross_pnl - commission;
        self.exit_time = Some(exit_time);
        self.exit_price = Some(exit_price);
        self.exit_reason = Some(exit_reason);
        self.gross_pnl = Some(gross_pnl);
        self.net_pnl = Some(net_pnl);
        self.bars_in_trade = Some(bars_in_trade);
        self.result = Some(if net_pnl > Decimal::ZERO {
            TradeResult::Win
        } else if net_pnl < Decimal::ZERO {
            TradeResult::Loss
        } else {
            TradeResult::Breakeven
        });
        self.r_multiple = if initial_risk_amount > Decimal::ZERO {
            Some(net_pnl / initial_risk_amount)
        } else {
            None
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn t(hour: u32) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(&format!("2024-01-01T{hour:02}:00:00Z"))
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn candle_rejects_non_monotonic_close_time() {
        let err = Candle::new(t(1), dec!(1), dec!(1), dec!(1), dec!(1), dec!(1), t(0));
        assert!(err.is_err());
    }

    #[test]
    fn true_range_is_gap_inclusive() {
        let c = Candle::new(t(1), dec!(100), dec!(108), dec!(101), dec!(107), dec!(1), t(2))
            .unwrap();
        // H=108, L=101, prev_close=102: max(7, |108-102|=6, |102-101|=1) = 7
        assert_eq!(c.true_range(Some(dec!(102))), dec!(7));
    }

    #[test]
    fn signal_rejects_non_positive_price() {
        assert!(TradeSignal::new("BTCUSDT", SignalKind::Buy, dec!(0), "x").is_err());
    }

    #[test]
    fn partial_exit_requires_fraction_in_unit_interval() {
        let s = TradeSignal::new("BTCUSDT", SignalKind::PartialExit, dec!(100), "r").unwrap();
        assert!(s.clone().with_partial_exit_fraction(dec!(0)).is_err());
        assert!(s.clone().with_partial_exit_fraction(dec!(1.5)).is_err());
        assert!(s.with_partial_exit_fraction(dec!(0.5)).is_ok());
    }

    #[test]
    fn position_risk_amount_tracks_stop_distance() {
        let pos = OpenPosition::new("BTCUSDT", Direction::Long, dec!(2), dec!(100), dec!(95))
            .unwrap();
        assert_eq!(pos.risk_amount, dec!(10));
    }

    #[test]
    fn partial_exit_reduces_quantity_and_recomputes_risk() {
        let mut pos = OpenPosition::new("BTCUSDT", Direction::Long, dec!(2), dec!(100), dec!(95))
            .unwrap();
        let closed = pos.apply_partial_exit(dec!(0.5), dec!(100), true);
        assert_eq!(closed, dec!(1));
        assert_eq!(pos.remaining_quantity, dec!(1));
        assert!(pos.breakeven_moved);
        assert_eq!(pos.risk_amount, dec!(0)); // stop moved to entry
    }

    #[test]
    fn trade_close_computes_r_multiple() {
        let mut trade = Trade::open(
            "BTCUSDT",
            t(0),
            dec!(100),
            dec!(1),
            Direction::Long,
            dec!(95),
            None,
        )
        .unwrap();
        trade.close(t(1), dec!(110), dec!(0), ExitReason::Signal, dec!(5), 3);
        assert_eq!(trade.net_pnl, Some(dec!(10)));
        assert_eq!(trade.r_multiple, Some(dec!(2)));
        assert_eq!(trade.result, Some(TradeResult::Win));
    }
}
