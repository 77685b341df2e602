//! Reconciliation between a persisted position snapshot and what the exchange
//! currently reports live. Never auto-corrects; always returns a report the
//! caller must act on, recommending one of a small set of safe remedies.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::core::errors::ReconciliationError;
use crate::core::types::OpenPosition;

/// What the caller should do in response to a [`ReconciliationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendedAction {
    /// Drop the saved position; nothing live backs it.
    ClearSaved,
    /// Trust the exchange; overwrite the saved position with the live one.
    AdoptLive,
    /// Saved and live agree in direction but drifted within tolerance; refresh
    /// the saved snapshot's quantity/price to the live values.
    UpdateSaved,
}

#[derive(Debug, Clone)]
pub struct ReconciliationReport {
    pub symbol: String,
    pub error: ReconciliationError,
    pub action: RecommendedAction,
}

/// Tolerance (as a fraction, e.g. `0.001` = 0.1%) below which quantity/price
/// drift is treated as noise rather than a discrepancy worth reporting.
const DEFAULT_TOLERANCE: Decimal = dec!(0.001);

/// Compares a saved position snapshot against the live position the exchange
/// reports for the same symbol, returning `None` when they agree within
/// tolerance and `Some(report)` otherwise. `saved`/`live` being `None` models
/// "no position recorded on that side".
pub fn reconcile(
    symbol: &str,
    saved: Option<&OpenPosition>,
    live: Option<&OpenPosition>,
) -> Option<ReconciliationReport> {
    reconcile_with_tolerance(symbol, saved, live, DEFAULT_TOLERANCE)
}

pub fn reconcile_with_tolerance(
    symbol: &str,
    saved: Option<&OpenPosition>,
    live: Option<&OpenPosition>,
    tolerance: Decimal,
) -> Option<ReconciliationReport> {
    match (saved, live) {
        (None, None) => None,
        (Some(_), None) => Some(ReconciliationReport {
            symbol: symbol.to_string(),
            error: ReconciliationError::MissingLive {
                symbol: symbol.to_string(),
            },
            action: RecommendedAction::ClearSaved,
        }),
        (None, Some(_)) => Some(ReconciliationReport {
            symbol: symbol.to_string(),
            error: ReconciliationError::MissingSaved {
                symbol: symbol.to_string(),
            },
            action: RecommendedAction::AdoptLive,
        }),
        (Some(saved), Some(live)) => {
            if saved.direction != live.direction {
                return Some(ReconciliationReport {
                    symbol: symbol.to_string(),
                    error: ReconciliationError::DirectionMismatch {
                        symbol: symbol.to_string(),
                        saved: saved.direction,
                        live: live.direction,
                    },
                    action: RecommendedAction::AdoptLive,
                });
            }

            let qty_drift = relative_drift(saved.remaining_quantity, live.remaining_quantity);
            if qty_drift > tolerance {
                return Some(ReconciliationReport {
                    symbol: symbol.to_string(),
                    error: ReconciliationError::QuantityDrift {
                        symbol: symbol.to_string(),
                        saved: saved.remaining_quantity,
                        live: live.remaining_quantity,
                    },
                    action: RecommendedAction::UpdateSaved,
                });
            }

            let price_drift = relative_drift(saved.entry_price, live.entry_price);
            if price_drift > tolerance {
                return Some(ReconciliationReport {
                    symbol: symbol.to_string(),
                    error: ReconciliationError::EntryPriceDrift {
                        symbol: symbol.to_string(),
                        saved: saved.entry_price,
                        live: live.entry_price,
                    },
                    action: RecommendedAction::UpdateSaved,
                });
            }

            None
        }
    }
}

fn relative_drift(saved: Decimal, live: Decimal) -> Decimal {
    if saved.is_zero() {
        return if live.is_zero() { Decimal::ZERO } else { Decimal::MAX };
    }
    ((saved - live) / saved).abs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Direction;

    fn pos(qty: Decimal, price: Decimal) -> OpenPosition {
        OpenPosition::new("BTCUSDT", Direction::Long, qty, price, price - dec!(5)).unwrap()
    }

    #[test]
    fn agreement_within_tolerance_reports_nothing() {
        let saved = pos(dec!(1.0000), dec!(100.00));
        let live = pos(dec!(1.00005), dec!(100.00));
        assert!(reconcile("BTCUSDT", Some(&saved), Some(&live)).is_none());
    }

    #[test]
    fn direction_mismatch_recommends_adopt_live() {
        let saved = pos(dec!(1), dec!(100));
        let mut live = pos(dec!(1), dec!(100));
        live.direction = Direction::Short;
        let report = reconcile("BTCUSDT", Some(&saved), Some(&live)).unwrap();
        assert_eq!(report.action, RecommendedAction::AdoptLive);
        assert!(matches!(report.error, ReconciliationError::DirectionMismatch { .. }));
    }

    #[test]
    fn missing_live_recommends_clear_saved() {
        let saved = pos(dec!(1), dec!(100));
        let report = reconcile("BTCUSDT", Some(&saved), None).unwrap();
        assert_eq!(report.action, RecommendedAction::ClearSaved);
    }

    #[test]
    fn quantity_drift_beyond_tolerance_recommends_update_saved() {
        let saved = pos(dec!(1), dec!(100));
        let live = pos(dec!(1.5), dec!(100));
        let report = reconcile("BTCUSDT", Some(&saved), Some(&live)).unwrap();
        assert_eq!(report.action, RecommendedAction::UpdateSaved);
        assert!(matches!(report.error, ReconciliationError::QuantityDrift { .. }));
    }
}
