//! Weighted-vote ensemble over a set of strategies: collects one vote per
//! sub-strategy per candle, scores each signal kind, and emits the consensus
//! signal when a kind's weighted score clears `min_agreement`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::core::strategies::Strategy;
use crate::core::types::{SignalKind, TradeSignal};

#[derive(Debug, Clone)]
pub struct EnsembleSettings {
    pub min_agreement: Decimal,
    pub use_confidence_weighting: bool,
}

impl Default for EnsembleSettings {
    fn default() -> Self {
        Self {
            min_agreement: dec!(0.6),
            use_confidence_weighting: true,
        }
    }
}

struct Vote {
    kind: SignalKind,
    stop_loss: Option<Decimal>,
    take_profit: Option<Decimal>,
    confidence: Decimal,
    weight: Decimal,
    partial_exit_fraction: Option<Decimal>,
    move_breakeven: bool,
}

/// A weighted list of member strategies `(strategy, weight)`, `weight ∈ (0,1]`.
pub struct StrategyEnsemble {
    members: Vec<(Box<dyn Strategy>, Decimal)>,
    settings: EnsembleSettings,
}

impl StrategyEnsemble {
    pub fn new(members: Vec<(Box<dyn Strategy>, Decimal)>, settings: EnsembleSettings) -> Self {
        Self { members, settings }
    }

    fn collect_votes(&mut self, candle: &crate::core::types::Candle, symbol: &str) -> Vec<Vote> {
        self.members
            .iter_mut()
            .filter_map(|(strategy, weight)| {
                let signal = strategy.analyze(candle, symbol)?;
                let confidence = strategy
                    .state()
                    .get("confidence")
                    .unwrap_or(dec!(0.5));
                Some(Vote {
                    kind: signal.kind,
                    stop_loss: signal.stop_loss,
                    take_profit: signal.take_profit,
                    confidence,
                    weight: *weight,
                    partial_exit_fraction: signal.partial_exit_fraction,
                    move_breakeven: signal.move_stop_to_breakeven,
                })
            })
            .collect()
    }

    fn score(&self, votes: &[Vote], total_weight: Decimal, kind: SignalKind) -> Decimal {
        if total_weight.is_zero() {
            return Decimal::ZERO;
        }
        let sum: Decimal = votes
            .iter()
            .filter(|v| v.kind == kind)
            .map(|v| {
                v.weight
                    * if self.settings.use_confidence_weighting {
                        v.confidence
                    } else {
                        Decimal::ONE
                    }
            })
            .sum();
        sum / total_weight
    }

    pub fn analyze(
        &mut self,
        candle: &crate::core::types::Candle,
        has_position: bool,
        symbol: &str,
    ) -> Option<TradeSignal> {
        let total_weight: Decimal = self.members.iter().map(|(_, w)| *w).sum();
        let votes = self.collect_votes(candle, symbol);

        let exit_score = self.score(&votes, total_weight, SignalKind::Exit);
        let partial_score = self.score(&votes, total_weight, SignalKind::PartialExit);
        let buy_score = self.score(&votes, total_weight, SignalKind::Buy);
        let sell_score = self.score(&votes, total_weight, SignalKind::Sell);

        let threshold = self.settings.min_agreement;

        if has_position {
            if exit_score >= threshold {
                return TradeSignal::new(symbol, SignalKind::Exit, candle.close, "ensemble exit consensus").ok();
            }
            if partial_score >= threshold {
                let voters: Vec<&Vote> = votes.iter().filter(|v| v.kind == SignalKind::PartialExit).collect();
                if !voters.is_empty() {
                    let fraction_sum: Decimal = voters.iter().filter_map(|v| v.partial_exit_fraction).sum();
                    let fraction_count = voters.iter().filter(|v| v.partial_exit_fraction.is_some()).count();
                    let fraction = if fraction_count > 0 {
                        fraction_sum / Decimal::from(fraction_count as u64)
                    } else {
                        dec!(0.5)
                    };
                    let move_breakeven = voters.iter().any(|v| v.move_breakeven);
                    let stop = voters.iter().find_map(|v| v.stop_loss);

                    let mut signal = TradeSignal::new(
                        symbol,
                        SignalKind::PartialExit,
                        candle.close,
                        "ensemble partial exit consensus",
                    )
                    .ok()?
                    .with_partial_exit_fraction(fraction)
                    .ok()?;
                    if let Some(stop) = stop {
                        signal = signal.with_stop(stop);
                    }
                    if move_breakeven {
                        signal = signal.with_breakeven();
                    }
                    return Some(signal);
                }
            }
            return None;
        }

        let buy_reaches = buy_score >= threshold;
        let sell_reaches = sell_score >= threshold;

        // Contradictory consensus: neither side emits.
        if buy_reaches && sell_reaches {
            return None;
        }

        if buy_reaches {
            let voters: Vec<&Vote> = votes.iter().filter(|v| v.kind == SignalKind::Buy).collect();
            let stop = voters.iter().filter_map(|v| v.stop_loss).max();
            let take_profit = voters.iter().filter_map(|v| v.take_profit).min();
            let mut signal =
                TradeSignal::new(symbol, SignalKind::Buy, candle.close, "ensemble entry consensus (buy)").ok()?;
            if let Some(stop) = stop {
                signal = signal.with_stop(stop);
            }
            if let Some(tp) = take_profit {
                signal = signal.with_take_profit(tp);
            }
            return Some(signal);
        }

        if sell_reaches {
            let voters: Vec<&Vote> = votes.iter().filter(|v| v.kind == SignalKind::Sell).collect();
            let stop = voters.iter().filter_map(|v| v.stop_loss).min();
            let take_profit = voters.iter().filter_map(|v| v.take_profit).max();
            let mut signal =
                TradeSignal::new(symbol, SignalKind::Sell, candle.close, "ensemble entry consensus (sell)").ok()?;
            if let Some(stop) = stop {
                signal = signal.with_stop(stop);
            }
            if let Some(tp) = take_profit {
                signal = signal.with_take_profit(tp);
            }
            return Some(signal);
        }

        None
    }

    pub fn reset(&mut self) {
        for (strategy, _) in &mut self.members {
            strategy.reset();
        }
    }

    /// Weight-averaged ATR across members that currently report one. Feeds the
    /// risk manager's stop-distance floor the same way a single strategy's own
    /// ATR would.
    pub fn current_atr(&self) -> Option<Decimal> {
        let (weighted_sum, weight_total) = self
            .members
            .iter()
            .filter_map(|(strategy, weight)| strategy.current_atr().map(|atr| (atr * *weight, *weight)))
            .fold((Decimal::ZERO, Decimal::ZERO), |(sum, total), (w_atr, w)| (sum + w_atr, total + w));
        if weight_total.is_zero() {
            None
        } else {
            Some(weighted_sum / weight_total)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::strategies::{AdxTrendStrategy, MaCrossoverStrategy, RsiMeanReversionStrategy};
    use crate::core::strategies::adx_trend::AdxTrendConfig;
    use crate::core::strategies::ma_crossover::MaCrossoverConfig;
    use crate::core::strategies::rsi_mean_reversion::RsiMeanReversionConfig;
    use crate::core::types::Candle;
    use chrono::{TimeZone, Utc};

    fn candle(i: i64, c: Decimal) -> Candle {
        let t0 = Utc.timestamp_opt(i * 3600, 0).unwrap();
        let t1 = Utc.timestamp_opt((i + 1) * 3600, 0).unwrap();
        Candle::new(t0, c + dec!(1), c + dec!(2), c - dec!(2), c, dec!(1000), t1).unwrap()
    }

    #[test]
    fn contradictory_consensus_emits_neither() {
        let members: Vec<(Box<dyn Strategy>, Decimal)> = vec![
            (
                Box::new(AdxTrendStrategy::new(AdxTrendConfig::default())),
                dec!(0.5),
            ),
            (
                Box::new(RsiMeanReversionStrategy::new(RsiMeanReversionConfig::default())),
                dec!(0.25),
            ),
            (
                Box::new(MaCrossoverStrategy::new(MaCrossoverConfig::default())),
                dec!(0.25),
            ),
        ];
        let mut ensemble = StrategyEnsemble::new(members, EnsembleSettings::default());
        // Run a flat series; absent any votes, no consensus should ever be contradictory.
        for i in 0..30 {
            let result = ensemble.analyze(&candle(i, dec!(100)), false, "BTCUSDT");
            if let Some(sig) = result {
                assert!(!matches!(sig.kind, SignalKind::None));
            }
        }
    }

    #[test]
    fn empty_ensemble_never_signals() {
        let mut ensemble = StrategyEnsemble::new(vec![], EnsembleSettings::default());
        assert!(ensemble.analyze(&candle(0, dec!(100)), false, "BTCUSDT").is_none());
    }
}
