use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use decision_core::app::AppConfig;
use decision_core::core::backtest::BacktestEngine;
use decision_core::core::ensemble::StrategyEnsemble;
use decision_core::core::strategies::adx_trend::AdxTrendConfig;
use decision_core::core::strategies::ma_crossover::MaCrossoverConfig;
use decision_core::core::strategies::rsi_mean_reversion::RsiMeanReversionConfig;
use decision_core::core::strategies::{AdxTrendStrategy, MaCrossoverStrategy, RsiMeanReversionStrategy, Strategy};
use decision_core::core::types::Candle;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "backtest", about = "Replay a candle fixture through the ensemble strategy")]
struct Cli {
    /// Path to a CSV file of candles: open_time,open,high,low,close,volume,close_time
    #[arg(long)]
    candles: Option<String>,

    /// Symbol label used in reported trades
    #[arg(long)]
    symbol: Option<String>,

    /// Print results as JSON instead of the human-readable summary
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Deserialize)]
struct CsvCandle {
    open_time: DateTime<Utc>,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: Decimal,
    close_time: DateTime<Utc>,
}

fn load_candles(path: &str) -> Result<Vec<Candle>> {
    let mut reader = csv::Reader::from_path(path).with_context(|| format!("opening candle file {path}"))?;
    let mut candles = Vec::new();
    for record in reader.deserialize() {
        let row: CsvCandle = record.with_context(|| format!("parsing candle row in {path}"))?;
        let candle = Candle::new(row.open_time, row.open, row.high, row.low, row.close, row.volume, row.close_time)
            .with_context(|| "invalid candle row")?;
        candles.push(candle);
    }
    Ok(candles)
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env().context("loading configuration")?;
    if let Some(symbol) = cli.symbol {
        config.symbol = symbol;
    }
    if let Some(candles) = cli.candles {
        config.candle_path = candles;
    }
    config.validate().context("validating configuration")?;

    let candles = load_candles(&config.candle_path)?;
    if candles.is_empty() {
        anyhow::bail!("no candles loaded from {}", config.candle_path);
    }

    let members: Vec<(Box<dyn Strategy>, Decimal)> = vec![
        (
            Box::new(AdxTrendStrategy::new(AdxTrendConfig::default())),
            dec!(0.4),
        ),
        (
            Box::new(RsiMeanReversionStrategy::new(RsiMeanReversionConfig::default())),
            dec!(0.3),
        ),
        (
            Box::new(MaCrossoverStrategy::new(MaCrossoverConfig::default())),
            dec!(0.3),
        ),
    ];
    let ensemble = StrategyEnsemble::new(members, config.ensemble.clone());

    let mut strategy = EnsembleStrategyAdapter::new(ensemble);
    let mut engine = BacktestEngine::new(config.backtest.clone(), config.risk.clone());
    let results = engine.run(&mut strategy, &candles, &config.symbol);
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&results).context("serializing results")?);
    } else {
        results.print_summary();
    }

    Ok(())
}

/// Adapts the weighted-vote ensemble (whose `analyze` needs the caller to
/// track `has_position` externally) to the single-strategy `Strategy`
/// interface the backtest engine drives.
struct EnsembleStrategyAdapter {
    ensemble: StrategyEnsemble,
    has_position: bool,
}

impl EnsembleStrategyAdapter {
    fn new(ensemble: StrategyEnsemble) -> Self {
        Self {
            ensemble,
            has_position: false,
        }
    }
}

impl Strategy for EnsembleStrategyAdapter {
    fn analyze(&mut self, candle: &Candle, symbol: &str) -> Option<decision_core::core::types::TradeSignal> {
        use decision_core::core::types::SignalKind;

        let signal = self.ensemble.analyze(candle, self.has_position, symbol);
        if let Some(signal) = &signal {
            match signal.kind {
                SignalKind::Buy | SignalKind::Sell => self.has_position = true,
                SignalKind::Exit => self.has_position = false,
                _ => {}
            }
        }
        signal
    }

    fn current_stop_loss(&self) -> Option<Decimal> {
        None
    }

    fn current_atr(&self) -> Option<Decimal> {
        self.ensemble.current_atr()
    }

    fn state(&self) -> decision_core::core::types::StrategyState {
        decision_core::core::types::StrategyState::default()
    }

    fn reset(&mut self) {
        self.ensemble.reset();
        self.has_position = false;
    }
}
