use chrono::NaiveDate;
use clap::Parser;
use quantflow::prelude::*;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use anyhow::{Result, bail};

/// Technical analysis of simulated daily price series.
#[derive(Parser, Debug)]
#[command(name = "quantflow", version, about)]
struct Cli {
    /// Tickers to analyze (e.g., AAPL TSLA NVDA).
    #[arg(required = true)]
    tickers: Vec<String>,

    /// Calendar days of history to generate.
    #[arg(long, default_value_t = 730)]
    days: u32,

    /// Seed mixed with each ticker for the random walk.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Last day of the series (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Window used for the performance line: 1M, 6M, 1Y or 2Y.
    #[arg(long, default_value = "6M")]
    range: TimeRange,

    /// Load bars from a JSON file instead of generating them (one ticker only).
    #[cfg(feature = "serde")]
    #[arg(long)]
    file: Option<std::path::PathBuf>,

    /// Print the full analysis as JSON.
    #[cfg(feature = "serde")]
    #[arg(long, default_value_t = false)]
    json: bool,
}

impl Cli {
    /// Rejects option combinations the sources cannot honor.
    fn check(&self) -> Result<()> {
        #[cfg(feature = "serde")]
        if self.file.is_some() && self.tickers.len() > 1 {
            bail!("--file holds a single series, got {} tickers", self.tickers.len());
        }
        Ok(())
    }
}

fn source(cli: &Cli) -> Box<dyn SeriesSource + Sync> {
    #[cfg(feature = "serde")]
    if let Some(path) = &cli.file {
        return Box::new(JsonFile::new(path));
    }

    Box::new(RandomWalk::new(RandomWalkConfig {
        days: cli.days,
        end: cli.end,
        seed: cli.seed,
        ..Default::default()
    }))
}

#[cfg(feature = "parallel")]
fn analyze(source: &(dyn SeriesSource + Sync), tickers: &[String]) -> Vec<quantflow::errors::Result<Analysis>> {
    analyze_many(source, tickers)
}

#[cfg(not(feature = "parallel"))]
fn analyze(source: &(dyn SeriesSource + Sync), tickers: &[String]) -> Vec<quantflow::errors::Result<Analysis>> {
    tickers.iter().map(|ticker| Analysis::from_source(source, ticker)).collect()
}

fn print_analysis(analysis: &Analysis, range: TimeRange) -> Result<()> {
    let latest = analysis.latest()?;
    let indicators = latest.indicators();
    let recommendation = analysis.recommendation();
    let show = |value: Option<f64>| value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"));

    println!("=== {} ({}) ===", analysis.ticker(), latest.date());
    match analysis.day_change() {
        Some((absolute, percent)) => {
            let arrow = if absolute >= 0.0 { '▲' } else { '▼' };
            println!(
                "Close: {:.2} {arrow} {:.2} ({:.2}%) Today",
                latest.close(),
                absolute.abs(),
                percent.abs()
            );
        }
        None => println!("Close: {:.2}", latest.close()),
    }
    if let Some(performance) = analysis.performance(range) {
        println!("Performance {range}: {performance:+.2}%");
    }
    println!(
        "SMA 20/50/200: {} / {} / {}",
        show(indicators.sma20),
        show(indicators.sma50),
        show(indicators.sma200)
    );
    println!("RSI: {}", show(indicators.rsi));
    match indicators.macd {
        Some(macd) => println!(
            "MACD: {:.3} (signal {:.3}, histogram {:+.3})",
            macd.line, macd.signal, macd.histogram
        ),
        None => println!("MACD: n/a"),
    }
    println!("Volatility: {}", show(indicators.volatility.map(|v| v * 100.0)));
    println!(
        "Recommendation: {} ({}% confidence, {} risk)",
        recommendation.direction(),
        recommendation.confidence(),
        recommendation.risk_level()
    );
    for factor in recommendation.factors() {
        println!("  [{:?}] {}: {}", factor.impact(), factor.name(), factor.description());
    }
    println!("{}", recommendation.summary());
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "quantflow=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    cli.check()?;
    let source = source(&cli);

    let mut failed = 0;
    for (ticker, result) in cli.tickers.iter().zip(analyze(source.as_ref(), &cli.tickers)) {
        let analysis = match result {
            Ok(analysis) => analysis,
            Err(err) => {
                tracing::error!(%ticker, %err, "analysis failed");
                failed += 1;
                continue;
            }
        };

        #[cfg(feature = "serde")]
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&analysis)?);
            continue;
        }

        print_analysis(&analysis, cli.range)?;
        println!();
    }

    if failed == cli.tickers.len() {
        bail!("no ticker could be analyzed");
    }
    Ok(())
}

#[cfg(all(test, feature = "serde"))]
#[test]
fn file_takes_a_single_ticker() {
    let parse = |args: &[&str]| Cli::try_parse_from(args).unwrap();

    assert!(parse(&["quantflow", "SPY", "--file", "spy.json"]).check().is_ok());
    assert!(parse(&["quantflow", "AAPL", "TSLA", "--file", "spy.json"]).check().is_err());
    assert!(parse(&["quantflow", "AAPL", "TSLA"]).check().is_ok());
}
