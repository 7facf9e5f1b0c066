//! Core analysis pipeline.
//!
//! This module provides the fundamental types:
//! - `Bar`: OHLCV data for one trading day.
//! - `IndicatorSet`: SMA, RSI, MACD and volatility attached to a bar.
//! - `Recommendation`: scored BUY/SELL/HOLD with its factors.
//! - `Analysis`: one ticker run through the whole pipeline.

mod bar;
mod decision;
mod indicators;

use std::str::FromStr;

use tracing::info;

use crate::{
    PercentCalculus,
    assistant::ChatContext,
    errors::{Error, Result},
    market::SeriesSource,
};

pub use bar::*;
pub use decision::*;
pub use indicators::*;

/// Chart window over the most recent bars.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeRange {
    /// One month.
    #[cfg_attr(feature = "serde", serde(rename = "1M"))]
    OneMonth,
    /// Six months.
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "6M"))]
    SixMonths,
    /// One year.
    #[cfg_attr(feature = "serde", serde(rename = "1Y"))]
    OneYear,
    /// Two years.
    #[cfg_attr(feature = "serde", serde(rename = "2Y"))]
    TwoYears,
}

impl TimeRange {
    /// Number of trading bars in the window.
    pub fn bars(&self) -> usize {
        match self {
            Self::OneMonth => 21,
            Self::SixMonths => 126,
            Self::OneYear => 252,
            Self::TwoYears => 504,
        }
    }
}

impl FromStr for TimeRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "1M" => Ok(Self::OneMonth),
            "6M" => Ok(Self::SixMonths),
            "1Y" => Ok(Self::OneYear),
            "2Y" => Ok(Self::TwoYears),
            _ => Err(Error::InvalidTimeRange(s.to_string())),
        }
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::OneMonth => "1M",
            Self::SixMonths => "6M",
            Self::OneYear => "1Y",
            Self::TwoYears => "2Y",
        };
        f.write_str(label)
    }
}

/// A ticker's bars with their indicators and the resulting recommendation.
///
/// Each analysis is computed from scratch; nothing is shared between runs.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    ticker: String,
    points: Vec<AnalyzedBar>,
    recommendation: Recommendation,
}

impl Analysis {
    /// Runs the indicator and decision engines over `bars`.
    ///
    /// ### Arguments
    /// * `ticker` - Symbol the bars belong to.
    /// * `bars` - Daily bars, oldest first.
    ///
    /// ### Returns
    /// The analysis, or [`Error::EmptySeries`] when there is no bar.
    pub fn new(ticker: impl ToString, bars: &[Bar]) -> Result<Self> {
        if bars.is_empty() {
            return Err(Error::EmptySeries);
        }

        let ticker = ticker.to_string();
        let points = compute_indicators(bars);
        let recommendation = recommend(&points);
        info!(
            %ticker,
            bars = points.len(),
            direction = %recommendation.direction(),
            confidence = recommendation.confidence(),
            risk = %recommendation.risk_level(),
            "analysis complete"
        );

        Ok(Self {
            ticker,
            points,
            recommendation,
        })
    }

    /// Fetches the bars of `ticker` from `source` and analyzes them.
    pub fn from_source<S: SeriesSource + ?Sized>(source: &S, ticker: &str) -> Result<Self> {
        let bars = source.bars(ticker)?;
        Self::new(ticker.trim().to_uppercase(), &bars)
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// All analyzed bars, oldest first.
    pub fn points(&self) -> &[AnalyzedBar] {
        &self.points
    }

    pub fn recommendation(&self) -> &Recommendation {
        &self.recommendation
    }

    /// The most recent analyzed bar.
    pub fn latest(&self) -> Result<&AnalyzedBar> {
        self.points.last().ok_or(Error::EmptySeries)
    }

    /// Close of the most recent bar.
    pub fn current_price(&self) -> Result<f64> {
        Ok(self.latest()?.close())
    }

    /// The trailing bars covered by `range`, or every bar when the series is shorter.
    pub fn window(&self, range: TimeRange) -> &[AnalyzedBar] {
        let start = self.points.len().saturating_sub(range.bars());
        &self.points[start..]
    }

    /// Percentage change of the close across `range`, `None` with fewer than two bars.
    pub fn performance(&self, range: TimeRange) -> Option<f64> {
        match self.window(range) {
            [first, .., last] => Some(first.close().change(last.close())),
            _ => None,
        }
    }

    /// Latest day-over-day change of the close as `(absolute, percent)`.
    ///
    /// `None` with fewer than two bars.
    pub fn day_change(&self) -> Option<(f64, f64)> {
        match self.points.as_slice() {
            [.., previous, latest] => Some((
                latest.close() - previous.close(),
                previous.close().change(latest.close()),
            )),
            _ => None,
        }
    }

    /// The context handed to the conversational explainer.
    pub fn chat_context(&self) -> Result<ChatContext> {
        Ok(ChatContext {
            ticker: self.ticker.clone(),
            current_price: self.current_price()?,
            direction: self.recommendation.direction(),
            confidence: self.recommendation.confidence(),
            risk_level: self.recommendation.risk_level(),
        })
    }
}

#[cfg(test)]
fn sample_bars(n: usize) -> Vec<Bar> {
    use chrono::{Duration, NaiveDate};

    let first_day = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + 0.2 * i as f64 + 4.0 * (i as f64 * 0.21).sin();
            let open = close - 0.5;
            let date = first_day + Duration::days(i as i64);
            Bar::from((date, open, close + 1.0, open - 1.0, close, 1_000))
        })
        .collect()
}

#[cfg(test)]
#[test]
fn empty_series_is_an_error() {
    assert!(matches!(Analysis::new("AAPL", &[]), Err(Error::EmptySeries)));
}

#[cfg(test)]
#[test]
fn short_series_holds_with_no_confidence() {
    let analysis = Analysis::new("AAPL", &sample_bars(150)).unwrap();
    assert_eq!(analysis.points().len(), 150);
    assert_eq!(analysis.recommendation(), &Recommendation::insufficient_data());
}

#[cfg(test)]
#[test]
fn analysis_is_idempotent() {
    let bars = sample_bars(300);
    let first = Analysis::new("AAPL", &bars).unwrap();
    let second = Analysis::new("AAPL", &bars).unwrap();
    assert_eq!(first, second);
    assert_ne!(first.recommendation(), &Recommendation::insufficient_data());
}

#[cfg(test)]
#[test]
fn window_and_performance() {
    let bars = sample_bars(300);
    let analysis = Analysis::new("AAPL", &bars).unwrap();

    let month = analysis.window(TimeRange::OneMonth);
    assert_eq!(month.len(), 21);
    assert_eq!(month.last().unwrap().date(), bars[299].date());
    assert_eq!(analysis.window(TimeRange::TwoYears).len(), 300);

    let expected = (bars[299].close() - bars[279].close()) / bars[279].close() * 100.0;
    let performance = analysis.performance(TimeRange::OneMonth).unwrap();
    assert!((performance - expected).abs() < 1e-9);

    let single = Analysis::new("AAPL", &bars[..1]).unwrap();
    assert_eq!(single.performance(TimeRange::OneMonth), None);
}

#[cfg(test)]
#[test]
fn day_change_from_last_two_bars() {
    let bars = sample_bars(30);
    let analysis = Analysis::new("AAPL", &bars).unwrap();
    let (absolute, percent) = analysis.day_change().unwrap();
    assert!((absolute - (bars[29].close() - bars[28].close())).abs() < 1e-9);
    assert!((percent - absolute / bars[28].close() * 100.0).abs() < 1e-9);

    let single = Analysis::new("AAPL", &bars[..1]).unwrap();
    assert_eq!(single.day_change(), None);
}

#[cfg(test)]
#[test]
fn chat_context_from_latest_bar() {
    let bars = sample_bars(300);
    let analysis = Analysis::new("MSFT", &bars).unwrap();
    let context = analysis.chat_context().unwrap();
    assert_eq!(context.ticker, "MSFT");
    assert_eq!(context.current_price, bars[299].close());
    assert_eq!(context.direction, analysis.recommendation().direction());
    assert_eq!(context.confidence, analysis.recommendation().confidence());
    assert_eq!(context.risk_level, analysis.recommendation().risk_level());
}

#[cfg(test)]
#[test]
fn parse_time_range() {
    assert_eq!("1m".parse::<TimeRange>().unwrap(), TimeRange::OneMonth);
    assert_eq!("2Y".parse::<TimeRange>().unwrap(), TimeRange::TwoYears);
    assert_eq!(TimeRange::default().to_string(), "6M");
    assert!(matches!("3W".parse::<TimeRange>(), Err(Error::InvalidTimeRange(_))));
}
