//! Where bars come from.
//!
//! A [`SeriesSource`] hands out validated daily bars, oldest first. The analysis core
//! trusts them as-is: weekend gaps are not filled and dates are not calendar-aligned.

use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::debug;

use crate::engine::{Bar, BarBuilder};
use crate::errors::{Error, Result};
use crate::utils::stable_hash;

/// Lowest price the random walk can reach.
const MIN_PRICE: f64 = 0.01;
/// Maximum intraday extension of the high/low beyond the open/close body.
const WICK: f64 = 0.01;
const MIN_VOLUME: u64 = 5_000_000;
const MAX_VOLUME: u64 = 15_000_000;
/// Upper bound of the bars reserved up front, about ten years of trading days.
const MAX_PREALLOCATED: usize = 2_520;

/// Supplies the daily bars of a ticker.
pub trait SeriesSource {
    /// Returns the bars of `ticker`, oldest first.
    fn bars(&self, ticker: &str) -> Result<Vec<Bar>>;
}

/// Settings of the [`RandomWalk`] generator.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomWalkConfig {
    /// Calendar days covered, weekends included (they produce no bar).
    pub days: u32,
    /// Last calendar day covered. Defaults to today (UTC).
    pub end: Option<NaiveDate>,
    /// Mixed with the ticker to seed the generator.
    pub seed: u64,
    /// Overrides the per-ticker starting price.
    pub start_price: Option<f64>,
    /// Daily drift, flipped at random.
    pub drift: f64,
    /// Half-width of the uniform daily return.
    pub daily_volatility: f64,
    /// Chance per bar that the drift changes sign.
    pub reversal_probability: f64,
}

impl Default for RandomWalkConfig {
    fn default() -> Self {
        Self {
            days: 730,
            end: None,
            seed: 0,
            start_price: None,
            drift: 0.0005,
            daily_volatility: 0.02,
            reversal_probability: 0.02,
        }
    }
}

/// Deterministic synthetic daily series.
///
/// The same ticker, seed and end date always give the same bars.
#[derive(Debug, Clone, Default)]
pub struct RandomWalk {
    config: RandomWalkConfig,
}

impl RandomWalk {
    pub fn new(config: RandomWalkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RandomWalkConfig {
        &self.config
    }

    /// Starting price of a ticker when none is configured.
    pub fn start_price(ticker: &str) -> f64 {
        match ticker {
            "AAPL" => 175.0,
            "TSLA" => 220.0,
            "NVDA" => 450.0,
            _ => 150.0,
        }
    }
}

fn cents(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

impl SeriesSource for RandomWalk {
    fn bars(&self, ticker: &str) -> Result<Vec<Bar>> {
        let ticker = ticker.trim().to_uppercase();
        if ticker.is_empty() {
            return Err(Error::EmptyTicker);
        }

        let config = &self.config;
        let end = config.end.unwrap_or_else(|| Utc::now().date_naive());
        let start = end
            .checked_sub_signed(Duration::days(i64::from(config.days)))
            .ok_or(Error::InvalidDays(config.days))?;
        let mut rng = StdRng::seed_from_u64(config.seed ^ stable_hash(&ticker));

        let mut price = config.start_price.unwrap_or_else(|| Self::start_price(&ticker));
        if price <= 0.0 || !price.is_finite() {
            return Err(Error::InvalidPrice(price));
        }
        let mut drift = config.drift;
        let mut bars = Vec::with_capacity((config.days as usize * 5 / 7 + 1).min(MAX_PREALLOCATED));

        for offset in 1..=config.days {
            let date = start + Duration::days(i64::from(offset));
            if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                continue;
            }

            if rng.random::<f64>() < config.reversal_probability {
                drift = -drift;
            }
            let change = (rng.random::<f64>() - 0.5) * config.daily_volatility * 2.0 + drift;

            let open = price;
            let close = (open * (1.0 + change)).max(MIN_PRICE);
            let high = open.max(close) * (1.0 + rng.random::<f64>() * WICK);
            let low = (open.min(close) * (1.0 - rng.random::<f64>() * WICK)).max(MIN_PRICE);
            let volume = rng.random_range(MIN_VOLUME..MAX_VOLUME);

            let bar = BarBuilder::builder()
                .date(date)
                .open(cents(open))
                .high(cents(high))
                .low(cents(low))
                .close(cents(close))
                .volume(volume)
                .build()?;
            bars.push(bar);
            price = close;
        }

        debug!(%ticker, %start, %end, bars = bars.len(), "generated random walk");
        Ok(bars)
    }
}

/// Bars stored as a JSON array, validated on load. The ticker is not used.
#[cfg(feature = "serde")]
#[derive(Debug, Clone)]
pub struct JsonFile {
    path: std::path::PathBuf,
}

#[cfg(feature = "serde")]
impl JsonFile {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[cfg(feature = "serde")]
impl SeriesSource for JsonFile {
    fn bars(&self, ticker: &str) -> Result<Vec<Bar>> {
        let bars = crate::utils::get_bars_from_file(&self.path)?;
        crate::engine::validate_series(&bars)?;
        debug!(ticker, path = %self.path.display(), bars = bars.len(), "loaded bars from file");
        Ok(bars)
    }
}

#[cfg(test)]
fn fixed_walk(seed: u64) -> RandomWalk {
    RandomWalk::new(RandomWalkConfig {
        end: NaiveDate::from_ymd_opt(2024, 6, 28),
        seed,
        ..Default::default()
    })
}

#[cfg(test)]
#[test]
fn same_seed_same_series() {
    let walk = fixed_walk(42);
    assert_eq!(walk.bars("AAPL").unwrap(), walk.bars("AAPL").unwrap());
    assert_eq!(walk.bars("aapl ").unwrap(), walk.bars("AAPL").unwrap());
    assert_ne!(walk.bars("AAPL").unwrap(), fixed_walk(43).bars("AAPL").unwrap());
    assert_ne!(walk.bars("AAPL").unwrap(), walk.bars("MSFT").unwrap());
}

#[cfg(test)]
#[test]
fn trading_days_only() {
    let bars = fixed_walk(1).bars("NVDA").unwrap();
    // 730 calendar days hold 104 or 105 weekends
    assert!((520..=522).contains(&bars.len()), "{} bars", bars.len());
    assert!(
        bars.iter()
            .all(|b| !matches!(b.date().weekday(), Weekday::Sat | Weekday::Sun))
    );
    assert_eq!(bars.last().unwrap().date(), NaiveDate::from_ymd_opt(2024, 6, 28).unwrap());
    assert!(crate::engine::validate_series(&bars).is_ok());
}

#[cfg(test)]
#[test]
fn walk_starts_at_ticker_price() {
    let walk = fixed_walk(3);
    assert_eq!(walk.bars("TSLA").unwrap()[0].open(), 220.0);
    assert_eq!(walk.bars("ZZZZ").unwrap()[0].open(), 150.0);

    let custom = RandomWalk::new(RandomWalkConfig {
        start_price: Some(12.5),
        ..walk.config().clone()
    });
    assert_eq!(custom.bars("TSLA").unwrap()[0].open(), 12.5);
}

#[cfg(test)]
#[test]
fn bars_are_chained_and_rounded() {
    let bars = fixed_walk(9).bars("AAPL").unwrap();
    for pair in bars.windows(2) {
        assert_eq!(pair[1].open(), pair[0].close());
    }
    for bar in &bars {
        assert!((MIN_VOLUME..MAX_VOLUME).contains(&bar.volume()));
        assert_eq!(cents(bar.close()), bar.close());
    }
}

#[cfg(test)]
#[test]
fn blank_ticker_is_rejected() {
    assert!(matches!(fixed_walk(0).bars("  "), Err(Error::EmptyTicker)));
}

#[cfg(test)]
#[test]
fn zero_days_is_empty() {
    let walk = RandomWalk::new(RandomWalkConfig {
        days: 0,
        ..fixed_walk(0).config().clone()
    });
    assert!(walk.bars("AAPL").unwrap().is_empty());
}

#[cfg(test)]
#[test]
fn days_beyond_calendar_are_rejected() {
    let walk = RandomWalk::new(RandomWalkConfig {
        days: u32::MAX,
        ..fixed_walk(0).config().clone()
    });
    assert!(matches!(walk.bars("AAPL"), Err(Error::InvalidDays(u32::MAX))));
}
