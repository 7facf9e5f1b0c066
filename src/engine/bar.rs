use chrono::NaiveDate;

use crate::errors::{Error, Result};

/// One trading day of OHLCV data.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
}

/// Unchecked construction, mostly for fixtures. Use [`BarBuilder`] for untrusted input.
impl From<(NaiveDate, f64, f64, f64, f64, u64)> for Bar {
    fn from((date, open, high, low, close, volume): (NaiveDate, f64, f64, f64, f64, u64)) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

impl Bar {
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn open(&self) -> f64 {
        self.open
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn close(&self) -> f64 {
        self.close
    }

    pub fn volume(&self) -> u64 {
        self.volume
    }

    /// Checks prices are positive and finite and that `low <= open, close <= high`.
    pub fn validate(&self) -> Result<()> {
        for price in [self.open, self.high, self.low, self.close] {
            if price <= 0.0 || !price.is_finite() {
                return Err(Error::InvalidPrice(price));
            }
        }
        let body_high = self.open.max(self.close);
        let body_low = self.open.min(self.close);
        if self.high < body_high || self.low > body_low {
            return Err(Error::InvalidRange(self.open, self.high, self.low, self.close));
        }
        Ok(())
    }
}

/// Validating builder for [`Bar`].
#[derive(Debug, Default)]
pub struct BarBuilder {
    date: Option<NaiveDate>,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: u64,
}

impl BarBuilder {
    pub fn builder() -> Self {
        Self::default()
    }

    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn open(mut self, open: f64) -> Self {
        self.open = Some(open);
        self
    }

    pub fn high(mut self, high: f64) -> Self {
        self.high = Some(high);
        self
    }

    pub fn low(mut self, low: f64) -> Self {
        self.low = Some(low);
        self
    }

    pub fn close(mut self, close: f64) -> Self {
        self.close = Some(close);
        self
    }

    pub fn volume(mut self, volume: u64) -> Self {
        self.volume = volume;
        self
    }

    pub fn build(self) -> Result<Bar> {
        let bar = Bar {
            date: self.date.ok_or(Error::MissingField("date"))?,
            open: self.open.ok_or(Error::MissingField("open"))?,
            high: self.high.ok_or(Error::MissingField("high"))?,
            low: self.low.ok_or(Error::MissingField("low"))?,
            close: self.close.ok_or(Error::MissingField("close"))?,
            volume: self.volume,
        };
        bar.validate()?;
        Ok(bar)
    }
}

/// Validates every bar and checks dates are strictly increasing.
pub fn validate_series(bars: &[Bar]) -> Result<()> {
    if bars.is_empty() {
        return Err(Error::EmptySeries);
    }
    for bar in bars {
        bar.validate()?;
    }
    for pair in bars.windows(2) {
        if pair[1].date <= pair[0].date {
            return Err(Error::UnorderedDates(pair[1].date, pair[0].date));
        }
    }
    Ok(())
}

#[cfg(test)]
fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

#[cfg(test)]
#[test]
fn build_valid_bar() {
    let bar = BarBuilder::builder()
        .date(day(4))
        .open(100.0)
        .high(110.0)
        .low(95.0)
        .close(105.0)
        .volume(1_000)
        .build()
        .unwrap();
    assert_eq!(bar.close(), 105.0);
    assert_eq!(bar.volume(), 1_000);
}

#[cfg(test)]
#[test]
fn build_missing_close() {
    let result = BarBuilder::builder().date(day(4)).open(100.0).high(110.0).low(95.0).build();
    assert!(matches!(result, Err(Error::MissingField("close"))));
}

#[cfg(test)]
#[test]
fn build_rejects_zero_price() {
    let result = BarBuilder::builder()
        .date(day(4))
        .open(0.0)
        .high(110.0)
        .low(95.0)
        .close(105.0)
        .build();
    assert!(matches!(result, Err(Error::InvalidPrice(_))));
}

#[cfg(test)]
#[test]
fn build_rejects_close_above_high() {
    let result = BarBuilder::builder()
        .date(day(4))
        .open(100.0)
        .high(104.0)
        .low(95.0)
        .close(105.0)
        .build();
    assert!(matches!(result, Err(Error::InvalidRange(..))));
}

#[cfg(test)]
#[test]
fn series_must_be_increasing() {
    let bars = vec![
        Bar::from((day(5), 100.0, 101.0, 99.0, 100.0, 1)),
        Bar::from((day(4), 100.0, 101.0, 99.0, 100.0, 1)),
    ];
    assert!(matches!(validate_series(&bars), Err(Error::UnorderedDates(..))));
    assert!(matches!(validate_series(&[]), Err(Error::EmptySeries)));
    assert!(validate_series(&bars[..1]).is_ok());
}
