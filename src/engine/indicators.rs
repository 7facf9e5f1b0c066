//! Per-bar technical indicators.
//!
//! Every series returned here has exactly the length of its input and is aligned
//! positionally with it. A value is `None` while there is not enough history, or
//! when the arithmetic stops being finite (a zero price in a log return, a NaN
//! close). Nothing non-finite is ever returned.
//!
//! Two initialisations are deliberately simpler than the textbook ones and the
//! decision thresholds depend on them:
//! - EMAs are seeded with the first value rather than a leading SMA, so they
//!   (and MACD) are defined from the first bar.
//! - RSI re-scans its trailing window at every bar, which is the
//!   "simple average of gains and losses" variant, not Wilder smoothing.

use std::ops::Deref;

use super::Bar;

/// Short simple moving average window.
pub const SMA_SHORT: usize = 20;
/// Medium simple moving average window.
pub const SMA_MEDIUM: usize = 50;
/// Long simple moving average window.
pub const SMA_LONG: usize = 200;
/// RSI lookback.
pub const RSI_WINDOW: usize = 14;
/// MACD fast EMA window.
pub const MACD_FAST: usize = 12;
/// MACD slow EMA window.
pub const MACD_SLOW: usize = 26;
/// MACD signal EMA window.
pub const MACD_SIGNAL: usize = 9;
/// Volatility lookback, in log returns.
pub const VOLATILITY_WINDOW: usize = 20;
/// Trading days per year used to annualize volatility.
pub const TRADING_DAYS: f64 = 252.0;

/// Largest `f64` below 100.
const BELOW_HUNDRED: f64 = 99.999_999_999_999_99;

/// MACD line, signal line and histogram for one bar.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Macd {
    /// `EMA12 - EMA26`.
    pub line: f64,
    /// EMA9 of the MACD line.
    pub signal: f64,
    /// `line - signal`.
    pub histogram: f64,
}

/// Indicators attached to one bar. `None` means "not enough history".
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IndicatorSet {
    pub sma20: Option<f64>,
    pub sma50: Option<f64>,
    pub sma200: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<Macd>,
    /// Annualized standard deviation of daily log returns.
    pub volatility: Option<f64>,
}

/// A bar together with its indicators.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedBar {
    #[cfg_attr(feature = "serde", serde(flatten))]
    bar: Bar,
    #[cfg_attr(feature = "serde", serde(flatten))]
    indicators: IndicatorSet,
}

impl Deref for AnalyzedBar {
    type Target = Bar;

    fn deref(&self) -> &Self::Target {
        &self.bar
    }
}

impl AnalyzedBar {
    pub fn new(bar: Bar, indicators: IndicatorSet) -> Self {
        Self { bar, indicators }
    }

    pub fn bar(&self) -> &Bar {
        &self.bar
    }

    pub fn indicators(&self) -> &IndicatorSet {
        &self.indicators
    }
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Annotates every bar with its [`IndicatorSet`].
///
/// Never reorders or drops bars; an empty input gives an empty output.
pub fn compute_indicators(bars: &[Bar]) -> Vec<AnalyzedBar> {
    let closes = bars.iter().map(Bar::close).collect::<Vec<_>>();

    let sma20 = sma(&closes, SMA_SHORT);
    let sma50 = sma(&closes, SMA_MEDIUM);
    let sma200 = sma(&closes, SMA_LONG);
    let rsi = rsi(&closes, RSI_WINDOW);
    let macd = macd(&closes);
    let volatility = volatility(&closes, VOLATILITY_WINDOW);

    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let indicators = IndicatorSet {
                sma20: sma20[i],
                sma50: sma50[i],
                sma200: sma200[i],
                rsi: rsi[i],
                macd: macd[i],
                volatility: volatility[i],
            };
            AnalyzedBar::new(bar.clone(), indicators)
        })
        .collect()
}

/// Simple moving average of the trailing `window` values.
pub fn sma(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    (0..closes.len())
        .map(|i| {
            if window == 0 || i + 1 < window {
                return None;
            }
            let slice = &closes[i + 1 - window..=i];
            finite(slice.iter().sum::<f64>() / window as f64)
        })
        .collect()
}

/// Relative strength index over the trailing `window` price changes.
///
/// Undefined for the first `window` bars. An average loss of exactly zero gives 100;
/// any loss keeps the value strictly below 100.
pub fn rsi(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    (0..closes.len())
        .map(|i| {
            if window == 0 || i < window {
                return None;
            }
            let (gains, losses) = closes[i - window..=i]
                .windows(2)
                .fold((0.0, 0.0), |(gains, losses), pair| {
                    let change = pair[1] - pair[0];
                    if change > 0.0 {
                        (gains + change, losses)
                    } else {
                        (gains, losses - change)
                    }
                });
            let avg_gain = gains / window as f64;
            let avg_loss = losses / window as f64;

            if avg_loss == 0.0 {
                return avg_gain.is_finite().then_some(100.0);
            }
            // a real loss keeps the value below 100 even when it rounds away
            finite(100.0 - 100.0 / (1.0 + avg_gain / avg_loss)).map(|value| value.min(BELOW_HUNDRED))
        })
        .collect()
}

/// Exponential moving average seeded with the first value.
///
/// `ema[i] = v[i] * k + ema[i - 1] * (1 - k)` with `k = 2 / (window + 1)`.
pub fn ema(values: &[f64], window: usize) -> Vec<f64> {
    let k = 2.0 / (window as f64 + 1.0);
    let mut output = Vec::with_capacity(values.len());
    let mut previous: Option<f64> = None;

    for &value in values {
        let current = match previous {
            None => value,
            Some(previous) => value * k + previous * (1.0 - k),
        };
        output.push(current);
        previous = Some(current);
    }

    output
}

/// MACD (12, 26, 9), defined from the first bar where it is `{0, 0, 0}`.
pub fn macd(closes: &[f64]) -> Vec<Option<Macd>> {
    let fast = ema(closes, MACD_FAST);
    let slow = ema(closes, MACD_SLOW);
    let line = fast.iter().zip(&slow).map(|(fast, slow)| fast - slow).collect::<Vec<_>>();
    let signal = ema(&line, MACD_SIGNAL);

    line.iter()
        .zip(&signal)
        .map(|(&line, &signal)| {
            let histogram = line - signal;
            (line.is_finite() && signal.is_finite() && histogram.is_finite()).then_some(Macd {
                line,
                signal,
                histogram,
            })
        })
        .collect()
}

/// Annualized volatility: population standard deviation of the trailing `window`
/// log returns, scaled by `sqrt(252)`.
pub fn volatility(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    (0..closes.len())
        .map(|i| {
            if window == 0 || i < window {
                return None;
            }
            let returns = closes[i - window..=i]
                .windows(2)
                .map(|pair| (pair[1] / pair[0]).ln())
                .collect::<Vec<_>>();
            let n = returns.len() as f64;
            let mean = returns.iter().sum::<f64>() / n;
            let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
            finite(variance.sqrt() * TRADING_DAYS.sqrt())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use proptest::prelude::*;
    use ta::Next;
    use ta::indicators::{ExponentialMovingAverage, MovingAverageConvergenceDivergence, SimpleMovingAverage};

    const EPSILON: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < EPSILON,
            "actual={actual}, expected={expected}, diff={}",
            (actual - expected).abs()
        );
    }

    fn make_bars(closes: &[f64]) -> Vec<Bar> {
        let first_day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let open = if i == 0 { close } else { closes[i - 1] };
                let date = first_day + Duration::days(i as i64);
                Bar::from((date, open, open.max(close) + 1.0, open.min(close) - 1.0, close, 1_000))
            })
            .collect()
    }

    fn wave(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + 0.3 * i as f64 + 5.0 * (i as f64 * 0.37).sin())
            .collect()
    }

    #[test]
    fn output_aligned_with_input() {
        for n in [0, 1, 2, 19, 20, 21, 199, 200, 250] {
            let bars = make_bars(&wave(n));
            let analyzed = compute_indicators(&bars);
            assert_eq!(analyzed.len(), n);
            for (bar, point) in bars.iter().zip(&analyzed) {
                assert_eq!(bar, point.bar());
            }
        }
    }

    #[test]
    fn sma_is_trailing_mean() {
        let closes = wave(60);
        let values = sma(&closes, 20);
        for (i, value) in values.iter().enumerate() {
            if i < 19 {
                assert_eq!(*value, None);
            } else {
                let expected = closes[i - 19..=i].iter().sum::<f64>() / 20.0;
                assert_eq!(*value, Some(expected));
            }
        }
    }

    #[test]
    fn sma_matches_ta() {
        let closes = wave(300);
        let values = sma(&closes, SMA_MEDIUM);
        let mut reference = SimpleMovingAverage::new(SMA_MEDIUM).unwrap();
        for (i, &close) in closes.iter().enumerate() {
            let expected = reference.next(close);
            if i + 1 >= SMA_MEDIUM {
                assert_approx(values[i].unwrap(), expected);
            }
        }
    }

    #[test]
    fn ema_seeded_with_first_value() {
        let values = ema(&[10.0, 20.0], 3);
        assert_eq!(values[0], 10.0);
        // k = 0.5
        assert_eq!(values[1], 15.0);
        assert!(ema(&[], 3).is_empty());
    }

    #[test]
    fn ema_matches_ta() {
        let closes = wave(120);
        let values = ema(&closes, MACD_FAST);
        let mut reference = ExponentialMovingAverage::new(MACD_FAST).unwrap();
        for (value, &close) in values.iter().zip(&closes) {
            assert_approx(*value, reference.next(close));
        }
    }

    #[test]
    fn macd_matches_ta() {
        let closes = wave(120);
        let values = macd(&closes);
        let mut reference = MovingAverageConvergenceDivergence::new(MACD_FAST, MACD_SLOW, MACD_SIGNAL).unwrap();
        for (value, &close) in values.iter().zip(&closes) {
            let expected = reference.next(close);
            let value = value.unwrap();
            assert_approx(value.line, expected.macd);
            assert_approx(value.signal, expected.signal);
            assert_approx(value.histogram, expected.histogram);
        }
    }

    #[test]
    fn macd_defined_from_first_bar() {
        let analyzed = compute_indicators(&make_bars(&wave(3)));
        let first = analyzed[0].indicators().macd;
        assert_eq!(
            first,
            Some(Macd {
                line: 0.0,
                signal: 0.0,
                histogram: 0.0
            })
        );
        assert!(analyzed.iter().all(|p| p.indicators().macd.is_some()));
    }

    #[test]
    fn rsi_window_rescan() {
        let values = rsi(&[1.0, 2.0, 1.0, 2.0, 3.0], 2);
        assert_eq!(values, vec![None, None, Some(50.0), Some(50.0), Some(100.0)]);
    }

    #[test]
    fn tiny_loss_stays_below_hundred() {
        let mut closes = vec![1.0, 1.0 - 1e-12];
        for _ in 0..13 {
            closes.push(closes[closes.len() - 1] + 1e4);
        }

        let value = rsi(&closes, RSI_WINDOW)[RSI_WINDOW].unwrap();
        assert!(value < 100.0);
        assert_eq!(value, BELOW_HUNDRED);
    }

    #[test]
    fn rsi_extremes() {
        let rising = (0..30).map(|i| 100.0 + i as f64).collect::<Vec<_>>();
        let falling = (0..30).map(|i| 100.0 - i as f64).collect::<Vec<_>>();
        let flat = vec![100.0; 30];

        assert!(rsi(&rising, RSI_WINDOW)[RSI_WINDOW..].iter().all(|v| *v == Some(100.0)));
        assert!(rsi(&falling, RSI_WINDOW)[RSI_WINDOW..].iter().all(|v| *v == Some(0.0)));
        // no losses at all, so 100 even without gains
        assert!(rsi(&flat, RSI_WINDOW)[RSI_WINDOW..].iter().all(|v| *v == Some(100.0)));
    }

    #[test]
    fn rsi_undefined_inside_first_window() {
        let values = rsi(&wave(40), RSI_WINDOW);
        assert!(values[..RSI_WINDOW].iter().all(Option::is_none));
        assert!(values[RSI_WINDOW..].iter().all(Option::is_some));
    }

    #[test]
    fn volatility_of_symmetric_moves() {
        let values = volatility(&[100.0, 110.0, 100.0], 2);
        assert_eq!(values[0], None);
        assert_eq!(values[1], None);
        assert_approx(values[2].unwrap(), 1.1f64.ln() * TRADING_DAYS.sqrt());
    }

    #[test]
    fn volatility_of_constant_growth_is_zero() {
        let mut closes = vec![100.0];
        for _ in 0..40 {
            closes.push(closes[closes.len() - 1] * 1.01);
        }
        let values = volatility(&closes, VOLATILITY_WINDOW);
        assert!(values[..VOLATILITY_WINDOW].iter().all(Option::is_none));
        for value in &values[VOLATILITY_WINDOW..] {
            assert!(value.unwrap() < 1e-9);
        }
    }

    #[test]
    fn zero_price_is_undefined_not_nan() {
        let mut closes = wave(60);
        closes[30] = 0.0;
        let values = volatility(&closes, VOLATILITY_WINDOW);
        for (i, value) in values.iter().enumerate() {
            if (30..=50).contains(&i) {
                assert_eq!(*value, None, "bar {i}");
            } else if i >= VOLATILITY_WINDOW {
                assert!(value.is_some(), "bar {i}");
            }
        }
    }

    #[test]
    fn nan_close_never_leaks() {
        let mut closes = wave(260);
        closes[210] = f64::NAN;
        let analyzed = compute_indicators(&make_bars(&closes));
        for point in &analyzed {
            let set = point.indicators();
            for value in [set.sma20, set.sma50, set.sma200, set.rsi, set.volatility].into_iter().flatten() {
                assert!(value.is_finite());
            }
            if let Some(macd) = set.macd {
                assert!(macd.line.is_finite() && macd.signal.is_finite() && macd.histogram.is_finite());
            }
        }
        assert_eq!(analyzed[259].indicators().macd, None);
    }

    #[test]
    fn recompute_is_identical() {
        let bars = make_bars(&wave(250));
        assert_eq!(compute_indicators(&bars), compute_indicators(&bars));
    }

    proptest! {
        #[test]
        fn aligned_and_bounded(closes in prop::collection::vec(1.0f64..1_000.0, 0..260)) {
            let analyzed = compute_indicators(&make_bars(&closes));
            prop_assert_eq!(analyzed.len(), closes.len());

            for (i, point) in analyzed.iter().enumerate() {
                let set = point.indicators();
                prop_assert_eq!(set.sma20.is_some(), i + 1 >= SMA_SHORT);
                prop_assert_eq!(set.sma200.is_some(), i + 1 >= SMA_LONG);
                prop_assert_eq!(set.volatility.is_some(), i >= VOLATILITY_WINDOW);
                if let Some(rsi) = set.rsi {
                    prop_assert!((0.0..=100.0).contains(&rsi));
                }
                if let Some(volatility) = set.volatility {
                    prop_assert!(volatility >= 0.0);
                }
            }
        }

        #[test]
        fn rsi_hundred_iff_no_losses(closes in prop::collection::vec(1.0f64..1_000.0, 15..60)) {
            let values = rsi(&closes, RSI_WINDOW);
            for i in RSI_WINDOW..closes.len() {
                let no_losses = closes[i - RSI_WINDOW..=i].windows(2).all(|pair| pair[1] >= pair[0]);
                prop_assert_eq!(values[i] == Some(100.0), no_losses);
            }
        }
    }
}
