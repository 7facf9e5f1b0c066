//! Scored BUY/SELL/HOLD recommendation from the latest two analyzed bars.

use std::fmt;

use tracing::debug;

use super::AnalyzedBar;

/// Score above which the model recommends a buy (and below whose negation, a sell).
const DIRECTION_THRESHOLD: i32 = 25;
/// Score magnitude mapped to 100% confidence.
const SCORE_SCALE: f64 = 60.0;
const MAX_CONFIDENCE: u8 = 99;
const HOLD_MIN_CONFIDENCE: u8 = 40;

const RSI_OVERSOLD: f64 = 30.0;
const RSI_OVERBOUGHT: f64 = 70.0;
const LOW_VOLATILITY: f64 = 0.20;
const HIGH_VOLATILITY: f64 = 0.40;

const INSUFFICIENT_DATA: &str = "Insufficient data to generate a recommendation.";

/// Recommended action.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => f.write_str("BUY"),
            Self::Sell => f.write_str("SELL"),
            Self::Hold => f.write_str("HOLD"),
        }
    }
}

/// Risk tier, driven by realized volatility.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => f.write_str("LOW"),
            Self::Medium => f.write_str("MEDIUM"),
            Self::High => f.write_str("HIGH"),
        }
    }
}

/// How a factor pushed the score.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Impact {
    Positive,
    Negative,
    Neutral,
}

/// One named explanation behind a recommendation.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Factor {
    name: String,
    impact: Impact,
    description: String,
}

impl Factor {
    fn new(name: &str, impact: Impact, description: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            impact,
            description: description.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn impact(&self) -> Impact {
        self.impact
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Output of the decision model.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    direction: Direction,
    confidence: u8,
    risk_level: RiskLevel,
    factors: Vec<Factor>,
    summary: String,
}

impl Recommendation {
    /// The answer given when the latest bar lacks a required indicator.
    pub fn insufficient_data() -> Self {
        Self {
            direction: Direction::Hold,
            confidence: 0,
            risk_level: RiskLevel::High,
            factors: Vec::new(),
            summary: INSUFFICIENT_DATA.to_string(),
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Confidence in percent, in `0..=99`.
    pub fn confidence(&self) -> u8 {
        self.confidence
    }

    pub fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }

    /// Factors in the order they were evaluated.
    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }
}

/// Scores the latest bar of `series` against the previous one.
///
/// ### Scoring
/// | Signal      | Condition                                  | Score      |
/// |-------------|--------------------------------------------|------------|
/// | Trend       | close > SMA200 / otherwise                 | +20 / -20  |
/// | Golden cross| SMA50 > SMA200                             | +10        |
/// | RSI         | < 30 / > 70                                | +20 / -20  |
/// | MACD        | histogram turns positive / > 0 / < 0       | +15 / +5 / -5 |
/// | Volatility  | < 0.20 (LOW risk) / > 0.40 (HIGH risk)     | +10 / -15  |
///
/// Fewer than two bars, or an undefined SMA50, SMA200, RSI, MACD or volatility
/// on the latest bar, gives [`Recommendation::insufficient_data`].
pub fn recommend(series: &[AnalyzedBar]) -> Recommendation {
    let [.., previous, latest] = series else {
        return Recommendation::insufficient_data();
    };
    let indicators = latest.indicators();
    let (Some(sma50), Some(sma200), Some(rsi), Some(macd), Some(volatility)) = (
        indicators.sma50,
        indicators.sma200,
        indicators.rsi,
        indicators.macd,
        indicators.volatility,
    ) else {
        return Recommendation::insufficient_data();
    };

    let mut score: i32 = 0;
    let mut factors = Vec::new();

    // trend
    if latest.close() > sma200 {
        score += 20;
        factors.push(Factor::new(
            "Long-term Trend",
            Impact::Positive,
            "Price is above the 200-day average, indicating a bullish long-term trend.",
        ));
    } else {
        score -= 20;
        factors.push(Factor::new(
            "Long-term Trend",
            Impact::Negative,
            "Price is below the 200-day average, indicating a bearish trend.",
        ));
    }

    if sma50 > sma200 {
        score += 10;
        factors.push(Factor::new(
            "Golden Cross",
            Impact::Positive,
            "Golden cross: the 50-day average is above the 200-day average.",
        ));
    }

    // momentum
    if rsi < RSI_OVERSOLD {
        score += 20;
        factors.push(Factor::new(
            "RSI",
            Impact::Positive,
            "RSI indicates oversold conditions (potential bounce).",
        ));
    } else if rsi > RSI_OVERBOUGHT {
        score -= 20;
        factors.push(Factor::new(
            "RSI",
            Impact::Negative,
            "RSI indicates overbought conditions (potential pullback).",
        ));
    } else {
        factors.push(Factor::new("RSI", Impact::Neutral, format!("RSI neutral at {rsi:.1}.")));
    }

    let crossed_up = previous.indicators().macd.is_some_and(|m| m.histogram <= 0.0);
    if macd.histogram > 0.0 && crossed_up {
        score += 15;
        factors.push(Factor::new(
            "MACD",
            Impact::Positive,
            "MACD histogram just turned positive (bullish crossover).",
        ));
    } else if macd.histogram > 0.0 {
        score += 5;
    } else if macd.histogram < 0.0 {
        score -= 5;
    }

    // risk
    let risk_level = if volatility < LOW_VOLATILITY {
        score += 10;
        factors.push(Factor::new(
            "Volatility",
            Impact::Positive,
            "Low volatility, suggesting stable conditions.",
        ));
        RiskLevel::Low
    } else if volatility > HIGH_VOLATILITY {
        score -= 15;
        factors.push(Factor::new(
            "Volatility",
            Impact::Negative,
            "High volatility detected. Risk is elevated.",
        ));
        RiskLevel::High
    } else {
        factors.push(Factor::new(
            "Volatility",
            Impact::Neutral,
            "Normal volatility, within usual bounds.",
        ));
        RiskLevel::Medium
    };

    let raw_confidence = (f64::from(score.abs()) / SCORE_SCALE * 100.0).round().min(f64::from(MAX_CONFIDENCE)) as u8;
    let (direction, confidence) = if score > DIRECTION_THRESHOLD {
        (Direction::Buy, raw_confidence)
    } else if score < -DIRECTION_THRESHOLD {
        (Direction::Sell, raw_confidence)
    } else {
        (Direction::Hold, raw_confidence.max(HOLD_MIN_CONFIDENCE))
    };
    debug!(score, %direction, confidence, %risk_level, "scored latest bar");

    let summary = summarize(direction, risk_level, &factors);
    Recommendation {
        direction,
        confidence,
        risk_level,
        factors,
        summary,
    }
}

/// Names the first two non-neutral factors and the risk tier.
fn summarize(direction: Direction, risk_level: RiskLevel, factors: &[Factor]) -> String {
    let drivers = factors
        .iter()
        .filter(|f| f.impact != Impact::Neutral)
        .take(2)
        .map(Factor::name)
        .collect::<Vec<_>>();

    let drivers = match drivers.as_slice() {
        [] => "No single factor dominates.".to_string(),
        [one] => format!("The primary driver is {one}."),
        [first, second, ..] => format!("The primary drivers are {first} and {second}."),
    };

    format!(
        "Based on our quantitative model, we recommend a {direction}. {drivers} Risk is assessed as {risk_level}."
    )
}
