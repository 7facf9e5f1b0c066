//! # QuantFlow: technical analysis for daily price series
//!
//! **QuantFlow** turns a daily OHLCV series into standard technical indicators and folds
//! them into a single scored **BUY / SELL / HOLD** recommendation with an explanation trail.
//! It also keeps the transcript of a conversation with an injected text-completion
//! service that explains the result.
//!
//! ## Core Components
//! | Component            | Description                                                                           |
//! |----------------------|---------------------------------------------------------------------------------------|
//! | **`Bar`**            | OHLCV (Open, High, Low, Close, Volume) data for a single trading day.                 |
//! | **`IndicatorSet`**   | SMA 20/50/200, RSI 14, MACD 12/26/9 and annualized volatility for one bar.            |
//! | **`Recommendation`** | Direction, confidence, risk level, ranked factors and a summary.                      |
//! | **`Analysis`**       | One ticker through the whole pipeline.                                                |
//! | **`RandomWalk`**     | Deterministic synthetic series source.                                                |
//! | **`ChatSession`**    | Transcript with an injected [`Explainer`](assistant::Explainer).                      |
//!
//! ## Getting Started
//! ```rust
//! use quantflow::prelude::*;
//! use chrono::NaiveDate;
//!
//! let config = RandomWalkConfig {
//!     end: NaiveDate::from_ymd_opt(2024, 6, 28),
//!     seed: 7,
//!     ..Default::default()
//! };
//! let analysis = Analysis::from_source(&RandomWalk::new(config), "AAPL").unwrap();
//! let recommendation = analysis.recommendation();
//!
//! println!("{} ({}%)", recommendation.direction(), recommendation.confidence());
//! println!("{}", recommendation.summary());
//! ```
//!
//! ## Undefined indicators
//! Indicators without enough history are `None`, never zero. When the latest bar lacks
//! any indicator the model needs, the recommendation is a HOLD with zero confidence and
//! HIGH risk rather than an error.
//!
//! ## Features
//! | Feature    | Purpose                                                         |
//! |------------|-----------------------------------------------------------------|
//! | `serde`    | Serialize the data model, load bars from JSON files.            |
//! | `parallel` | Analyze a watchlist of tickers concurrently with `rayon`.       |
//!
//! ## License
//! MIT
#![warn(missing_docs)]

/// Bars, indicators, the decision model and the analysis pipeline.
pub mod engine;

/// Error types for the library.
pub mod errors;

/// Series sources: synthetic random walk and JSON files.
pub mod market;

/// Chat transcript and the conversational explainer seam.
pub mod assistant;

/// Utility functions and helpers.
mod utils;

/// Concurrent analysis of several tickers.
#[cfg(feature = "parallel")]
pub mod parallel;

/// Re-exports of commonly used types and traits for convenience.
pub mod prelude {
    pub use super::*;
    pub use crate::assistant::*;
    pub use crate::engine::*;
    pub use crate::errors::*;
    pub use crate::market::*;

    #[cfg(feature = "parallel")]
    pub use crate::parallel::*;
}

use std::ops::{Div, Mul, Sub};

/// Trait for percentage-based calculations.
pub trait PercentCalculus<Rhs = Self> {
    /// Calculates the percentage change between two values.
    ///
    /// ### Arguments
    /// * `new` - The new value to compare with.
    ///
    /// ### Returns
    /// The percentage change from the original value to the new value.
    fn change(self, new: Rhs) -> Self;
}

impl PercentCalculus for f64 {
    fn change(self, new: Self) -> Self {
        new.sub(self).div(self).mul(100.0)
    }
}

#[cfg(test)]
mod percent {
    use super::*;

    #[test]
    fn change() {
        assert_eq!(10.0, 100.0.change(110.0));
        assert_eq!(-50.0, 200.0.change(100.0));
    }
}
