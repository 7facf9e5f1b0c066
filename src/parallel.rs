//! Concurrent analysis of a watchlist.
//!
//! Every ticker goes through its own, independent pipeline; results come back in the
//! order of the input.

use rayon::prelude::*;

use crate::engine::Analysis;
use crate::errors::Result;
use crate::market::SeriesSource;

/// Analyzes every ticker of `tickers` from `source` in parallel.
///
/// A failing ticker only fails its own entry.
pub fn analyze_many<S, T>(source: &S, tickers: &[T]) -> Vec<Result<Analysis>>
where
    S: SeriesSource + Sync + ?Sized,
    T: AsRef<str> + Sync,
{
    tickers
        .par_iter()
        .map(|ticker| Analysis::from_source(source, ticker.as_ref()))
        .collect()
}

#[cfg(test)]
#[test]
fn parallel_matches_sequential() {
    use crate::market::{RandomWalk, RandomWalkConfig};

    let source = RandomWalk::new(RandomWalkConfig {
        end: chrono::NaiveDate::from_ymd_opt(2024, 6, 28),
        seed: 11,
        ..Default::default()
    });
    let tickers = ["AAPL", "TSLA", " ", "NVDA"];

    let results = analyze_many(&source, &tickers);
    assert_eq!(results.len(), 4);
    assert!(results[2].is_err());

    for (ticker, result) in tickers.iter().zip(&results) {
        if let Ok(analysis) = result {
            let sequential = Analysis::from_source(&source, ticker).unwrap();
            assert_eq!(analysis, &sequential);
        }
    }
}
