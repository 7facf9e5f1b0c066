pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The bar sequence is empty. An analysis requires at least one bar.
    #[error("Bar data is empty: an analysis requires at least one bar")]
    EmptySeries,

    /// The ticker symbol is empty or blank.
    #[error("Ticker symbol is empty")]
    EmptyTicker,

    /// A price is not a positive finite number.
    #[error("Price must be positive and finite (got: {0})")]
    InvalidPrice(f64),

    /// The high/low range does not contain the open and the close.
    /// Open: {0}, High: {1}, Low: {2}, Close: {3}
    #[error("Invalid price range: open {0}, high {1}, low {2}, close {3}")]
    InvalidRange(f64, f64, f64, f64),

    /// Bar dates are not strictly increasing.
    #[error("Bar dates must be strictly increasing ({0} follows {1})")]
    UnorderedDates(chrono::NaiveDate, chrono::NaiveDate),

    /// The time range label is not one of `1M`, `6M`, `1Y`, `2Y`.
    #[error("Unknown time range: {0} (expected 1M, 6M, 1Y or 2Y)")]
    InvalidTimeRange(String),

    /// The history length reaches outside the supported calendar.
    #[error("Cannot cover {0} days of history")]
    InvalidDays(u32),

    /// A required builder field was not set.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// The conversational explainer failed to answer.
    #[error("Explainer error: {0}")]
    Explainer(String),

    /// I/O error occurred.
    // utils.rs
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error occurred.
    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
