use chrono::NaiveDate;
use thiserror::Error;

/// Failure of a single collaborator call (price history, profile, scrape, text analysis).
///
/// Callers decide whether a failure is fatal (subject ticker, benchmark index)
/// or ignorable (a peer, a discovery source).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchFailure {
    #[error("No data for {0}")]
    NoData(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Budget in milliseconds
    #[error("Timed out after {0}ms")]
    Timeout(u64),
}

impl FetchFailure {
    pub fn is_no_data(&self) -> bool {
        matches!(self, FetchFailure::NoData(_))
    }
}

/// Terminal outcome of an analysis request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("No market index data for {symbol} between {start} and {end}")]
    NoMarketData {
        symbol: String,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("No price data for {ticker} (tried {tried:?}) between {start} and {end}")]
    NoSubjectData {
        ticker: String,
        tried: Vec<String>,
        start: NaiveDate,
        end: NaiveDate,
    },

    #[error("Insufficient data points for {ticker}: {detail}")]
    InsufficientDataPoints { ticker: String, detail: String },

    /// Deadline in milliseconds
    #[error("Analysis deadline of {0}ms exceeded")]
    DeadlineExceeded(u64),

    #[error("Storage error: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subject_data_message_names_ticker_and_range() {
        let err = AnalysisError::NoSubjectData {
            ticker: "TCS".to_string(),
            tried: vec!["TCS.NS".to_string(), "TCS.BO".to_string()],
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        };

        let msg = err.to_string();
        assert!(msg.contains("TCS.NS"));
        assert!(msg.contains("TCS.BO"));
        assert!(msg.contains("2024-01-01"));
        assert!(msg.contains("2024-06-30"));
    }

    #[test]
    fn test_is_no_data() {
        assert!(FetchFailure::NoData("X".into()).is_no_data());
        assert!(!FetchFailure::Timeout(5000).is_no_data());
    }
}
