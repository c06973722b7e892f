use chrono::NaiveDate;
use thiserror::Error;

/// Failure of a single quote lookup against the market-data collaborator.
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("quote requested for weekend date {date}")]
    Weekend { date: NaiveDate },

    #[error("no quote for {symbol} on {date}")]
    NoData { symbol: String, date: NaiveDate },

    #[error("invalid quote for {symbol} on {date}: {price}")]
    InvalidPrice {
        symbol: String,
        date: NaiveDate,
        price: f64,
    },

    #[error("market data source failed: {0:#}")]
    Source(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unsupported instrument: {0}")]
    UnsupportedInstrument(String),

    #[error("invalid instrument data: {0}")]
    InvalidData(String),

    #[error("precondition violated: {0}")]
    Precondition(String),

    #[error(transparent)]
    Quote(#[from] QuoteError),
}
