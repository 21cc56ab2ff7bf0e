//! Error types for the market-data aggregation system.
//!
//! Invalid and stale trades are not errors; they are dropped as ordinary
//! control flow. Only conditions that would corrupt output surface here.

use thiserror::Error;

use crate::types::{CandleUpdate, TickerSnapshot};

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the market-data aggregation system.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Checked arithmetic overflowed while accumulating a total.
    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    /// Data error (malformed tape input).
    #[error("Data error: {0}")]
    Data(String),

    /// Replay output did not match the expected checksum.
    #[error("Output checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// One aggregation path failed after the other had already committed.
    ///
    /// Carries what the committed path emitted so it is not lost.
    #[error("Partial update: {source}")]
    PartialUpdate {
        candles: Vec<CandleUpdate>,
        ticker: Option<TickerSnapshot>,
        source: Box<Error>,
    },
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create an overflow error.
    pub fn overflow(msg: impl Into<String>) -> Self {
        Error::Overflow(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    /// Wrap `source` with whatever the other path already emitted.
    ///
    /// Returns `source` unchanged when nothing was emitted.
    pub fn partial(
        candles: Vec<CandleUpdate>,
        ticker: Option<TickerSnapshot>,
        source: Error,
    ) -> Self {
        if candles.is_empty() && ticker.is_none() {
            return source;
        }
        Error::PartialUpdate {
            candles,
            ticker,
            source: Box::new(source),
        }
    }

    /// Whether this error came from checked arithmetic.
    pub fn is_overflow(&self) -> bool {
        match self {
            Error::Overflow(_) => true,
            Error::PartialUpdate { source, .. } => source.is_overflow(),
            _ => false,
        }
    }
}
