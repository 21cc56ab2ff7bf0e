//! Trade aggregation for the market-data system.
//!
//! This crate handles:
//! - Fixed-interval OHLCV candles with progressive and final updates
//! - Rolling trailing-window tickers
//! - A job that drives both from one trade stream
//!
//! Both aggregators gate trades per symbol on a strictly increasing seq and
//! own their per-symbol state outright.

pub mod candle;
pub mod job;
pub mod ticker;

pub use candle::CandleAggregator;
pub use job::{health, JobOutput, MarketDataJob};
pub use ticker::TickerAggregator;
