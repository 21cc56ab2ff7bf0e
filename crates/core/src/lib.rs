//! Core types and configuration for the market-data aggregation system.
//!
//! This crate provides shared types used across all other crates:
//! - Trade events, candle updates and ticker snapshots
//! - Trade admission (validity check and per-symbol seq gate)
//! - Configuration structures
//! - Common error types

pub mod admission;
pub mod config;
pub mod error;
pub mod types;

pub use admission::{Admission, SeqGate};
pub use config::{CandleConfig, Config, TickerConfig};
pub use error::{Error, Result};
pub use types::*;
