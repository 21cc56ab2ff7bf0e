//! Deterministic replay for the market-data system.
//!
//! This crate provides:
//! - JSON-lines trade tape reading and writing
//! - Tape replay through fresh aggregators
//! - Replay counters and an output checksum for determinism checks

pub mod engine;
pub mod metrics;
pub mod tape;

pub use engine::{ReplayEngine, ReplayResult};
pub use metrics::{OutputHasher, ReplayMetrics};
pub use tape::{load_tape, read_tape, write_tape};
