//! Replay metrics and output checksum.

use marketdata_core::{Admission, CandleUpdate, Result, TickerSnapshot};
use sha2::{Digest, Sha256};

/// Counters collected while replaying a tape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayMetrics {
    /// Trades read from the tape.
    pub trades_seen: u64,
    /// Trades accepted by the seq gate.
    pub accepted: u64,
    /// Trades with non-positive price or quantity.
    pub dropped_invalid: u64,
    /// Trades at or below the last accepted seq.
    pub dropped_stale: u64,
    /// Candle updates emitted, progressive and final.
    pub candle_updates: u64,
    /// Final candle updates emitted (including end-of-tape flushes).
    pub final_candles: u64,
    /// Ticker snapshots emitted.
    pub ticker_snapshots: u64,
    /// SHA-256 (hex) over every emitted update in emission order.
    pub output_checksum: String,
}

impl ReplayMetrics {
    /// Fraction of trades accepted (0-1).
    pub fn acceptance_rate(&self) -> f64 {
        if self.trades_seen > 0 {
            self.accepted as f64 / self.trades_seen as f64
        } else {
            0.0
        }
    }

    pub(crate) fn record_admission(&mut self, admission: Admission) {
        self.trades_seen += 1;
        match admission {
            Admission::Accepted => self.accepted += 1,
            Admission::Invalid => self.dropped_invalid += 1,
            Admission::Stale => self.dropped_stale += 1,
        }
    }

    pub(crate) fn record_candle(&mut self, candle: &CandleUpdate) {
        self.candle_updates += 1;
        if candle.is_final {
            self.final_candles += 1;
        }
    }
}

/// Running checksum over emitted updates.
///
/// Each update is hashed as its JSON encoding followed by a newline, tagged
/// with its kind, so identical output streams hash identically.
pub struct OutputHasher {
    hasher: Sha256,
}

impl OutputHasher {
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
        }
    }

    pub fn candle(&mut self, candle: &CandleUpdate) -> Result<()> {
        self.hasher.update(b"C|");
        self.hasher.update(serde_json::to_vec(candle)?);
        self.hasher.update(b"\n");
        Ok(())
    }

    pub fn ticker(&mut self, ticker: &TickerSnapshot) -> Result<()> {
        self.hasher.update(b"T|");
        self.hasher.update(serde_json::to_vec(ticker)?);
        self.hasher.update(b"\n");
        Ok(())
    }

    pub fn finish(self) -> String {
        format!("{:x}", self.hasher.finalize())
    }
}

impl Default for OutputHasher {
    fn default() -> Self {
        Self::new()
    }
}
