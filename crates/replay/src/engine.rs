//! Replay engine.
//!
//! Runs a tape through a fresh [`MarketDataJob`] and collects every update
//! in emission order. Same tape in, same outputs and checksum out.

use std::time::Instant;

use marketdata_aggregation::MarketDataJob;
use marketdata_core::{CandleUpdate, Config, Error, Result, TickerSnapshot, TradeEvent};
use tracing::{error, info};

use crate::metrics::{OutputHasher, ReplayMetrics};

/// Result of a replay.
#[derive(Debug, Clone)]
pub struct ReplayResult {
    /// Candle updates in emission order, end-of-tape flushes last.
    pub candles: Vec<CandleUpdate>,
    /// Ticker snapshots in emission order.
    pub tickers: Vec<TickerSnapshot>,
    /// Replay counters and checksum.
    pub metrics: ReplayMetrics,
}

impl ReplayResult {
    /// Final candle updates only.
    pub fn final_candles(&self) -> impl Iterator<Item = &CandleUpdate> {
        self.candles.iter().filter(|c| c.is_final)
    }
}

/// Replays trade tapes through the aggregators.
pub struct ReplayEngine {
    config: Config,
    /// Expected output checksum for validation (if known).
    expected_checksum: Option<String>,
    /// Force-close all open candles once the tape is exhausted.
    flush_at_end: bool,
}

impl ReplayEngine {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            expected_checksum: None,
            flush_at_end: true,
        }
    }

    /// Set the expected output checksum for post-replay validation.
    pub fn with_expected_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.expected_checksum = Some(checksum.into());
        self
    }

    /// Whether to flush open candles at end of tape (default: true).
    pub fn with_flush_at_end(mut self, flush: bool) -> Self {
        self.flush_at_end = flush;
        self
    }

    /// Replay a tape through a fresh job.
    ///
    /// Stale and invalid trades are counted, not errors. Overflow aborts the
    /// replay.
    pub fn replay(&self, trades: &[TradeEvent]) -> Result<ReplayResult> {
        let start = Instant::now();
        info!(trade_count = trades.len(), "Starting tape replay");

        let mut job = MarketDataJob::new(&self.config)?;
        let mut metrics = ReplayMetrics::default();
        let mut hasher = OutputHasher::new();
        let mut candles = Vec::new();
        let mut tickers = Vec::new();

        for trade in trades {
            let output = job.on_trade(trade)?;
            metrics.record_admission(output.admission);

            for candle in output.candles {
                hasher.candle(&candle)?;
                metrics.record_candle(&candle);
                candles.push(candle);
            }
            if let Some(ticker) = output.ticker {
                hasher.ticker(&ticker)?;
                metrics.ticker_snapshots += 1;
                tickers.push(ticker);
            }
        }

        if self.flush_at_end {
            for candle in job.flush_all() {
                hasher.candle(&candle)?;
                metrics.record_candle(&candle);
                candles.push(candle);
            }
        }

        metrics.output_checksum = hasher.finish();

        if let Some(expected) = &self.expected_checksum {
            if *expected != metrics.output_checksum {
                error!(
                    expected = %expected,
                    actual = %metrics.output_checksum,
                    "Output checksum mismatch after replay"
                );
                return Err(Error::ChecksumMismatch {
                    expected: expected.clone(),
                    actual: metrics.output_checksum,
                });
            }
        }

        info!(
            trades_seen = metrics.trades_seen,
            accepted = metrics.accepted,
            dropped_invalid = metrics.dropped_invalid,
            dropped_stale = metrics.dropped_stale,
            candle_updates = metrics.candle_updates,
            ticker_snapshots = metrics.ticker_snapshots,
            elapsed_ms = start.elapsed().as_millis() as u64,
            checksum = %metrics.output_checksum,
            "Replay completed"
        );

        Ok(ReplayResult {
            candles,
            tickers,
            metrics,
        })
    }
}

impl Default for ReplayEngine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
