//! OHLCV candle aggregation.
//!
//! Buckets trades into fixed-length intervals per symbol with one open bucket
//! at a time. Every contributing trade emits a progressive update; closing a
//! bucket emits its final update ahead of the new bucket's first update.

use std::collections::BTreeMap;

use marketdata_core::{
    align_to_interval, interval_label, Admission, CandleConfig, CandleUpdate, Error, Price,
    Quantity, Result, Seq, SeqGate, TimestampMs, TradeEvent,
};
use tracing::{debug, error, trace, warn};

/// A bucket that's currently open.
#[derive(Debug, Clone)]
struct BucketInProgress {
    symbol: String,
    open_time_ms: TimestampMs,
    close_time_ms: TimestampMs,
    open: Price,
    high: Price,
    low: Price,
    close: Price,
    volume: Quantity,
    trade_count: u64,
    seq: Seq,
}

impl BucketInProgress {
    fn from_trade(trade: &TradeEvent, open_time_ms: TimestampMs, close_time_ms: TimestampMs) -> Self {
        Self {
            symbol: trade.symbol.clone(),
            open_time_ms,
            close_time_ms,
            open: trade.price,
            high: trade.price,
            low: trade.price,
            close: trade.price,
            volume: trade.quantity,
            trade_count: 1,
            seq: trade.seq,
        }
    }

    /// Merge a trade into the bucket.
    ///
    /// Totals are computed before any field is written, so an overflow
    /// leaves the bucket exactly as it was.
    fn apply_trade(&mut self, trade: &TradeEvent) -> Result<()> {
        let volume = self.volume.checked_add(trade.quantity).ok_or_else(|| {
            Error::overflow(format!(
                "candle volume for {} at seq {} ({} + {})",
                trade.symbol, trade.seq, self.volume, trade.quantity
            ))
        })?;
        let trade_count = self.trade_count.checked_add(1).ok_or_else(|| {
            Error::overflow(format!(
                "candle trade count for {} at seq {}",
                trade.symbol, trade.seq
            ))
        })?;

        self.high = self.high.max(trade.price);
        self.low = self.low.min(trade.price);
        self.close = trade.price;
        self.volume = volume;
        self.trade_count = trade_count;
        self.seq = trade.seq;
        Ok(())
    }

    fn snapshot(&self, interval: &str, is_final: bool) -> CandleUpdate {
        CandleUpdate {
            symbol: self.symbol.clone(),
            interval: interval.to_string(),
            open_time_ms: self.open_time_ms,
            close_time_ms: self.close_time_ms,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            trade_count: self.trade_count,
            seq: self.seq,
            is_final,
        }
    }
}

/// Per-symbol candle state, created on first valid trade.
#[derive(Debug, Default)]
struct CandleState {
    gate: SeqGate,
    current: Option<BucketInProgress>,
}

/// Deterministic candle aggregator for a single interval length.
///
/// Holds no internal synchronization: callers must serialize all trades for
/// a given symbol.
#[derive(Debug)]
pub struct CandleAggregator {
    interval_ms: i64,
    interval: String,
    /// Symbol registry. Ordered so multi-symbol iteration is deterministic.
    states: BTreeMap<String, CandleState>,
}

impl CandleAggregator {
    /// Create an aggregator with the given bucket length.
    pub fn new(interval_ms: i64) -> Result<Self> {
        Self::from_config(&CandleConfig { interval_ms })
    }

    /// Create an aggregator from configuration.
    pub fn from_config(config: &CandleConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            interval_ms: config.interval_ms,
            interval: interval_label(config.interval_ms),
            states: BTreeMap::new(),
        })
    }

    /// Process a trade.
    ///
    /// Returns zero, one or two updates. Two updates means the open bucket
    /// closed (final update first) and a new one opened.
    pub fn on_trade(&mut self, trade: &TradeEvent) -> Result<Vec<CandleUpdate>> {
        if !trade.is_well_formed() {
            debug!(
                symbol = %trade.symbol,
                seq = trade.seq,
                price = trade.price,
                quantity = trade.quantity,
                "Dropping invalid trade"
            );
            return Ok(Vec::new());
        }

        let interval_ms = self.interval_ms;
        let interval = self.interval.as_str();
        let state = self.states.entry(trade.symbol.clone()).or_default();

        if state.gate.admit(trade) != Admission::Accepted {
            debug!(
                symbol = %trade.symbol,
                seq = trade.seq,
                last_seq = ?state.gate.last_accepted(),
                "Dropping stale trade"
            );
            return Ok(Vec::new());
        }

        let open_time_ms = match align_to_interval(trade.event_time_ms, interval_ms) {
            Ok(open_time_ms) => open_time_ms,
            Err(err) => {
                error!(symbol = %trade.symbol, seq = trade.seq, %err, "Candle update aborted");
                return Err(err);
            }
        };
        let close_time_ms = open_time_ms.saturating_add(interval_ms - 1);

        let mut updates = Vec::with_capacity(2);
        match state.current.as_mut() {
            None => {
                let bucket = BucketInProgress::from_trade(trade, open_time_ms, close_time_ms);
                updates.push(bucket.snapshot(interval, false));
                state.current = Some(bucket);
            }
            Some(bucket) if open_time_ms == bucket.open_time_ms => {
                if let Err(err) = bucket.apply_trade(trade) {
                    error!(symbol = %trade.symbol, seq = trade.seq, %err, "Candle update aborted");
                    return Err(err);
                }
                updates.push(bucket.snapshot(interval, false));
            }
            Some(bucket) if open_time_ms > bucket.open_time_ms => {
                updates.push(bucket.snapshot(interval, true));
                *bucket = BucketInProgress::from_trade(trade, open_time_ms, close_time_ms);
                updates.push(bucket.snapshot(interval, false));
            }
            Some(bucket) => {
                // Seq and event time disagree upstream. Seq stays advanced.
                warn!(
                    symbol = %trade.symbol,
                    seq = trade.seq,
                    event_time_ms = trade.event_time_ms,
                    trade_bucket = open_time_ms,
                    open_bucket = bucket.open_time_ms,
                    "Trade falls before the open bucket; ignoring"
                );
            }
        }

        for update in &updates {
            trace!(
                symbol = %update.symbol,
                open_time_ms = update.open_time_ms,
                seq = update.seq,
                is_final = update.is_final,
                "Candle update"
            );
        }
        Ok(updates)
    }

    /// Force-close the open bucket for a symbol (e.g., at stream shutdown).
    ///
    /// The seq gate is untouched.
    pub fn flush_final(&mut self, symbol: &str) -> Option<CandleUpdate> {
        let bucket = self.states.get_mut(symbol)?.current.take()?;
        Some(bucket.snapshot(&self.interval, true))
    }

    /// Force-close every open bucket, in symbol order.
    pub fn flush_all(&mut self) -> Vec<CandleUpdate> {
        let interval = self.interval.as_str();
        self.states
            .values_mut()
            .filter_map(|state| state.current.take())
            .map(|bucket| bucket.snapshot(interval, true))
            .collect()
    }

    /// Progressive view of the open bucket, if any.
    pub fn current_candle(&self, symbol: &str) -> Option<CandleUpdate> {
        self.states
            .get(symbol)?
            .current
            .as_ref()
            .map(|bucket| bucket.snapshot(&self.interval, false))
    }

    /// Last accepted seq for a symbol.
    pub fn last_accepted_seq(&self, symbol: &str) -> Option<Seq> {
        self.states.get(symbol)?.gate.last_accepted()
    }

    /// Drop all state for a symbol, including its seq high-water mark.
    ///
    /// Returns whether the symbol was tracked.
    pub fn reset(&mut self, symbol: &str) -> bool {
        self.states.remove(symbol).is_some()
    }

    /// Number of symbols with state.
    pub fn symbol_count(&self) -> usize {
        self.states.len()
    }

    pub fn interval_ms(&self) -> i64 {
        self.interval_ms
    }

    pub fn interval_label(&self) -> &str {
        &self.interval
    }
}
