//! Core data types for the market-data aggregation system.
//!
//! Prices and quantities are fixed-point integers in engine units; nothing in
//! this workspace touches floating point on the trade path.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Timestamp in milliseconds since Unix epoch (UTC).
pub type TimestampMs = i64;

/// Price in fixed-point engine units.
pub type Price = i64;

/// Quantity in fixed-point engine units.
pub type Quantity = i64;

/// Engine-assigned trade sequence number.
pub type Seq = u64;

const SECOND_MS: i64 = 1_000;
const MINUTE_MS: i64 = 60 * SECOND_MS;
const HOUR_MS: i64 = 60 * MINUTE_MS;
const DAY_MS: i64 = 24 * HOUR_MS;

/// Floor a timestamp to the start of its interval.
///
/// Uses Euclidean division so timestamps before the epoch still floor
/// downwards. `interval_ms` must be positive. Fails when the interval start
/// would fall below `i64::MIN`.
#[inline]
pub fn align_to_interval(ts_ms: TimestampMs, interval_ms: i64) -> Result<TimestampMs> {
    ts_ms
        .div_euclid(interval_ms)
        .checked_mul(interval_ms)
        .ok_or_else(|| {
            Error::overflow(format!(
                "interval start for {} at {}ms interval",
                ts_ms, interval_ms
            ))
        })
}

/// Human-readable label for an interval length ("1m", "4h", "1d", ...).
pub fn interval_label(interval_ms: i64) -> String {
    let units = [(DAY_MS, "d"), (HOUR_MS, "h"), (MINUTE_MS, "m"), (SECOND_MS, "s")];
    for (unit_ms, suffix) in units {
        if interval_ms > 0 && interval_ms % unit_ms == 0 {
            return format!("{}{}", interval_ms / unit_ms, suffix);
        }
    }
    format!("{}ms", interval_ms)
}

/// A single matched trade from the trading engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeEvent {
    /// Trading symbol (e.g., "BTC-KRW").
    pub symbol: String,
    /// Engine sequence number. Not guaranteed ordered on arrival.
    pub seq: Seq,
    /// Event time in milliseconds.
    pub event_time_ms: TimestampMs,
    /// Trade price.
    pub price: Price,
    /// Trade quantity.
    pub quantity: Quantity,
}

impl TradeEvent {
    pub fn new(
        symbol: impl Into<String>,
        seq: Seq,
        event_time_ms: TimestampMs,
        price: Price,
        quantity: Quantity,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            seq,
            event_time_ms,
            price,
            quantity,
        }
    }

    /// Price and quantity are both strictly positive.
    #[inline]
    pub fn is_well_formed(&self) -> bool {
        self.price > 0 && self.quantity > 0
    }

    /// Traded value in quote units (price × quantity), `None` on overflow.
    #[inline]
    pub fn quote_value(&self) -> Option<i64> {
        self.price.checked_mul(self.quantity)
    }
}

/// Snapshot of an OHLCV candle bucket.
///
/// Progressive updates (`is_final == false`) may be superseded by later
/// updates for the same `open_time_ms`; a final update never is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandleUpdate {
    pub symbol: String,
    /// Interval label, e.g. "1m".
    pub interval: String,
    /// Bucket start, always a multiple of the interval length.
    pub open_time_ms: TimestampMs,
    /// Inclusive bucket end: `open_time_ms + interval_ms - 1`.
    pub close_time_ms: TimestampMs,
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    /// Sum of quantities of all contributing trades.
    pub volume: Quantity,
    /// Number of contributing trades.
    pub trade_count: u64,
    /// Seq of the last contributing trade.
    pub seq: Seq,
    /// Bucket is closed and will receive no further updates.
    pub is_final: bool,
}

impl CandleUpdate {
    /// Validate candle integrity (OHLC invariants).
    pub fn is_valid(&self) -> bool {
        self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.low <= self.high
            && self.volume > 0
            && self.trade_count > 0
            && self.close_time_ms > self.open_time_ms
    }

    /// Bucket start as a UTC datetime.
    pub fn open_time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.open_time_ms).single()
    }
}

/// Rolling ticker over the trailing window ending at the triggering trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerSnapshot {
    pub symbol: String,
    /// Seq of the triggering trade.
    pub seq: Seq,
    /// Earliest event time among retained trades.
    pub window_start_ms: TimestampMs,
    /// Event time of the triggering trade.
    pub window_end_ms: TimestampMs,
    /// Price of the triggering trade.
    pub last_price: Price,
    pub high: Price,
    pub low: Price,
    /// Sum of quantities in the window.
    pub volume: Quantity,
    /// Sum of price × quantity in the window.
    pub quote_volume: i64,
}
