//! Rolling ticker aggregation.
//!
//! Keeps every trade inside a trailing window per symbol and recomputes
//! high/low/volume/quote-volume by scanning the retained trades on each
//! accepted trade.

use std::collections::{BTreeMap, VecDeque};

use marketdata_core::{
    Admission, Error, Price, Quantity, Result, Seq, SeqGate, TickerConfig, TickerSnapshot,
    TimestampMs, TradeEvent,
};
use tracing::{debug, error, trace};

/// The parts of a trade the window needs once the symbol is known.
#[derive(Debug, Clone, Copy)]
struct WindowedTrade {
    seq: Seq,
    event_time_ms: TimestampMs,
    price: Price,
    quantity: Quantity,
}

impl From<&TradeEvent> for WindowedTrade {
    fn from(trade: &TradeEvent) -> Self {
        Self {
            seq: trade.seq,
            event_time_ms: trade.event_time_ms,
            price: trade.price,
            quantity: trade.quantity,
        }
    }
}

/// Per-symbol window. Front is oldest; appended at the back, evicted from
/// the front only.
#[derive(Debug, Default)]
struct SymbolWindow {
    gate: SeqGate,
    trades: VecDeque<WindowedTrade>,
}

impl SymbolWindow {
    /// Number of leading trades older than `threshold_ms`.
    fn evictable(&self, threshold_ms: TimestampMs) -> usize {
        self.trades
            .iter()
            .take_while(|t| t.event_time_ms < threshold_ms)
            .count()
    }
}

/// Scan a window and build the snapshot for `trigger`.
///
/// `trades` must include the trigger itself.
fn summarize<'a>(
    symbol: &str,
    trades: impl Iterator<Item = &'a WindowedTrade>,
    trigger: &WindowedTrade,
) -> Result<TickerSnapshot> {
    let mut high = Price::MIN;
    let mut low = Price::MAX;
    let mut volume: Quantity = 0;
    let mut quote_volume: i64 = 0;
    let mut window_start_ms = trigger.event_time_ms;

    for t in trades {
        high = high.max(t.price);
        low = low.min(t.price);
        volume = volume
            .checked_add(t.quantity)
            .ok_or_else(|| Error::overflow(format!("ticker volume for {}", symbol)))?;
        let value = t.price.checked_mul(t.quantity).ok_or_else(|| {
            Error::overflow(format!("trade value for {} at seq {}", symbol, t.seq))
        })?;
        quote_volume = quote_volume
            .checked_add(value)
            .ok_or_else(|| Error::overflow(format!("ticker quote volume for {}", symbol)))?;
        window_start_ms = window_start_ms.min(t.event_time_ms);
    }

    Ok(TickerSnapshot {
        symbol: symbol.to_string(),
        seq: trigger.seq,
        window_start_ms,
        window_end_ms: trigger.event_time_ms,
        last_price: trigger.price,
        high,
        low,
        volume,
        quote_volume,
    })
}

/// Rolling ticker aggregator over a fixed trailing window.
///
/// Like [`crate::CandleAggregator`], it holds no internal synchronization.
#[derive(Debug)]
pub struct TickerAggregator {
    window_ms: i64,
    windows: BTreeMap<String, SymbolWindow>,
}

impl TickerAggregator {
    /// Create an aggregator with the given window length.
    pub fn new(window_ms: i64) -> Result<Self> {
        Self::from_config(&TickerConfig { window_ms })
    }

    /// Create an aggregator from configuration.
    pub fn from_config(config: &TickerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            window_ms: config.window_ms,
            windows: BTreeMap::new(),
        })
    }

    /// Process a trade and return the recomputed rolling snapshot.
    ///
    /// Trades whose event time is strictly before
    /// `trade.event_time_ms - window_ms` are evicted from the head first.
    /// The snapshot is computed before the window is touched, so an overflow
    /// leaves it unchanged; only the seq gate has advanced.
    pub fn on_trade(&mut self, trade: &TradeEvent) -> Result<Option<TickerSnapshot>> {
        if !trade.is_well_formed() {
            debug!(
                symbol = %trade.symbol,
                seq = trade.seq,
                price = trade.price,
                quantity = trade.quantity,
                "Dropping invalid trade"
            );
            return Ok(None);
        }

        let window_ms = self.window_ms;
        let window = self.windows.entry(trade.symbol.clone()).or_default();

        if window.gate.admit(trade) != Admission::Accepted {
            debug!(
                symbol = %trade.symbol,
                seq = trade.seq,
                last_seq = ?window.gate.last_accepted(),
                "Dropping stale trade"
            );
            return Ok(None);
        }

        let incoming = WindowedTrade::from(trade);
        let threshold_ms = trade.event_time_ms.saturating_sub(window_ms);
        let evict = window.evictable(threshold_ms);

        let retained = window.trades.iter().skip(evict).chain(std::iter::once(&incoming));
        let snapshot = match summarize(&trade.symbol, retained, &incoming) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                error!(symbol = %trade.symbol, seq = trade.seq, %err, "Ticker update aborted");
                return Err(err);
            }
        };

        window.trades.drain(..evict);
        window.trades.push_back(incoming);

        trace!(
            symbol = %snapshot.symbol,
            seq = snapshot.seq,
            evicted = evict,
            retained = window.trades.len(),
            "Ticker snapshot"
        );
        Ok(Some(snapshot))
    }

    /// Snapshot as of the last accepted trade, without mutating anything.
    pub fn latest(&self, symbol: &str) -> Option<TickerSnapshot> {
        let window = self.windows.get(symbol)?;
        let trigger = window.trades.back()?;
        summarize(symbol, window.trades.iter(), trigger).ok()
    }

    /// Number of trades currently retained for a symbol.
    pub fn retained_len(&self, symbol: &str) -> usize {
        self.windows.get(symbol).map_or(0, |w| w.trades.len())
    }

    /// Last accepted seq for a symbol.
    pub fn last_accepted_seq(&self, symbol: &str) -> Option<Seq> {
        self.windows.get(symbol)?.gate.last_accepted()
    }

    /// Drop all state for a symbol, including its seq high-water mark.
    pub fn reset(&mut self, symbol: &str) -> bool {
        self.windows.remove(symbol).is_some()
    }

    /// Number of symbols with state.
    pub fn symbol_count(&self) -> usize {
        self.windows.len()
    }

    pub fn window_ms(&self) -> i64 {
        self.window_ms
    }
}
