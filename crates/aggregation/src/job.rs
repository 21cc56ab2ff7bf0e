//! Market-data job.
//!
//! Feeds each trade to both aggregators and bundles what they emit. This is
//! the in-process driver an ingestion loop calls; transport and delivery of
//! the outputs stay with the caller.

use marketdata_core::{
    Admission, CandleUpdate, Config, Error, Result, SeqGate, TickerSnapshot, TradeEvent,
};
use serde::{Deserialize, Serialize};

use crate::candle::CandleAggregator;
use crate::ticker::TickerAggregator;

/// Liveness probe for the job wiring.
pub fn health() -> &'static str {
    "ok"
}

/// Everything one trade produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOutput {
    /// How the candle path's gate classified the trade.
    pub admission: Admission,
    /// Zero, one or two candle updates.
    pub candles: Vec<CandleUpdate>,
    /// Rolling ticker snapshot, if the trade was accepted.
    pub ticker: Option<TickerSnapshot>,
}

impl JobOutput {
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty() && self.ticker.is_none()
    }
}

/// Candle and ticker aggregation over one trade stream.
#[derive(Debug)]
pub struct MarketDataJob {
    candles: CandleAggregator,
    ticker: TickerAggregator,
}

impl MarketDataJob {
    /// Create a job from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            candles: CandleAggregator::from_config(&config.candle)?,
            ticker: TickerAggregator::from_config(&config.ticker)?,
        })
    }

    /// 1-minute candles and a 24-hour rolling ticker.
    pub fn default_job() -> Result<Self> {
        Self::new(&Config::default())
    }

    /// Process a trade through both aggregators.
    ///
    /// The two paths gate independently; the reported admission is the
    /// candle path's. An overflow on either path fails the whole call. If
    /// the other path had already committed, its output travels inside
    /// [`Error::PartialUpdate`].
    pub fn on_trade(&mut self, trade: &TradeEvent) -> Result<JobOutput> {
        let admission = self.classify(trade);
        // Both paths see the trade before either error surfaces, so their
        // seq gates stay in step.
        let candles = self.candles.on_trade(trade);
        let ticker = self.ticker.on_trade(trade);
        match (candles, ticker) {
            (Ok(candles), Ok(ticker)) => Ok(JobOutput {
                admission,
                candles,
                ticker,
            }),
            (Ok(candles), Err(err)) => Err(Error::partial(candles, None, err)),
            (Err(err), Ok(ticker)) => Err(Error::partial(Vec::new(), ticker, err)),
            (Err(err), Err(_)) => Err(err),
        }
    }

    /// Classify a trade against the candle path's gate without mutating.
    pub fn classify(&self, trade: &TradeEvent) -> Admission {
        match self.candles.last_accepted_seq(&trade.symbol) {
            Some(last) if trade.is_well_formed() && trade.seq <= last => Admission::Stale,
            _ => SeqGate::new().classify(trade),
        }
    }

    /// Force-close one symbol's open candle.
    pub fn flush_final(&mut self, symbol: &str) -> Option<CandleUpdate> {
        self.candles.flush_final(symbol)
    }

    /// Force-close every open candle, in symbol order.
    pub fn flush_all(&mut self) -> Vec<CandleUpdate> {
        self.candles.flush_all()
    }

    pub fn candles(&self) -> &CandleAggregator {
        &self.candles
    }

    pub fn ticker(&self) -> &TickerAggregator {
        &self.ticker
    }
}
