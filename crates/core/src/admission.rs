//! Trade admission: validity check plus strict per-symbol seq gating.
//!
//! Delivery upstream is at-least-once and may reorder, so a trade is only
//! accepted when its seq is strictly above the last accepted seq for its
//! symbol. Replaying the exact same trade therefore has no effect.

use serde::{Deserialize, Serialize};

use crate::types::{Seq, TradeEvent};

/// Outcome of running a trade through a [`SeqGate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Admission {
    /// Trade passed both checks; the gate has advanced to its seq.
    Accepted,
    /// Non-positive price or quantity.
    Invalid,
    /// Seq at or below the last accepted seq.
    Stale,
}

impl Admission {
    #[inline]
    pub fn is_accepted(self) -> bool {
        self == Admission::Accepted
    }
}

/// Per-symbol high-water mark of accepted seqs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeqGate {
    /// `None` until the first trade is accepted (below any valid seq).
    last_accepted: Option<Seq>,
}

impl SeqGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify without mutating.
    pub fn classify(&self, trade: &TradeEvent) -> Admission {
        if !trade.is_well_formed() {
            return Admission::Invalid;
        }
        match self.last_accepted {
            Some(last) if trade.seq <= last => Admission::Stale,
            _ => Admission::Accepted,
        }
    }

    /// Classify and, on acceptance, advance to the trade's seq.
    ///
    /// The gate advances before any aggregation happens, so monotonicity
    /// holds even if the caller's subsequent update fails.
    pub fn admit(&mut self, trade: &TradeEvent) -> Admission {
        let admission = self.classify(trade);
        if admission.is_accepted() {
            self.last_accepted = Some(trade.seq);
        }
        admission
    }

    pub fn last_accepted(&self) -> Option<Seq> {
        self.last_accepted
    }
}
