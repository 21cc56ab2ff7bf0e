//! Determinism tests for tape replay.
//!
//! Validates that identical tapes produce identical outputs, and that
//! duplicates, stale redeliveries and malformed trades leave no trace in the
//! output stream.
//!
//! Tests include:
//! - Dual replay comparison
//! - Candle and rolling ticker walkthroughs
//! - Redelivery and reordering insensitivity
//! - Tape file round trip through the engine

use std::collections::BTreeMap;

use marketdata_core::{align_to_interval, Config, Error, SeqGate, TradeEvent};
use marketdata_replay::{read_tape, write_tape, ReplayEngine};
use proptest::prelude::*;

const ALIGNED: i64 = 1_700_000_040_000;
const DAY_MS: i64 = 86_400_000;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn trade(symbol: &str, seq: u64, ts_ms: i64, price: i64, quantity: i64) -> TradeEvent {
    TradeEvent::new(symbol, seq, ts_ms, price, quantity)
}

fn mixed_tape() -> Vec<TradeEvent> {
    vec![
        trade("BTC-KRW", 1, ALIGNED, 100, 2),
        trade("ETH-KRW", 1, ALIGNED + 500, 50, 4),
        trade("BTC-KRW", 2, ALIGNED + 10_000, 110, 3),
        trade("BTC-KRW", 2, ALIGNED + 10_000, 110, 3),
        trade("ETH-KRW", 3, ALIGNED + 20_000, 0, 1),
        trade("BTC-KRW", 1, ALIGNED + 30_000, 999, 9),
        trade("ETH-KRW", 2, ALIGNED + 59_999, 55, 1),
        trade("BTC-KRW", 3, ALIGNED + 60_000, 120, 1),
        trade("ETH-KRW", 4, ALIGNED + 125_000, 60, 2),
    ]
}

/// Drop everything a per-symbol seq gate would reject.
fn admitted_only(trades: &[TradeEvent]) -> Vec<TradeEvent> {
    let mut gates: BTreeMap<String, SeqGate> = BTreeMap::new();
    trades
        .iter()
        .filter(|t| {
            gates
                .entry(t.symbol.clone())
                .or_default()
                .admit(t)
                .is_accepted()
        })
        .cloned()
        .collect()
}

#[test]
fn test_dual_replay_identical_checksum() {
    init_tracing();
    let engine = ReplayEngine::default();

    let first = engine.replay(&mixed_tape()).unwrap();
    let second = engine.replay(&mixed_tape()).unwrap();

    assert_eq!(first.metrics.output_checksum, second.metrics.output_checksum);
    assert_eq!(first.candles, second.candles);
    assert_eq!(first.tickers, second.tickers);
}

#[test]
fn test_mixed_tape_counts() {
    init_tracing();
    let result = ReplayEngine::default().replay(&mixed_tape()).unwrap();
    let m = &result.metrics;

    assert_eq!(m.trades_seen, 9);
    assert_eq!(m.accepted, 6);
    assert_eq!(m.dropped_stale, 2);
    assert_eq!(m.dropped_invalid, 1);
    assert_eq!(m.ticker_snapshots, 6);
}

#[test]
fn test_candle_walkthrough() {
    init_tracing();
    let tape = vec![
        trade("BTC-KRW", 1, ALIGNED, 100, 2),
        trade("BTC-KRW", 2, ALIGNED + 10_000, 110, 3),
        trade("BTC-KRW", 3, ALIGNED + 61_000, 120, 1),
    ];
    let result = ReplayEngine::default()
        .with_flush_at_end(false)
        .replay(&tape)
        .unwrap();
    let c = &result.candles;
    assert_eq!(c.len(), 4);

    assert!(!c[0].is_final);
    assert_eq!((c[0].open, c[0].close, c[0].volume), (100, 100, 2));

    assert!(!c[1].is_final);
    assert_eq!((c[1].close, c[1].high, c[1].volume), (110, 110, 5));

    assert!(c[2].is_final);
    assert_eq!(c[2].volume, 5);
    assert_eq!(c[2].open_time_ms, ALIGNED);
    assert_eq!(c[2].close_time_ms, ALIGNED + 59_999);

    assert!(!c[3].is_final);
    assert_eq!((c[3].open, c[3].close, c[3].volume), (120, 120, 1));
    assert_eq!(c[3].open_time_ms, ALIGNED + 60_000);
}

#[test]
fn test_ticker_walkthrough() {
    init_tracing();
    let tape = vec![
        trade("BTC-KRW", 1, ALIGNED, 100, 2),
        trade("BTC-KRW", 2, ALIGNED + 1_000, 120, 1),
        trade("BTC-KRW", 3, ALIGNED + 2_000, 90, 4),
    ];
    let result = ReplayEngine::default().replay(&tape).unwrap();
    let last = result.tickers.last().unwrap();

    assert_eq!(last.high, 120);
    assert_eq!(last.low, 90);
    assert_eq!(last.volume, 7);
    assert_eq!(last.quote_volume, 680);
    assert_eq!(last.last_price, 90);
    assert_eq!(last.window_start_ms, ALIGNED);
    assert_eq!(last.window_end_ms, ALIGNED + 2_000);
}

#[test]
fn test_ticker_evicts_after_a_day() {
    init_tracing();
    let tape = vec![
        trade("BTC-KRW", 1, ALIGNED, 100, 2),
        trade("BTC-KRW", 2, ALIGNED + DAY_MS + 1, 80, 1),
    ];
    let result = ReplayEngine::default().replay(&tape).unwrap();
    let last = result.tickers.last().unwrap();

    assert_eq!((last.high, last.low, last.volume), (80, 80, 1));
    assert_eq!(last.quote_volume, 80);
}

#[test]
fn test_redelivered_trades_leave_no_trace() {
    init_tracing();
    let engine = ReplayEngine::default();
    let noisy = engine.replay(&mixed_tape()).unwrap();
    let clean = engine.replay(&admitted_only(&mixed_tape())).unwrap();

    assert_eq!(noisy.candles, clean.candles);
    assert_eq!(noisy.tickers, clean.tickers);
    assert_eq!(noisy.metrics.output_checksum, clean.metrics.output_checksum);
    assert_eq!(clean.metrics.accepted, clean.metrics.trades_seen);
}

#[test]
fn test_tape_file_replay() {
    init_tracing();
    let mut buf = Vec::new();
    write_tape(&mut buf, &mixed_tape()).unwrap();
    let loaded = read_tape(buf.as_slice()).unwrap();

    let engine = ReplayEngine::default();
    assert_eq!(
        engine.replay(&loaded).unwrap().metrics.output_checksum,
        engine.replay(&mixed_tape()).unwrap().metrics.output_checksum
    );
}

#[test]
fn test_checksum_pinning() {
    init_tracing();
    let expected = ReplayEngine::default()
        .replay(&mixed_tape())
        .unwrap()
        .metrics
        .output_checksum;

    let pinned = ReplayEngine::default().with_expected_checksum(expected.clone());
    assert!(pinned.replay(&mixed_tape()).is_ok());

    // A shifted price changes the output stream
    let mut altered = mixed_tape();
    altered[0].price = 101;
    match pinned.replay(&altered) {
        Err(Error::ChecksumMismatch { expected: e, actual }) => {
            assert_eq!(e, expected);
            assert_ne!(actual, expected);
        }
        other => panic!("expected checksum mismatch, got {:?}", other.map(|r| r.metrics)),
    }
}

#[test]
fn test_interval_changes_output() {
    init_tracing();
    let mut config = Config::default();
    config.candle.interval_ms = 3_600_000;

    let minute = ReplayEngine::default().replay(&mixed_tape()).unwrap();
    let hour = ReplayEngine::new(config).replay(&mixed_tape()).unwrap();

    assert_ne!(minute.metrics.output_checksum, hour.metrics.output_checksum);
    assert!(hour.candles.iter().all(|c| c.interval == "1h"));
    // Every accepted trade lands in the same hour bucket per symbol
    assert_eq!(hour.metrics.final_candles, 2);
}

fn arb_trade() -> impl Strategy<Value = TradeEvent> {
    (
        prop::sample::select(vec!["BTC-KRW", "ETH-KRW", "SOL-KRW"]),
        1u64..40,
        0i64..(3 * DAY_MS),
        -5i64..1_000,
        -2i64..50,
    )
        .prop_map(|(symbol, seq, offset, price, quantity)| {
            trade(symbol, seq, ALIGNED + offset, price, quantity)
        })
}

proptest! {
    #[test]
    fn prop_replay_is_deterministic(tape in prop::collection::vec(arb_trade(), 0..80)) {
        let engine = ReplayEngine::default();
        let a = engine.replay(&tape).unwrap();
        let b = engine.replay(&tape).unwrap();
        prop_assert_eq!(a.metrics, b.metrics);
        prop_assert_eq!(a.candles, b.candles);
        prop_assert_eq!(a.tickers, b.tickers);
    }

    #[test]
    fn prop_only_admitted_trades_matter(
        tape in prop::collection::vec(arb_trade(), 0..80),
        dup_idx in prop::collection::vec(any::<prop::sample::Index>(), 0..20),
    ) {
        // Re-deliver copies of earlier trades after the originals
        let mut noisy = tape.clone();
        if !tape.is_empty() {
            for idx in &dup_idx {
                noisy.push(idx.get(&tape).clone());
            }
        }

        let engine = ReplayEngine::default();
        let noisy_out = engine.replay(&noisy).unwrap();
        let clean_out = engine.replay(&admitted_only(&noisy)).unwrap();

        prop_assert_eq!(&noisy_out.candles, &clean_out.candles);
        prop_assert_eq!(&noisy_out.tickers, &clean_out.tickers);
        prop_assert_eq!(noisy_out.metrics.accepted, clean_out.metrics.accepted);
        prop_assert_eq!(
            noisy_out.metrics.trades_seen,
            noisy_out.metrics.accepted
                + noisy_out.metrics.dropped_invalid
                + noisy_out.metrics.dropped_stale
        );
    }

    #[test]
    fn prop_final_volume_matches_accepted(tape in prop::collection::vec(arb_trade(), 0..80)) {
        let result = ReplayEngine::default().replay(&tape).unwrap();

        // (volume, trade count) per (symbol, bucket) from admitted trades,
        // skipping those that fall before the symbol's open bucket
        let mut open: BTreeMap<String, i64> = BTreeMap::new();
        let mut expected: BTreeMap<(String, i64), (i64, u64)> = BTreeMap::new();
        for t in admitted_only(&tape) {
            let bucket = align_to_interval(t.event_time_ms, 60_000).unwrap();
            match open.get(&t.symbol).copied() {
                Some(current) if bucket < current => continue,
                Some(current) if bucket == current => {}
                _ => {
                    open.insert(t.symbol.clone(), bucket);
                }
            }
            let entry = expected.entry((t.symbol, bucket)).or_default();
            entry.0 += t.quantity;
            entry.1 += 1;
        }

        let actual: BTreeMap<(String, i64), (i64, u64)> = result
            .final_candles()
            .map(|c| ((c.symbol.clone(), c.open_time_ms), (c.volume, c.trade_count)))
            .collect();

        prop_assert_eq!(actual.len() as u64, result.metrics.final_candles);
        prop_assert_eq!(actual, expected);
    }
}
