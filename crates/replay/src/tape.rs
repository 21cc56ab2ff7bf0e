//! Trade tapes.
//!
//! A tape is a JSON-lines file with one [`TradeEvent`] per line, in the order
//! the ingestion layer delivered them (duplicates and reordering included).

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use marketdata_core::{Error, Result, TradeEvent};

/// Read a tape from any buffered reader. Blank lines are skipped.
pub fn read_tape<R: BufRead>(reader: R) -> Result<Vec<TradeEvent>> {
    let mut trades = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let trade: TradeEvent = serde_json::from_str(line)
            .map_err(|e| Error::data(format!("tape line {}: {}", idx + 1, e)))?;
        trades.push(trade);
    }
    Ok(trades)
}

/// Load a tape file.
pub fn load_tape(path: impl AsRef<Path>) -> Result<Vec<TradeEvent>> {
    let file = File::open(path)?;
    read_tape(BufReader::new(file))
}

/// Write trades as a JSON-lines tape.
pub fn write_tape<W: Write>(mut writer: W, trades: &[TradeEvent]) -> Result<()> {
    for trade in trades {
        serde_json::to_writer(&mut writer, trade)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
