//! CSV export for recorded channels.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::engine::ChannelTable;

/// Name of the leading time column.
const TIME_COLUMN: &str = "time_s";

/// Exports a channel table to a CSV file at the given path.
///
/// Writes a header row followed by one data row per sample. Produces
/// deterministic output for identical inputs.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(table: &ChannelTable, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(table, buf)
}

/// Writes a channel table as CSV to any writer.
///
/// Columns are `time_s` followed by the channel labels in recording order.
/// Times use 4 decimals, channel values 6; missing samples are written as
/// `NaN`.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(table: &ChannelTable, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    let mut header = Vec::with_capacity(table.channels.len() + 1);
    header.push(TIME_COLUMN);
    header.extend(table.channels.iter().map(|c| c.label.as_str()));
    wtr.write_record(&header)?;

    for (i, t) in table.time_s.iter().enumerate() {
        let mut row = Vec::with_capacity(header.len());
        row.push(format!("{t:.4}"));
        for channel in &table.channels {
            let v = channel.values.get(i).copied().unwrap_or(f64::NAN);
            row.push(format!("{v:.6}"));
        }
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}
