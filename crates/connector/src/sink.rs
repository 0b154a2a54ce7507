use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::SinkError;
use crate::record::{TickerRecord, COLUMNS};
use crate::traits::BatchSink;

/// Writes each symbol's batch to `<base_dir>/binance_<symbol>_data.csv`,
/// replacing the file on every write.
pub struct CsvSink {
    base_dir: PathBuf,
}

impl CsvSink {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// File names always use the lower-case symbol
    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.base_dir
            .join(format!("binance_{}_data.csv", symbol.to_lowercase()))
    }
}

fn write_csv(path: &Path, records: &[TickerRecord]) -> Result<(), SinkError> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(COLUMNS)?;
    for record in records {
        wtr.write_record(record.to_row())?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write to a sibling file then rename over the target, so a failed write
/// leaves the previous flush in place.
fn replace_csv(path: &Path, records: &[TickerRecord]) -> Result<(), SinkError> {
    let staging = path.with_extension("csv.tmp");
    if let Err(e) = write_csv(&staging, records) {
        if let Err(cleanup) = fs::remove_file(&staging) {
            warn!(path = %staging.display(), error = %cleanup, "Failed to remove staging file");
        }
        return Err(e);
    }
    fs::rename(&staging, path)?;
    Ok(())
}

impl BatchSink for CsvSink {
    fn write_batch(&mut self, symbol: &str, records: &[TickerRecord]) -> Result<(), SinkError> {
        fs::create_dir_all(&self.base_dir)?;
        let path = self.path_for(symbol);
        replace_csv(&path, records)?;
        info!(path = %path.display(), records = records.len(), "Data saved");
        Ok(())
    }
}
