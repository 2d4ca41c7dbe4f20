//! History log — one append-only row per completed cycle.
//!
//! The CSV backend writes a `cycle,setpoint,achieved` header when the
//! file is created (or truncated) and never rewrites rows afterwards.
//! Each append is flushed before returning, so a killed process loses at
//! most the cycle in flight. The last appended row is kept in memory and
//! served while the file length still matches; anything else (a log
//! written before `open`, an outside edit) is read back from disk.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use stagegrid_core::CycleRecord;
use tracing::debug;

use crate::error::{HistoryError, HistoryResult};

/// Column names, in order.
pub const HISTORY_HEADER: [&str; 3] = ["cycle", "setpoint", "achieved"];

/// Where completed cycles are recorded.
pub trait HistorySink {
    fn append(&mut self, record: &CycleRecord) -> HistoryResult<()>;

    /// The final row, fully parsed.
    fn last_record(&self) -> HistoryResult<CycleRecord>;

    /// `achieved` from the final row. Only that column has to parse.
    fn last_achieved(&self) -> HistoryResult<f64> {
        self.last_record().map(|r| r.achieved)
    }
}

/// CSV file backend.
pub struct CsvHistoryLog {
    path: PathBuf,
    writer: csv::Writer<File>,
    /// Last appended record and the file length right after its flush.
    last: Option<(CycleRecord, u64)>,
}

impl CsvHistoryLog {
    /// Open the log at `path` for appending.
    ///
    /// With `fresh` the file is truncated first. A header is written
    /// whenever the file ends up empty.
    pub fn open(path: &Path, fresh: bool) -> HistoryResult<Self> {
        let mut options = OpenOptions::new();
        if fresh {
            options.write(true).create(true).truncate(true);
        } else {
            options.append(true).create(true);
        }
        let file = options.open(path)?;
        let needs_header = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if needs_header {
            writer.write_record(HISTORY_HEADER)?;
            writer.flush()?;
        }

        debug!(?path, fresh, "history log opened");
        Ok(Self {
            path: path.to_path_buf(),
            writer,
            last: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every data row. Rows that fail to parse are an error.
    pub fn records(&self) -> HistoryResult<Vec<CycleRecord>> {
        let mut reader = self.reader()?;
        let mut rows = Vec::new();
        for row in reader.deserialize() {
            rows.push(row?);
        }
        Ok(rows)
    }

    fn reader(&self) -> HistoryResult<csv::Reader<File>> {
        Ok(csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?)
    }

    fn cached(&self) -> Option<CycleRecord> {
        let (record, len) = self.last?;
        let current = std::fs::metadata(&self.path).ok()?.len();
        (current == len).then_some(record)
    }

    fn last_row(&self) -> HistoryResult<csv::StringRecord> {
        let mut reader = self.reader()?;
        let mut last = None;
        for row in reader.records() {
            last = Some(row?);
        }
        last.ok_or(HistoryError::Empty)
    }
}

impl HistorySink for CsvHistoryLog {
    fn append(&mut self, record: &CycleRecord) -> HistoryResult<()> {
        self.writer.serialize(record)?;
        self.writer.flush()?;
        let len = self.writer.get_ref().metadata()?.len();
        self.last = Some((*record, len));
        Ok(())
    }

    fn last_record(&self) -> HistoryResult<CycleRecord> {
        if let Some(record) = self.cached() {
            return Ok(record);
        }
        let row = self.last_row()?;
        let header = csv::StringRecord::from(HISTORY_HEADER.to_vec());
        row.deserialize(Some(&header))
            .map_err(|e| HistoryError::Unparsable(e.to_string()))
    }

    fn last_achieved(&self) -> HistoryResult<f64> {
        if let Some(record) = self.cached() {
            return Ok(record.achieved);
        }
        let row = self.last_row()?;
        let field = row.get(2).unwrap_or("").trim();
        field
            .parse::<f64>()
            .map_err(|_| HistoryError::Unparsable(format!("achieved = {field:?}")))
    }
}

/// In-memory backend.
#[derive(Debug, Clone, Default)]
pub struct MemoryHistory {
    rows: Vec<CycleRecord>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[CycleRecord] {
        &self.rows
    }
}

impl HistorySink for MemoryHistory {
    fn append(&mut self, record: &CycleRecord) -> HistoryResult<()> {
        self.rows.push(*record);
        Ok(())
    }

    fn last_record(&self) -> HistoryResult<CycleRecord> {
        self.rows.last().copied().ok_or(HistoryError::Empty)
    }
}
