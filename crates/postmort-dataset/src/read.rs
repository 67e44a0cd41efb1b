use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use postmort_core::{parse_timestamp, Metadata, Record, SourceKind};

use crate::error::DatasetError;

/// One row of collector CSV, as written on disk.
///
/// Everything except `source` and `id` may be blank; missing columns
/// deserialize as empty strings rather than failing the row. Older exports
/// named the id column `data_id`, so both spellings are accepted.
#[derive(Debug, Deserialize)]
pub struct RawRow {
    pub source: SourceKind,
    #[serde(alias = "data_id")]
    pub id: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub raw_text: String,
    #[serde(default)]
    pub author_id: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub metadata: String,
}

impl RawRow {
    /// Converts a raw row into the in-memory shape.
    ///
    /// Fields are whitespace-trimmed. A timestamp that fits none of the
    /// collector formats is dropped with a warning, never guessed.
    #[must_use]
    pub fn into_record(self) -> Record {
        let id = self.id.trim().to_string();
        let timestamp = parse_timestamp(&self.timestamp);
        if timestamp.is_none() && !self.timestamp.trim().is_empty() {
            warn!(
                source = %self.source,
                id = %id,
                value = %self.timestamp.trim(),
                "unparseable timestamp, leaving record undated"
            );
        }
        let url = self.url.trim();
        Record {
            source: self.source,
            id,
            timestamp,
            raw_text: self.raw_text.trim().to_string(),
            author_id: self.author_id.trim().to_string(),
            url: (!url.is_empty()).then(|| url.to_string()),
            metadata: Metadata::from_json(self.source, &self.metadata),
        }
    }
}

/// What happened while reading an input file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Data rows encountered, including rejected ones.
    pub rows: usize,
    /// Rows skipped because they could not be decoded.
    pub rejected: usize,
}

/// Reads collector records from a CSV file.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or the underlying stream
/// fails mid-read. Rows that merely fail to decode (unknown source, wrong
/// column count, bad UTF-8) are skipped and counted instead.
pub fn read_records(path: impl AsRef<Path>) -> Result<(Vec<Record>, IngestReport), DatasetError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| DatasetError::Io {
        path: path.display().to_string(),
        source,
    })?;
    read_records_from(file, &path.display().to_string())
}

/// Reads collector records from any reader. `origin` names the stream in
/// errors and warnings.
///
/// # Errors
///
/// Returns an error if the underlying stream fails; decode failures on
/// individual rows are skipped and counted.
pub fn read_records_from<R: Read>(
    reader: R,
    origin: &str,
) -> Result<(Vec<Record>, IngestReport), DatasetError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut records = Vec::new();
    let mut report = IngestReport::default();
    for row in csv_reader.deserialize::<RawRow>() {
        match row {
            Ok(raw) => {
                report.rows += 1;
                records.push(raw.into_record());
            }
            Err(err) => {
                if matches!(err.kind(), csv::ErrorKind::Io(_)) {
                    return Err(DatasetError::Csv {
                        path: origin.to_string(),
                        source: err,
                    });
                }
                report.rows += 1;
                report.rejected += 1;
                warn!(
                    origin,
                    line = err.position().map(csv::Position::line),
                    error = %err,
                    "skipping undecodable csv row"
                );
            }
        }
    }
    Ok((records, report))
}
