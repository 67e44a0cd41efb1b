use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

use postmort_core::{LabelSet, Layer, TaggedRecord};

use crate::error::DatasetError;

/// One row of the tagged-output CSV. Field order is column order.
///
/// Blank cells stand for absent values: an undated record has an empty
/// `timestamp`, a layer without a secondary label an empty `*_secondary`,
/// and a record without platform metadata an empty `metadata` cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedRow {
    pub source: String,
    pub id: String,
    pub timestamp: String,
    pub raw_text: String,
    pub author_id: String,
    pub url: String,
    pub metadata: String,
    pub temporal_period: String,
    pub temporal_secondary: String,
    pub temporal_confidence: f32,
    pub resolution_status: String,
    pub resolution_secondary: String,
    pub resolution_confidence: f32,
    pub root_cause_category: String,
    pub root_cause_secondary: String,
    pub root_cause_confidence: f32,
    pub tag_reasoning: String,
}

fn secondary<L: LabelSet>(label: Option<L>) -> String {
    match label {
        Some(label) => label.as_str().to_string(),
        None => String::new(),
    }
}

impl TaggedRow {
    /// Flattens a tagged record into CSV cells.
    ///
    /// # Errors
    ///
    /// Returns an error if the record's metadata cannot be serialized back
    /// to JSON.
    pub fn from_tagged(tagged: &TaggedRecord) -> Result<Self, serde_json::Error> {
        let record = &tagged.record;
        let metadata = if record.metadata.is_empty() {
            String::new()
        } else {
            serde_json::to_string(&record.metadata)?
        };
        Ok(Self {
            source: record.source.to_string(),
            id: record.id.clone(),
            timestamp: record
                .timestamp
                .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Secs, true))
                .unwrap_or_default(),
            raw_text: record.raw_text.clone(),
            author_id: record.author_id.clone(),
            url: record.url.clone().unwrap_or_default(),
            metadata,
            temporal_period: tagged.temporal_period.to_string(),
            temporal_secondary: secondary(tagged.temporal_secondary),
            temporal_confidence: tagged.temporal_confidence,
            resolution_status: tagged.resolution_status.to_string(),
            resolution_secondary: secondary(tagged.resolution_secondary),
            resolution_confidence: tagged.resolution_confidence,
            root_cause_category: tagged.root_cause_category.to_string(),
            root_cause_secondary: secondary(tagged.root_cause_secondary),
            root_cause_confidence: tagged.root_cause_confidence,
            tag_reasoning: tagged.tag_reasoning.clone(),
        })
    }

    /// The primary label this row carries for a layer.
    #[must_use]
    pub fn label_for(&self, layer: Layer) -> &str {
        match layer {
            Layer::TemporalPeriod => &self.temporal_period,
            Layer::ResolutionStatus => &self.resolution_status,
            Layer::RootCauseCategory => &self.root_cause_category,
        }
    }
}

/// Writes tagged rows to a CSV file, header included.
///
/// # Errors
///
/// Returns an error if the file cannot be created or a row fails to encode.
pub fn write_tagged(path: impl AsRef<Path>, rows: &[TaggedRow]) -> Result<(), DatasetError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| DatasetError::Io {
        path: path.display().to_string(),
        source,
    })?;
    write_tagged_to(file, rows, &path.display().to_string())
}

/// Writes tagged rows to any writer. `origin` names the sink in errors.
///
/// # Errors
///
/// Returns an error if a row fails to encode or the writer fails.
pub fn write_tagged_to<W: Write>(
    writer: W,
    rows: &[TaggedRow],
    origin: &str,
) -> Result<(), DatasetError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row).map_err(|source| DatasetError::Csv {
            path: origin.to_string(),
            source,
        })?;
    }
    csv_writer.flush().map_err(|source| DatasetError::Io {
        path: origin.to_string(),
        source,
    })?;
    Ok(())
}

/// Reads back a tagged CSV file, e.g. as pilot-sampling input.
///
/// Unlike collector ingestion this is strict: the file is our own output,
/// so any undecodable row is an error.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or any row fails to decode.
pub fn read_tagged(path: impl AsRef<Path>) -> Result<Vec<TaggedRow>, DatasetError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| DatasetError::Io {
        path: path.display().to_string(),
        source,
    })?;
    read_tagged_from(file, &path.display().to_string())
}

/// Reads tagged rows from any reader. `origin` names the stream in errors.
///
/// # Errors
///
/// Returns an error if any row fails to decode.
pub fn read_tagged_from<R: Read>(reader: R, origin: &str) -> Result<Vec<TaggedRow>, DatasetError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for row in csv_reader.deserialize::<TaggedRow>() {
        rows.push(row.map_err(|source| DatasetError::Csv {
            path: origin.to_string(),
            source,
        })?);
    }
    Ok(rows)
}

/// Writes any serializable report as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if the file cannot be created or serialization fails.
pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<(), DatasetError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(value).map_err(|source| DatasetError::Json {
        path: path.display().to_string(),
        source,
    })?;
    std::fs::write(path, json).map_err(|source| DatasetError::Io {
        path: path.display().to_string(),
        source,
    })
}
