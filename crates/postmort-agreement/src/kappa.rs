use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use postmort_core::Layer;

use crate::error::AgreementError;

/// One row of a pilot coding file.
///
/// The pipeline writes these with a blank `label` column; coders fill it in
/// by hand, so everything is read back as plain strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoderRow {
    pub source: String,
    pub id: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub raw_text: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub label: String,
}

/// Two coders' labels for the same record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinedPair {
    pub source: String,
    pub id: String,
    pub coder1: String,
    pub coder2: String,
}

/// Result of joining two coder files on `(source, id)`.
#[derive(Debug, Default)]
pub struct JoinOutcome {
    pub pairs: Vec<JoinedPair>,
    /// Rows present in both files where at least one label was left blank.
    pub blank_skipped: usize,
    /// Rows present in only one of the two files.
    pub unpaired: usize,
}

/// Joins two coder files on `(source, id)`.
///
/// Labels are whitespace-trimmed and lowercased; hand-edited files disagree
/// on casing often enough that exact matching would manufacture
/// disagreements. Duplicate keys within a file keep the first row.
#[must_use]
pub fn join_coder_rows(coder1: &[CoderRow], coder2: &[CoderRow]) -> JoinOutcome {
    let mut by_key: HashMap<(&str, &str), &CoderRow> = HashMap::new();
    for row in coder2 {
        match by_key.entry((row.source.as_str(), row.id.as_str())) {
            Entry::Occupied(_) => {
                warn!(source = %row.source, id = %row.id, "duplicate key in coder file, keeping the first row");
            }
            Entry::Vacant(slot) => {
                slot.insert(row);
            }
        }
    }

    let mut outcome = JoinOutcome::default();
    let mut seen = HashSet::new();
    let mut matched = HashSet::new();
    for row in coder1 {
        let key = (row.source.as_str(), row.id.as_str());
        if !seen.insert(key) {
            warn!(source = %row.source, id = %row.id, "duplicate key in coder file, keeping the first row");
            continue;
        }
        let Some(other) = by_key.get(&key) else {
            outcome.unpaired += 1;
            continue;
        };
        matched.insert(key);
        let label1 = row.label.trim();
        let label2 = other.label.trim();
        if label1.is_empty() || label2.is_empty() {
            outcome.blank_skipped += 1;
            continue;
        }
        outcome.pairs.push(JoinedPair {
            source: row.source.clone(),
            id: row.id.clone(),
            coder1: label1.to_ascii_lowercase(),
            coder2: label2.to_ascii_lowercase(),
        });
    }
    outcome.unpaired += by_key.keys().filter(|key| !matched.contains(*key)).count();
    outcome
}

/// One cell of the confusion matrix between the two coders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfusionCell {
    pub coder1: String,
    pub coder2: String,
    pub count: usize,
}

/// Agreement statistics for one layer of double-coded records.
#[derive(Debug, Clone, Serialize)]
pub struct KappaReport {
    pub layer: String,
    pub pairs: usize,
    pub agreements: usize,
    pub observed_agreement: f64,
    pub expected_agreement: f64,
    pub kappa: f64,
    pub interpretation: &'static str,
    pub confusion: Vec<ConfusionCell>,
}

/// Computes Cohen's kappa over joined coder pairs.
///
/// When both coders used one identical label throughout, chance-corrected
/// agreement is undefined; that case scores 1 for perfect raw agreement and
/// 0 otherwise. An empty input scores 0.
#[must_use]
pub fn cohen_kappa(layer: Layer, pairs: &[JoinedPair]) -> KappaReport {
    if pairs.is_empty() {
        return KappaReport {
            layer: layer.as_str().to_string(),
            pairs: 0,
            agreements: 0,
            observed_agreement: 0.0,
            expected_agreement: 0.0,
            kappa: 0.0,
            interpretation: interpret_kappa(0.0),
            confusion: Vec::new(),
        };
    }

    let mut marginal1: BTreeMap<&str, usize> = BTreeMap::new();
    let mut marginal2: BTreeMap<&str, usize> = BTreeMap::new();
    let mut cells: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    let mut agreements = 0usize;
    for pair in pairs {
        *marginal1.entry(pair.coder1.as_str()).or_default() += 1;
        *marginal2.entry(pair.coder2.as_str()).or_default() += 1;
        *cells
            .entry((pair.coder1.as_str(), pair.coder2.as_str()))
            .or_default() += 1;
        if pair.coder1 == pair.coder2 {
            agreements += 1;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    let total = pairs.len() as f64;
    #[allow(clippy::cast_precision_loss)]
    let observed = agreements as f64 / total;
    let mut expected = 0.0;
    for (label, count1) in &marginal1 {
        let count2 = marginal2.get(label).copied().unwrap_or(0);
        #[allow(clippy::cast_precision_loss)]
        let term = (*count1 as f64 / total) * (count2 as f64 / total);
        expected += term;
    }

    let kappa = if expected >= 1.0 {
        if (observed - 1.0).abs() < f64::EPSILON {
            1.0
        } else {
            0.0
        }
    } else {
        (observed - expected) / (1.0 - expected)
    };

    KappaReport {
        layer: layer.as_str().to_string(),
        pairs: pairs.len(),
        agreements,
        observed_agreement: observed,
        expected_agreement: expected,
        kappa,
        interpretation: interpret_kappa(kappa),
        confusion: cells
            .into_iter()
            .map(|((coder1, coder2), count)| ConfusionCell {
                coder1: coder1.to_string(),
                coder2: coder2.to_string(),
                count,
            })
            .collect(),
    }
}

/// Maps a kappa value onto the Landis and Koch (1977) strength bands.
#[must_use]
pub fn interpret_kappa(kappa: f64) -> &'static str {
    if kappa < 0.0 {
        "poor"
    } else if kappa <= 0.20 {
        "slight"
    } else if kappa <= 0.40 {
        "fair"
    } else if kappa <= 0.60 {
        "moderate"
    } else if kappa <= 0.80 {
        "substantial"
    } else {
        "almost perfect"
    }
}

/// Reads a pilot coding file filled in by a coder.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or any row fails to decode.
pub fn read_coder_rows(path: impl AsRef<Path>) -> Result<Vec<CoderRow>, AgreementError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| AgreementError::Io {
        path: path.display().to_string(),
        source,
    })?;
    read_coder_rows_from(file, &path.display().to_string())
}

/// Reads coder rows from any reader. `origin` names the stream in errors.
///
/// # Errors
///
/// Returns an error if any row fails to decode.
pub fn read_coder_rows_from<R: Read>(
    reader: R,
    origin: &str,
) -> Result<Vec<CoderRow>, AgreementError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    for row in csv_reader.deserialize::<CoderRow>() {
        rows.push(row.map_err(|source| AgreementError::Csv {
            path: origin.to_string(),
            source,
        })?);
    }
    Ok(rows)
}

/// Writes the pairs the coders disagreed on, for reconciliation meetings.
/// Returns how many disagreements were written.
///
/// # Errors
///
/// Returns an error if the file cannot be created or a row fails to encode.
pub fn write_disagreements(
    path: impl AsRef<Path>,
    pairs: &[JoinedPair],
) -> Result<usize, AgreementError> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path).map_err(|source| AgreementError::Csv {
        path: path.display().to_string(),
        source,
    })?;
    let mut written = 0usize;
    for pair in pairs.iter().filter(|pair| pair.coder1 != pair.coder2) {
        writer.serialize(pair).map_err(|source| AgreementError::Csv {
            path: path.display().to_string(),
            source,
        })?;
        written += 1;
    }
    writer.flush().map_err(|source| AgreementError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(written)
}
