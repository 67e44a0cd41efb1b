use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::SeedableRng;

use postmort_core::Layer;
use postmort_dataset::TaggedRow;

use crate::error::AgreementError;
use crate::kappa::CoderRow;

/// Where the three pilot files ended up.
#[derive(Debug, Clone)]
pub struct SamplePaths {
    pub coder1: PathBuf,
    pub coder2: PathBuf,
    pub master: PathBuf,
}

fn sample_size(total: usize, fraction: f64) -> usize {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let size = (total as f64 * fraction).ceil() as usize;
    size.min(total)
}

/// Draws a reproducible pilot sample for double-coding.
///
/// The sample size is `ceil(len * fraction)`, and the same seed always
/// selects the same rows. Selected rows keep their input order.
///
/// # Errors
///
/// Returns an error unless `fraction` is within `(0, 1]`.
pub fn pilot_sample(
    rows: &[TaggedRow],
    fraction: f64,
    seed: u64,
) -> Result<Vec<TaggedRow>, AgreementError> {
    if !fraction.is_finite() || fraction <= 0.0 || fraction > 1.0 {
        return Err(AgreementError::InvalidFraction(fraction));
    }
    let size = sample_size(rows.len(), fraction);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked = rand::seq::index::sample(&mut rng, rows.len(), size).into_vec();
    picked.sort_unstable();
    Ok(picked.into_iter().map(|index| rows[index].clone()).collect())
}

fn coder_rows(rows: &[TaggedRow], layer: Layer, with_labels: bool) -> Vec<CoderRow> {
    rows.iter()
        .map(|row| CoderRow {
            source: row.source.clone(),
            id: row.id.clone(),
            timestamp: row.timestamp.clone(),
            raw_text: row.raw_text.clone(),
            url: row.url.clone(),
            label: if with_labels {
                row.label_for(layer).to_string()
            } else {
                String::new()
            },
        })
        .collect()
}

/// Writes coder rows to any writer. `origin` names the sink in errors.
///
/// # Errors
///
/// Returns an error if a row fails to encode or the writer fails.
pub fn write_coder_rows_to<W: Write>(
    writer: W,
    rows: &[CoderRow],
    origin: &str,
) -> Result<(), AgreementError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row).map_err(|source| AgreementError::Csv {
            path: origin.to_string(),
            source,
        })?;
    }
    csv_writer.flush().map_err(|source| AgreementError::Io {
        path: origin.to_string(),
        source,
    })
}

/// Writes the pilot files for one layer into `dir`.
///
/// `pilot_coder1.csv` and `pilot_coder2.csv` carry the record context with a
/// blank label column so coding stays blind to the pipeline's answer;
/// `pilot_master.csv` is the same sample with the pipeline's labels kept.
///
/// # Errors
///
/// Returns an error if the directory or any of the files cannot be written.
pub fn write_sample(
    dir: impl AsRef<Path>,
    rows: &[TaggedRow],
    layer: Layer,
) -> Result<SamplePaths, AgreementError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|source| AgreementError::Io {
        path: dir.display().to_string(),
        source,
    })?;
    let paths = SamplePaths {
        coder1: dir.join("pilot_coder1.csv"),
        coder2: dir.join("pilot_coder2.csv"),
        master: dir.join("pilot_master.csv"),
    };
    let blind = coder_rows(rows, layer, false);
    write_coder_file(&paths.coder1, &blind)?;
    write_coder_file(&paths.coder2, &blind)?;
    write_coder_file(&paths.master, &coder_rows(rows, layer, true))?;
    Ok(paths)
}

fn write_coder_file(path: &Path, rows: &[CoderRow]) -> Result<(), AgreementError> {
    let file = fs::File::create(path).map_err(|source| AgreementError::Io {
        path: path.display().to_string(),
        source,
    })?;
    write_coder_rows_to(file, rows, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged_row(id: &str, resolution: &str) -> TaggedRow {
        TaggedRow {
            source: "issue".into(),
            id: id.into(),
            timestamp: "2024-08-15T00:00:00Z".into(),
            raw_text: format!("record {id}"),
            author_id: "anon".into(),
            url: String::new(),
            metadata: String::new(),
            temporal_period: "decline".into(),
            temporal_secondary: String::new(),
            temporal_confidence: 1.0,
            resolution_status: resolution.into(),
            resolution_secondary: String::new(),
            resolution_confidence: 0.8,
            root_cause_category: "technical_debt".into(),
            root_cause_secondary: String::new(),
            root_cause_confidence: 0.6,
            tag_reasoning: String::new(),
        }
    }

    fn corpus(len: usize) -> Vec<TaggedRow> {
        (0..len)
            .map(|index| tagged_row(&format!("r{index:03}"), "fixed"))
            .collect()
    }

    #[test]
    fn same_seed_selects_the_same_rows() {
        let rows = corpus(40);
        let first = pilot_sample(&rows, 0.25, 7).unwrap();
        let second = pilot_sample(&rows, 0.25, 7).unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(first, second);
    }

    #[test]
    fn sample_size_rounds_up() {
        let rows = corpus(10);
        assert_eq!(pilot_sample(&rows, 0.15, 1).unwrap().len(), 2);
        assert_eq!(pilot_sample(&rows, 0.001, 1).unwrap().len(), 1);
        assert_eq!(pilot_sample(&rows, 1.0, 1).unwrap().len(), 10);

        let three = corpus(3);
        assert_eq!(pilot_sample(&three, 0.34, 1).unwrap().len(), 2);
    }

    #[test]
    fn selection_preserves_input_order() {
        let rows = corpus(50);
        let sample = pilot_sample(&rows, 0.3, 99).unwrap();
        let ids: Vec<&str> = sample.iter().map(|row| row.id.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn invalid_fractions_are_rejected() {
        let rows = corpus(5);
        for fraction in [0.0, -0.2, 1.5, f64::NAN] {
            let err = pilot_sample(&rows, fraction, 1).unwrap_err();
            assert!(
                matches!(err, AgreementError::InvalidFraction(_)),
                "fraction {fraction} got {err:?}"
            );
        }
    }

    #[test]
    fn empty_input_yields_an_empty_sample() {
        let sample = pilot_sample(&[], 0.5, 1).unwrap();
        assert!(sample.is_empty());
    }

    #[test]
    fn coder_files_are_blind_but_the_master_is_not() {
        let rows = vec![tagged_row("a", "fixed"), tagged_row("b", "wontfix")];

        let blind = coder_rows(&rows, Layer::ResolutionStatus, false);
        assert!(blind.iter().all(|row| row.label.is_empty()));
        assert_eq!(blind[0].raw_text, "record a");

        let master = coder_rows(&rows, Layer::ResolutionStatus, true);
        assert_eq!(master[0].label, "fixed");
        assert_eq!(master[1].label, "wontfix");
    }

    #[test]
    fn coder_file_header_matches_the_read_shape() {
        let rows = coder_rows(&[tagged_row("a", "fixed")], Layer::TemporalPeriod, true);
        let mut buf = Vec::new();
        write_coder_rows_to(&mut buf, &rows, "buffer").unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text.lines().next().unwrap(),
            "source,id,timestamp,raw_text,url,label"
        );
        assert!(text.lines().nth(1).unwrap().ends_with(",decline"));
    }
}
