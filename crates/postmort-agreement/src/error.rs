use thiserror::Error;

/// Failures in pilot sampling and agreement scoring.
#[derive(Debug, Error)]
pub enum AgreementError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("sample fraction must be within (0, 1], got {0}")]
    InvalidFraction(f64),
}
