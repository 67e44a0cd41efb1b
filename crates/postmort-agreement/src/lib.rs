//! Inter-rater reliability tooling: reproducible pilot samples for
//! double-coding, and Cohen's kappa over the joined results.

pub mod error;
pub mod kappa;
pub mod sample;

pub use error::AgreementError;
pub use kappa::{
    cohen_kappa, interpret_kappa, join_coder_rows, read_coder_rows, read_coder_rows_from,
    write_disagreements, CoderRow, ConfusionCell, JoinOutcome, JoinedPair, KappaReport,
};
pub use sample::{pilot_sample, write_coder_rows_to, write_sample, SamplePaths};
