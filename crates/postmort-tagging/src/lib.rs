//! The tagging pipeline: deduplication, author anonymization, and the
//! three-layer rule engine, plus the run summary that accounts for every
//! record the pipeline touched.

pub mod anonymize;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod pipeline;
mod rules;
pub mod summary;

pub use anonymize::Anonymizer;
pub use dedup::{dedup, normalize_url, DedupReport};
pub use engine::{LayerOutcome, LayerResults, RuleEngine};
pub use error::TaggingError;
pub use pipeline::{Pipeline, PipelineOutput};
pub use summary::RunSummary;
