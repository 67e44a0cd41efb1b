use thiserror::Error;

/// Errors raised while evaluating rule predicates against a record.
///
/// These degrade the affected layer for the affected record; they never
/// abort a run.
#[derive(Debug, Error)]
pub enum TaggingError {
    #[error("invalid regex '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },

    #[error("field '{field}' holds a {found} value, cannot compare numerically")]
    NonNumericField { field: String, found: &'static str },
}
