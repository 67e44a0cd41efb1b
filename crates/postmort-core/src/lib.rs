//! Shared data model and configuration for the postmort pipeline: records
//! and their platform metadata, the three label vocabularies, and the rules
//! file that drives classification and anonymization.

pub mod config;
pub mod error;
pub mod labels;
pub mod metadata;
pub mod record;

pub use config::{
    load_rules, AnonymizationConfig, AnonymizationMode, Predicate, RuleDef, RulesFile,
    BOUNDARY_COUNT,
};
pub use error::ConfigError;
pub use labels::{Layer, LabelSet, ResolutionStatus, RootCause, TemporalPeriod};
pub use metadata::{ForumMeta, GithubMeta, Metadata, QaMeta};
pub use record::{parse_timestamp, Record, SourceKind, TaggedRecord};
