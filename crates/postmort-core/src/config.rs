use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;
use crate::labels::{LabelSet, Layer, ResolutionStatus, RootCause, TemporalPeriod};
use crate::record::SourceKind;

/// Number of period boundary dates a rules file must carry.
///
/// Five cut points `b0..b4`: `b0` marks the corpus start, `b1..b4` separate
/// pre-launch / early adoption / plateau / decline / post-discontinuation.
pub const BOUNDARY_COUNT: usize = 5;

/// One node of a rule's condition tree.
///
/// Leaves test a single aspect of a record; `all_of`/`any_of`/`not` combine
/// them. Text matching is case-insensitive against the record's raw text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Substring present in the raw text.
    Contains(String),
    /// Any of the phrases present in the raw text.
    ContainsAny(Vec<String>),
    /// Regular expression over the raw text. Compiled on first use; an
    /// invalid pattern surfaces as an evaluation error, not a load error.
    Matches(String),
    /// Timestamp within `[from, to)` (midnight UTC); either side may be
    /// open. Records without a timestamp never match.
    DateRange {
        #[serde(default)]
        from: Option<NaiveDate>,
        #[serde(default)]
        to: Option<NaiveDate>,
    },
    /// Record comes from the given source.
    SourceIs(SourceKind),
    /// Metadata field equals the given value. String comparison is
    /// case-insensitive; against a list field, any element may match.
    FieldEquals { field: String, value: Value },
    /// Numeric metadata field is at least the given value.
    FieldAtLeast { field: String, value: f64 },
    AllOf(Vec<Predicate>),
    AnyOf(Vec<Predicate>),
    Not(Box<Predicate>),
}

/// One classification rule from the rules file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDef {
    pub name: String,
    pub layer: Layer,
    /// Lower runs earlier; ties keep declaration order.
    #[serde(default = "default_priority")]
    pub priority: u32,
    pub when: Predicate,
    pub label: String,
    pub confidence: f32,
    /// Allows this rule's label to ride along as a secondary label when a
    /// higher-priority rule already claimed the primary slot.
    #[serde(default)]
    pub can_co_occur: bool,
}

fn default_priority() -> u32 {
    100
}

/// How author identifiers are pseudonymized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnonymizationMode {
    /// Salt comes from an env var, so pseudonyms are comparable across runs.
    Stable,
    /// A fresh random salt per run; pseudonyms do not correlate across runs.
    PerRun,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnonymizationConfig {
    pub mode: AnonymizationMode,
    #[serde(default = "default_salt_env")]
    pub salt_env: String,
}

fn default_salt_env() -> String {
    "POSTMORT_SALT".to_string()
}

impl Default for AnonymizationConfig {
    fn default() -> Self {
        Self {
            mode: AnonymizationMode::Stable,
            salt_env: default_salt_env(),
        }
    }
}

/// Parsed rules file: period boundaries, anonymization settings, and the
/// rule list for all three layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesFile {
    pub boundaries: Vec<NaiveDate>,
    #[serde(default)]
    pub anonymization: AnonymizationConfig,
    pub rules: Vec<RuleDef>,
}

/// Load and validate a rules file from YAML.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails
/// validation (wrong boundary count, decreasing boundaries, a label outside
/// its layer's vocabulary, confidence out of range, duplicate rule names).
pub fn load_rules(path: &Path) -> Result<RulesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::RulesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let rules_file: RulesFile =
        serde_yaml::from_str(&content).map_err(ConfigError::RulesFileParse)?;

    validate_rules(&rules_file)?;

    Ok(rules_file)
}

fn validate_rules(rules_file: &RulesFile) -> Result<(), ConfigError> {
    if rules_file.boundaries.len() != BOUNDARY_COUNT {
        return Err(ConfigError::Validation(format!(
            "expected {BOUNDARY_COUNT} period boundaries, found {}",
            rules_file.boundaries.len()
        )));
    }

    for pair in rules_file.boundaries.windows(2) {
        if pair[1] < pair[0] {
            return Err(ConfigError::Validation(format!(
                "period boundaries must be non-decreasing: {} follows {}",
                pair[1], pair[0]
            )));
        }
    }

    let mut seen_names = HashSet::new();

    for rule in &rules_file.rules {
        if rule.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "rule name must be non-empty".to_string(),
            ));
        }

        if !seen_names.insert(rule.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate rule name: '{}'",
                rule.name
            )));
        }

        if !(0.0..=1.0).contains(&rule.confidence) {
            return Err(ConfigError::Validation(format!(
                "rule '{}' has confidence {} outside 0.0..=1.0",
                rule.name, rule.confidence
            )));
        }

        if !label_in_layer(rule.layer, &rule.label) {
            return Err(ConfigError::Validation(format!(
                "rule '{}' labels {} as '{}', which is not in that layer's vocabulary",
                rule.name, rule.layer, rule.label
            )));
        }
    }

    Ok(())
}

fn label_in_layer(layer: Layer, label: &str) -> bool {
    match layer {
        Layer::TemporalPeriod => TemporalPeriod::parse(label).is_some(),
        Layer::ResolutionStatus => ResolutionStatus::parse(label).is_some(),
        Layer::RootCauseCategory => RootCause::parse(label).is_some(),
    }
}
