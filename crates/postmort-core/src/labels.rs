use std::fmt;

use serde::{Deserialize, Serialize};

/// The three classification layers applied to every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    TemporalPeriod,
    ResolutionStatus,
    RootCauseCategory,
}

impl Layer {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TemporalPeriod => "temporal_period",
            Self::ResolutionStatus => "resolution_status",
            Self::RootCauseCategory => "root_cause_category",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "temporal_period" => Some(Self::TemporalPeriod),
            "resolution_status" => Some(Self::ResolutionStatus),
            "root_cause_category" => Some(Self::RootCauseCategory),
            _ => None,
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A closed label vocabulary for one layer.
///
/// Lets the rule engine treat the three layers uniformly: every vocabulary
/// knows its wire names and its fallback label for records no rule matches.
pub trait LabelSet: Copy + Eq + fmt::Display + Send + Sync + 'static {
    const LAYER: Layer;

    /// Every label in the vocabulary.
    fn all() -> &'static [Self];

    /// Wire name, as written in config files and CSV columns.
    fn as_str(self) -> &'static str;

    /// Label assigned when no rule matches.
    fn fallback() -> Self;

    fn parse(value: &str) -> Option<Self> {
        Self::all().iter().copied().find(|label| label.as_str() == value)
    }
}

/// Lifecycle period of the studied framework a record falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalPeriod {
    PreLaunch,
    EarlyAdoption,
    Plateau,
    Decline,
    PostDiscontinuation,
    Unknown,
}

impl LabelSet for TemporalPeriod {
    const LAYER: Layer = Layer::TemporalPeriod;

    fn all() -> &'static [Self] {
        &[
            Self::PreLaunch,
            Self::EarlyAdoption,
            Self::Plateau,
            Self::Decline,
            Self::PostDiscontinuation,
            Self::Unknown,
        ]
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::PreLaunch => "pre_launch",
            Self::EarlyAdoption => "early_adoption",
            Self::Plateau => "plateau",
            Self::Decline => "decline",
            Self::PostDiscontinuation => "post_discontinuation",
            Self::Unknown => "unknown",
        }
    }

    fn fallback() -> Self {
        Self::Unknown
    }
}

impl fmt::Display for TemporalPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the problem described by a record was (or was not) resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    Fixed,
    Wontfix,
    AcknowledgedNotFixed,
    Abandoned,
    Unknown,
}

impl LabelSet for ResolutionStatus {
    const LAYER: Layer = Layer::ResolutionStatus;

    fn all() -> &'static [Self] {
        &[
            Self::Fixed,
            Self::Wontfix,
            Self::AcknowledgedNotFixed,
            Self::Abandoned,
            Self::Unknown,
        ]
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Wontfix => "wontfix",
            Self::AcknowledgedNotFixed => "acknowledged_not_fixed",
            Self::Abandoned => "abandoned",
            Self::Unknown => "unknown",
        }
    }

    fn fallback() -> Self {
        Self::Unknown
    }
}

impl fmt::Display for ResolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Root-cause bucket a record's complaint points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootCause {
    ArchitecturalLimitation,
    CommunityMismatch,
    TechnicalDebt,
    ResourceConstraint,
    Unclear,
}

impl LabelSet for RootCause {
    const LAYER: Layer = Layer::RootCauseCategory;

    fn all() -> &'static [Self] {
        &[
            Self::ArchitecturalLimitation,
            Self::CommunityMismatch,
            Self::TechnicalDebt,
            Self::ResourceConstraint,
            Self::Unclear,
        ]
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::ArchitecturalLimitation => "architectural_limitation",
            Self::CommunityMismatch => "community_mismatch",
            Self::TechnicalDebt => "technical_debt",
            Self::ResourceConstraint => "resource_constraint",
            Self::Unclear => "unclear",
        }
    }

    fn fallback() -> Self {
        Self::Unclear
    }
}

impl fmt::Display for RootCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
