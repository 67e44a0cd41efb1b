use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::record::SourceKind;

/// Platform-specific fields carried alongside a record.
///
/// Records from known platforms get a typed shape; anything else is kept
/// verbatim as an opaque map so exports round-trip. Serialization is
/// untagged: the output column holds the same bare JSON object that came in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Metadata {
    Github(GithubMeta),
    QaSite(QaMeta),
    Forum(ForumMeta),
    Opaque(Map<String, Value>),
}

/// Issue/PR/comment fields from the GitHub collector.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GithubMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<String>,
    #[serde(
        default,
        alias = "comments",
        alias = "num_comments",
        skip_serializing_if = "Option::is_none"
    )]
    pub comments_count: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Question/answer fields from the Q&A site collector.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QaMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_answered: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Post/comment fields from forum and mailing-list collectors.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ForumMeta {
    #[serde(default, alias = "score", skip_serializing_if = "Option::is_none")]
    pub points: Option<i64>,
    #[serde(
        default,
        alias = "num_comments",
        skip_serializing_if = "Option::is_none"
    )]
    pub comments_count: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self::Opaque(Map::new())
    }
}

impl Metadata {
    /// Parses the raw metadata JSON carried in an input row.
    ///
    /// The payload is matched against the typed shape for the record's
    /// source; payloads that fit no shape fall back to an opaque map, and
    /// unparseable or empty payloads become an empty map. Ingestion never
    /// fails on metadata.
    #[must_use]
    pub fn from_json(source: SourceKind, raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Self::default();
        }
        match source {
            SourceKind::Issue | SourceKind::PullRequest | SourceKind::Comment => {
                if let Ok(meta) = serde_json::from_str::<GithubMeta>(raw) {
                    return Self::Github(meta);
                }
            }
            SourceKind::QaQuestion | SourceKind::QaAnswer => {
                if let Ok(meta) = serde_json::from_str::<QaMeta>(raw) {
                    return Self::QaSite(meta);
                }
            }
            SourceKind::ForumPost | SourceKind::ForumComment | SourceKind::MailingThread => {
                if let Ok(meta) = serde_json::from_str::<ForumMeta>(raw) {
                    return Self::Forum(meta);
                }
            }
        }
        match serde_json::from_str::<Map<String, Value>>(raw) {
            Ok(map) => Self::Opaque(map),
            Err(_) => Self::default(),
        }
    }

    /// Uniform key lookup across all shapes.
    ///
    /// Typed fields answer under their canonical names; everything else is
    /// looked up in the shape's passthrough map.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        match self {
            Self::Github(meta) => meta.get(key),
            Self::QaSite(meta) => meta.get(key),
            Self::Forum(meta) => meta.get(key),
            Self::Opaque(map) => map.get(key).cloned(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Opaque(map) => map.is_empty(),
            Self::Github(_) | Self::QaSite(_) | Self::Forum(_) => false,
        }
    }
}

impl GithubMeta {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        match key {
            "state" => self.state.clone().map(Value::String),
            "labels" => Some(Value::Array(
                self.labels.iter().cloned().map(Value::String).collect(),
            )),
            "merged" => self.merged.map(Value::Bool),
            "closed_at" => self.closed_at.clone().map(Value::String),
            "comments_count" => self.comments_count.map(Value::from),
            _ => self.extra.get(key).cloned(),
        }
    }
}

impl QaMeta {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        match key {
            "is_answered" => self.is_answered.map(Value::Bool),
            "score" => self.score.map(Value::from),
            "answer_count" => self.answer_count.map(Value::from),
            "tags" => Some(Value::Array(
                self.tags.iter().cloned().map(Value::String).collect(),
            )),
            _ => self.extra.get(key).cloned(),
        }
    }
}

impl ForumMeta {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        match key {
            "points" => self.points.map(Value::from),
            "comments_count" => self.comments_count.map(Value::from),
            _ => self.extra.get(key).cloned(),
        }
    }
}
