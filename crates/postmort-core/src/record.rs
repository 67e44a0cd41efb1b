use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::labels::{ResolutionStatus, RootCause, TemporalPeriod};
use crate::metadata::Metadata;

/// Where a record was collected from.
///
/// The serde aliases accept the per-platform names the original collectors
/// wrote (`github_issue`, `stackoverflow_question`, ...); output always uses
/// the canonical snake_case names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    #[serde(alias = "github_issue")]
    Issue,
    #[serde(alias = "github_pr", alias = "github_pull_request")]
    PullRequest,
    #[serde(alias = "github_comment", alias = "github_issue_comment")]
    Comment,
    #[serde(alias = "reddit_post", alias = "hackernews_story")]
    ForumPost,
    #[serde(alias = "reddit_comment", alias = "hackernews_comment")]
    ForumComment,
    #[serde(alias = "stackoverflow_question")]
    QaQuestion,
    #[serde(alias = "stackoverflow_answer")]
    QaAnswer,
    #[serde(alias = "google_groups_thread", alias = "mailing_list_thread")]
    MailingThread,
}

impl SourceKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Issue => "issue",
            Self::PullRequest => "pull_request",
            Self::Comment => "comment",
            Self::ForumPost => "forum_post",
            Self::ForumComment => "forum_comment",
            Self::QaQuestion => "qa_question",
            Self::QaAnswer => "qa_answer",
            Self::MailingThread => "mailing_thread",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One community record about the studied framework, as ingested.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub source: SourceKind,
    pub id: String,
    /// Absent when the collector could not recover a timestamp. Never
    /// defaulted to the current time.
    pub timestamp: Option<DateTime<Utc>>,
    pub raw_text: String,
    pub author_id: String,
    pub url: Option<String>,
    pub metadata: Metadata,
}

/// A record with all three classification layers applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaggedRecord {
    pub record: Record,
    pub temporal_period: TemporalPeriod,
    pub temporal_secondary: Option<TemporalPeriod>,
    pub temporal_confidence: f32,
    pub resolution_status: ResolutionStatus,
    pub resolution_secondary: Option<ResolutionStatus>,
    pub resolution_confidence: f32,
    pub root_cause_category: RootCause,
    pub root_cause_secondary: Option<RootCause>,
    pub root_cause_confidence: f32,
    /// Human-readable trace of which rule produced each label.
    pub tag_reasoning: String,
}

/// Parses the timestamp formats seen across the collectors.
///
/// Accepts RFC 3339 (with offset or `Z`), a naive `T`- or space-separated
/// datetime (taken as UTC), and a bare date (midnight UTC). Anything else is
/// `None`.
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN).and_utc());
    }
    None
}
