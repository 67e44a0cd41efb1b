use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use regex::Regex;
use serde_json::Value;

use postmort_core::{Metadata, Predicate, Record, SourceKind};

use crate::error::TaggingError;

/// A record plus its case-folded text, computed once so every predicate in
/// every layer shares the same pass.
pub(crate) struct EvalContext<'a> {
    pub record: &'a Record,
    pub lower_text: String,
}

impl<'a> EvalContext<'a> {
    pub fn new(record: &'a Record) -> Self {
        Self {
            lower_text: record.raw_text.to_lowercase(),
            record,
        }
    }
}

/// Regex compiled on first use. Rule files validate structurally at load;
/// a pattern the regex engine rejects surfaces as a per-record evaluation
/// error instead.
#[derive(Debug)]
struct LazyRegex {
    pattern: String,
    compiled: OnceLock<Result<Regex, regex::Error>>,
}

impl LazyRegex {
    fn new(pattern: String) -> Self {
        Self {
            pattern,
            compiled: OnceLock::new(),
        }
    }

    fn get(&self) -> Result<&Regex, TaggingError> {
        self.compiled
            .get_or_init(|| Regex::new(&self.pattern))
            .as_ref()
            .map_err(|e| TaggingError::InvalidRegex {
                pattern: self.pattern.clone(),
                message: e.to_string(),
            })
    }
}

/// A condition tree ready to run: phrases case-folded once, date bounds
/// widened to UTC instants, regexes wrapped for lazy compilation.
#[derive(Debug)]
pub(crate) enum CompiledPredicate {
    Contains(String),
    ContainsAny(Vec<String>),
    Matches(LazyRegex),
    DateRange {
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    },
    SourceIs(SourceKind),
    FieldEquals {
        field: String,
        value: Value,
    },
    FieldAtLeast {
        field: String,
        value: f64,
    },
    AllOf(Vec<CompiledPredicate>),
    AnyOf(Vec<CompiledPredicate>),
    Not(Box<CompiledPredicate>),
}

pub(crate) fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

impl CompiledPredicate {
    pub fn compile(predicate: &Predicate) -> Self {
        match predicate {
            Predicate::Contains(phrase) => Self::Contains(phrase.to_lowercase()),
            Predicate::ContainsAny(phrases) => {
                Self::ContainsAny(phrases.iter().map(|p| p.to_lowercase()).collect())
            }
            Predicate::Matches(pattern) => Self::Matches(LazyRegex::new(pattern.clone())),
            Predicate::DateRange { from, to } => Self::DateRange {
                from: from.map(day_start),
                to: to.map(day_start),
            },
            Predicate::SourceIs(source) => Self::SourceIs(*source),
            Predicate::FieldEquals { field, value } => Self::FieldEquals {
                field: field.clone(),
                value: value.clone(),
            },
            Predicate::FieldAtLeast { field, value } => Self::FieldAtLeast {
                field: field.clone(),
                value: *value,
            },
            Predicate::AllOf(parts) => Self::AllOf(parts.iter().map(Self::compile).collect()),
            Predicate::AnyOf(parts) => Self::AnyOf(parts.iter().map(Self::compile).collect()),
            Predicate::Not(inner) => Self::Not(Box::new(Self::compile(inner))),
        }
    }

    pub fn eval(&self, ctx: &EvalContext<'_>) -> Result<bool, TaggingError> {
        match self {
            Self::Contains(phrase) => Ok(ctx.lower_text.contains(phrase.as_str())),
            Self::ContainsAny(phrases) => {
                Ok(phrases.iter().any(|p| ctx.lower_text.contains(p.as_str())))
            }
            Self::Matches(regex) => Ok(regex.get()?.is_match(&ctx.record.raw_text)),
            Self::DateRange { from, to } => Ok(match ctx.record.timestamp {
                // records without a timestamp never fall inside a range
                None => false,
                Some(ts) => from.is_none_or(|f| ts >= f) && to.is_none_or(|t| ts < t),
            }),
            Self::SourceIs(source) => Ok(ctx.record.source == *source),
            Self::FieldEquals { field, value } => {
                Ok(field_equals(&ctx.record.metadata, field, value))
            }
            Self::FieldAtLeast { field, value } => {
                field_at_least(&ctx.record.metadata, field, *value)
            }
            Self::AllOf(parts) => {
                for part in parts {
                    if !part.eval(ctx)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::AnyOf(parts) => {
                for part in parts {
                    if part.eval(ctx)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Self::Not(inner) => Ok(!inner.eval(ctx)?),
        }
    }
}

/// Missing fields compare unequal; a list field matches if any element does.
fn field_equals(metadata: &Metadata, field: &str, expected: &Value) -> bool {
    let Some(actual) = metadata.get(field) else {
        return false;
    };
    match &actual {
        Value::Array(items) => items.iter().any(|item| value_eq(item, expected)),
        other => value_eq(other, expected),
    }
}

fn value_eq(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::String(a), Value::String(b)) => a.eq_ignore_ascii_case(b),
        _ => actual == expected,
    }
}

/// Missing fields compare false; a present non-numeric field is a config
/// mistake worth surfacing, not a silent false.
fn field_at_least(metadata: &Metadata, field: &str, threshold: f64) -> Result<bool, TaggingError> {
    let Some(actual) = metadata.get(field) else {
        return Ok(false);
    };
    match actual.as_f64() {
        Some(n) => Ok(n >= threshold),
        None => Err(TaggingError::NonNumericField {
            field: field.to_string(),
            found: value_kind(&actual),
        }),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
