use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use serde::Serialize;
use tracing::warn;

use postmort_core::{Record, SourceKind};

/// Tracking parameters stripped during URL normalization, besides the
/// `utm_*` family.
const TRACKING_PARAMS: [&str; 5] = ["fbclid", "gclid", "igshid", "mc_cid", "mc_eid"];

/// Counters from one deduplication pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DedupReport {
    pub input: usize,
    pub kept: usize,
    pub malformed_dropped: usize,
    pub primary_collisions: usize,
    pub url_collisions: usize,
}

/// Collapses duplicates and drops records that cannot be keyed at all.
///
/// Stage one collapses records with a non-empty id on `(source, id)`; stage
/// two collapses the survivors on normalized URL. Records with an empty id
/// and no URL are dropped and counted. Survivors are chosen by a total
/// preference order, so neither input order nor map iteration order leaks
/// into the result. Output is sorted by `(source, id, url)`.
#[must_use]
pub fn dedup(records: Vec<Record>) -> (Vec<Record>, DedupReport) {
    let mut report = DedupReport {
        input: records.len(),
        ..DedupReport::default()
    };

    let mut by_key: HashMap<(SourceKind, String), Record> = HashMap::new();
    let mut keyless: Vec<Record> = Vec::new();

    for record in records {
        if record.id.is_empty() {
            if record.url.is_none() {
                report.malformed_dropped += 1;
                warn!(source = %record.source, "dropping record with no id and no url");
                continue;
            }
            // no primary key; participates in the URL stage only
            keyless.push(record);
            continue;
        }
        match by_key.entry((record.source, record.id.clone())) {
            Entry::Occupied(mut slot) => {
                report.primary_collisions += 1;
                if prefer(&record, slot.get()) {
                    slot.insert(record);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
        }
    }

    let mut kept: Vec<Record> = Vec::new();
    let mut by_url: HashMap<String, Record> = HashMap::new();

    for record in by_key.into_values().chain(keyless) {
        let Some(url) = record.url.as_deref() else {
            kept.push(record);
            continue;
        };
        match by_url.entry(normalize_url(url)) {
            Entry::Occupied(mut slot) => {
                report.url_collisions += 1;
                warn!(
                    source = %record.source,
                    id = %record.id,
                    "collapsing url duplicate"
                );
                if prefer(&record, slot.get()) {
                    slot.insert(record);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
        }
    }

    kept.extend(by_url.into_values());
    kept.sort_by(|a, b| {
        (a.source.as_str(), a.id.as_str(), a.url.as_deref())
            .cmp(&(b.source.as_str(), b.id.as_str(), b.url.as_deref()))
    });
    report.kept = kept.len();

    (kept, report)
}

fn prefer(candidate: &Record, incumbent: &Record) -> bool {
    preference(candidate, incumbent) == Ordering::Greater
}

/// Total preference order over duplicates: timestamped beats missing, then
/// longer raw text, then smaller id, then smaller source name. The trailing
/// comparisons only exist to make the order total, so the survivor never
/// depends on which duplicate was seen first.
fn preference(a: &Record, b: &Record) -> Ordering {
    a.timestamp
        .is_some()
        .cmp(&b.timestamp.is_some())
        .then_with(|| a.raw_text.len().cmp(&b.raw_text.len()))
        .then_with(|| b.id.cmp(&a.id))
        .then_with(|| b.source.as_str().cmp(a.source.as_str()))
        .then_with(|| b.timestamp.cmp(&a.timestamp))
        .then_with(|| b.raw_text.cmp(&a.raw_text))
        .then_with(|| b.author_id.cmp(&a.author_id))
        .then_with(|| b.url.cmp(&a.url))
        .then_with(|| {
            let a_meta = serde_json::to_string(&a.metadata).unwrap_or_default();
            let b_meta = serde_json::to_string(&b.metadata).unwrap_or_default();
            b_meta.cmp(&a_meta)
        })
}

/// Canonicalizes a URL for duplicate detection.
///
/// Lowercases scheme and host, strips a single trailing slash from the
/// path, and removes known tracking parameters. Path case, fragment, and
/// the order of surviving query parameters are preserved: they can be
/// significant on the forums this corpus covers.
#[must_use]
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();

    let (rest, fragment) = match url.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (url, None),
    };
    let (path_part, query) = match rest.split_once('?') {
        Some((path_part, query)) => (path_part, Some(query)),
        None => (rest, None),
    };

    let mut base = match path_part.find("://") {
        Some(idx) => {
            let scheme = &path_part[..idx];
            let after = &path_part[idx + 3..];
            match after.find('/') {
                Some(slash) => format!(
                    "{}://{}{}",
                    scheme.to_lowercase(),
                    after[..slash].to_lowercase(),
                    &after[slash..]
                ),
                None => format!("{}://{}", scheme.to_lowercase(), after.to_lowercase()),
            }
        }
        None => path_part.to_string(),
    };
    if base.ends_with('/') && !base.ends_with("//") {
        base.pop();
    }

    let query = query
        .map(|q| {
            q.split('&')
                .filter(|pair| !is_tracking_param(pair))
                .collect::<Vec<_>>()
                .join("&")
        })
        .filter(|q| !q.is_empty());

    if let Some(query) = query {
        base.push('?');
        base.push_str(&query);
    }
    if let Some(fragment) = fragment {
        base.push('#');
        base.push_str(fragment);
    }
    base
}

fn is_tracking_param(pair: &str) -> bool {
    let key = pair.split('=').next().unwrap_or("").to_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}
