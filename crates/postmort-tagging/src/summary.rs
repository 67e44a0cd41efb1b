use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use postmort_core::{LabelSet, ResolutionStatus, RootCause, TemporalPeriod};

use crate::dedup::DedupReport;

/// Machine-readable account of one pipeline run, written alongside the
/// tagged output.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub records_in: usize,
    pub records_out: usize,
    pub dedup: DedupReport,
    /// Primary-label histograms per layer, keyed by wire name. Every label
    /// of the vocabulary appears, zeroes included.
    pub temporal_counts: BTreeMap<String, usize>,
    pub resolution_counts: BTreeMap<String, usize>,
    pub root_cause_counts: BTreeMap<String, usize>,
    /// `(record, layer)` pairs that fell back because a rule errored.
    pub degraded_labels: usize,
    /// Records where at least one layer matched no rule.
    pub unmatched_records: usize,
}

impl RunSummary {
    #[must_use]
    pub fn new(records_in: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            records_in,
            records_out: 0,
            dedup: DedupReport::default(),
            temporal_counts: zeroed_counts::<TemporalPeriod>(),
            resolution_counts: zeroed_counts::<ResolutionStatus>(),
            root_cause_counts: zeroed_counts::<RootCause>(),
            degraded_labels: 0,
            unmatched_records: 0,
        }
    }
}

fn zeroed_counts<L: LabelSet>() -> BTreeMap<String, usize> {
    L::all()
        .iter()
        .map(|label| (label.as_str().to_string(), 0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn histograms_start_with_every_label_at_zero() {
        let summary = RunSummary::new(0);
        assert_eq!(summary.temporal_counts.len(), TemporalPeriod::all().len());
        assert_eq!(summary.resolution_counts.len(), ResolutionStatus::all().len());
        assert_eq!(summary.root_cause_counts.len(), RootCause::all().len());
        assert!(summary.temporal_counts.values().all(|&n| n == 0));
        assert_eq!(summary.root_cause_counts.get("unclear"), Some(&0));
    }

    #[test]
    fn run_ids_are_unique_per_summary() {
        assert_ne!(RunSummary::new(0).run_id, RunSummary::new(0).run_id);
    }

    #[test]
    fn summary_serializes_with_stable_keys() {
        let summary = RunSummary::new(3);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["records_in"], 3);
        assert_eq!(json["dedup"]["malformed_dropped"], 0);
        assert_eq!(json["temporal_counts"]["pre_launch"], 0);
    }
}
