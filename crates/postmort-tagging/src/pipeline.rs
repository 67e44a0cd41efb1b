use std::collections::BTreeMap;

use tracing::{info, warn};

use postmort_core::{LabelSet, Record, TaggedRecord};

use crate::anonymize::Anonymizer;
use crate::dedup::dedup;
use crate::engine::{LayerOutcome, RuleEngine};
use crate::error::TaggingError;
use crate::summary::RunSummary;

/// The full tagging pass over one batch: dedup, anonymize, classify,
/// account.
pub struct Pipeline {
    engine: RuleEngine,
    anonymizer: Anonymizer,
}

/// Tagged records plus the run summary, in output order.
pub struct PipelineOutput {
    pub tagged: Vec<TaggedRecord>,
    pub summary: RunSummary,
}

impl Pipeline {
    #[must_use]
    pub fn new(engine: RuleEngine, anonymizer: Anonymizer) -> Self {
        Self { engine, anonymizer }
    }

    /// Runs the whole pipeline over an in-memory batch.
    ///
    /// Never fails once constructed: per-record trouble degrades that record
    /// or layer and is counted in the summary instead.
    #[must_use]
    pub fn run(&self, records: Vec<Record>) -> PipelineOutput {
        let mut summary = RunSummary::new(records.len());

        let (deduped, dedup_report) = dedup(records);
        summary.dedup = dedup_report;

        let mut tagged = Vec::with_capacity(deduped.len());
        for record in deduped {
            let record = self.anonymizer.anonymize(record);
            tagged.push(self.tag_record(record, &mut summary));
        }

        summary.records_out = tagged.len();
        info!(
            run_id = %summary.run_id,
            records_in = summary.records_in,
            records_out = summary.records_out,
            degraded_labels = summary.degraded_labels,
            unmatched_records = summary.unmatched_records,
            "tagging run complete"
        );

        PipelineOutput { tagged, summary }
    }

    fn tag_record(&self, record: Record, summary: &mut RunSummary) -> TaggedRecord {
        let results = self.engine.evaluate(&record);

        let (temporal, temporal_degraded) =
            settle(results.temporal, &record, &mut summary.degraded_labels);
        let (resolution, resolution_degraded) =
            settle(results.resolution, &record, &mut summary.degraded_labels);
        let (root_cause, root_cause_degraded) =
            settle(results.root_cause, &record, &mut summary.degraded_labels);

        if temporal.rule.is_none() || resolution.rule.is_none() || root_cause.rule.is_none() {
            summary.unmatched_records += 1;
        }

        bump(&mut summary.temporal_counts, temporal.label.as_str());
        bump(&mut summary.resolution_counts, resolution.label.as_str());
        bump(&mut summary.root_cause_counts, root_cause.label.as_str());

        let tag_reasoning = [
            reason_for(&temporal, temporal_degraded),
            reason_for(&resolution, resolution_degraded),
            reason_for(&root_cause, root_cause_degraded),
        ]
        .join("; ");

        TaggedRecord {
            record,
            temporal_period: temporal.label,
            temporal_secondary: temporal.secondary,
            temporal_confidence: temporal.confidence,
            resolution_status: resolution.label,
            resolution_secondary: resolution.secondary,
            resolution_confidence: resolution.confidence,
            root_cause_category: root_cause.label,
            root_cause_secondary: root_cause.secondary,
            root_cause_confidence: root_cause.confidence,
            tag_reasoning,
        }
    }
}

/// Unwraps a layer result, degrading to the fallback outcome on error.
fn settle<L: LabelSet>(
    result: Result<LayerOutcome<L>, TaggingError>,
    record: &Record,
    degraded_labels: &mut usize,
) -> (LayerOutcome<L>, bool) {
    match result {
        Ok(outcome) => (outcome, false),
        Err(err) => {
            *degraded_labels += 1;
            warn!(
                source = %record.source,
                id = %record.id,
                layer = %L::LAYER,
                error = %err,
                "rule evaluation failed; layer degraded to its fallback label"
            );
            (LayerOutcome::fallback(), true)
        }
    }
}

fn bump(counts: &mut BTreeMap<String, usize>, label: &str) {
    *counts.entry(label.to_string()).or_insert(0) += 1;
}

fn reason_for<L: LabelSet>(outcome: &LayerOutcome<L>, degraded: bool) -> String {
    let mut part = format!("{}={}", L::LAYER, outcome.label);
    if let Some(secondary) = outcome.secondary {
        part.push_str(&format!("+{secondary}"));
    }
    if degraded {
        part.push_str(" (degraded)");
    } else {
        match &outcome.rule {
            Some(rule) => part.push_str(&format!(" (rule: {rule})")),
            None => part.push_str(" (no match)"),
        }
    }
    part
}
