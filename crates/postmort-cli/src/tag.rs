//! The `tag` command: ingest collector CSV, deduplicate, anonymize,
//! classify, and write the tagged dataset.

use std::path::Path;

use postmort_core::load_rules;
use postmort_dataset::{read_records, write_json, write_tagged, TaggedRow};
use postmort_tagging::{Anonymizer, Pipeline, RuleEngine};

/// Runs the full tagging pass from one input file to one output file.
///
/// # Errors
///
/// Returns an error if the rules file is missing or invalid, the salt env
/// var is required but unset, the input cannot be read, or an output file
/// cannot be written. Undecodable input rows and per-record rule failures
/// are counted and logged instead.
pub(crate) fn run_tag(
    input: &Path,
    rules_path: &Path,
    output: &Path,
    summary_path: Option<&Path>,
) -> anyhow::Result<()> {
    let rules = load_rules(rules_path)?;
    let engine = RuleEngine::from_config(&rules)?;
    let anonymizer = Anonymizer::from_config(&rules.anonymization)?;

    let (records, ingest) = read_records(input)?;
    if ingest.rejected > 0 {
        tracing::warn!(
            rejected = ingest.rejected,
            rows = ingest.rows,
            "some input rows could not be decoded"
        );
    }

    let pipeline = Pipeline::new(engine, anonymizer);
    let result = pipeline.run(records);

    let rows = result
        .tagged
        .iter()
        .map(TaggedRow::from_tagged)
        .collect::<Result<Vec<_>, _>>()?;
    write_tagged(output, &rows)?;

    if let Some(path) = summary_path {
        write_json(path, &result.summary)?;
        println!("run summary written to {}", path.display());
    }

    let summary = &result.summary;
    let duplicates = summary.dedup.primary_collisions + summary.dedup.url_collisions;
    println!(
        "tagged {} of {} records ({} duplicates removed, {} dropped as malformed, {} unmatched on at least one layer)",
        summary.records_out,
        summary.records_in,
        duplicates,
        summary.dedup.malformed_dropped,
        summary.unmatched_records
    );
    Ok(())
}
