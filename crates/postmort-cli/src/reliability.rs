//! The `sample` and `kappa` commands: pilot files for double-coding and
//! agreement scoring over the filled-in results.

use std::path::Path;

use postmort_agreement::{
    cohen_kappa, join_coder_rows, pilot_sample, read_coder_rows, write_disagreements, write_sample,
};
use postmort_core::Layer;
use postmort_dataset::{read_tagged, write_json};

fn parse_layer(value: &str) -> anyhow::Result<Layer> {
    Layer::parse(value).ok_or_else(|| {
        anyhow::anyhow!(
            "unknown layer '{value}'; expected temporal_period, resolution_status or root_cause_category"
        )
    })
}

/// Draws a pilot sample from a tagged CSV and writes the three pilot files.
///
/// # Errors
///
/// Returns an error if the layer name or fraction is invalid, the tagged
/// file cannot be read, or the pilot files cannot be written.
pub(crate) fn run_sample(
    input: &Path,
    layer: &str,
    fraction: f64,
    seed: u64,
    out_dir: &Path,
) -> anyhow::Result<()> {
    let layer = parse_layer(layer)?;
    let rows = read_tagged(input)?;
    let sample = pilot_sample(&rows, fraction, seed)?;
    let paths = write_sample(out_dir, &sample, layer)?;

    println!(
        "sampled {} of {} records for {} into {}",
        sample.len(),
        rows.len(),
        layer,
        out_dir.display()
    );
    println!(
        "coder files: {} and {} (labels blank); master: {}",
        paths.coder1.display(),
        paths.coder2.display(),
        paths.master.display()
    );
    Ok(())
}

/// Joins two filled-in pilot files and reports Cohen's kappa.
///
/// # Errors
///
/// Returns an error if the layer name is invalid, either coder file cannot
/// be read, or the report files cannot be written.
pub(crate) fn run_kappa(
    coder1: &Path,
    coder2: &Path,
    layer: &str,
    out_dir: Option<&Path>,
) -> anyhow::Result<()> {
    let layer = parse_layer(layer)?;
    let rows1 = read_coder_rows(coder1)?;
    let rows2 = read_coder_rows(coder2)?;

    let outcome = join_coder_rows(&rows1, &rows2);
    if outcome.unpaired > 0 || outcome.blank_skipped > 0 {
        tracing::warn!(
            unpaired = outcome.unpaired,
            blank_skipped = outcome.blank_skipped,
            "some rows were excluded from scoring"
        );
    }

    let report = cohen_kappa(layer, &outcome.pairs);
    println!(
        "kappa for {}: {:.3} ({}) over {} pairs, {} agreements",
        report.layer, report.kappa, report.interpretation, report.pairs, report.agreements
    );

    if let Some(dir) = out_dir {
        std::fs::create_dir_all(dir)?;
        let report_path = dir.join(format!("kappa_{}.json", report.layer));
        write_json(&report_path, &report)?;
        let disagreements_path = dir.join(format!("disagreements_{}.csv", report.layer));
        let written = write_disagreements(&disagreements_path, &outcome.pairs)?;
        println!(
            "report written to {}; {} disagreements listed in {}",
            report_path.display(),
            written,
            disagreements_path.display()
        );
    }
    Ok(())
}
