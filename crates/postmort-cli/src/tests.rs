use std::path::PathBuf;

use super::*;

#[test]
fn parses_tag_with_defaults() {
    let cli = Cli::try_parse_from([
        "postmort",
        "tag",
        "--input",
        "raw.csv",
        "--output",
        "tagged.csv",
    ])
    .expect("expected valid cli args");

    let Some(Commands::Tag {
        input,
        rules,
        output,
        summary,
    }) = cli.command
    else {
        panic!("unexpected command variant");
    };
    assert_eq!(input, PathBuf::from("raw.csv"));
    assert_eq!(rules, PathBuf::from("config/rules.yaml"));
    assert_eq!(output, PathBuf::from("tagged.csv"));
    assert!(summary.is_none());
}

#[test]
fn parses_tag_with_all_flags() {
    let cli = Cli::try_parse_from([
        "postmort",
        "tag",
        "--input",
        "raw.csv",
        "--rules",
        "other/rules.yaml",
        "--output",
        "tagged.csv",
        "--summary",
        "summary.json",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Tag {
            ref rules,
            summary: Some(ref summary),
            ..
        }) if rules == &PathBuf::from("other/rules.yaml")
            && summary == &PathBuf::from("summary.json")
    ));
}

#[test]
fn tag_requires_input_and_output() {
    assert!(Cli::try_parse_from(["postmort", "tag"]).is_err());
    assert!(Cli::try_parse_from(["postmort", "tag", "--input", "raw.csv"]).is_err());
}

#[test]
fn parses_sample_defaults() {
    let cli = Cli::try_parse_from([
        "postmort",
        "sample",
        "--input",
        "tagged.csv",
        "--layer",
        "resolution_status",
    ])
    .expect("expected valid cli args");

    let Some(Commands::Sample {
        layer,
        fraction,
        seed,
        out_dir,
        ..
    }) = cli.command
    else {
        panic!("unexpected command variant");
    };
    assert_eq!(layer, "resolution_status");
    assert!((fraction - 0.15).abs() < 1e-12);
    assert_eq!(seed, 42);
    assert_eq!(out_dir, PathBuf::from("pilot"));
}

#[test]
fn parses_sample_with_overrides() {
    let cli = Cli::try_parse_from([
        "postmort",
        "sample",
        "--input",
        "tagged.csv",
        "--layer",
        "temporal_period",
        "--fraction",
        "0.3",
        "--seed",
        "7",
        "--out-dir",
        "pilot-2026",
    ])
    .expect("expected valid cli args");

    let Some(Commands::Sample {
        fraction,
        seed,
        out_dir,
        ..
    }) = cli.command
    else {
        panic!("unexpected command variant");
    };
    assert!((fraction - 0.3).abs() < 1e-12);
    assert_eq!(seed, 7);
    assert_eq!(out_dir, PathBuf::from("pilot-2026"));
}

#[test]
fn parses_kappa_without_out_dir() {
    let cli = Cli::try_parse_from([
        "postmort",
        "kappa",
        "--coder1",
        "pilot/pilot_coder1.csv",
        "--coder2",
        "pilot/pilot_coder2.csv",
        "--layer",
        "root_cause_category",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Kappa {
            out_dir: None,
            ref layer,
            ..
        }) if layer == "root_cause_category"
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["postmort"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn rejects_unknown_flags() {
    assert!(Cli::try_parse_from([
        "postmort",
        "tag",
        "--input",
        "raw.csv",
        "--output",
        "tagged.csv",
        "--frobnicate",
    ])
    .is_err());
}
