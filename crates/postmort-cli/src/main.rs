mod reliability;
mod tag;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "postmort-cli")]
#[command(about = "Research-data pipeline for the framework post-mortem study")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Deduplicate, anonymize and classify collector records
    Tag {
        /// Collector CSV to ingest
        #[arg(long)]
        input: PathBuf,

        /// Rules file with period boundaries and classification rules
        #[arg(long, default_value = "config/rules.yaml")]
        rules: PathBuf,

        /// Where to write the tagged CSV
        #[arg(long)]
        output: PathBuf,

        /// Where to write the JSON run summary (skipped when omitted)
        #[arg(long)]
        summary: Option<PathBuf>,
    },
    /// Draw a reproducible pilot sample for double-coding
    Sample {
        /// Tagged CSV produced by `tag`
        #[arg(long)]
        input: PathBuf,

        /// Layer the coders will label (temporal_period, resolution_status,
        /// root_cause_category)
        #[arg(long)]
        layer: String,

        /// Fraction of records to sample, within (0, 1]
        #[arg(long, default_value_t = 0.15)]
        fraction: f64,

        /// Seed for the sample draw; the same seed selects the same records
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Directory for the pilot files
        #[arg(long, default_value = "pilot")]
        out_dir: PathBuf,
    },
    /// Score inter-rater agreement between two filled-in pilot files
    Kappa {
        /// First coder's filled-in pilot file
        #[arg(long)]
        coder1: PathBuf,

        /// Second coder's filled-in pilot file
        #[arg(long)]
        coder2: PathBuf,

        /// Layer the coders labelled
        #[arg(long)]
        layer: String,

        /// Directory for the kappa report and disagreement list
        /// (print-only when omitted)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Tag {
            input,
            rules,
            output,
            summary,
        }) => tag::run_tag(&input, &rules, &output, summary.as_deref()),
        Some(Commands::Sample {
            input,
            layer,
            fraction,
            seed,
            out_dir,
        }) => reliability::run_sample(&input, &layer, fraction, seed, &out_dir),
        Some(Commands::Kappa {
            coder1,
            coder2,
            layer,
            out_dir,
        }) => reliability::run_kappa(&coder1, &coder2, &layer, out_dir.as_deref()),
        None => {
            println!("no command given; run with --help to see available commands");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests;
