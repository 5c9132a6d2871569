//! ndsplit: Split an ndjson file into one file per routing key
//!
//! Usage:
//!   # Split by inparams.target into the current directory
//!   ndsplit runs.ndjson
//!
//!   # Split into ./by_target
//!   ndsplit -o=by_target runs.ndjson
//!
//!   # Route on a different field chain, skipping unroutable lines
//!   ndsplit --skip-invalid --out-folder=out events.ndjson meta source

// Use MiMalloc allocator for better performance (recommended by simd-json)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use ndsplit::{
    DecoderKind, ErrorPolicy, KeyPath, KeyPolicy, NoopReporter, PartitionEngine, ProgressReporter,
    RunSummary, SplitConfig, TerminalReporter,
};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "ndsplit", version)]
#[command(about = "Splits ndjson file into multiple files according to values at json path identifiers", long_about = None)]
struct Args {
    /// ndjson input file
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Field names leading to the routing key (default: inparams target)
    #[arg(value_name = "FIELD")]
    key_path: Vec<String>,

    /// Output directory, created if missing
    #[arg(long = "out-folder", short = 'o', value_name = "DIR", default_value = ".")]
    out_folder: PathBuf,

    /// Skip lines that are not valid JSON or have no usable routing key
    #[arg(long)]
    skip_invalid: bool,

    /// How routing keys become file names
    #[arg(long, value_enum, default_value_t = KeyPolicyArg::Reject)]
    key_policy: KeyPolicyArg,

    /// Parse lines with simd-json
    #[arg(long)]
    simd: bool,

    /// Don't render progress or the output listing
    #[arg(long, short)]
    quiet: bool,

    /// Print the run summary as JSON instead of a listing
    #[arg(long)]
    json_summary: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KeyPolicyArg {
    Reject,
    Sanitize,
    PassThrough,
}

impl From<KeyPolicyArg> for KeyPolicy {
    fn from(arg: KeyPolicyArg) -> Self {
        match arg {
            KeyPolicyArg::Reject => KeyPolicy::Reject,
            KeyPolicyArg::Sanitize => KeyPolicy::Sanitize,
            KeyPolicyArg::PassThrough => KeyPolicy::PassThrough,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    // Build config
    let mut config = SplitConfig {
        out_dir: args.out_folder.clone(),
        key_policy: args.key_policy.into(),
        ..SplitConfig::default()
    };
    if !args.key_path.is_empty() {
        config.key_path = KeyPath::new(args.key_path.iter().cloned())?;
    }
    if args.skip_invalid {
        config.error_policy = ErrorPolicy::Skip;
    }
    if args.simd {
        config.decoder = DecoderKind::Simd;
    }

    let mut engine = PartitionEngine::new(&args.input, config)?;

    let mut reporter: Box<dyn ProgressReporter> = if args.quiet || args.json_summary {
        Box::new(NoopReporter)
    } else {
        // the progress line rewrites the line above it
        println!("Processing file {}", args.input.display());
        Box::new(TerminalReporter::new(std::io::stdout()))
    };

    let summary = engine
        .run(&mut *reporter)
        .with_context(|| format!("Failed to split {}", args.input.display()))?;

    if args.json_summary {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if !args.quiet {
        print_listing(&summary)?;
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// One line per output file: record count, then path
fn print_listing(summary: &RunSummary) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    for output in &summary.outputs {
        writeln!(stdout, "{}\t{}", output.records, output.path.display())?;
    }
    if summary.records_skipped > 0 {
        writeln!(stdout, "skipped {} records", summary.records_skipped)?;
    }
    Ok(())
}
