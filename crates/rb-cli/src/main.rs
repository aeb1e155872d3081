//! rbcombine CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rb_combine::{CombineOptions, HistogramCatalog, MergeRules, read_config};
use rb_core::{Store, StructuredSource};
use rb_store::ContainerStore;
use std::path::PathBuf;

mod inputs;

#[derive(Parser)]
#[command(name = "rbcombine")]
#[command(about = "Combine histogram output files from many analysis runs")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge two or more analysis or combine outputs into one file
    Combine {
        /// Output file (never glob-expanded)
        output: PathBuf,

        /// Input files or glob patterns
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Replace the output file if it exists
        #[arg(long)]
        overwrite: bool,

        /// Threads (0 = auto). Use 1 for sequential processing.
        #[arg(long)]
        threads: Option<usize>,

        /// Config file (YAML, or JSON by extension) with merge rules and defaults
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the run report as pretty JSON to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// List the histograms of a file and how they would be merged
    Inspect {
        /// File to inspect
        input: PathBuf,

        /// Config file providing merge rules
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print version
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Combine { output, inputs, overwrite, threads, config, report } => {
            cmd_combine(output, &inputs, overwrite, threads, config, report)
        }
        Commands::Inspect { input, config, json } => cmd_inspect(&input, config, json),
        Commands::Version => {
            println!("rbcombine {}", rb_core::VERSION);
            Ok(())
        }
    }
}

fn cmd_combine(
    output: PathBuf,
    inputs: &[String],
    overwrite: bool,
    threads: Option<usize>,
    config: Option<PathBuf>,
    report_path: Option<PathBuf>,
) -> Result<()> {
    let mut options = CombineOptions::default();
    if let Some(path) = &config {
        options.apply(read_config(path)?);
    }
    if overwrite {
        options.overwrite = true;
    }
    if let Some(t) = threads {
        options.threads = t;
    }

    rb_combine::check_output_path(&output)?;
    let inputs = inputs::expand_inputs(inputs)?;
    tracing::info!(output = %output.display(), inputs = inputs.len(), "combining");

    let report = rb_combine::combine(&ContainerStore, &output, &inputs, &options)
        .with_context(|| format!("combine into {} failed", output.display()))?;
    println!("{}", report.summary());

    if let Some(path) = report_path {
        std::fs::write(&path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("cannot write report {}", path.display()))?;
    }
    Ok(())
}

fn cmd_inspect(input: &PathBuf, config: Option<PathBuf>, json: bool) -> Result<()> {
    let rules = match &config {
        Some(path) => read_config(path)?.merge_rules.unwrap_or_default(),
        None => MergeRules::default(),
    };
    let source = ContainerStore.open(input)?;
    let catalog = HistogramCatalog::build(&source, &rules)?;
    let header = source.header();

    if json {
        let histograms: Vec<serde_json::Value> = catalog
            .entries()
            .iter()
            .map(|e| {
                serde_json::json!({
                    "path": e.object_path().to_string(),
                    "dims": e.dims,
                    "merge": e.kind,
                })
            })
            .collect();
        let auxiliary: Vec<String> = catalog
            .auxiliary()
            .iter()
            .map(|a| rb_core::ObjectPath::new(&a.path, a.name.clone()).to_string())
            .collect();
        let value = serde_json::json!({
            "header": header,
            "histograms": histograms,
            "auxiliary": auxiliary,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!(
        "{}: {} v{} ({} original events)",
        input.display(),
        header.data_type,
        header.data_version,
        header.metadata.n_original_events
    );
    for e in catalog.entries() {
        println!("  {:<5} {}D  {}", e.kind.to_string(), e.dims, e.object_path());
    }
    for a in catalog.auxiliary() {
        println!("  {:<5} --  {}", "copy", rb_core::ObjectPath::new(&a.path, a.name.clone()));
    }
    Ok(())
}
