use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use workflow_patch::cli::Args;
use workflow_patch::config::{load_config, ToolConfig};
use workflow_patch::process::{FileSink, Processor, RunStatus};

/// Exit status for usage and config errors, matching clap's.
const USAGE_ERROR: u8 = 2;

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing();
    match run(&args) {
        Ok(status) => ExitCode::from(status.exit_code()),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(USAGE_ERROR)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("WFPATCH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(args: &Args) -> Result<RunStatus> {
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ToolConfig::default(),
    };
    let catalog = config.catalog()?;
    let codec = config.codec();
    let mut processor = Processor::new(&codec, &catalog, args.mode(), FileSink);
    let summary = processor.run(&args.files);
    for file in &summary.files {
        if let Some(notice) = file.notice() {
            println!("{notice}");
        }
    }
    if args.json {
        let text = serde_json::to_string_pretty(&summary).context("serialize run summary")?;
        println!("{text}");
    }
    Ok(summary.status())
}
