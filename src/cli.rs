//! Command-line arguments.
//!
//! The CLI only picks the mode, the files, and an optional config; all
//! behavior lives in the library.
use crate::process::Mode;
use clap::{ArgGroup, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "wfpatch",
    version,
    about = "Apply idempotent, format-preserving patches to CI workflow files",
    after_help = "Exit status:\n  0  nothing to do, or every needed update was written\n  1  an update could not be written\n  2  usage or config error\n  3  --check found files that need updates\n\nExamples:\n  wfpatch --check .github/workflows/pester-selfhosted.yml\n  wfpatch --write .github/workflows/*.yml\n  wfpatch --check --json --config wfpatch.json .github/workflows/ci.yml",
    arg_required_else_help = true
)]
#[command(group(ArgGroup::new("mode").required(true).args(["check", "write"])))]
pub struct Args {
    /// Report files that need updates without changing them
    #[arg(long)]
    pub check: bool,

    /// Rewrite files that need updates in place
    #[arg(long)]
    pub write: bool,

    /// JSON config with codec options and extra rule sets
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the run summary as JSON after the notices
    #[arg(long)]
    pub json: bool,

    /// Workflow files to process
    #[arg(value_name = "FILES", required = true)]
    pub files: Vec<PathBuf>,
}

impl Args {
    pub fn mode(&self) -> Mode {
        if self.write {
            Mode::Write
        } else {
            Mode::Check
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
