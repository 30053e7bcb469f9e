//! Per-file processing and run aggregation.
//!
//! Each file is read, loaded, patched by the applicable rules, and then either
//! reported (check mode) or serialized and handed to a [`Sink`] (write mode).
//! Every failure is caught here and turned into that file's [`Outcome`]; no
//! single file stops the batch.
use crate::catalog::Catalog;
use crate::codec::Codec;
use crate::error::ProcessError;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Report files that need changes; never serialize or write.
    Check,
    /// Serialize and overwrite files that need changes.
    Write,
}

/// Result of processing one file. `rules` lists the rules that changed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Unchanged,
    NeedsUpdate { rules: Vec<String> },
    Written { rules: Vec<String> },
    /// The file could not be read or parsed.
    Skipped { reason: String },
    /// The updated text could not be written.
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl FileReport {
    /// Line printed for this file, if any.
    pub fn notice(&self) -> Option<String> {
        let path = self.path.display();
        match &self.outcome {
            Outcome::Unchanged => None,
            Outcome::NeedsUpdate { .. } => Some(format!("NEEDS UPDATE: {path}")),
            Outcome::Written { .. } => Some(format!("updated: {path}")),
            Outcome::Skipped { reason } => Some(format!("::warning::Skipping {path}: {reason}")),
            Outcome::Failed { reason } => {
                Some(format!("::error::Failed to write {path}: {reason}"))
            }
        }
    }
}

/// Destination for updated documents.
pub trait Sink {
    fn write(&mut self, path: &Path, text: &str) -> io::Result<()>;
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn write(&mut self, path: &Path, text: &str) -> io::Result<()> {
        (**self).write(path, text)
    }
}

/// Overwrites files in place through a temporary file in the same directory,
/// so a failed write leaves the original intact.
#[derive(Debug, Default)]
pub struct FileSink;

impl Sink for FileSink {
    fn write(&mut self, path: &Path, text: &str) -> io::Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = tempfile::NamedTempFile::new_in(dir)?;
        staged.write_all(text.as_bytes())?;
        if let Ok(metadata) = fs::metadata(path) {
            staged.as_file().set_permissions(metadata.permissions())?;
        }
        staged.persist(path).map_err(|err| err.error)?;
        Ok(())
    }
}

pub struct Processor<'a, S> {
    codec: &'a Codec,
    catalog: &'a Catalog,
    mode: Mode,
    sink: S,
}

impl<'a, S: Sink> Processor<'a, S> {
    pub fn new(codec: &'a Codec, catalog: &'a Catalog, mode: Mode, sink: S) -> Self {
        Self {
            codec,
            catalog,
            mode,
            sink,
        }
    }

    /// Process files one after another.
    pub fn run(&mut self, paths: &[PathBuf]) -> RunSummary {
        let files = paths
            .iter()
            .map(|path| FileReport {
                path: path.clone(),
                outcome: self.process(path),
            })
            .collect();
        RunSummary {
            mode: self.mode,
            files,
        }
    }

    pub fn process(&mut self, path: &Path) -> Outcome {
        match fs::read_to_string(path) {
            Ok(text) => self.process_text(path, &text),
            Err(source) => self.outcome(
                path,
                Err(ProcessError::Read {
                    path: path.to_path_buf(),
                    source,
                }),
            ),
        }
    }

    /// Process `text` as the contents of `path`.
    pub fn process_text(&mut self, path: &Path, text: &str) -> Outcome {
        let result = self.patch(path, text);
        self.outcome(path, result)
    }

    fn patch(&mut self, path: &Path, text: &str) -> Result<Outcome, ProcessError> {
        let mut doc = self.codec.load(path, text)?;
        let rules = self.catalog.apply(path, &mut doc);
        if rules.is_empty() {
            return Ok(Outcome::Unchanged);
        }
        if self.mode == Mode::Check {
            return Ok(Outcome::NeedsUpdate { rules });
        }
        let rendered = self.codec.serialize(&doc);
        let rendered = self.codec.options().newline.apply(&rendered);
        self.sink
            .write(path, &rendered)
            .map_err(|source| ProcessError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::info!(path = %path.display(), ?rules, "updated workflow");
        Ok(Outcome::Written { rules })
    }

    fn outcome(&self, path: &Path, result: Result<Outcome, ProcessError>) -> Outcome {
        match result {
            Ok(outcome) => outcome,
            Err(err @ ProcessError::Write { .. }) => {
                tracing::warn!(path = %path.display(), error = %err, "write failed");
                Outcome::Failed {
                    reason: err.to_string(),
                }
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "skipping file");
                Outcome::Skipped {
                    reason: err.to_string(),
                }
            }
        }
    }
}

/// Aggregate status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Nothing pending, and every needed write succeeded.
    Clean,
    /// Check mode found files that need updates.
    Pending,
    /// At least one write failed.
    Failed,
}

impl RunStatus {
    pub fn exit_code(self) -> u8 {
        match self {
            RunStatus::Clean => 0,
            RunStatus::Failed => 1,
            RunStatus::Pending => 3,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub mode: Mode,
    pub files: Vec<FileReport>,
}

impl RunSummary {
    fn count(&self, wanted: impl Fn(&Outcome) -> bool) -> usize {
        self.files.iter().filter(|file| wanted(&file.outcome)).count()
    }

    pub fn needs_update(&self) -> usize {
        self.count(|outcome| matches!(outcome, Outcome::NeedsUpdate { .. }))
    }

    pub fn written(&self) -> usize {
        self.count(|outcome| matches!(outcome, Outcome::Written { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, Outcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, Outcome::Failed { .. }))
    }

    /// Skipped files are reported but never change the status.
    pub fn status(&self) -> RunStatus {
        if self.failed() > 0 {
            RunStatus::Failed
        } else if self.needs_update() > 0 {
            RunStatus::Pending
        } else {
            RunStatus::Clean
        }
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
