//! Idempotent, format-preserving structural patches for CI workflow files.
//!
//! Documents are loaded by the [`codec`] into the [`document`] model, patched
//! by the rules of a [`catalog`], and written back so that everything no rule
//! touched keeps its exact source text. [`process`] runs a batch of files in
//! check or write mode.
pub mod catalog;
pub mod cli;
pub mod codec;
pub mod config;
pub mod document;
pub mod error;
pub mod locate;
pub mod process;
pub mod rules;

pub use catalog::{Catalog, FileMatch, RuleSet};
pub use codec::{Codec, CodecOptions, Newline};
pub use document::{Alias, Document, Mapping, Node, Scalar, ScalarStyle, Sequence};
pub use error::{ParseError, ProcessError};
pub use locate::{NodePath, Target};
pub use process::{FileReport, FileSink, Mode, Outcome, Processor, RunStatus, RunSummary, Sink};
pub use rules::{Action, Effect, Rule};
