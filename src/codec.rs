//! Format-preserving load and serialize for workflow documents.
//!
//! `load` keeps the source text alongside the tree; `serialize` writes every
//! node no rule touched straight from that text, so a document with no edits
//! serializes to exactly its input. Validation and value decoding are done
//! by `serde_yaml`; the codec adds the layout spans on top.
mod emit;
mod parse;
pub(crate) mod scalar;

use crate::document::Document;
use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Line terminator used for written files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Newline {
    #[default]
    Lf,
    Crlf,
}

impl Newline {
    pub fn as_str(self) -> &'static str {
        match self {
            Newline::Lf => "\n",
            Newline::Crlf => "\r\n",
        }
    }

    /// Rewrite every line break in `text` to this convention.
    pub fn apply(self, text: &str) -> String {
        let unified = text.replace("\r\n", "\n");
        match self {
            Newline::Lf => unified,
            Newline::Crlf => unified.replace('\n', "\r\n"),
        }
    }
}

/// Serialization settings, passed explicitly to every codec call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodecOptions {
    /// Column limit for folded block scalars the engine renders.
    pub width: usize,
    /// Nesting step for fresh mappings and block scalar content, used when
    /// the document has no nested mapping to copy it from.
    pub indent: usize,
    /// Dash offset for fresh block sequences under a key, used when the
    /// document has no such sequence to copy it from.
    pub sequence_indent: usize,
    pub newline: Newline,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            width: 4096,
            indent: 2,
            sequence_indent: 2,
            newline: Newline::Lf,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Codec {
    options: CodecOptions,
}

impl Codec {
    pub fn new(options: CodecOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CodecOptions {
        &self.options
    }

    /// Parse `text`; `path` is only used to label errors.
    pub fn load(&self, path: &Path, text: &str) -> Result<Document, ParseError> {
        parse::parse_document(text).map_err(|err| err.at_path(path))
    }

    /// Render `doc`. Fresh lines follow the line breaks already used by the
    /// document's source, or the configured newline for a new document.
    pub fn serialize(&self, doc: &Document) -> String {
        emit::emit(doc, &self.options)
    }
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
