//! Serializer: document model back to text.
//!
//! Parsed slots whose values are untouched are copied from the source. A slot
//! whose value changed keeps its key text and trailing comment and renders
//! only the value; entries and items added by rules are rendered at the
//! indentation of their collection. Fresh nested collections use the
//! indentation steps the document already shows, falling back to
//! `CodecOptions` for documents that have none.
use super::scalar::{render_block, render_inline};
use super::CodecOptions;
use crate::document::{Document, Layout, Mapping, Node, Scalar, Sequence, Slot, SlotKind, Span};

pub(super) fn emit(doc: &Document, options: &CodecOptions) -> String {
    let src = doc.source.as_str();
    let newline = match src.find('\n') {
        Some(index) if src[..index].ends_with('\r') => "\r\n",
        Some(_) => "\n",
        None => options.newline.as_str(),
    };
    let mut steps = Steps::default();
    steps.observe(&doc.root);
    let mut emitter = Emitter {
        src,
        options,
        indent: steps.mapping.unwrap_or(options.indent),
        sequence_indent: steps.sequence.unwrap_or(options.sequence_indent),
        newline,
        out: String::with_capacity(src.len() + 256),
    };
    emitter.document(doc);
    emitter.out
}

/// Indentation steps observed in parsed block collections.
#[derive(Debug, Default)]
struct Steps {
    /// Columns between a key and the keys of its nested mapping.
    mapping: Option<usize>,
    /// Columns between a key and the dashes of its nested sequence.
    sequence: Option<usize>,
}

impl Steps {
    fn observe(&mut self, node: &Node) {
        if self.mapping.is_some() && self.sequence.is_some() {
            return;
        }
        match node {
            Node::Mapping(mapping) => {
                for entry in &mapping.entries {
                    let nested = entry
                        .slot
                        .as_ref()
                        .is_some_and(|slot| slot.kind == SlotKind::Nested);
                    if let (true, Some(parent)) = (nested, mapping.indent) {
                        match &entry.value {
                            Node::Mapping(child) => {
                                if let Some(child) = child.indent {
                                    self.mapping.get_or_insert(child.saturating_sub(parent));
                                }
                            }
                            Node::Sequence(child) => {
                                if let Some(child) = child.indent {
                                    self.sequence.get_or_insert(child.saturating_sub(parent));
                                }
                            }
                            _ => {}
                        }
                    }
                    self.observe(&entry.value);
                }
            }
            Node::Sequence(sequence) => sequence.iter().for_each(|item| self.observe(item)),
            Node::Scalar(_) | Node::Alias(_) => {}
        }
    }
}

struct Emitter<'a> {
    src: &'a str,
    options: &'a CodecOptions,
    indent: usize,
    sequence_indent: usize,
    newline: &'static str,
    out: String,
}

impl Emitter<'_> {
    fn document(&mut self, doc: &Document) {
        self.raw(&doc.head);
        match &doc.root {
            Node::Mapping(mapping) if is_block(&doc.root) => {
                self.block_mapping(mapping, mapping.indent.unwrap_or(0), false)
            }
            Node::Sequence(sequence) if is_block(&doc.root) => {
                self.block_sequence(sequence, sequence.indent.unwrap_or(0), false)
            }
            Node::Mapping(mapping) if mapping.layout() == Layout::Block => {}
            root => match &doc.root_lines {
                Some(lines) if inline_pristine(root) => self.raw(lines),
                _ => {
                    self.ensure_newline();
                    self.value(root, 0, true, "", "");
                }
            },
        }
        if !doc.tail.is_empty() {
            self.ensure_newline();
            self.raw(&doc.tail);
        }
    }

    fn block_mapping(&mut self, mapping: &Mapping, indent: usize, mid_line: bool) {
        for (index, entry) in mapping.entries.iter().enumerate() {
            let mid_line = mid_line && index == 0;
            match &entry.slot {
                Some(slot) => self.slot(slot, &entry.value, indent, mid_line, true),
                None => {
                    self.start_line(indent, mid_line);
                    self.out.push_str(&render_key(entry.key()));
                    self.out.push(':');
                    self.value(&entry.value, indent, true, " ", "");
                }
            }
        }
    }

    fn block_sequence(&mut self, sequence: &Sequence, indent: usize, mid_line: bool) {
        for (index, item) in sequence.items.iter().enumerate() {
            let mid_line = mid_line && index == 0;
            match &item.slot {
                Some(slot) => self.slot(slot, &item.value, indent, mid_line, false),
                None => {
                    self.start_line(indent, mid_line);
                    self.out.push('-');
                    self.value(&item.value, indent, false, " ", "");
                }
            }
        }
    }

    /// Write a parsed entry or item. `mid_line` is set when the output cursor
    /// sits after a parent's `- `.
    fn slot(&mut self, slot: &Slot, value: &Node, indent: usize, mid_line: bool, in_mapping: bool) {
        let header_start = match (mid_line, slot.inline_start) {
            (true, true) => slot.header.start,
            (true, false) => {
                let text = &self.src[slot.header.start..slot.header.end];
                slot.header.start + text.len() - text.trim_start_matches(' ').len()
            }
            (false, true) => {
                self.start_line(indent, false);
                slot.header.start
            }
            (false, false) => {
                if !slot.lead.is_empty() {
                    self.ensure_newline();
                    self.raw(&slot.lead);
                }
                self.ensure_newline();
                slot.header.start
            }
        };
        let header = header_start..slot.header.end;
        match slot.kind {
            SlotKind::Inline if inline_pristine(value) => self.raw(&header),
            SlotKind::Nested | SlotKind::Compact if is_block(value) => {
                self.raw(&header);
                let compact = slot.kind == SlotKind::Compact;
                let step = match value {
                    _ if compact => 2,
                    Node::Sequence(_) if in_mapping => self.sequence_indent,
                    Node::Sequence(_) => 2,
                    _ => self.indent,
                };
                match value {
                    Node::Mapping(mapping) => {
                        self.block_mapping(mapping, mapping.indent.unwrap_or(indent + step), compact)
                    }
                    Node::Sequence(sequence) => self.block_sequence(
                        sequence,
                        sequence.indent.unwrap_or(indent + step),
                        compact,
                    ),
                    Node::Scalar(_) | Node::Alias(_) => {}
                }
            }
            _ => {
                let prefix = self.src[header_start..slot.prefix_end].trim_end_matches([' ', '\t']);
                self.out.push_str(prefix);
                let comment = &self.src[slot.comment.clone()];
                self.value(value, indent, in_mapping, " ", comment);
            }
        }
    }

    /// Render `node` after a `key:` or `-` indicator at column `indent`.
    /// `sep` goes between the indicator and an inline value; `comment` ends
    /// the indicator's line.
    fn value(&mut self, node: &Node, indent: usize, in_mapping: bool, sep: &str, comment: &str) {
        if is_block(node) {
            let compact = !in_mapping && !sep.is_empty();
            let step = match node {
                Node::Sequence(_) => self.sequence_indent,
                _ => self.indent,
            };
            let child = if compact {
                self.out.push(' ');
                indent + 2
            } else if sep.is_empty() {
                indent
            } else {
                self.out.push_str(comment);
                self.newline();
                indent + step
            };
            match node {
                Node::Mapping(mapping) => {
                    self.block_mapping(mapping, mapping.indent.unwrap_or(child), compact)
                }
                Node::Sequence(sequence) => {
                    self.block_sequence(sequence, sequence.indent.unwrap_or(child), compact)
                }
                Node::Scalar(_) | Node::Alias(_) => {}
            }
            return;
        }
        if let Node::Scalar(scalar) = node {
            if scalar.style().is_block() {
                self.block_scalar(scalar, indent, sep, comment);
                return;
            }
        }
        let text = self.flow_text(node, false);
        if !text.is_empty() {
            self.out.push_str(sep);
            self.out.push_str(&text);
        }
        self.out.push_str(comment);
        self.newline();
    }

    fn block_scalar(&mut self, scalar: &Scalar, indent: usize, sep: &str, comment: &str) {
        let step = self.indent.max(1);
        let content_indent = indent + step;
        let rendered = render_block(
            scalar.text(),
            scalar.style(),
            content_indent,
            step,
            self.options.width,
        );
        self.out.push_str(sep);
        self.out.push_str(&rendered.indicator);
        self.out.push_str(comment);
        self.newline();
        for line in &rendered.lines {
            if !line.is_empty() {
                self.out.push_str(&" ".repeat(content_indent));
                self.out.push_str(line);
            }
            self.newline();
        }
    }

    /// Single-line text of a scalar or flow collection. Untouched single-line
    /// nodes keep their source text.
    fn flow_text(&self, node: &Node, in_flow: bool) -> String {
        if inline_pristine(node) {
            if let Some(origin) = node_origin(node) {
                let text = &self.src[origin.clone()];
                if !text.contains('\n') {
                    return text.to_string();
                }
            }
        }
        match node {
            Node::Scalar(scalar) => render_inline(scalar.text(), scalar.style(), in_flow),
            Node::Mapping(mapping) => {
                let entries: Vec<String> = mapping
                    .entries
                    .iter()
                    .map(|entry| {
                        let key = match &entry.key_raw {
                            Some(raw) if !self.src[raw.clone()].contains('\n') => {
                                self.src[raw.clone()].to_string()
                            }
                            _ => render_key(entry.key()),
                        };
                        let value = self.flow_text(entry.value(), true);
                        if value.is_empty() {
                            key
                        } else {
                            format!("{key}: {value}")
                        }
                    })
                    .collect();
                format!("{{{}}}", entries.join(", "))
            }
            Node::Sequence(sequence) => {
                let items: Vec<String> = sequence
                    .iter()
                    .map(|item| self.flow_text(item, true))
                    .collect();
                format!("[{}]", items.join(", "))
            }
            Node::Alias(alias) => format!("*{}", alias.name()),
        }
    }

    fn start_line(&mut self, indent: usize, mid_line: bool) {
        if !mid_line {
            self.ensure_newline();
            self.out.push_str(&" ".repeat(indent));
        }
    }

    fn raw(&mut self, span: &Span) {
        self.out.push_str(&self.src[span.clone()]);
    }

    fn newline(&mut self) {
        self.out.push_str(self.newline);
    }

    fn ensure_newline(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.newline();
        }
    }
}

fn render_key(key: &str) -> String {
    let scalar = Scalar::string(key);
    render_inline(scalar.text(), scalar.style(), false)
}

fn node_origin(node: &Node) -> Option<&Span> {
    match node {
        Node::Scalar(scalar) => scalar.origin.as_ref(),
        Node::Mapping(mapping) => mapping.origin.as_ref(),
        Node::Sequence(sequence) => sequence.origin.as_ref(),
        Node::Alias(alias) => Some(&alias.origin),
    }
}

/// A non-empty block collection. Children of a flow collection are written
/// in flow whatever their own layout.
fn is_block(node: &Node) -> bool {
    match node {
        Node::Mapping(mapping) => !mapping.is_empty() && mapping.layout() == Layout::Block,
        Node::Sequence(sequence) => !sequence.is_empty() && sequence.layout() == Layout::Block,
        Node::Scalar(_) | Node::Alias(_) => false,
    }
}

/// A value on its slot's line that can be copied from source unchanged.
fn inline_pristine(node: &Node) -> bool {
    match node {
        Node::Scalar(scalar) => scalar.origin.is_some(),
        Node::Alias(_) => true,
        Node::Mapping(mapping) => {
            mapping.layout() == Layout::Flow
                && mapping.origin.is_some()
                && !mapping.edited
                && mapping
                    .entries
                    .iter()
                    .all(|entry| entry.key_raw.is_some() && inline_pristine(&entry.value))
        }
        Node::Sequence(sequence) => {
            sequence.layout() == Layout::Flow
                && sequence.origin.is_some()
                && !sequence.edited
                && sequence.iter().all(inline_pristine)
        }
    }
}
