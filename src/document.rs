//! In-memory model for a loaded workflow document.
//!
//! Nodes carry their semantic value plus the formatting facts the codec needs
//! to reproduce them: scalar style, collection layout, and (for nodes that came
//! from source text) the byte spans they were parsed from. Spans are private to
//! the codec; callers only see values and styles.
//!
//! ```text
//! Document
//! ├── head   (comments, directives, `---` before the first node)
//! ├── root: Node
//! │   ├── Mapping  [Entry { key, value: Node }, ...]
//! │   ├── Sequence [Item { value: Node }, ...]
//! │   ├── Scalar   { text, style, tag }
//! │   └── Alias    { name, target: Node }
//! └── tail   (comments and blank lines after the last node)
//! ```
//!
//! Anything a rule replaces loses its span and is rendered fresh on output;
//! everything else is written back verbatim.
use crate::codec::scalar::{
    block_representable, double_quote_required, plain_representable, resolve_plain,
    resolves_to_string,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

pub(crate) type Span = Range<usize>;

/// Presentation of a scalar in source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScalarStyle {
    Plain,
    SingleQuoted,
    DoubleQuoted,
    Literal,
    Folded,
}

impl ScalarStyle {
    pub fn is_block(self) -> bool {
        matches!(self, ScalarStyle::Literal | ScalarStyle::Folded)
    }
}

impl fmt::Display for ScalarStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ScalarStyle::Plain => "plain",
            ScalarStyle::SingleQuoted => "single-quoted",
            ScalarStyle::DoubleQuoted => "double-quoted",
            ScalarStyle::Literal => "literal",
            ScalarStyle::Folded => "folded",
        };
        f.write_str(label)
    }
}

/// Typed view of a scalar under the YAML 1.2 core schema.
///
/// Only plain scalars resolve to non-string types; any quoted or block scalar
/// is a string regardless of its text, and so is a plain scalar carrying a
/// tag outside the core schema (`!!str 3`, `!env x`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalarValue<'a> {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(&'a str),
}

/// A leaf value with its presentation style.
#[derive(Debug, Clone)]
pub struct Scalar {
    text: String,
    style: ScalarStyle,
    tag: Option<String>,
    pub(crate) origin: Option<Span>,
}

impl Scalar {
    /// Build a scalar in `style`, downgrading to the nearest style that can
    /// actually represent `text` so the rendered form reloads to the same
    /// value and style.
    pub fn new(text: impl Into<String>, style: ScalarStyle) -> Self {
        let text = text.into();
        let style = representable_style(&text, style);
        Self {
            text,
            style,
            tag: None,
            origin: None,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, ScalarStyle::Plain)
    }

    pub fn single_quoted(text: impl Into<String>) -> Self {
        Self::new(text, ScalarStyle::SingleQuoted)
    }

    pub fn double_quoted(text: impl Into<String>) -> Self {
        Self::new(text, ScalarStyle::DoubleQuoted)
    }

    pub fn literal(text: impl Into<String>) -> Self {
        Self::new(text, ScalarStyle::Literal)
    }

    /// A string scalar styled the way a YAML representer would: plain when
    /// the text reads back as a string, single-quoted when it would resolve
    /// to another type (`'false'`, `'3'`), double-quoted when it needs escapes.
    pub fn string(text: impl Into<String>) -> Self {
        let text = text.into();
        if plain_representable(&text) && resolves_to_string(&text) {
            Self::new(text, ScalarStyle::Plain)
        } else {
            Self::new(text, ScalarStyle::SingleQuoted)
        }
    }

    pub fn bool(value: bool) -> Self {
        Self::plain(if value { "true" } else { "false" })
    }

    pub fn int(value: i64) -> Self {
        Self::plain(value.to_string())
    }

    pub fn null() -> Self {
        Self {
            text: String::new(),
            style: ScalarStyle::Plain,
            tag: None,
            origin: None,
        }
    }

    pub(crate) fn parsed(
        text: String,
        style: ScalarStyle,
        tag: Option<String>,
        origin: Span,
    ) -> Self {
        Self {
            text,
            style,
            tag,
            origin: Some(origin),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn style(&self) -> ScalarStyle {
        self.style
    }

    /// The tag written before the scalar in source (`!!str`), if any.
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// True when value and style both match; this is the comparison rules use
    /// to decide whether a field is already canonical.
    pub fn same_as(&self, other: &Scalar) -> bool {
        self.text == other.text && self.style == other.style
    }

    pub fn is_null(&self) -> bool {
        matches!(self.value(), ScalarValue::Null)
    }

    pub fn value(&self) -> ScalarValue<'_> {
        let core = matches!(
            self.tag.as_deref(),
            None | Some("!!null" | "!!bool" | "!!int" | "!!float")
        );
        if self.style != ScalarStyle::Plain || !core {
            return ScalarValue::Str(&self.text);
        }
        resolve_plain(&self.text)
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

fn representable_style(text: &str, style: ScalarStyle) -> ScalarStyle {
    match style {
        ScalarStyle::Plain if plain_representable(text) => ScalarStyle::Plain,
        ScalarStyle::Literal | ScalarStyle::Folded if block_representable(text) => style,
        ScalarStyle::DoubleQuoted => ScalarStyle::DoubleQuoted,
        _ if double_quote_required(text) => ScalarStyle::DoubleQuoted,
        _ => ScalarStyle::SingleQuoted,
    }
}

/// Whether a collection is written with indentation or with brackets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Block,
    Flow,
}

/// How a parsed entry or item sat in the source, used to write it back.
#[derive(Debug, Clone)]
pub(crate) struct Slot {
    /// Comment and blank lines owned by this slot, written before it.
    pub(crate) lead: Span,
    /// The slot's own text: indentation, key or dash, and any inline value.
    /// For nested collections only the key/dash line is covered.
    pub(crate) header: Span,
    /// End of the text kept when the value is re-rendered (`  key: `).
    pub(crate) prefix_end: usize,
    /// Whitespace and comment following the value on its line.
    pub(crate) comment: Span,
    pub(crate) kind: SlotKind,
    /// The slot started mid-line, after a parent's `- `.
    pub(crate) inline_start: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SlotKind {
    /// Value sits on the header line (scalar, flow collection, block scalar).
    Inline,
    /// Value is a block collection on the following lines.
    Nested,
    /// Item whose block collection starts on the dash line (`- key: value`).
    Compact,
}

/// One key/value pair of a mapping.
#[derive(Debug, Clone)]
pub struct Entry {
    key: String,
    pub(crate) key_raw: Option<Span>,
    pub(crate) value: Node,
    pub(crate) slot: Option<Slot>,
}

impl Entry {
    pub(crate) fn parsed(key: String, key_raw: Span, value: Node, slot: Slot) -> Self {
        Self {
            key,
            key_raw: Some(key_raw),
            value,
            slot: Some(slot),
        }
    }

    /// An entry of a flow mapping, which has no line layout of its own.
    pub(crate) fn inline(key: String, key_raw: Span, value: Node) -> Self {
        Self {
            key,
            key_raw: Some(key_raw),
            value,
            slot: None,
        }
    }

    fn fresh(key: String, value: Node) -> Self {
        Self {
            key,
            key_raw: None,
            value,
            slot: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &Node {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut Node {
        &mut self.value
    }
}

/// Ordered key/value collection with unique keys.
#[derive(Debug, Clone)]
pub struct Mapping {
    pub(crate) entries: Vec<Entry>,
    layout: Layout,
    pub(crate) indent: Option<usize>,
    pub(crate) origin: Option<Span>,
    pub(crate) edited: bool,
}

impl Default for Mapping {
    fn default() -> Self {
        Self::new()
    }
}

impl Mapping {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            layout: Layout::Block,
            indent: None,
            origin: None,
            edited: false,
        }
    }

    pub(crate) fn parsed(layout: Layout, indent: Option<usize>, origin: Span) -> Self {
        Self {
            entries: Vec::new(),
            layout,
            indent,
            origin: Some(origin),
            edited: false,
        }
    }

    /// Builder used to spell out canonical content.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Node>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.key == key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| &entry.value)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.entries
            .iter_mut()
            .find(|entry| entry.key == key)
            .map(|entry| &mut entry.value)
    }

    pub fn entry_at(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries
            .iter()
            .map(|entry| (entry.key.as_str(), &entry.value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.key.as_str())
    }

    /// Set `key` to `value`, replacing an existing value in place (the key
    /// keeps its position and surrounding comments) or appending a new entry.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Node>) -> Option<Node> {
        let key = key.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|entry| entry.key == key) {
            return Some(std::mem::replace(&mut entry.value, value));
        }
        self.entries.push(Entry::fresh(key, value));
        self.edited = true;
        None
    }

    /// The value under `key`, created with `make` when the key is absent.
    pub fn get_or_insert_with(
        &mut self,
        key: impl Into<String>,
        make: impl FnOnce() -> Node,
    ) -> &mut Node {
        let key = key.into();
        let index = match self.position(&key) {
            Some(index) => index,
            None => {
                self.entries.push(Entry::fresh(key, make()));
                self.edited = true;
                self.entries.len() - 1
            }
        };
        &mut self.entries[index].value
    }
}

impl PartialEq for Mapping {
    /// Key order is presentation, not meaning.
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key).is_some_and(|theirs| theirs == value))
    }
}

/// One element of a sequence.
#[derive(Debug, Clone)]
pub struct Item {
    pub(crate) value: Node,
    pub(crate) slot: Option<Slot>,
}

impl Item {
    pub(crate) fn parsed(value: Node, slot: Slot) -> Self {
        Self {
            value,
            slot: Some(slot),
        }
    }

    pub(crate) fn inline(value: Node) -> Self {
        Self { value, slot: None }
    }

    fn fresh(value: Node) -> Self {
        Self::inline(value)
    }
}

/// Ordered list of nodes.
#[derive(Debug, Clone)]
pub struct Sequence {
    pub(crate) items: Vec<Item>,
    layout: Layout,
    pub(crate) indent: Option<usize>,
    pub(crate) origin: Option<Span>,
    pub(crate) edited: bool,
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}

impl Sequence {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            layout: Layout::Block,
            indent: None,
            origin: None,
            edited: false,
        }
    }

    pub(crate) fn parsed(layout: Layout, indent: Option<usize>, origin: Span) -> Self {
        Self {
            items: Vec::new(),
            layout,
            indent,
            origin: Some(origin),
            edited: false,
        }
    }

    pub fn with(mut self, value: impl Into<Node>) -> Self {
        self.push(value);
        self
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Node> {
        self.items.get(index).map(|item| &item.value)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Node> {
        self.items.get_mut(index).map(|item| &mut item.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.items.iter().map(|item| &item.value)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.items.iter_mut().map(|item| &mut item.value)
    }

    pub fn push(&mut self, value: impl Into<Node>) {
        self.items.push(Item::fresh(value.into()));
        self.edited = true;
    }

    /// Insert at `index`, clamped to the end of the sequence.
    pub fn insert(&mut self, index: usize, value: impl Into<Node>) {
        let index = index.min(self.items.len());
        self.items.insert(index, Item::fresh(value.into()));
        self.edited = true;
    }
}

impl PartialEq for Sequence {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

/// A reference (`*name`) to an anchored node elsewhere in the document.
///
/// The target is a detached copy of the anchored value. An alias is always
/// written back as `*name`, so edits never go through it.
#[derive(Debug, Clone)]
pub struct Alias {
    name: String,
    target: Box<Node>,
    pub(crate) origin: Span,
}

impl Alias {
    pub(crate) fn parsed(name: String, target: Node, origin: Span) -> Self {
        Self {
            name,
            target: Box::new(target),
            origin,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &Node {
        &self.target
    }
}

impl PartialEq for Alias {
    fn eq(&self, other: &Self) -> bool {
        self.target == other.target
    }
}

/// A node of the document tree.
///
/// Read accessors look through aliases to the anchored value; mutable ones
/// return `None` for them.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Scalar(Scalar),
    Mapping(Mapping),
    Sequence(Sequence),
    Alias(Alias),
}

impl Node {
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Scalar(_) => "scalar",
            Node::Mapping(_) => "mapping",
            Node::Sequence(_) => "sequence",
            Node::Alias(_) => "alias",
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Scalar(scalar) => Some(scalar),
            Node::Alias(alias) => alias.target.as_scalar(),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Node::Mapping(mapping) => Some(mapping),
            Node::Alias(alias) => alias.target.as_mapping(),
            _ => None,
        }
    }

    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Node::Mapping(mapping) => Some(mapping),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Node::Sequence(sequence) => Some(sequence),
            Node::Alias(alias) => alias.target.as_sequence(),
            _ => None,
        }
    }

    pub fn as_sequence_mut(&mut self) -> Option<&mut Sequence> {
        match self {
            Node::Sequence(sequence) => Some(sequence),
            _ => None,
        }
    }

    /// Scalar text, if this is a scalar.
    pub fn text(&self) -> Option<&str> {
        self.as_scalar().map(Scalar::text)
    }

    /// Look up `key` when this node is a mapping.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.as_mapping()?.get(key)
    }
}

impl From<Scalar> for Node {
    fn from(scalar: Scalar) -> Self {
        Node::Scalar(scalar)
    }
}

impl From<Mapping> for Node {
    fn from(mapping: Mapping) -> Self {
        Node::Mapping(mapping)
    }
}

impl From<Sequence> for Node {
    fn from(sequence: Sequence) -> Self {
        Node::Sequence(sequence)
    }
}

/// Root of one parsed configuration file together with its source text.
#[derive(Debug, Clone)]
pub struct Document {
    pub(crate) source: String,
    pub(crate) head: Span,
    pub(crate) root: Node,
    /// Full lines holding a scalar or flow root, when the root is not a block.
    pub(crate) root_lines: Option<Span>,
    pub(crate) tail: Span,
}

impl Document {
    /// A document with no source text, for building content from scratch.
    pub fn new(root: impl Into<Node>) -> Self {
        Self {
            source: String::new(),
            head: 0..0,
            root: root.into(),
            root_lines: None,
            tail: 0..0,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Node {
        &mut self.root
    }

    /// Top-level lookup for mapping documents.
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.root.get(key)
    }

    /// The workflow's display name (`name:` at the top level).
    pub fn workflow_name(&self) -> Option<&str> {
        self.get("name").and_then(Node::text)
    }
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
