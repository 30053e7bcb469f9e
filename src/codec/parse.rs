//! Loader: source text to document model.
//!
//! `serde_yaml` validates the text and decodes every value, including
//! escapes, folding, tags and aliases. The layout pass here then walks the
//! same document line by line, pairing each decoded value with the byte spans
//! it occupies so the emitter can write untouched parts back exactly. Comment
//! and blank lines inside a collection are owned by the entry that follows
//! them; those before the first node form the document head and those after
//! the last node its tail.
//!
//! A document that is valid YAML but laid out in a way the layout pass does
//! not model is rejected rather than rewritten.
use crate::document::{
    Alias, Document, Entry, Item, Layout, Mapping, Node, Scalar, ScalarStyle, Sequence, Slot,
    SlotKind, Span,
};
use crate::error::SyntaxError;
use serde::Deserialize;
use serde_yaml::Value;

type ParseResult<T> = Result<T, SyntaxError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineClass {
    Blank,
    Comment,
    Content,
    DocStart,
    DocEnd,
    Directive,
}

#[derive(Debug, Clone, Copy)]
struct Line {
    start: usize,
    /// End of the line's text, excluding `\r\n` / `\n`.
    end: usize,
    /// Start of the following line.
    next: usize,
    indent: usize,
    class: LineClass,
}

fn scan_lines(src: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut start = 0;
    while start < src.len() {
        let (break_at, next) = match src[start..].find('\n') {
            Some(index) => (start + index, start + index + 1),
            None => (src.len(), src.len()),
        };
        let end = if src[start..break_at].ends_with('\r') {
            break_at - 1
        } else {
            break_at
        };
        let text = &src[start..end];
        let indent = count_spaces(text);
        let rest = &text[indent..];
        let class = if rest.trim().is_empty() {
            LineClass::Blank
        } else if rest.starts_with('#') {
            LineClass::Comment
        } else if indent == 0 && is_marker(text, "---") {
            LineClass::DocStart
        } else if indent == 0 && is_marker(text, "...") {
            LineClass::DocEnd
        } else if indent == 0 && text.starts_with('%') {
            LineClass::Directive
        } else {
            LineClass::Content
        };
        lines.push(Line {
            start,
            end,
            next,
            indent,
            class,
        });
        start = next;
    }
    lines
}

fn is_marker(text: &str, marker: &str) -> bool {
    text.strip_prefix(marker)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with([' ', '\t']))
}

fn is_dash(text: &str) -> bool {
    is_marker(text, "-")
}

/// `? key`: an explicit mapping key.
fn is_explicit_key(text: &str) -> bool {
    is_marker(text, "?")
}

/// `: value` following an explicit key.
fn is_explicit_value(text: &str) -> bool {
    is_marker(text, ":")
}

/// Parse a complete document.
pub(super) fn parse_document(src: &str) -> ParseResult<Document> {
    let value = decode(src)?;
    Parser {
        src,
        lines: scan_lines(src),
        pos: 0,
    }
    .parse(&value)
}

/// Validate `src` and decode its first document.
fn decode(src: &str) -> ParseResult<Value> {
    let Some(document) = serde_yaml::Deserializer::from_str(src).next() else {
        return Ok(Value::Null);
    };
    Value::deserialize(document).map_err(|err| {
        let (line, column) = err
            .location()
            .map_or((1, 1), |location| (location.line(), location.column()));
        SyntaxError {
            line,
            column,
            message: err.to_string(),
        }
    })
}

/// Value inside any number of tags.
fn untag(value: &Value) -> &Value {
    match value {
        Value::Tagged(tagged) => untag(&tagged.value),
        other => other,
    }
}

/// Text of a decoded scalar. Strings carry their decoded text; other scalars
/// (`true`, `0x1F`, `~`) keep `raw`, their text in source. Collections have no
/// scalar text.
fn scalar_text(value: &Value, raw: &str) -> Option<String> {
    match untag(value) {
        Value::String(text) => Some(text.clone()),
        Value::Null | Value::Bool(_) | Value::Number(_) => Some(raw.to_string()),
        _ => None,
    }
}

/// Lookup text of a mapping key.
fn key_text(key: &Value, raw: &str) -> String {
    match untag(key) {
        Value::String(text) => text.clone(),
        _ => raw.trim().to_string(),
    }
}

/// Fresh copy of an aliased value.
fn detached(value: &Value) -> Node {
    match value {
        Value::Null => Node::Scalar(Scalar::null()),
        Value::Bool(flag) => Node::Scalar(Scalar::bool(*flag)),
        Value::Number(number) => Node::Scalar(Scalar::plain(number.to_string())),
        Value::String(text) => Node::Scalar(Scalar::string(text.clone())),
        Value::Sequence(items) => Node::Sequence(
            items
                .iter()
                .fold(Sequence::new(), |sequence, item| sequence.with(detached(item))),
        ),
        Value::Mapping(entries) => Node::Mapping(entries.iter().fold(
            Mapping::new(),
            |mapping, (key, value)| {
                let raw = serde_yaml::to_string(key).unwrap_or_default();
                mapping.with(key_text(key, &raw), detached(value))
            },
        )),
        Value::Tagged(tagged) => detached(&tagged.value),
    }
}

/// Anchor and tag properties in front of a node.
struct Properties {
    tag: Option<String>,
    /// End of the last property; the node start when there are none.
    end: usize,
    /// Where the node itself begins.
    content: usize,
}

/// A mapping key found on a line.
struct KeySplit {
    raw: Span,
    /// Offset just past the `:` indicator.
    colon_end: usize,
}

/// A value that starts on the current line.
struct InlineValue {
    node: Node,
    /// Where the value begins, after any properties.
    start: usize,
    comment: Span,
    /// Index of the last line the value occupies.
    end_line: usize,
}

struct Parser<'a> {
    src: &'a str,
    lines: Vec<Line>,
    pos: usize,
}

impl Parser<'_> {
    fn parse(mut self, value: &Value) -> ParseResult<Document> {
        let mut started = false;
        while let Some(line) = self.lines.get(self.pos).copied() {
            match line.class {
                LineClass::Blank | LineClass::Comment => {}
                LineClass::Directive if !started => {}
                LineClass::DocStart if !started => {
                    started = true;
                    let after = self.src[line.start + 3..line.end].trim_start();
                    if !after.is_empty() && !after.starts_with('#') {
                        return Err(self.error(
                            line.end - after.len(),
                            "content on the document start line is not supported",
                        ));
                    }
                }
                LineClass::Content => break,
                _ => return Err(self.error(line.start, "unexpected document marker")),
            }
            self.pos += 1;
        }
        let head = 0..self.offset_at(self.pos);

        let (root, root_lines) = match self.lines.get(self.pos).copied() {
            Some(line) if line.class == LineClass::Content => self.parse_root(line, value)?,
            _ => (
                Node::Mapping(Mapping::parsed(
                    Layout::Block,
                    Some(0),
                    head.end..head.end,
                )),
                None,
            ),
        };

        let tail_start = self.offset_at(self.pos);
        let mut ended = false;
        while let Some(line) = self.lines.get(self.pos).copied() {
            match line.class {
                LineClass::Blank | LineClass::Comment => {}
                LineClass::DocEnd if !ended => ended = true,
                LineClass::DocStart | LineClass::Directive => {
                    return Err(self.error(line.start, "multiple documents are not supported"))
                }
                _ => {
                    return Err(self.error(
                        line.start + line.indent,
                        "unexpected content after the document root",
                    ))
                }
            }
            self.pos += 1;
        }

        Ok(Document {
            source: self.src.to_string(),
            head,
            root,
            root_lines,
            tail: tail_start..self.src.len(),
        })
    }

    fn parse_root(&mut self, line: Line, value: &Value) -> ParseResult<(Node, Option<Span>)> {
        let offset = line.start + line.indent;
        let text = &self.src[offset..line.end];
        if is_dash(text) {
            let sequence = self.parse_block_sequence(line.indent, None, value)?;
            return Ok((Node::Sequence(sequence), None));
        }
        if self.opens_mapping(offset, line.end) {
            let mapping = self.parse_block_mapping(line.indent, None, value)?;
            return Ok((Node::Mapping(mapping), None));
        }
        let inline = self.parse_inline_value(offset, 0, value)?;
        self.pos = inline.end_line + 1;
        let lines = line.start..self.lines[inline.end_line].next;
        Ok((inline.node, Some(lines)))
    }

    fn opens_mapping(&self, start: usize, end: usize) -> bool {
        is_explicit_key(&self.src[start..end]) || self.split_key(start, end).is_some()
    }

    fn parse_block_mapping(
        &mut self,
        indent: usize,
        first: Option<usize>,
        value: &Value,
    ) -> ParseResult<Mapping> {
        let origin_start = first.unwrap_or_else(|| self.offset_at(self.pos));
        let Value::Mapping(decoded) = untag(value) else {
            return Err(self.unsupported(origin_start));
        };
        let mut pairs = decoded.iter();
        let mut mapping = Mapping::parsed(Layout::Block, Some(indent), origin_start..origin_start);
        if let Some(offset) = first {
            let Some((key, value)) = pairs.next() else {
                return Err(self.unsupported(offset));
            };
            let entry = self.parse_entry(indent, offset, offset..offset, true, key, value)?;
            mapping.entries.push(entry);
        }
        loop {
            let lead_start = self.offset_at(self.pos);
            let Some(index) = self.peek_content() else {
                break;
            };
            let line = self.lines[index];
            if line.indent < indent {
                break;
            }
            let offset = line.start + line.indent;
            if line.indent > indent || is_dash(&self.src[offset..line.end]) {
                return Err(self.unsupported(offset));
            }
            let Some((key, value)) = pairs.next() else {
                return Err(self.unsupported(offset));
            };
            self.pos = index;
            let entry = self.parse_entry(indent, offset, lead_start..line.start, false, key, value)?;
            mapping.entries.push(entry);
        }
        if pairs.next().is_some() {
            return Err(self.unsupported(origin_start));
        }
        mapping.origin = Some(origin_start..self.offset_at(self.pos));
        Ok(mapping)
    }

    fn parse_entry(
        &mut self,
        indent: usize,
        offset: usize,
        lead: Span,
        inline_start: bool,
        key: &Value,
        value: &Value,
    ) -> ParseResult<Entry> {
        let line = self.lines[self.pos];
        let header_start = if inline_start { offset } else { line.start };
        let (raw, colon_end) = if is_explicit_key(&self.src[offset..line.end]) {
            self.explicit_key(indent, offset)?
        } else {
            let split = self
                .split_key(offset, line.end)
                .ok_or_else(|| self.unsupported(offset))?;
            (split.raw, split.colon_end)
        };
        let text = key_text(key, &self.src[raw.clone()]);
        let (value, slot) = self.parse_value(indent, header_start, colon_end, true, value)?;
        let slot = Slot {
            lead,
            inline_start,
            ..slot
        };
        Ok(Entry::parsed(text, raw, value, slot))
    }

    /// Span of a `? key` and the offset past the `:` that follows it on a
    /// later line at the same indentation. Leaves the parser on that line.
    fn explicit_key(&mut self, indent: usize, offset: usize) -> ParseResult<(Span, usize)> {
        let line = self.lines[self.pos];
        let key_start = offset + 1 + count_spaces(&self.src[offset + 1..line.end]);
        let mut key_end = line.end;
        let mut index = self.pos + 1;
        loop {
            let Some(next) = self.lines.get(index).copied() else {
                return Err(self.unsupported(offset));
            };
            let text = &self.src[next.start + next.indent..next.end];
            match next.class {
                LineClass::Blank | LineClass::Comment => {}
                LineClass::Content if next.indent > indent => key_end = next.end,
                LineClass::Content if next.indent == indent && is_explicit_value(text) => {
                    self.pos = index;
                    return Ok((key_start..key_end, next.start + next.indent + 1));
                }
                _ => return Err(self.unsupported(offset)),
            }
            index += 1;
        }
    }

    fn parse_block_sequence(
        &mut self,
        indent: usize,
        first: Option<usize>,
        value: &Value,
    ) -> ParseResult<Sequence> {
        let origin_start = first.unwrap_or_else(|| self.offset_at(self.pos));
        let Value::Sequence(decoded) = untag(value) else {
            return Err(self.unsupported(origin_start));
        };
        let mut values = decoded.iter();
        let mut sequence =
            Sequence::parsed(Layout::Block, Some(indent), origin_start..origin_start);
        if let Some(offset) = first {
            let Some(value) = values.next() else {
                return Err(self.unsupported(offset));
            };
            let item = self.parse_item(offset, offset..offset, true, value)?;
            sequence.items.push(item);
        }
        loop {
            let lead_start = self.offset_at(self.pos);
            let Some(index) = self.peek_content() else {
                break;
            };
            let line = self.lines[index];
            if line.indent < indent {
                break;
            }
            let offset = line.start + line.indent;
            if line.indent > indent {
                return Err(self.unsupported(offset));
            }
            if !is_dash(&self.src[offset..line.end]) {
                break;
            }
            let Some(value) = values.next() else {
                return Err(self.unsupported(offset));
            };
            self.pos = index;
            let item = self.parse_item(offset, lead_start..line.start, false, value)?;
            sequence.items.push(item);
        }
        if values.next().is_some() {
            return Err(self.unsupported(origin_start));
        }
        sequence.origin = Some(origin_start..self.offset_at(self.pos));
        Ok(sequence)
    }

    fn parse_item(
        &mut self,
        offset: usize,
        lead: Span,
        inline_start: bool,
        value: &Value,
    ) -> ParseResult<Item> {
        let line = self.lines[self.pos];
        let dash_col = offset - line.start;
        let header_start = if inline_start { offset } else { line.start };
        let after = offset + 1;
        let content = after + count_blanks(&self.src[after..line.end]);
        let rest = &self.src[content..line.end];
        if !rest.is_empty() && !rest.starts_with('#') {
            let content_col = content - line.start;
            let compact = Slot {
                lead: lead.clone(),
                header: header_start..content,
                prefix_end: content,
                comment: content..content,
                kind: SlotKind::Compact,
                inline_start,
            };
            if is_dash(rest) {
                let sequence = self.parse_block_sequence(content_col, Some(content), value)?;
                return Ok(Item::parsed(Node::Sequence(sequence), compact));
            }
            if self.opens_mapping(content, line.end) {
                let mapping = self.parse_block_mapping(content_col, Some(content), value)?;
                return Ok(Item::parsed(Node::Mapping(mapping), compact));
            }
        }
        let (value, slot) = self.parse_value(dash_col, header_start, after, false, value)?;
        let slot = Slot {
            lead,
            inline_start,
            ..slot
        };
        Ok(Item::parsed(value, slot))
    }

    /// Parse the value following a `key:` or `-` indicator that ends at
    /// `after` on the current line. `parent` is the column of that indicator.
    /// Properties stay with the indicator, so a re-rendered value keeps them.
    fn parse_value(
        &mut self,
        parent: usize,
        header_start: usize,
        after: usize,
        in_mapping: bool,
        value: &Value,
    ) -> ParseResult<(Node, Slot)> {
        let line = self.lines[self.pos];
        let value_start = after + count_blanks(&self.src[after..line.end]);
        let props = self.properties(value_start, line.end);
        let rest = &self.src[props.content..line.end];

        if !rest.is_empty() && !rest.starts_with('#') {
            let inline = self.parse_inline_value(value_start, parent, value)?;
            self.pos = inline.end_line + 1;
            let slot = Slot {
                lead: 0..0,
                header: header_start..self.lines[inline.end_line].next,
                prefix_end: inline.start,
                comment: inline.comment,
                kind: SlotKind::Inline,
                inline_start: false,
            };
            return Ok((inline.node, slot));
        }

        let after = if props.end > value_start {
            props.end
        } else {
            after
        };
        self.pos += 1;
        let slot = |kind, header: Span| Slot {
            lead: 0..0,
            header,
            prefix_end: after,
            comment: after..line.end,
            kind,
            inline_start: false,
        };
        if let Some(index) = self.peek_content() {
            let next = self.lines[index];
            let offset = next.start + next.indent;
            let text = &self.src[offset..next.end];
            let nested_sequence = is_dash(text)
                && (next.indent > parent || (in_mapping && next.indent == parent));
            if nested_sequence {
                let sequence = self.parse_block_sequence(next.indent, None, value)?;
                let header = header_start..line.next;
                return Ok((Node::Sequence(sequence), slot(SlotKind::Nested, header)));
            }
            if next.indent > parent && self.opens_mapping(offset, next.end) {
                let mapping = self.parse_block_mapping(next.indent, None, value)?;
                let header = header_start..line.next;
                return Ok((Node::Mapping(mapping), slot(SlotKind::Nested, header)));
            }
            if next.indent > parent {
                // A scalar on the lines below its key.
                self.pos = index;
                let inline = self.parse_inline_value(offset, parent, value)?;
                self.pos = inline.end_line + 1;
                let slot = Slot {
                    lead: 0..0,
                    header: header_start..self.lines[inline.end_line].next,
                    prefix_end: after,
                    comment: inline.comment,
                    kind: SlotKind::Inline,
                    inline_start: false,
                };
                return Ok((inline.node, slot));
            }
        }
        let text = scalar_text(value, "").ok_or_else(|| self.unsupported(after))?;
        let null = Scalar::parsed(text, ScalarStyle::Plain, props.tag, after..after);
        Ok((Node::Scalar(null), slot(SlotKind::Inline, header_start..line.next)))
    }

    /// Parse a scalar, alias or flow collection starting at `start` on the
    /// current line. Does not advance past it; callers move to `end_line + 1`.
    fn parse_inline_value(
        &mut self,
        start: usize,
        parent: usize,
        value: &Value,
    ) -> ParseResult<InlineValue> {
        let line = self.lines[self.pos];
        let props = self.properties(start, line.end);
        let start = props.content;
        match self.src.as_bytes().get(start) {
            Some(b'|' | b'>') => self.parse_block_scalar(start, parent, props.tag, value),
            Some(b'[' | b'{') => {
                let mut cursor = start;
                let node = self.flow_node(&mut cursor, value)?;
                self.finish_inline(node, start, cursor)
            }
            Some(b'\'' | b'"') => {
                let (scalar, end) = self.parse_quoted(start, props.tag, value)?;
                self.finish_inline(Node::Scalar(scalar), start, end)
            }
            Some(b'*') => {
                let mut cursor = start;
                let alias = self.alias(&mut cursor, value);
                self.finish_inline(alias, start, cursor)
            }
            Some(_) => self.parse_plain(start, parent, props.tag, value),
            None => Err(self.unsupported(start)),
        }
    }

    /// Check what follows a quoted, alias or flow value on its last line.
    fn finish_inline(&self, node: Node, start: usize, end: usize) -> ParseResult<InlineValue> {
        let end_line = self.line_index(end.saturating_sub(1));
        let line_end = self.lines[end_line].end;
        let tail = self.src[end..line_end].trim_start_matches([' ', '\t']);
        if !tail.is_empty() && !tail.starts_with('#') {
            return Err(self.unsupported(end));
        }
        Ok(InlineValue {
            node,
            start,
            comment: end..line_end,
            end_line,
        })
    }

    fn parse_plain(
        &mut self,
        start: usize,
        parent: usize,
        tag: Option<String>,
        value: &Value,
    ) -> ParseResult<InlineValue> {
        let line = self.lines[self.pos];
        let mut end = plain_end(self.src, start, line.end);
        let mut end_line = self.pos;
        let mut commented = has_comment(self.src, end, line.end);
        let mut index = self.pos + 1;
        while !commented {
            let Some(next) = self.lines.get(index).copied() else {
                break;
            };
            match next.class {
                LineClass::Blank => {}
                LineClass::Content if next.indent > parent => {
                    end = plain_end(self.src, next.start + next.indent, next.end);
                    end_line = index;
                    commented = has_comment(self.src, end, next.end);
                }
                _ => break,
            }
            index += 1;
        }
        let text = scalar_text(value, &self.src[start..end]).ok_or_else(|| self.unsupported(start))?;
        let scalar = Scalar::parsed(text, ScalarStyle::Plain, tag, start..end);
        Ok(InlineValue {
            node: Node::Scalar(scalar),
            start,
            comment: end..self.lines[end_line].end,
            end_line,
        })
    }

    /// Find where a block scalar's content ends. The decoded text comes from
    /// `value`.
    fn parse_block_scalar(
        &mut self,
        start: usize,
        parent: usize,
        tag: Option<String>,
        value: &Value,
    ) -> ParseResult<InlineValue> {
        let line = self.lines[self.pos];
        let bytes = self.src.as_bytes();
        let literal = bytes[start] == b'|';
        let mut cursor = start + 1;
        let mut keep = false;
        let mut explicit = None;
        while cursor < line.end {
            match bytes[cursor] {
                b'+' => keep = true,
                b'-' => {}
                digit @ b'1'..=b'9' => explicit = Some(usize::from(digit - b'0')),
                _ => break,
            }
            cursor += 1;
        }
        let comment = cursor..line.end;

        let mut content_indent = explicit.map(|step| parent + step);
        let mut last_content = None;
        let mut index = self.pos + 1;
        while let Some(next) = self.lines.get(index) {
            if next.class == LineClass::Blank {
                index += 1;
                continue;
            }
            let required = match content_indent {
                Some(required) => required,
                None if next.indent > parent => {
                    content_indent = Some(next.indent);
                    next.indent
                }
                None => break,
            };
            if next.indent < required {
                break;
            }
            last_content = Some(index);
            index += 1;
        }

        let mut end_line = last_content.unwrap_or(self.pos);
        if keep && last_content.is_some() {
            while self
                .lines
                .get(end_line + 1)
                .is_some_and(|next| next.class == LineClass::Blank)
            {
                end_line += 1;
            }
        }
        let text = scalar_text(value, "").ok_or_else(|| self.unsupported(start))?;
        let style = if literal {
            ScalarStyle::Literal
        } else {
            ScalarStyle::Folded
        };
        let scalar = Scalar::parsed(text, style, tag, start..self.lines[end_line].end);
        Ok(InlineValue {
            node: Node::Scalar(scalar),
            start,
            comment,
            end_line,
        })
    }

    /// The quoted scalar at `start` and the offset just past its closing
    /// quote.
    fn parse_quoted(
        &self,
        start: usize,
        tag: Option<String>,
        value: &Value,
    ) -> ParseResult<(Scalar, usize)> {
        let close = scan_quoted(self.src, start, self.src.len())
            .ok_or_else(|| self.unsupported(start))?;
        let text = scalar_text(value, &self.src[start + 1..close])
            .ok_or_else(|| self.unsupported(start))?;
        let style = if self.src.as_bytes()[start] == b'\'' {
            ScalarStyle::SingleQuoted
        } else {
            ScalarStyle::DoubleQuoted
        };
        Ok((Scalar::parsed(text, style, tag, start..close + 1), close + 1))
    }

    /// An alias at `cursor`; its target is the value the decoder resolved.
    fn alias(&self, cursor: &mut usize, value: &Value) -> Node {
        let start = *cursor;
        *cursor = token_end(self.src, start + 1, self.src.len());
        let name = self.src[start + 1..*cursor].to_string();
        Node::Alias(Alias::parsed(name, detached(value), start..*cursor))
    }

    /// Anchor and tag properties starting at `start`, up to `end`.
    fn properties(&self, start: usize, end: usize) -> Properties {
        let bytes = self.src.as_bytes();
        let mut tag = None;
        let mut last = start;
        let mut cursor = start;
        while cursor < end && matches!(bytes[cursor], b'&' | b'!') {
            let token = token_end(self.src, cursor + 1, end);
            if bytes[cursor] == b'!' {
                tag = Some(self.src[cursor..token].to_string());
            }
            last = token;
            cursor = token + count_blanks(&self.src[token..end]);
        }
        Properties {
            tag,
            end: last,
            content: cursor,
        }
    }

    /// Find a mapping key at `start`, returning `None` when the line holds a
    /// plain value instead. The key span includes any properties.
    fn split_key(&self, start: usize, end: usize) -> Option<KeySplit> {
        let props = self.properties(start, end);
        let key_start = props.content;
        let rest = &self.src[key_start..end];
        let bytes = rest.as_bytes();
        let first = *bytes.first()?;
        let colon_follows = |index: usize| {
            bytes.get(index) == Some(&b':')
                && matches!(bytes.get(index + 1), None | Some(b' ' | b'\t'))
        };
        let split = |key_end: usize, colon: usize| KeySplit {
            raw: start..key_start + key_end,
            colon_end: key_start + colon + 1,
        };
        match first {
            b'\'' | b'"' => {
                let close = scan_quoted(self.src, key_start, end)?;
                let after = close + 1 - key_start;
                let colon = after + count_blanks(&rest[after..]);
                colon_follows(colon).then(|| split(after, colon))
            }
            b'*' => {
                let after = token_end(self.src, key_start + 1, end) - key_start;
                let colon = after + count_blanks(&rest[after..]);
                colon_follows(colon).then(|| split(after, colon))
            }
            b'[' | b'{' | b'#' | b'|' | b'>' | b'%' | b'@' | b'`' => None,
            _ => {
                for (index, &byte) in bytes.iter().enumerate() {
                    if colon_follows(index) {
                        let key = rest[..index].trim_end_matches([' ', '\t']);
                        return (!key.is_empty()).then(|| split(key.len(), index));
                    }
                    if byte == b'#' && index > 0 && matches!(bytes[index - 1], b' ' | b'\t') {
                        return None;
                    }
                }
                None
            }
        }
    }

    fn flow_node(&self, cursor: &mut usize, value: &Value) -> ParseResult<Node> {
        self.skip_flow_space(cursor);
        let start = *cursor;
        let props = self.properties(start, self.src.len());
        *cursor = props.content;
        self.skip_flow_space(cursor);
        let mut node = match self.src.as_bytes().get(*cursor) {
            None => return Err(self.unsupported(*cursor)),
            Some(b'[') => self.flow_sequence(cursor, value)?,
            Some(b'{') => self.flow_mapping(cursor, value)?,
            Some(b'\'' | b'"') => {
                let (scalar, end) = self.parse_quoted(*cursor, props.tag, value)?;
                *cursor = end;
                Node::Scalar(scalar)
            }
            Some(b'*') => self.alias(cursor, value),
            Some(_) => {
                let plain_start = *cursor;
                *cursor = self.flow_plain_end(plain_start)?;
                let text = scalar_text(value, &self.src[plain_start..*cursor])
                    .ok_or_else(|| self.unsupported(plain_start))?;
                Node::Scalar(Scalar::parsed(
                    text,
                    ScalarStyle::Plain,
                    props.tag,
                    plain_start..*cursor,
                ))
            }
        };
        // Flow items are copied by origin, so the origin covers properties.
        if props.end > start {
            widen_origin(&mut node, start);
        }
        Ok(node)
    }

    fn flow_sequence(&self, cursor: &mut usize, value: &Value) -> ParseResult<Node> {
        let start = *cursor;
        let Value::Sequence(decoded) = untag(value) else {
            return Err(self.unsupported(start));
        };
        let mut values = decoded.iter();
        *cursor += 1;
        let mut sequence = Sequence::parsed(Layout::Flow, None, start..start);
        loop {
            self.skip_flow_space(cursor);
            if self.src.as_bytes().get(*cursor) == Some(&b']') {
                *cursor += 1;
                break;
            }
            let value = values.next().ok_or_else(|| self.unsupported(*cursor))?;
            let node = self.flow_node(cursor, value)?;
            sequence.items.push(Item::inline(node));
            self.skip_flow_space(cursor);
            match self.src.as_bytes().get(*cursor) {
                Some(b',') => *cursor += 1,
                Some(b']') => {
                    *cursor += 1;
                    break;
                }
                _ => return Err(self.unsupported(*cursor)),
            }
        }
        sequence.origin = Some(start..*cursor);
        Ok(Node::Sequence(sequence))
    }

    fn flow_mapping(&self, cursor: &mut usize, value: &Value) -> ParseResult<Node> {
        let start = *cursor;
        let Value::Mapping(decoded) = untag(value) else {
            return Err(self.unsupported(start));
        };
        let mut pairs = decoded.iter();
        *cursor += 1;
        let mut mapping = Mapping::parsed(Layout::Flow, None, start..start);
        loop {
            self.skip_flow_space(cursor);
            let bytes = self.src.as_bytes();
            if bytes.get(*cursor) == Some(&b'}') {
                *cursor += 1;
                break;
            }
            let (key, value) = pairs.next().ok_or_else(|| self.unsupported(*cursor))?;
            let key_start = *cursor;
            *cursor = match bytes.get(*cursor) {
                Some(b'\'' | b'"') => scan_quoted(self.src, key_start, self.src.len())
                    .map(|close| close + 1)
                    .ok_or_else(|| self.unsupported(key_start))?,
                Some(b'[' | b'{' | b'?' | b'&' | b'!' | b'*') => {
                    return Err(self.unsupported(key_start))
                }
                _ => self.flow_plain_end(key_start)?,
            };
            let key_raw = key_start..*cursor;
            self.skip_flow_space(cursor);
            let has_value = bytes.get(*cursor) == Some(&b':');
            if has_value {
                *cursor += 1;
                self.skip_flow_space(cursor);
            }
            let node = if has_value && !matches!(bytes.get(*cursor), Some(b',' | b'}')) {
                self.flow_node(cursor, value)?
            } else {
                let text = scalar_text(value, "").ok_or_else(|| self.unsupported(*cursor))?;
                Node::Scalar(Scalar::parsed(
                    text,
                    ScalarStyle::Plain,
                    None,
                    *cursor..*cursor,
                ))
            };
            let text = key_text(key, &self.src[key_raw.clone()]);
            mapping.entries.push(Entry::inline(text, key_raw, node));
            self.skip_flow_space(cursor);
            match bytes.get(*cursor) {
                Some(b',') => *cursor += 1,
                Some(b'}') => {
                    *cursor += 1;
                    break;
                }
                _ => return Err(self.unsupported(*cursor)),
            }
        }
        mapping.origin = Some(start..*cursor);
        Ok(Node::Mapping(mapping))
    }

    /// End of a plain scalar inside a flow collection.
    fn flow_plain_end(&self, start: usize) -> ParseResult<usize> {
        let bytes = self.src.as_bytes();
        let mut end = start;
        while let Some(&byte) = bytes.get(end) {
            let stop = match byte {
                b',' | b'[' | b']' | b'{' | b'}' | b'\n' | b'\r' => true,
                b':' => matches!(
                    bytes.get(end + 1),
                    None | Some(b' ' | b'\t' | b',' | b']' | b'}' | b'\n' | b'\r')
                ),
                b'#' => end > start && matches!(bytes[end - 1], b' ' | b'\t'),
                _ => false,
            };
            if stop {
                break;
            }
            end += 1;
        }
        let text = self.src[start..end].trim_end_matches([' ', '\t']);
        if text.is_empty() {
            return Err(self.unsupported(start));
        }
        Ok(start + text.len())
    }

    /// Skip whitespace, line breaks, and comments inside a flow collection.
    fn skip_flow_space(&self, cursor: &mut usize) {
        let bytes = self.src.as_bytes();
        loop {
            while matches!(bytes.get(*cursor), Some(b' ' | b'\t' | b'\r' | b'\n')) {
                *cursor += 1;
            }
            if bytes.get(*cursor) != Some(&b'#') {
                return;
            }
            while !matches!(bytes.get(*cursor), None | Some(b'\n')) {
                *cursor += 1;
            }
        }
    }

    fn peek_content(&self) -> Option<usize> {
        let mut index = self.pos;
        while let Some(line) = self.lines.get(index) {
            match line.class {
                LineClass::Blank | LineClass::Comment => index += 1,
                LineClass::Content => return Some(index),
                _ => return None,
            }
        }
        None
    }

    fn offset_at(&self, index: usize) -> usize {
        self.lines
            .get(index)
            .map_or(self.src.len(), |line| line.start)
    }

    fn line_index(&self, offset: usize) -> usize {
        self.lines
            .partition_point(|line| line.next <= offset)
            .min(self.lines.len().saturating_sub(1))
    }

    /// Valid YAML whose layout cannot be edited in place.
    fn unsupported(&self, offset: usize) -> SyntaxError {
        self.error(offset, "layout not supported for in-place editing")
    }

    fn error(&self, offset: usize, message: impl Into<String>) -> SyntaxError {
        let index = self.line_index(offset);
        let column = match self.lines.get(index) {
            Some(line) => {
                let upto = offset.clamp(line.start, line.end);
                self.src[line.start..upto].chars().count() + 1
            }
            None => 1,
        };
        SyntaxError {
            line: index + 1,
            column,
            message: message.into(),
        }
    }
}

fn widen_origin(node: &mut Node, start: usize) {
    let origin = match node {
        Node::Scalar(scalar) => scalar.origin.as_mut(),
        Node::Mapping(mapping) => mapping.origin.as_mut(),
        Node::Sequence(sequence) => sequence.origin.as_mut(),
        Node::Alias(alias) => Some(&mut alias.origin),
    };
    if let Some(origin) = origin {
        origin.start = start;
    }
}

fn count_spaces(text: &str) -> usize {
    text.len() - text.trim_start_matches(' ').len()
}

fn count_blanks(text: &str) -> usize {
    text.len() - text.trim_start_matches([' ', '\t']).len()
}

/// End of an anchor, alias or tag name starting at `start`.
fn token_end(src: &str, start: usize, limit: usize) -> usize {
    src[start..limit]
        .find([' ', '\t', '\r', '\n', ',', '[', ']', '{', '}'])
        .map_or(limit, |index| start + index)
}

/// End of a plain scalar on one line: before a ` #` comment, trailing
/// whitespace trimmed.
fn plain_end(src: &str, start: usize, line_end: usize) -> usize {
    let bytes = src.as_bytes();
    let mut end = line_end;
    for index in start + 1..line_end {
        if bytes[index] == b'#' && matches!(bytes[index - 1], b' ' | b'\t') {
            end = index;
            break;
        }
    }
    start + src[start..end].trim_end_matches([' ', '\t']).len()
}

fn has_comment(src: &str, end: usize, line_end: usize) -> bool {
    src[end..line_end].trim_start_matches([' ', '\t']).starts_with('#')
}

/// Offset of the closing quote of the quoted scalar at `start`.
fn scan_quoted(src: &str, start: usize, limit: usize) -> Option<usize> {
    let bytes = src.as_bytes();
    let quote = bytes[start];
    let mut index = start + 1;
    while index < limit {
        let byte = bytes[index];
        if quote == b'\'' {
            if byte == b'\'' {
                if bytes.get(index + 1) == Some(&b'\'') && index + 1 < limit {
                    index += 2;
                    continue;
                }
                return Some(index);
            }
        } else if byte == b'\\' {
            index += 2;
            continue;
        } else if byte == b'"' {
            return Some(index);
        }
        index += 1;
    }
    None
}

#[cfg(test)]
#[path = "parse_tests.rs"]
mod tests;
