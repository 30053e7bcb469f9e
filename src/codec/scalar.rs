//! Scalar resolution and rendering.
//!
//! Values are decoded by `serde_yaml` when a document loads; this module
//! covers the other direction, turning scalars created by rules into text.
//! The representability checks ask the same decoder how a candidate
//! rendering reads back, so a style is only used for a value when rendering
//! and reloading yields the same value and style.
use crate::document::{ScalarStyle, ScalarValue};
use serde_yaml::Value;

const FLOW_INDICATORS: [char; 5] = [',', '[', ']', '{', '}'];

fn decode(text: &str) -> Option<Value> {
    serde_yaml::from_str(text).ok()
}

/// Resolve a plain scalar under the YAML 1.2 core schema.
pub(crate) fn resolve_plain(text: &str) -> ScalarValue<'_> {
    if text.is_empty() {
        return ScalarValue::Null;
    }
    match decode(text) {
        Some(Value::Null) => ScalarValue::Null,
        Some(Value::Bool(flag)) => ScalarValue::Bool(flag),
        Some(Value::Number(number)) => match number.as_i64() {
            Some(int) => ScalarValue::Int(int),
            None => ScalarValue::Float(number.as_f64().unwrap_or(f64::NAN)),
        },
        _ => ScalarValue::Str(text),
    }
}

pub(crate) fn resolves_to_string(text: &str) -> bool {
    matches!(resolve_plain(text), ScalarValue::Str(_))
}

/// Whether `text` can be written as a plain scalar in block context and
/// read back as the same text.
pub(crate) fn plain_representable(text: &str) -> bool {
    if text.is_empty() || text.chars().any(char::is_control) {
        return false;
    }
    match decode(text) {
        Some(Value::String(decoded)) => decoded == text,
        Some(Value::Null) => matches!(text, "~" | "null" | "Null" | "NULL"),
        Some(Value::Bool(_) | Value::Number(_)) => {
            !text.contains(|ch: char| ch.is_whitespace() || ch == '#')
        }
        _ => false,
    }
}

/// Whether `text` needs escapes only a double-quoted scalar offers.
pub(crate) fn double_quote_required(text: &str) -> bool {
    text.chars().any(|ch| ch.is_control() && ch != '\t')
}

/// Whether `text` survives a literal or folded block round trip.
pub(crate) fn block_representable(text: &str) -> bool {
    let body = text.trim_end_matches('\n');
    if body.is_empty() && !text.is_empty() {
        return false;
    }
    if text
        .chars()
        .any(|ch| ch.is_control() && ch != '\n' && ch != '\t')
    {
        return false;
    }
    !body
        .split('\n')
        .any(|line| !line.is_empty() && line.trim_matches([' ', '\t']).is_empty())
}

/// Render a non-block scalar on a single line.
pub(crate) fn render_inline(text: &str, style: ScalarStyle, in_flow: bool) -> String {
    match style {
        ScalarStyle::Plain if text.is_empty() => String::new(),
        ScalarStyle::Plain if in_flow && text.contains(FLOW_INDICATORS) => single_quote(text),
        ScalarStyle::Plain => text.to_string(),
        ScalarStyle::SingleQuoted if !double_quote_required(text) => single_quote(text),
        _ => double_quote(text),
    }
}

fn single_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// JSON string syntax is valid double-quoted YAML.
fn double_quote(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

/// A block scalar split into its indicator (`|-`, `>2+`) and content lines.
pub(crate) struct BlockRender {
    pub(crate) indicator: String,
    pub(crate) lines: Vec<String>,
}

/// Render a literal or folded scalar whose content sits at `content_indent`
/// columns, `step` columns deeper than its parent.
pub(crate) fn render_block(
    text: &str,
    style: ScalarStyle,
    content_indent: usize,
    step: usize,
    width: usize,
) -> BlockRender {
    let body = text.trim_end_matches('\n');
    let newlines = text.len() - body.len();
    let chomp = match newlines {
        0 => "-",
        1 => "",
        _ => "+",
    };
    let raw_lines: Vec<&str> = if body.is_empty() {
        Vec::new()
    } else {
        body.split('\n').collect()
    };
    let needs_indicator = raw_lines
        .iter()
        .find(|line| !line.is_empty())
        .is_some_and(|line| line.starts_with(' '));
    let literal = style != ScalarStyle::Folded;
    let mut indicator = String::from(if literal { "|" } else { ">" });
    if needs_indicator {
        indicator.push_str(&step.to_string());
    }
    indicator.push_str(chomp);

    let mut lines = if literal {
        raw_lines.iter().map(|line| line.to_string()).collect()
    } else {
        fold_encode(&raw_lines, width.saturating_sub(content_indent).max(1))
    };
    if newlines > 1 {
        lines.resize(lines.len() + newlines - 1, String::new());
    }
    BlockRender { indicator, lines }
}

fn fold_encode(lines: &[&str], width: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut seen = false;
    let mut prev_normal = false;
    for line in lines {
        if line.is_empty() {
            out.push(String::new());
            continue;
        }
        let normal = !line.starts_with([' ', '\t']);
        if seen && prev_normal && normal {
            out.push(String::new());
        }
        if normal {
            out.extend(wrap(line, width));
        } else {
            out.push(line.to_string());
        }
        seen = true;
        prev_normal = normal;
    }
    out
}

/// Break `line` at single spaces so pieces stay within `width` where
/// possible; folding joins the pieces back with one space each.
fn wrap(line: &str, width: usize) -> Vec<String> {
    let bytes = line.as_bytes();
    if bytes.len() <= width {
        return vec![line.to_string()];
    }
    let is_break = |index: usize| {
        bytes[index] == b' ' && bytes[index - 1] != b' ' && bytes[index + 1] != b' '
    };
    let mut pieces = Vec::new();
    let mut start = 0usize;
    let mut candidate: Option<usize> = None;
    for index in 1..bytes.len() - 1 {
        if !is_break(index) {
            continue;
        }
        if index - start > width {
            if let Some(at) = candidate.filter(|at| *at > start) {
                pieces.push(line[start..at].to_string());
                start = at + 1;
            }
        }
        candidate = Some(index);
    }
    if bytes.len() - start > width {
        if let Some(at) = candidate.filter(|at| *at > start) {
            pieces.push(line[start..at].to_string());
            start = at + 1;
        }
    }
    pieces.push(line[start..].to_string());
    pieces
}

#[cfg(test)]
#[path = "scalar_tests.rs"]
mod tests;
