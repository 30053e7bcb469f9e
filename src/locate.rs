//! Finding nodes inside a document.
//!
//! A [`Target`] selects one child of a collection: a mapping entry by key, or
//! a sequence item (or mapping value) by the scalar fields it carries. Lookups
//! return the first match in document order; a missing field never matches.
//! A [`NodePath`] chains targets from the document root.
use crate::document::{Mapping, Node, Sequence};
use std::fmt;

/// Predicate selecting a child of a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Mapping entry with this key.
    Key(String),
    /// Child whose `field` scalar equals `value`.
    FieldEquals { field: String, value: String },
    /// Child whose `field` scalar starts with `prefix`.
    FieldPrefix { field: String, prefix: String },
    /// Child whose `field` scalar ends with `suffix`.
    FieldSuffix { field: String, suffix: String },
    /// Every predicate must hold.
    All(Vec<Target>),
}

impl Target {
    pub fn key(key: impl Into<String>) -> Self {
        Target::Key(key.into())
    }

    pub fn field(field: impl Into<String>, value: impl Into<String>) -> Self {
        Target::FieldEquals {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Match by identifier (`id:`).
    pub fn id(value: impl Into<String>) -> Self {
        Self::field("id", value)
    }

    /// Match by display name (`name:`).
    pub fn name(value: impl Into<String>) -> Self {
        Self::field("name", value)
    }

    /// Match by the start of a display name.
    pub fn name_prefix(prefix: impl Into<String>) -> Self {
        Target::FieldPrefix {
            field: "name".to_string(),
            prefix: prefix.into(),
        }
    }

    /// Match by the start of a reference (`uses: actions/checkout@...`).
    pub fn uses_prefix(prefix: impl Into<String>) -> Self {
        Target::FieldPrefix {
            field: "uses".to_string(),
            prefix: prefix.into(),
        }
    }

    pub fn uses_suffix(suffix: impl Into<String>) -> Self {
        Target::FieldSuffix {
            field: "uses".to_string(),
            suffix: suffix.into(),
        }
    }

    /// Conjunction of `self` and `other`.
    pub fn and(self, other: Target) -> Self {
        let mut all = match self {
            Target::All(all) => all,
            single => vec![single],
        };
        match other {
            Target::All(more) => all.extend(more),
            single => all.push(single),
        }
        Target::All(all)
    }

    /// Whether a child stored under `key` (mapping entries) or at a sequence
    /// position (`key == None`) satisfies the predicate.
    pub fn matches(&self, key: Option<&str>, node: &Node) -> bool {
        let field = |name: &str| node.get(name).and_then(Node::text);
        match self {
            Target::Key(wanted) => key == Some(wanted.as_str()),
            Target::FieldEquals { field: name, value } => field(name) == Some(value.as_str()),
            Target::FieldPrefix { field: name, prefix } => {
                field(name).is_some_and(|text| text.starts_with(prefix.as_str()))
            }
            Target::FieldSuffix { field: name, suffix } => {
                field(name).is_some_and(|text| text.ends_with(suffix.as_str()))
            }
            Target::All(all) => all.iter().all(|target| target.matches(key, node)),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Key(key) => write!(f, "{key}"),
            Target::FieldEquals { field, value } => write!(f, "[{field} == {value:?}]"),
            Target::FieldPrefix { field, prefix } => write!(f, "[{field} ^= {prefix:?}]"),
            Target::FieldSuffix { field, suffix } => write!(f, "[{field} $= {suffix:?}]"),
            Target::All(all) => {
                for target in all {
                    write!(f, "{target}")?;
                }
                Ok(())
            }
        }
    }
}

/// Index of the first item of `sequence` matching `target`.
pub fn find_item(sequence: &Sequence, target: &Target) -> Option<usize> {
    sequence.iter().position(|item| target.matches(None, item))
}

/// Index of the first entry of `mapping` matching `target`.
pub fn find_entry(mapping: &Mapping, target: &Target) -> Option<usize> {
    mapping
        .iter()
        .position(|(key, value)| target.matches(Some(key), value))
}

/// Index of the first child of `parent` matching `target`.
///
/// Scalars have no children; a key target never matches a sequence item.
/// An alias is searched through its anchored value.
pub fn find(parent: &Node, target: &Target) -> Option<usize> {
    match parent {
        Node::Mapping(mapping) => find_entry(mapping, target),
        Node::Sequence(sequence) => find_item(sequence, target),
        Node::Alias(alias) => find(alias.target(), target),
        Node::Scalar(_) => None,
    }
}

pub fn child<'a>(parent: &'a Node, target: &Target) -> Option<&'a Node> {
    let index = find(parent, target)?;
    match parent {
        Node::Mapping(mapping) => mapping.entry_at(index).map(|entry| entry.value()),
        Node::Sequence(sequence) => sequence.get(index),
        Node::Alias(alias) => child(alias.target(), target),
        Node::Scalar(_) => None,
    }
}

/// Aliases are read-only, so a path through one resolves to nothing here.
pub fn child_mut<'a>(parent: &'a mut Node, target: &Target) -> Option<&'a mut Node> {
    let index = find(parent, target)?;
    match parent {
        Node::Mapping(mapping) => mapping.entries.get_mut(index).map(|entry| entry.value_mut()),
        Node::Sequence(sequence) => sequence.get_mut(index),
        Node::Scalar(_) | Node::Alias(_) => None,
    }
}

/// Chain of targets leading from the document root to a node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodePath {
    steps: Vec<Target>,
}

impl NodePath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Dotted key path: `jobs.pre-init.steps`.
    pub fn keys(path: &str) -> Self {
        Self {
            steps: path
                .split('.')
                .filter(|key| !key.is_empty())
                .map(Target::key)
                .collect(),
        }
    }

    pub fn then(mut self, target: Target) -> Self {
        self.steps.push(target);
        self
    }

    pub fn resolve<'a>(&self, root: &'a Node) -> Option<&'a Node> {
        self.steps
            .iter()
            .try_fold(root, |node, target| child(node, target))
    }

    pub fn resolve_mut<'a>(&self, root: &'a mut Node) -> Option<&'a mut Node> {
        let mut node = root;
        for target in &self.steps {
            node = child_mut(node, target)?;
        }
        Some(node)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return f.write_str("<root>");
        }
        for (index, target) in self.steps.iter().enumerate() {
            if index > 0 && matches!(target, Target::Key(_)) {
                f.write_str(".")?;
            }
            write!(f, "{target}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "locate_tests.rs"]
mod tests;
