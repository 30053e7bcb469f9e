//! Rule execution.
//!
//! A [`Rule`] is a named list of [`Action`]s, each addressing its parent
//! collection by [`NodePath`]. A parent that is missing or has the wrong shape
//! means the action does not apply; that is never an error, since workflows
//! legitimately omit optional sections. Rules hold no state between documents.
pub mod ops;

use crate::document::{Mapping, Node, Scalar};
use crate::locate::{NodePath, Target};

/// What applying a rule or action did to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Changed,
    Unchanged,
    /// The document lacks the structure the rule works on.
    NotApplicable,
}

impl Effect {
    pub fn changed(self) -> bool {
        self == Effect::Changed
    }

    /// Combine the effects of two steps of the same rule.
    pub fn merge(self, other: Effect) -> Effect {
        match (self, other) {
            (Effect::Changed, _) | (_, Effect::Changed) => Effect::Changed,
            (Effect::Unchanged, _) | (_, Effect::Unchanged) => Effect::Unchanged,
            _ => Effect::NotApplicable,
        }
    }
}

impl From<bool> for Effect {
    fn from(changed: bool) -> Self {
        if changed {
            Effect::Changed
        } else {
            Effect::Unchanged
        }
    }
}

/// One structural edit. `parent` names the collection the edit works in.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Insert `key: value` into the `parent` mapping when the key is absent.
    EnsureKey {
        parent: NodePath,
        key: String,
        value: Node,
    },
    /// Set `key` in the `parent` mapping to `value`, text and style.
    EnsureScalar {
        parent: NodePath,
        key: String,
        value: Scalar,
    },
    /// Add `value` to the list under `key` in the `parent` mapping.
    EnsureListContains {
        parent: NodePath,
        key: String,
        value: Scalar,
    },
    /// Make sure the `parent` sequence has an item matching `target`.
    EnsureItem {
        parent: NodePath,
        target: Target,
        item: Node,
        after: Option<Target>,
        reconcile: bool,
    },
}

impl Action {
    pub fn ensure_key(parent: NodePath, key: impl Into<String>, value: impl Into<Node>) -> Self {
        Action::EnsureKey {
            parent,
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn ensure_scalar(parent: NodePath, key: impl Into<String>, value: Scalar) -> Self {
        Action::EnsureScalar {
            parent,
            key: key.into(),
            value,
        }
    }

    pub fn ensure_list_contains(parent: NodePath, key: impl Into<String>, value: Scalar) -> Self {
        Action::EnsureListContains {
            parent,
            key: key.into(),
            value,
        }
    }

    pub fn ensure_item(parent: NodePath, target: Target, item: impl Into<Node>) -> Self {
        Action::EnsureItem {
            parent,
            target,
            item: item.into(),
            after: None,
            reconcile: false,
        }
    }

    /// Anchor an `EnsureItem` insertion after the item matching `anchor`.
    pub fn after(mut self, anchor: Target) -> Self {
        if let Action::EnsureItem { after, .. } = &mut self {
            *after = Some(anchor);
        }
        self
    }

    /// Let an `EnsureItem` bring an existing item's fields in line.
    pub fn reconciling(mut self) -> Self {
        if let Action::EnsureItem { reconcile, .. } = &mut self {
            *reconcile = true;
        }
        self
    }

    pub fn apply(&self, root: &mut Node) -> Effect {
        match self {
            Action::EnsureKey { parent, key, value } => match mapping_at(root, parent) {
                Some(mapping) => ops::ensure_mapping_key(mapping, key, value).into(),
                None => Effect::NotApplicable,
            },
            Action::EnsureScalar { parent, key, value } => match mapping_at(root, parent) {
                Some(mapping) => ops::ensure_scalar_equals(mapping, key, value).into(),
                None => Effect::NotApplicable,
            },
            Action::EnsureListContains { parent, key, value } => mapping_at(root, parent)
                .and_then(|mapping| ops::ensure_list_contains(mapping, key, value))
                .map_or(Effect::NotApplicable, Effect::from),
            Action::EnsureItem {
                parent,
                target,
                item,
                after,
                reconcile,
            } => match parent.resolve_mut(root).and_then(Node::as_sequence_mut) {
                Some(sequence) => {
                    ops::ensure_item_after(sequence, target, item, after.as_ref(), *reconcile)
                        .into()
                }
                None => Effect::NotApplicable,
            },
        }
    }
}

fn mapping_at<'a>(root: &'a mut Node, path: &NodePath) -> Option<&'a mut Mapping> {
    path.resolve_mut(root).and_then(Node::as_mapping_mut)
}

/// A named, ordered group of actions.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    name: String,
    requires: Vec<NodePath>,
    actions: Vec<Action>,
}

impl Rule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requires: Vec::new(),
            actions: Vec::new(),
        }
    }

    /// Only fire when `path` resolves in the document.
    pub fn requires(mut self, path: NodePath) -> Self {
        self.requires.push(path);
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the actions in order. Later actions see the edits of earlier ones.
    pub fn apply(&self, root: &mut Node) -> Effect {
        if self.requires.iter().any(|path| path.resolve(root).is_none()) {
            return Effect::NotApplicable;
        }
        self.actions
            .iter()
            .fold(Effect::NotApplicable, |effect, action| {
                effect.merge(action.apply(root))
            })
    }
}

#[cfg(test)]
#[path = "rules_tests.rs"]
mod tests;
