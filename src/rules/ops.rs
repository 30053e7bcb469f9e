//! The ensure-* operations rules are built from.
//!
//! Each operation is a no-op once its postcondition holds and returns whether
//! it changed anything. Operations only touch the field or child they own.
use crate::document::{Mapping, Node, Scalar, Sequence};
use crate::locate::{find_item, Target};

/// Insert `key: value` when `mapping` has no such key. An existing value is
/// never replaced, whatever its shape.
pub fn ensure_mapping_key(mapping: &mut Mapping, key: &str, value: &Node) -> bool {
    if mapping.contains_key(key) {
        return false;
    }
    mapping.insert(key, value.clone());
    true
}

/// Make `key` hold exactly `value`: same text and same style.
pub fn ensure_scalar_equals(mapping: &mut Mapping, key: &str, value: &Scalar) -> bool {
    let current = mapping.get(key).and_then(Node::as_scalar);
    if current.is_some_and(|current| current.same_as(value)) {
        return false;
    }
    mapping.insert(key, value.clone());
    true
}

/// Append `value` to the list under `key` unless an item with the same text
/// is already there. A missing key becomes a one-item list; a single scalar
/// (`needs: build`) is promoted to a list keeping it first. Returns `None`
/// when the key holds a mapping or an alias.
pub fn ensure_list_contains(mapping: &mut Mapping, key: &str, value: &Scalar) -> Option<bool> {
    let current = mapping.get_or_insert_with(key, || Sequence::new().into());
    match current {
        Node::Sequence(list) => {
            let present = list
                .iter()
                .any(|item| item.text() == Some(value.text()));
            if !present {
                list.push(value.clone());
            }
            Some(!present)
        }
        Node::Scalar(existing) if existing.is_null() => {
            *current = Node::Sequence(Sequence::new().with(value.clone()));
            Some(true)
        }
        Node::Scalar(existing) if existing.text() == value.text() => Some(false),
        Node::Scalar(existing) => {
            let first = existing.clone();
            *current = Node::Sequence(Sequence::new().with(first).with(value.clone()));
            Some(true)
        }
        Node::Mapping(_) | Node::Alias(_) => None,
    }
}

/// Make sure an item matching `target` exists in `sequence`. A missing item
/// is inserted right after the first item matching `after`, or appended when
/// there is no anchor or the anchor is absent. With `reconcile`, an existing
/// item has its scalar fields brought in line with `item` and gains any
/// missing keys; other fields are left alone.
pub fn ensure_item_after(
    sequence: &mut Sequence,
    target: &Target,
    item: &Node,
    after: Option<&Target>,
    reconcile: bool,
) -> bool {
    if let Some(index) = find_item(sequence, target) {
        if !reconcile {
            return false;
        }
        return match (sequence.get_mut(index), item) {
            (Some(Node::Mapping(existing)), Node::Mapping(canonical)) => {
                reconcile_fields(existing, canonical)
            }
            _ => false,
        };
    }
    let position = after
        .and_then(|anchor| find_item(sequence, anchor))
        .map_or(sequence.len(), |index| index + 1);
    sequence.insert(position, item.clone());
    true
}

fn reconcile_fields(existing: &mut Mapping, canonical: &Mapping) -> bool {
    let mut changed = false;
    for (key, value) in canonical.iter() {
        changed |= match value {
            Node::Scalar(scalar) => ensure_scalar_equals(existing, key, scalar),
            other => ensure_mapping_key(existing, key, other),
        };
    }
    changed
}

#[cfg(test)]
#[path = "ops_tests.rs"]
mod tests;
