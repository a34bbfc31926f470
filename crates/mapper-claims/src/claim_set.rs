//! Mutable claim document assembled from mapper contributions.
//!
//! # Purpose
//! Applies [`ClaimContribution`]s in order to a JSON object, creating nested
//! objects along a [`ClaimPath`] as needed.
//!
//! # Key invariants
//! - `Set` is last-write-wins: a later set at the same path replaces the value,
//!   and replaces a non-object intermediate with an object.
//! - `Append` keeps array members unique and in first-seen order.
//! - `Remove` never creates structure; removing from a missing path is a no-op.
//! - `Rename` writes its new value only when the old one was present.
//!
//! # Examples
//! ```rust
//! use mapper_claims::{ClaimOp, ClaimPath, ClaimSet};
//! use serde_json::json;
//!
//! let path = ClaimPath::parse("realm_access.roles").unwrap();
//! let mut claims = ClaimSet::new();
//! claims.apply(ClaimOp::Append, &path, json!("offline_access"));
//! claims.apply(ClaimOp::Append, &path, json!("offline_access"));
//! assert_eq!(claims.get(&path), Some(&json!(["offline_access"])));
//! ```
use crate::{ClaimContribution, ClaimOp, ClaimPath};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClaimSet(Map<String, Value>);

impl ClaimSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_contribution(&mut self, contribution: &ClaimContribution) {
        self.apply(
            contribution.op.clone(),
            &contribution.path,
            contribution.value.clone(),
        );
    }

    pub fn apply(&mut self, op: ClaimOp, path: &ClaimPath, value: Value) {
        match op {
            ClaimOp::Set => self.set(path, value),
            ClaimOp::Append => self.append(path, value),
            ClaimOp::Remove => {
                self.remove(path, value);
            }
            ClaimOp::Rename { from, old } => {
                if self.remove(&from, old) {
                    self.append(path, value);
                }
            }
        }
    }

    fn set(&mut self, path: &ClaimPath, value: Value) {
        let Some((leaf, parents)) = path.segments().split_last() else {
            return;
        };
        if let Some(parent) = parent_mut(&mut self.0, parents) {
            parent.insert(leaf.clone(), value);
        }
    }

    fn append(&mut self, path: &ClaimPath, value: Value) {
        let Some((leaf, parents)) = path.segments().split_last() else {
            return;
        };
        let Some(parent) = parent_mut(&mut self.0, parents) else {
            return;
        };
        let slot = parent
            .entry(leaf.clone())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !slot.is_array() {
            let existing = slot.take();
            *slot = Value::Array(vec![existing]);
        }
        if let Value::Array(items) = slot {
            for item in flatten(value) {
                if !items.contains(&item) {
                    items.push(item);
                }
            }
        }
    }

    /// Returns whether any value was actually removed.
    fn remove(&mut self, path: &ClaimPath, value: Value) -> bool {
        let Some((leaf, parents)) = path.segments().split_last() else {
            return false;
        };
        let Some(parent) = existing_parent_mut(&mut self.0, parents) else {
            return false;
        };
        let removals = flatten(value);
        let drop_leaf = match parent.get_mut(leaf) {
            Some(Value::Array(items)) => {
                let before = items.len();
                items.retain(|item| !removals.contains(item));
                return items.len() != before;
            }
            Some(scalar) => removals.contains(scalar),
            None => false,
        };
        if drop_leaf {
            parent.remove(leaf);
        }
        drop_leaf
    }

    pub fn get(&self, path: &ClaimPath) -> Option<&Value> {
        let (leaf, parents) = path.segments().split_last()?;
        let mut current = &self.0;
        for segment in parents {
            current = current.get(segment)?.as_object()?;
        }
        current.get(leaf)
    }

    /// Look up a claim by its dotted name; unparsable names resolve to `None`.
    pub fn lookup(&self, dotted: &str) -> Option<&Value> {
        let path = ClaimPath::parse(dotted).ok()?;
        self.get(&path)
    }

    pub fn contains(&self, dotted: &str) -> bool {
        self.lookup(dotted).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

fn flatten(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        other => vec![other],
    }
}

/// Walks to the parent object of a leaf, creating objects along the way and
/// replacing non-object intermediates.
fn parent_mut<'a>(
    root: &'a mut Map<String, Value>,
    parents: &[String],
) -> Option<&'a mut Map<String, Value>> {
    let mut current = root;
    for segment in parents {
        let entry = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = entry.as_object_mut()?;
    }
    Some(current)
}

fn existing_parent_mut<'a>(
    root: &'a mut Map<String, Value>,
    parents: &[String],
) -> Option<&'a mut Map<String, Value>> {
    let mut current = root;
    for segment in parents {
        current = current.get_mut(segment)?.as_object_mut()?;
    }
    Some(current)
}
