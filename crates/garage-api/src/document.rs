// ── Local mirror of a watched node ──
//
// Change feeds describe edits relative to the watched path. Consumers want
// the whole document each time, so edits are folded into a local copy.

use serde_json::{Map, Value};

/// The current value of a watched node, rebuilt from `put` / `patch` edits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    root: Value,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// The whole document as last assembled. `Value::Null` if the node is absent.
    pub fn value(&self) -> &Value {
        &self.root
    }

    /// Replace the value at `path` (relative to the watched node).
    ///
    /// `"/"` replaces the whole document. A `null` value deletes the key.
    pub fn put(&mut self, path: &str, data: Value) {
        let segments = split_path(path);
        set_at(&mut self.root, &segments, data);
        collapse_if_empty(&mut self.root);
    }

    /// Merge each child of `data` into the node at `path`.
    pub fn patch(&mut self, path: &str, data: Value) {
        let Value::Object(children) = data else {
            self.put(path, data);
            return;
        };

        let base = split_path(path);
        for (key, value) in children {
            let mut segments = base.clone();
            segments.extend(split_path(&key));
            set_at(&mut self.root, &segments, value);
        }
        collapse_if_empty(&mut self.root);
    }
}

fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

/// A node with no children does not exist.
fn is_absent(node: &Value) -> bool {
    node.is_null() || node.as_object().is_some_and(Map::is_empty)
}

fn collapse_if_empty(node: &mut Value) {
    if is_absent(node) {
        *node = Value::Null;
    }
}

fn set_at(node: &mut Value, segments: &[String], data: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = data;
        return;
    };

    if !node.is_object() {
        if data.is_null() {
            return;
        }
        *node = Value::Object(Map::new());
    }
    let Value::Object(map) = node else { return };

    let now_empty = {
        let child = map.entry(head.clone()).or_insert(Value::Null);
        set_at(child, rest, data);
        is_absent(child)
    };
    if now_empty {
        map.remove(head);
    }
}
