//! Path-addressed document tree.
//!
//! The whole dataset is one JSON object tree. Callers address locations with
//! dot-delimited paths (`users.42.name`); each segment is a map key. Values
//! written through [`PathStore::set`] are stored as tokens produced by the
//! [`ValueCodec`], and [`PathStore::get`] decodes them on the way out.
//!
//! Deleting a leaf prunes every container the deletion leaves empty, from
//! the bottom up, so no empty maps linger in the tree.

use crate::error::{CoreError, CoreResult};
use crate::value::{kind_name, number, values_equal};
use crate::value_codec::ValueCodec;
use dotdb_codec::{is_table, Document, META_KEY};
use serde_json::Value;

/// Splits and validates a dotted path.
pub(crate) fn split_path(path: &str) -> CoreResult<Vec<&str>> {
    if path.is_empty() {
        return Err(CoreError::validation("path must not be empty"));
    }
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(CoreError::validation(format!(
            "path {path:?} contains an empty segment"
        )));
    }
    Ok(segments)
}

/// Arithmetic applied by [`PathStore::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arithmetic {
    /// `current + n`
    Add,
    /// `current - n`
    Subtract,
    /// `current * n`
    Multiply,
    /// `current / n`
    Divide,
}

/// The in-memory tree plus the codec its leaves are sealed with.
#[derive(Debug)]
pub struct PathStore {
    tree: Document,
    codec: ValueCodec,
    revision: u64,
}

impl PathStore {
    /// Creates a store over an existing tree.
    #[must_use]
    pub fn new(tree: Document, codec: ValueCodec) -> Self {
        Self {
            tree,
            codec,
            revision: 0,
        }
    }

    /// Counter bumped by every structural change.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The raw tree, with leaves still sealed.
    #[must_use]
    pub fn tree(&self) -> &Document {
        &self.tree
    }

    /// The value codec.
    #[must_use]
    pub fn codec(&self) -> &ValueCodec {
        &self.codec
    }

    /// Replaces the whole tree.
    pub fn replace(&mut self, tree: Document) {
        self.tree = tree;
        self.revision += 1;
    }

    /// Removes everything.
    pub fn clear(&mut self) {
        self.tree.clear();
        self.revision += 1;
    }

    /// Reads the value at `path`, or `default` if nothing is there.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed paths, or a crypto error in
    /// strict mode.
    pub fn get(&self, path: &str, default: Value) -> CoreResult<Value> {
        let segments = split_path(path)?;
        match self.raw_get(&segments) {
            Some(value) => self.decode_deep(value),
            None => Ok(default),
        }
    }

    /// Returns true if anything is stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed paths.
    pub fn has(&self, path: &str) -> CoreResult<bool> {
        let segments = split_path(path)?;
        Ok(self.raw_get(&segments).is_some())
    }

    /// Stores `value` at `path`, creating intermediate maps as needed.
    ///
    /// Returns the value as given.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed paths, for paths through
    /// a non-container value, or for paths into a table's `_meta`.
    pub fn set(&mut self, path: &str, value: Value) -> CoreResult<Value> {
        let segments = split_path(path)?;
        self.guard_meta(&segments)?;
        let sealed = self.codec.encode(&value)?;
        self.raw_set(&segments, sealed)?;
        Ok(value)
    }

    /// Deletes whatever is stored at `path`.
    ///
    /// Returns false if nothing was there.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed paths or paths into `_meta`.
    pub fn delete(&mut self, path: &str) -> CoreResult<bool> {
        let segments = split_path(path)?;
        self.guard_meta(&segments)?;
        Ok(self.raw_remove(&segments).is_some())
    }

    /// Appends `value` to the array at `path`, creating it if absent.
    ///
    /// Returns the new length.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the current value is not an array.
    pub fn push(&mut self, path: &str, value: Value) -> CoreResult<usize> {
        let mut items = match self.get(path, Value::Null)? {
            Value::Null => Vec::new(),
            Value::Array(items) => items,
            other => {
                return Err(CoreError::validation(format!(
                    "cannot push onto {} at {path:?}",
                    kind_name(&other)
                )))
            }
        };
        items.push(value);
        let len = items.len();
        self.set(path, Value::Array(items))?;
        Ok(len)
    }

    /// Removes every element equal to `value` from the array at `path`.
    ///
    /// Returns how many elements were removed.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the current value is not an array.
    pub fn pull(&mut self, path: &str, value: &Value) -> CoreResult<usize> {
        let items = match self.get(path, Value::Null)? {
            Value::Null => return Ok(0),
            Value::Array(items) => items,
            other => {
                return Err(CoreError::validation(format!(
                    "cannot pull from {} at {path:?}",
                    kind_name(&other)
                )))
            }
        };
        let before = items.len();
        let kept: Vec<Value> = items
            .into_iter()
            .filter(|item| !values_equal(item, value))
            .collect();
        let removed = before - kept.len();
        if removed > 0 {
            self.set(path, Value::Array(kept))?;
        }
        Ok(removed)
    }

    /// Applies arithmetic to the number at `path`; absent counts as 0.
    ///
    /// Returns the new value.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the current value is not a number or
    /// on division by zero.
    pub fn apply(&mut self, path: &str, op: Arithmetic, operand: f64) -> CoreResult<Value> {
        let current = match self.get(path, Value::Null)? {
            Value::Null => 0.0,
            Value::Number(n) => n.as_f64().unwrap_or_default(),
            other => {
                return Err(CoreError::validation(format!(
                    "cannot apply arithmetic to {} at {path:?}",
                    kind_name(&other)
                )))
            }
        };
        let result = match op {
            Arithmetic::Add => current + operand,
            Arithmetic::Subtract => current - operand,
            Arithmetic::Multiply => current * operand,
            Arithmetic::Divide => {
                if operand == 0.0 {
                    return Err(CoreError::validation(format!("division by zero at {path:?}")));
                }
                current / operand
            }
        };
        if !result.is_finite() {
            return Err(CoreError::validation(format!(
                "arithmetic overflow at {path:?}"
            )));
        }
        self.set(path, number(result))
    }

    /// Top-level keys in insertion order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.tree.keys().cloned().collect()
    }

    /// Decoded top-level values.
    ///
    /// # Errors
    ///
    /// Returns a crypto error in strict mode.
    pub fn values(&self) -> CoreResult<Vec<Value>> {
        self.tree.values().map(|v| self.decode_deep(v)).collect()
    }

    /// Decoded top-level entries.
    ///
    /// # Errors
    ///
    /// Returns a crypto error in strict mode.
    pub fn entries(&self) -> CoreResult<Vec<(String, Value)>> {
        self.tree
            .iter()
            .map(|(k, v)| Ok((k.clone(), self.decode_deep(v)?)))
            .collect()
    }

    /// First top-level entry matching `predicate`.
    ///
    /// # Errors
    ///
    /// Returns a crypto error in strict mode.
    pub fn find<F>(&self, mut predicate: F) -> CoreResult<Option<(String, Value)>>
    where
        F: FnMut(&str, &Value) -> bool,
    {
        Ok(self
            .entries()?
            .into_iter()
            .find(|(k, v)| predicate(k, v)))
    }

    /// All top-level entries matching `predicate`.
    ///
    /// # Errors
    ///
    /// Returns a crypto error in strict mode.
    pub fn filter<F>(&self, mut predicate: F) -> CoreResult<Vec<(String, Value)>>
    where
        F: FnMut(&str, &Value) -> bool,
    {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|(k, v)| predicate(k, v))
            .collect())
    }

    /// Maps every top-level entry through `f`.
    ///
    /// # Errors
    ///
    /// Returns a crypto error in strict mode.
    pub fn map<T, F>(&self, mut f: F) -> CoreResult<Vec<T>>
    where
        F: FnMut(&str, &Value) -> T,
    {
        Ok(self.entries()?.iter().map(|(k, v)| f(k, v)).collect())
    }

    /// Calls `f` for every top-level entry.
    ///
    /// # Errors
    ///
    /// Returns a crypto error in strict mode.
    pub fn for_each<F>(&self, mut f: F) -> CoreResult<()>
    where
        F: FnMut(&str, &Value),
    {
        for (k, v) in self.entries()? {
            f(&k, &v);
        }
        Ok(())
    }

    /// True if any top-level entry matches `predicate`.
    ///
    /// # Errors
    ///
    /// Returns a crypto error in strict mode.
    pub fn some<F>(&self, predicate: F) -> CoreResult<bool>
    where
        F: FnMut(&str, &Value) -> bool,
    {
        Ok(self.find(predicate)?.is_some())
    }

    /// True if every top-level entry matches `predicate` (vacuously true when empty).
    ///
    /// # Errors
    ///
    /// Returns a crypto error in strict mode.
    pub fn every<F>(&self, mut predicate: F) -> CoreResult<bool>
    where
        F: FnMut(&str, &Value) -> bool,
    {
        Ok(self.entries()?.iter().all(|(k, v)| predicate(k, v)))
    }

    /// Rejects paths that reach into a table's schema.
    fn guard_meta(&self, segments: &[&str]) -> CoreResult<()> {
        for (i, segment) in segments.iter().enumerate() {
            if *segment != META_KEY {
                continue;
            }
            let parent_is_table = if i == 0 {
                false
            } else {
                self.raw_get(&segments[..i]).is_some_and(is_table)
            };
            if parent_is_table {
                return Err(CoreError::validation(format!(
                    "{META_KEY} of table {:?} is managed by the table engine",
                    segments[..i].join(".")
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn raw_get(&self, segments: &[&str]) -> Option<&Value> {
        let (last, parents) = segments.split_last()?;
        let mut node = &self.tree;
        for segment in parents {
            node = node.get(*segment)?.as_object()?;
        }
        node.get(*last)
    }

    pub(crate) fn raw_get_mut(&mut self, segments: &[&str]) -> Option<&mut Value> {
        let (last, parents) = segments.split_last()?;
        let mut node = &mut self.tree;
        for segment in parents {
            node = node.get_mut(*segment)?.as_object_mut()?;
        }
        node.get_mut(*last)
    }

    pub(crate) fn raw_set(&mut self, segments: &[&str], value: Value) -> CoreResult<()> {
        let Some((last, parents)) = segments.split_last() else {
            return Err(CoreError::validation("path must not be empty"));
        };
        let mut node = &mut self.tree;
        for (depth, segment) in parents.iter().enumerate() {
            let child = node
                .entry((*segment).to_string())
                .or_insert_with(|| Value::Object(Document::new()));
            node = match child {
                Value::Object(map) => map,
                other => {
                    return Err(CoreError::validation(format!(
                        "cannot descend into {} at {:?}",
                        kind_name(other),
                        parents[..=depth].join(".")
                    )))
                }
            };
        }
        node.insert((*last).to_string(), value);
        self.revision += 1;
        Ok(())
    }

    pub(crate) fn raw_remove(&mut self, segments: &[&str]) -> Option<Value> {
        let removed = remove_and_prune(&mut self.tree, segments);
        if removed.is_some() {
            self.revision += 1;
        }
        removed
    }

    pub(crate) fn tree_mut(&mut self) -> &mut Document {
        self.revision += 1;
        &mut self.tree
    }

    /// Decodes a stored subtree, leaving table schemas untouched.
    pub(crate) fn decode_deep(&self, value: &Value) -> CoreResult<Value> {
        match value {
            Value::Object(map) => {
                let table = is_table(value);
                let mut out = Document::new();
                for (key, child) in map {
                    let decoded = if table && key == META_KEY {
                        child.clone()
                    } else {
                        self.decode_deep(child)?
                    };
                    out.insert(key.clone(), decoded);
                }
                Ok(Value::Object(out))
            }
            other => self.codec.decode(other),
        }
    }

    /// Seals a plain subtree for storage, leaving table schemas untouched.
    ///
    /// Plain objects are sealed per leaf so nested paths stay addressable.
    /// Table rows are sealed per cell, matching how rows are written, and
    /// empty objects and arrays are sealed whole.
    pub(crate) fn encode_deep(&self, value: &Value) -> CoreResult<Value> {
        match value {
            Value::Object(map) if is_table(value) => {
                let mut out = Document::new();
                for (key, child) in map {
                    let encoded = match child {
                        _ if key == META_KEY => child.clone(),
                        Value::Object(cells) => Value::Object(self.encode_cells(cells)?),
                        other => self.codec.encode(other)?,
                    };
                    out.insert(key.clone(), encoded);
                }
                Ok(Value::Object(out))
            }
            Value::Object(map) if !map.is_empty() => {
                let mut out = Document::new();
                for (key, child) in map {
                    out.insert(key.clone(), self.encode_deep(child)?);
                }
                Ok(Value::Object(out))
            }
            other => self.codec.encode(other),
        }
    }

    fn encode_cells(&self, cells: &Document) -> CoreResult<Document> {
        let mut out = Document::new();
        for (column, cell) in cells {
            out.insert(column.clone(), self.codec.encode(cell)?);
        }
        Ok(out)
    }

    /// The whole tree with every leaf decoded, as written to backups.
    ///
    /// # Errors
    ///
    /// Returns a crypto error in strict mode.
    pub fn plain_snapshot(&self) -> CoreResult<Document> {
        let mut out = Document::new();
        for (key, value) in &self.tree {
            out.insert(key.clone(), self.decode_deep(value)?);
        }
        Ok(out)
    }

    /// Replays a plain document into the tree, re-sealing its values.
    ///
    /// Each top-level key present in `document` replaces the current value
    /// under that key; other keys are left alone.
    ///
    /// # Errors
    ///
    /// Returns a crypto error in strict mode.
    pub fn restore_document(&mut self, document: &Document) -> CoreResult<usize> {
        let mut restored = 0;
        for (key, value) in document {
            let sealed = self.encode_deep(value)?;
            self.tree.insert(key.clone(), sealed);
            restored += 1;
        }
        if restored > 0 {
            self.revision += 1;
        }
        Ok(restored)
    }
}

fn remove_and_prune(node: &mut Document, segments: &[&str]) -> Option<Value> {
    let (first, rest) = segments.split_first()?;
    if rest.is_empty() {
        return node.shift_remove(*first);
    }
    let child = node.get_mut(*first)?.as_object_mut()?;
    let removed = remove_and_prune(child, rest)?;
    if child.is_empty() {
        node.shift_remove(*first);
    }
    Some(removed)
}
