//! Path addressing into nested JSON trees.
//!
//! Paths are written `database.pools[0].size` or given as explicit segments.
//! Numeric segments index arrays; every other segment is an object key.

use serde_json::{Map, Value};
use std::fmt;

use crate::config::ConfigError;

/// Largest array index a write may create. Arrays are padded with `null` up
/// to the written index.
pub const MAX_ARRAY_INDEX: usize = 4096;

/// A parsed key path into a nested configuration tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ConfigPath {
    segments: Vec<String>,
}

impl ConfigPath {
    /// Parse a dot-delimited path, accepting `[n]` and `['key']` segments
    pub fn parse(path: &str) -> Self {
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = path.chars();

        while let Some(c) = chars.next() {
            match c {
                '.' => flush(&mut current, &mut segments),
                '[' => {
                    flush(&mut current, &mut segments);
                    let mut inner = String::new();
                    for c in chars.by_ref() {
                        if c == ']' {
                            break;
                        }
                        inner.push(c);
                    }
                    let inner = inner.trim().trim_matches(|c| c == '"' || c == '\'');
                    if !inner.is_empty() {
                        segments.push(inner.to_string());
                    }
                }
                _ => current.push(c),
            }
        }
        flush(&mut current, &mut segments);

        Self { segments }
    }

    /// Build a path from explicit segments, without any parsing
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The empty path addresses the root of the tree
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Find the value at this path
    pub fn lookup<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(root, |node, segment| match node {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
    }

    /// Find the value at this path for mutation
    pub fn lookup_mut<'a>(&self, root: &'a mut Value) -> Option<&'a mut Value> {
        self.segments
            .iter()
            .try_fold(root, |node, segment| match node {
                Value::Object(map) => map.get_mut(segment),
                Value::Array(items) => segment
                    .parse::<usize>()
                    .ok()
                    .and_then(move |i| items.get_mut(i)),
                _ => None,
            })
    }

    /// Write `value` at this path, creating intermediate containers.
    ///
    /// Scalars standing in the way are replaced. A numeric segment creates an
    /// array when the parent does not exist yet, unless it is above
    /// [`MAX_ARRAY_INDEX`], in which case it becomes an object key. Indexing an
    /// existing array past [`MAX_ARRAY_INDEX`] fails.
    pub fn assign(&self, root: &mut Value, value: Value) -> Result<(), ConfigError> {
        let Some((last, parents)) = self.segments.split_last() else {
            *root = value;
            return Ok(());
        };

        let mut node = root;
        for (i, segment) in parents.iter().enumerate() {
            let next = parents.get(i + 1).unwrap_or(last);
            node = self.child_mut(node, segment, array_index(next).is_some())?;
        }

        match node {
            Value::Array(items) if last.parse::<usize>().is_ok() => {
                *self.array_slot(items, last)? = value;
            }
            node => {
                ensure_object(node).insert(last.clone(), value);
            }
        }
        Ok(())
    }

    fn child_mut<'a>(
        &self,
        node: &'a mut Value,
        segment: &str,
        index_follows: bool,
    ) -> Result<&'a mut Value, ConfigError> {
        let is_index = segment.parse::<usize>().is_ok();
        let slot = match (node, is_index) {
            (Value::Array(items), true) => self.array_slot(items, segment)?,
            (node, _) => ensure_object(node)
                .entry(segment.to_string())
                .or_insert(Value::Null),
        };

        if !(slot.is_object() || slot.is_array()) {
            *slot = if index_follows {
                Value::Array(Vec::new())
            } else {
                Value::Object(Map::new())
            };
        }
        Ok(slot)
    }

    /// Slot for a numeric `segment`, padding `items` with `null` up to it
    fn array_slot<'a>(
        &self,
        items: &'a mut Vec<Value>,
        segment: &str,
    ) -> Result<&'a mut Value, ConfigError> {
        let index = array_index(segment).ok_or_else(|| {
            ConfigError::invalid_value(
                self.to_string(),
                segment,
                format!("an array index up to {}", MAX_ARRAY_INDEX),
            )
        })?;
        if items.len() <= index {
            items.resize(index + 1, Value::Null);
        }
        Ok(&mut items[index])
    }

    /// Remove and return the value at this path
    pub fn take(&self, root: &mut Value) -> Option<Value> {
        let (last, parents) = self.segments.split_last()?;
        let parent = Self::from_segments(parents.iter().cloned()).lookup_mut(root)?;

        match parent {
            Value::Object(map) => map.remove(last),
            Value::Array(items) => {
                let index = last.parse::<usize>().ok()?;
                items.get_mut(index).map(Value::take)
            }
            _ => None,
        }
    }
}

fn flush(current: &mut String, segments: &mut Vec<String>) {
    if !current.is_empty() {
        segments.push(std::mem::take(current));
    }
}

fn array_index(segment: &str) -> Option<usize> {
    segment
        .parse::<usize>()
        .ok()
        .filter(|index| *index <= MAX_ARRAY_INDEX)
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced with an object"),
    }
}

impl fmt::Display for ConfigPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl From<&str> for ConfigPath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

impl From<String> for ConfigPath {
    fn from(path: String) -> Self {
        Self::parse(&path)
    }
}

impl From<&String> for ConfigPath {
    fn from(path: &String) -> Self {
        Self::parse(path)
    }
}

impl From<&[&str]> for ConfigPath {
    fn from(segments: &[&str]) -> Self {
        Self::from_segments(segments.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for ConfigPath {
    fn from(segments: [&str; N]) -> Self {
        Self::from_segments(segments)
    }
}

impl From<Vec<String>> for ConfigPath {
    fn from(segments: Vec<String>) -> Self {
        Self { segments }
    }
}

impl From<&ConfigPath> for ConfigPath {
    fn from(path: &ConfigPath) -> Self {
        path.clone()
    }
}
