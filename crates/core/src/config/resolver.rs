use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::config::{ConfigError, ConfigPath};

/// Path-based accessor over a resolved configuration tree.
///
/// Clones share the same tree, so an accessor mounted on the application and
/// one held by a provider always answer identically.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    tree: Arc<Value>,
}

impl ConfigResolver {
    pub fn new(tree: Value) -> Self {
        Self {
            tree: Arc::new(tree),
        }
    }

    /// The whole resolved tree
    pub fn tree(&self) -> &Value {
        &self.tree
    }

    /// Value at `path`, if every segment exists
    pub fn lookup<P: Into<ConfigPath>>(&self, path: P) -> Option<&Value> {
        path.into().lookup(&self.tree)
    }

    /// Value at `path`, or `default` when any segment is missing
    pub fn get<P, D>(&self, path: P, default: D) -> Value
    where
        P: Into<ConfigPath>,
        D: Into<Value>,
    {
        self.lookup(path)
            .cloned()
            .unwrap_or_else(|| default.into())
    }

    pub fn contains<P: Into<ConfigPath>>(&self, path: P) -> bool {
        self.lookup(path).is_some()
    }

    /// Deserialize the value at `path` into `T`
    pub fn get_as<T, P>(&self, path: P) -> Result<Option<T>, ConfigError>
    where
        T: DeserializeOwned,
        P: Into<ConfigPath>,
    {
        let path = path.into();
        match path.lookup(&self.tree) {
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| ConfigError::Deserialize {
                    path: path.to_string(),
                    message: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// Deserialize the value at `path`, falling back to `default` when absent
    pub fn get_or<T, P>(&self, path: P, default: T) -> Result<T, ConfigError>
    where
        T: DeserializeOwned,
        P: Into<ConfigPath>,
    {
        Ok(self.get_as(path)?.unwrap_or(default))
    }
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new(Value::Object(Map::new()))
    }
}

impl From<Value> for ConfigResolver {
    fn from(tree: Value) -> Self {
        Self::new(tree)
    }
}
