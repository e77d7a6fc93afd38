use serde_json::{Map, Value};
use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::warn;

use crate::config::{ConfigError, ConfigPath, ConfigResolver};
use crate::providers::ProviderEntry;

/// The application object being bootstrapped.
///
/// Providers receive it as `&mut App`, one at a time. It holds plain JSON
/// values addressed by path, typed extensions for services, configuration
/// accessors mounted at a path, and providers registered for later execution.
pub struct App {
    values: Value,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    mounts: BTreeMap<String, ConfigResolver>,
    primary_mount: Option<String>,
    pending_providers: Vec<ProviderEntry>,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an application seeded with values
    pub fn with_values(values: Map<String, Value>) -> Self {
        Self {
            values: Value::Object(values),
            ..Self::default()
        }
    }

    /// All plain values
    pub fn values(&self) -> &Value {
        &self.values
    }

    /// Set a value at `path`, creating intermediate objects.
    ///
    /// A write the path cannot hold is dropped with a warning; use
    /// [`App::try_set`] to observe it.
    pub fn set<P, V>(&mut self, path: P, value: V)
    where
        P: Into<ConfigPath>,
        V: Into<Value>,
    {
        if let Err(error) = self.try_set(path, value) {
            warn!("Ignoring app value: {}", error);
        }
    }

    /// Set a value at `path`, failing on array indices above
    /// [`MAX_ARRAY_INDEX`](crate::config::MAX_ARRAY_INDEX)
    pub fn try_set<P, V>(&mut self, path: P, value: V) -> Result<(), ConfigError>
    where
        P: Into<ConfigPath>,
        V: Into<Value>,
    {
        if !self.values.is_object() {
            self.values = Value::Object(Map::new());
        }
        path.into().assign(&mut self.values, value.into())
    }

    pub fn get<P: Into<ConfigPath>>(&self, path: P) -> Option<&Value> {
        path.into().lookup(&self.values)
    }

    pub fn get_mut<P: Into<ConfigPath>>(&mut self, path: P) -> Option<&mut Value> {
        path.into().lookup_mut(&mut self.values)
    }

    pub fn remove<P: Into<ConfigPath>>(&mut self, path: P) -> Option<Value> {
        path.into().take(&mut self.values)
    }

    /// Store a typed extension, returning the previous one of the same type
    pub fn insert<T: Any + Send + Sync>(&mut self, value: T) -> Option<T> {
        self.extensions
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|previous| previous.downcast().ok().map(|boxed| *boxed))
    }

    pub fn extension<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref())
    }

    pub fn extension_mut<T: Any + Send + Sync>(&mut self) -> Option<&mut T> {
        self.extensions
            .get_mut(&TypeId::of::<T>())
            .and_then(|value| value.downcast_mut())
    }

    pub fn take_extension<T: Any + Send + Sync>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|value| value.downcast().ok().map(|boxed| *boxed))
    }

    pub fn has_extension<T: Any + Send + Sync>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }

    /// Mount a configuration accessor at `path`.
    ///
    /// The first mounted accessor becomes the one returned by [`App::config`].
    pub fn mount_config(&mut self, path: impl Into<String>, resolver: ConfigResolver) {
        let path = path.into();
        if self.primary_mount.is_none() {
            self.primary_mount = Some(path.clone());
        }
        self.mounts.insert(path, resolver);
    }

    /// Accessor mounted at `path`
    pub fn config_at(&self, path: &str) -> Option<&ConfigResolver> {
        self.mounts.get(path)
    }

    /// The primary configuration accessor
    pub fn config(&self) -> Option<&ConfigResolver> {
        self.primary_mount
            .as_deref()
            .and_then(|path| self.mounts.get(path))
    }

    /// Queue a provider to run after every provider already known to the
    /// running pipeline
    pub fn register_provider(&mut self, entry: impl Into<ProviderEntry>) {
        self.pending_providers.push(entry.into());
    }

    pub fn pending_provider_count(&self) -> usize {
        self.pending_providers.len()
    }

    pub(crate) fn take_pending_providers(&mut self) -> Vec<ProviderEntry> {
        std::mem::take(&mut self.pending_providers)
    }
}

impl Default for App {
    fn default() -> Self {
        Self {
            values: Value::Object(Map::new()),
            extensions: HashMap::new(),
            mounts: BTreeMap::new(),
            primary_mount: None,
            pending_providers: Vec::new(),
        }
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("values", &self.values)
            .field("extensions", &self.extensions.len())
            .field("mounts", &self.mounts.keys().collect::<Vec<_>>())
            .field("pending_providers", &self.pending_providers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq)]
    struct Mailer {
        driver: &'static str,
    }

    #[test]
    fn test_values_by_path() {
        let mut app = App::new();
        app.set("http.port", 8080);
        app.set("http.hosts[0]", "localhost");

        assert_eq!(app.get("http.port"), Some(&json!(8080)));
        assert_eq!(app.values(), &json!({"http": {"port": 8080, "hosts": ["localhost"]}}));

        if let Some(port) = app.get_mut("http.port") {
            *port = json!(9090);
        }
        assert_eq!(app.remove("http.port"), Some(json!(9090)));
        assert_eq!(app.get("http.port"), None);
    }

    #[test]
    fn test_huge_indices_leave_values_untouched() {
        let mut app = App::new();
        app.set("http.hosts[0]", "localhost");

        assert!(app.try_set("http.hosts[18446744073709551615]", "x").is_err());
        app.set("http.hosts[5000000000]", "x");
        assert_eq!(app.values(), &json!({"http": {"hosts": ["localhost"]}}));
    }

    #[test]
    fn test_typed_extensions() {
        let mut app = App::new();
        assert!(app.insert(Mailer { driver: "smtp" }).is_none());
        assert_eq!(
            app.insert(Mailer { driver: "log" }),
            Some(Mailer { driver: "smtp" })
        );

        app.extension_mut::<Mailer>().unwrap().driver = "ses";
        assert_eq!(app.extension::<Mailer>(), Some(&Mailer { driver: "ses" }));
        assert!(app.has_extension::<Mailer>());
        assert_eq!(app.take_extension::<Mailer>(), Some(Mailer { driver: "ses" }));
        assert!(app.extension::<Mailer>().is_none());
    }

    #[test]
    fn test_mounted_config_is_separate_from_values() {
        let mut app = App::with_values(Map::new());
        app.mount_config("config", ConfigResolver::new(json!({"name": "demo"})));
        app.mount_config("legacy.config", ConfigResolver::new(json!({})));

        assert_eq!(app.config().unwrap().get("name", ""), json!("demo"));
        assert!(app.config_at("legacy.config").is_some());
        assert!(app.get("config").is_none());
    }

    #[test]
    fn test_pending_providers_drain() {
        let mut app = App::new();
        app.register_provider("mailer");
        app.register_provider(String::from("queue"));
        assert_eq!(app.pending_provider_count(), 2);

        let pending = app.take_pending_providers();
        assert_eq!(pending.len(), 2);
        assert_eq!(app.pending_provider_count(), 0);
    }
}
