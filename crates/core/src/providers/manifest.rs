//! Declarative providers loaded from a directory.
//!
//! A manifest is a YAML or JSON document:
//!
//! ```yaml
//! name: mail
//! set:
//!   mail.driver: smtp
//!   mail.retries: 3
//! providers:
//!   - queue
//! ```
//!
//! Running it writes each `set` entry onto the application at its path and
//! registers every `providers` entry to run after the current pipeline.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::errors::{ArchitectError, BoxError};
use crate::foundation::App;
use crate::providers::{ModuleLoader, Provider, ProviderEntry};

/// Parsed provider manifest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderManifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub set: BTreeMap<String, Value>,
    #[serde(default)]
    pub providers: Vec<Value>,
}

/// Provider that applies a manifest
#[derive(Debug)]
pub struct ManifestProvider {
    name: String,
    manifest: ProviderManifest,
}

impl ManifestProvider {
    pub fn new(identifier: &str, manifest: ProviderManifest) -> Self {
        Self {
            name: manifest
                .name
                .clone()
                .unwrap_or_else(|| identifier.to_string()),
            manifest,
        }
    }

    pub fn manifest(&self) -> &ProviderManifest {
        &self.manifest
    }
}

#[async_trait]
impl Provider for ManifestProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn provide(&self, app: &mut App) -> Result<(), BoxError> {
        for (path, value) in &self.manifest.set {
            app.try_set(path.as_str(), value.clone())?;
        }
        for entry in &self.manifest.providers {
            app.register_provider(ProviderEntry::from_config_value(entry.clone()));
        }
        Ok(())
    }
}

/// Default [`ModuleLoader`]: reads `<root>/<identifier>` or
/// `<root>/<identifier><suffix>` as a provider manifest
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestLoader;

impl ManifestLoader {
    /// Identifiers name files under the root: relative, without `..` or `.`
    fn is_contained(identifier: &str) -> bool {
        let mut components = Path::new(identifier).components().peekable();
        components.peek().is_some()
            && components.all(|component| matches!(component, Component::Normal(_)))
    }

    fn candidates(root: &Path, identifier: &str, suffix: Option<&str>) -> Vec<PathBuf> {
        let mut candidates = vec![root.join(identifier)];
        if let Some(suffix) = suffix {
            if !identifier.ends_with(suffix) {
                candidates.push(root.join(format!("{identifier}{suffix}")));
            }
        }
        candidates
    }
}

#[async_trait]
impl ModuleLoader for ManifestLoader {
    async fn load(
        &self,
        root: &Path,
        identifier: &str,
        suffix: Option<&str>,
    ) -> Result<Option<Arc<dyn Provider>>, ArchitectError> {
        if !Self::is_contained(identifier) {
            return Err(ArchitectError::provider_load(
                identifier,
                root,
                "identifier must be a relative path inside the provider directory",
            ));
        }

        for path in Self::candidates(root, identifier, suffix) {
            let contents = match tokio::fs::read_to_string(&path).await {
                Ok(contents) => contents,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(ArchitectError::provider_load(identifier, root, e.to_string())),
            };

            let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
            let manifest: ProviderManifest = if contents.trim().is_empty() {
                ProviderManifest::default()
            } else if is_json {
                serde_json::from_str(&contents)
                    .map_err(|e| ArchitectError::provider_load(identifier, root, e.to_string()))?
            } else {
                serde_yaml::from_str(&contents)
                    .map_err(|e| ArchitectError::provider_load(identifier, root, e.to_string()))?
            };

            tracing::debug!("Loaded provider manifest {}", path.display());
            return Ok(Some(Arc::new(ManifestProvider::new(identifier, manifest))));
        }

        Ok(None)
    }
}
