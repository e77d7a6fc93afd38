use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::ArchitectError;
use crate::providers::{ManifestLoader, Provider, ProviderEntry};

/// Loads a provider by identifier from a directory
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    /// `Ok(None)` when the directory has nothing under that identifier
    async fn load(
        &self,
        root: &Path,
        identifier: &str,
        suffix: Option<&str>,
    ) -> Result<Option<Arc<dyn Provider>>, ArchitectError>;
}

/// How provider identifiers are turned into providers
#[derive(Clone, Default)]
pub enum ProviderSource {
    /// Identifiers never resolve; only ready providers run
    #[default]
    Identity,
    /// Look identifiers up in a fixed map
    Mapping(HashMap<String, Arc<dyn Provider>>),
    /// Load identifiers from a directory
    Directory {
        root: PathBuf,
        loader: Arc<dyn ModuleLoader>,
    },
}

impl ProviderSource {
    /// Build a mapping source from `(identifier, provider)` pairs
    pub fn mapping<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Arc<dyn Provider>)>,
        K: Into<String>,
    {
        Self::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Directory source reading provider manifests
    pub fn directory(root: impl Into<PathBuf>) -> Self {
        Self::directory_with_loader(root, ManifestLoader)
    }

    pub fn directory_with_loader<L: ModuleLoader + 'static>(
        root: impl Into<PathBuf>,
        loader: L,
    ) -> Self {
        Self::Directory {
            root: root.into(),
            loader: Arc::new(loader),
        }
    }
}

impl fmt::Debug for ProviderSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity => write!(f, "Identity"),
            Self::Mapping(map) => {
                let mut keys: Vec<_> = map.keys().collect();
                keys.sort();
                f.debug_tuple("Mapping").field(&keys).finish()
            }
            Self::Directory { root, .. } => {
                f.debug_struct("Directory").field("root", root).finish()
            }
        }
    }
}

/// Resolves queued entries to runnable providers
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    source: ProviderSource,
    suffix: Option<String>,
}

impl ProviderRegistry {
    pub fn new(source: ProviderSource, suffix: Option<String>) -> Self {
        Self {
            source,
            suffix: suffix.filter(|s| !s.is_empty()),
        }
    }

    pub fn source(&self) -> &ProviderSource {
        &self.source
    }

    /// Resolve `entry`, which sits at 1-based `position` in the pipeline
    pub async fn resolve(
        &self,
        entry: &ProviderEntry,
        position: usize,
    ) -> Result<Arc<dyn Provider>, ArchitectError> {
        let resolved = match entry {
            ProviderEntry::Provider(provider) => Some(Arc::clone(provider)),
            ProviderEntry::Identifier(identifier) => self.lookup(identifier).await?,
            ProviderEntry::Unresolvable(_) => None,
        };

        resolved.ok_or_else(|| ArchitectError::not_callable(position, entry.describe()))
    }

    async fn lookup(&self, identifier: &str) -> Result<Option<Arc<dyn Provider>>, ArchitectError> {
        match &self.source {
            ProviderSource::Identity => Ok(None),
            ProviderSource::Mapping(map) => Ok(self.lookup_mapping(map, identifier)),
            ProviderSource::Directory { root, loader } => {
                loader.load(root, identifier, self.suffix.as_deref()).await
            }
        }
    }

    /// Exact identifier, then with the suffix stripped, then with it appended
    fn lookup_mapping(
        &self,
        map: &HashMap<String, Arc<dyn Provider>>,
        identifier: &str,
    ) -> Option<Arc<dyn Provider>> {
        if let Some(provider) = map.get(identifier) {
            return Some(Arc::clone(provider));
        }

        let suffix = self.suffix.as_deref()?;
        identifier
            .strip_suffix(suffix)
            .and_then(|stripped| map.get(stripped))
            .or_else(|| map.get(&format!("{identifier}{suffix}")))
            .cloned()
    }
}
