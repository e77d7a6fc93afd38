use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::ConfigError;
use crate::errors::ArchitectError;

/// A named piece of configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFragment {
    pub name: String,
    pub value: Value,
}

impl ConfigFragment {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Where configuration fragments come from
#[derive(Debug, Clone, Default)]
pub enum FragmentSource {
    /// No fragments
    #[default]
    None,
    /// Fragments already loaded in memory, keyed by name
    Mapping(BTreeMap<String, Value>),
    /// Every regular file in a directory is one fragment
    Directory(PathBuf),
}

impl FragmentSource {
    /// Build an in-memory source from `(name, value)` pairs
    pub fn mapping<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self::Directory(path.into())
    }

    /// Load all fragments
    pub async fn load(&self) -> Result<Vec<ConfigFragment>, ArchitectError> {
        match self {
            FragmentSource::None => Ok(Vec::new()),
            FragmentSource::Mapping(entries) => Ok(entries
                .iter()
                .map(|(name, value)| ConfigFragment::new(name.clone(), value.clone()))
                .collect()),
            FragmentSource::Directory(root) => load_directory(root).await,
        }
    }

    /// Get source description
    pub fn description(&self) -> String {
        match self {
            FragmentSource::None => "No configuration fragments".to_string(),
            FragmentSource::Mapping(entries) => {
                format!("In-memory fragments ({})", entries.len())
            }
            FragmentSource::Directory(path) => {
                format!("Configuration directory: {}", path.display())
            }
        }
    }
}

impl fmt::Display for FragmentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

async fn load_directory(root: &Path) -> Result<Vec<ConfigFragment>, ArchitectError> {
    let io_error = |path: &Path| {
        let path = path.to_path_buf();
        move |source| ArchitectError::FragmentLoad { path, source }
    };

    let mut entries = tokio::fs::read_dir(root).await.map_err(io_error(root))?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(io_error(root))? {
        let path = entry.path();
        let metadata = tokio::fs::metadata(&path).await.map_err(io_error(&path))?;
        if metadata.is_file() {
            files.push(path);
        }
    }
    files.sort();

    let mut fragments = Vec::with_capacity(files.len());
    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(io_error(&path))?;
        let extension = path.extension().and_then(|e| e.to_str());

        let value = parse_fragment(&name, extension, &contents)?;
        tracing::debug!("Loaded configuration fragment '{}'", name);
        fragments.push(ConfigFragment::new(name, value));
    }

    Ok(fragments)
}

/// Parse fragment contents according to the file extension
pub fn parse_fragment(
    name: &str,
    extension: Option<&str>,
    contents: &str,
) -> Result<Value, ConfigError> {
    if contents.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    match extension.map(str::to_ascii_lowercase).as_deref() {
        Some("json") => {
            serde_json::from_str(contents).map_err(|e| ConfigError::parsing(name, e))
        }
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(contents).map_err(|e| ConfigError::parsing(name, e))
        }
        other => Err(ConfigError::UnsupportedFormat {
            name: name.to_string(),
            extension: other.unwrap_or_default().to_string(),
        }),
    }
}
