use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{
    ConfigError, ConfigValidator, FragmentNaming, FragmentSource, NonEmptyValidator,
};
use crate::providers::ProviderSource;

pub const DEFAULT_CONFIG_FILES_EXT: &str = ".yaml";
pub const DEFAULT_APP_CONFIG_PATH: &str = "config";
pub const DEFAULT_ENV_FRAGMENT: &str = ".env";
pub const DEFAULT_APP_FRAGMENT: &str = "app";
pub const DEFAULT_PROVIDERS_PATH: &str = "providers";

/// Settings shared by every architect built from one factory
#[derive(Debug, Clone)]
pub struct FactoryConfig {
    /// Source of configuration fragments. Default: none
    pub config_files: FragmentSource,
    /// Suffix stripped from fragment names and used for provider lookups.
    /// Default: `.yaml`
    pub config_files_use_ext: Option<String>,
    /// Path on the application where the configuration accessor is mounted.
    /// Default: `config`
    pub app_config_path: String,
    /// Name of the environment fragment. Default: `.env`
    pub config_env_filename: String,
    /// Name of the application fragment. Default: `app`
    pub config_app_filename: String,
    /// Configuration path listing additional providers. Default: `providers`
    pub config_providers_path: String,
    /// How provider identifiers are resolved. Default: identity
    pub provider_files: ProviderSource,
    /// Upper bound on a single provider step. Default: unbounded
    pub step_timeout: Option<Duration>,
}

impl FactoryConfig {
    pub fn new() -> Self {
        Self {
            config_files: FragmentSource::None,
            config_files_use_ext: Some(DEFAULT_CONFIG_FILES_EXT.to_string()),
            app_config_path: DEFAULT_APP_CONFIG_PATH.to_string(),
            config_env_filename: DEFAULT_ENV_FRAGMENT.to_string(),
            config_app_filename: DEFAULT_APP_FRAGMENT.to_string(),
            config_providers_path: DEFAULT_PROVIDERS_PATH.to_string(),
            provider_files: ProviderSource::Identity,
            step_timeout: None,
        }
    }

    /// Overlay `ARCHITECT_*` environment variables on the defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::new();

        if let Ok(dir) = env::var("ARCHITECT_CONFIG_DIR") {
            config.config_files = FragmentSource::Directory(PathBuf::from(dir));
        }

        // An empty value disables suffix handling
        if let Ok(ext) = env::var("ARCHITECT_CONFIG_EXT") {
            config.config_files_use_ext = Some(ext).filter(|e| !e.is_empty());
        }

        if let Ok(path) = env::var("ARCHITECT_APP_CONFIG_PATH") {
            config.app_config_path = path;
        }

        if let Ok(name) = env::var("ARCHITECT_ENV_FRAGMENT") {
            config.config_env_filename = name;
        }

        if let Ok(name) = env::var("ARCHITECT_APP_FRAGMENT") {
            config.config_app_filename = name;
        }

        if let Ok(path) = env::var("ARCHITECT_PROVIDERS_PATH") {
            config.config_providers_path = path;
        }

        if let Ok(dir) = env::var("ARCHITECT_PROVIDER_DIR") {
            config.provider_files = ProviderSource::directory(dir);
        }

        if let Ok(ms) = env::var("ARCHITECT_STEP_TIMEOUT_MS") {
            let ms: u64 = ms.parse().map_err(|_| {
                ConfigError::invalid_value(
                    "ARCHITECT_STEP_TIMEOUT_MS",
                    ms.clone(),
                    "timeout in milliseconds",
                )
            })?;
            config.step_timeout = Some(Duration::from_millis(ms));
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the bootstrap cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("app_config_path", &self.app_config_path),
            ("config_env_filename", &self.config_env_filename),
            ("config_app_filename", &self.config_app_filename),
            ("config_providers_path", &self.config_providers_path),
        ];
        for (field, value) in required {
            NonEmptyValidator.validate(field, value.as_str())?;
        }

        if self.step_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::invalid_value(
                "step_timeout",
                "0ms",
                "a positive duration",
            ));
        }
        Ok(())
    }

    /// Fragment naming rules derived from these settings
    pub fn naming(&self) -> FragmentNaming {
        FragmentNaming::new(
            self.config_files_use_ext.clone(),
            self.config_env_filename.clone(),
            self.config_app_filename.clone(),
        )
    }

    pub fn with_config_files(mut self, source: FragmentSource) -> Self {
        self.config_files = source;
        self
    }

    pub fn with_config_files_ext(mut self, ext: Option<&str>) -> Self {
        self.config_files_use_ext = ext.filter(|e| !e.is_empty()).map(str::to_string);
        self
    }

    pub fn with_app_config_path(mut self, path: impl Into<String>) -> Self {
        self.app_config_path = path.into();
        self
    }

    pub fn with_env_fragment(mut self, name: impl Into<String>) -> Self {
        self.config_env_filename = name.into();
        self
    }

    pub fn with_app_fragment(mut self, name: impl Into<String>) -> Self {
        self.config_app_filename = name.into();
        self
    }

    pub fn with_providers_path(mut self, path: impl Into<String>) -> Self {
        self.config_providers_path = path.into();
        self
    }

    pub fn with_provider_files(mut self, source: ProviderSource) -> Self {
        self.provider_files = source;
        self
    }

    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = Some(timeout);
        self
    }
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self::new()
    }
}
