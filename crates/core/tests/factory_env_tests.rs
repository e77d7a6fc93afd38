//! Factory settings read from `ARCHITECT_*` environment variables.

use std::env;
use std::time::Duration;

use serial_test::serial;
use serde_json::{json, Value};
use tempfile::TempDir;

use architect_core::{ArchitectFactory, ConfigError, FactoryConfig, FragmentSource, Initial, ProviderSource};

const VARS: [&str; 8] = [
    "ARCHITECT_CONFIG_DIR",
    "ARCHITECT_CONFIG_EXT",
    "ARCHITECT_APP_CONFIG_PATH",
    "ARCHITECT_ENV_FRAGMENT",
    "ARCHITECT_APP_FRAGMENT",
    "ARCHITECT_PROVIDERS_PATH",
    "ARCHITECT_PROVIDER_DIR",
    "ARCHITECT_STEP_TIMEOUT_MS",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_defaults_without_environment() {
    clear_env();
    let config = FactoryConfig::from_env().unwrap();

    assert!(matches!(config.config_files, FragmentSource::None));
    assert_eq!(config.config_files_use_ext.as_deref(), Some(".yaml"));
    assert_eq!(config.app_config_path, "config");
    assert_eq!(config.config_env_filename, ".env");
    assert_eq!(config.config_app_filename, "app");
    assert_eq!(config.config_providers_path, "providers");
    assert!(matches!(config.provider_files, ProviderSource::Identity));
    assert_eq!(config.step_timeout, None);
}

#[test]
#[serial]
fn test_environment_overrides() {
    clear_env();
    env::set_var("ARCHITECT_CONFIG_DIR", "/etc/shop");
    env::set_var("ARCHITECT_CONFIG_EXT", "");
    env::set_var("ARCHITECT_APP_CONFIG_PATH", "settings");
    env::set_var("ARCHITECT_ENV_FRAGMENT", "local");
    env::set_var("ARCHITECT_APP_FRAGMENT", "shop");
    env::set_var("ARCHITECT_PROVIDERS_PATH", "boot.providers");
    env::set_var("ARCHITECT_PROVIDER_DIR", "/etc/shop/providers");
    env::set_var("ARCHITECT_STEP_TIMEOUT_MS", "1500");

    let config = FactoryConfig::from_env().unwrap();
    clear_env();

    assert!(matches!(config.config_files, FragmentSource::Directory(ref p) if p.ends_with("shop")));
    assert_eq!(config.config_files_use_ext, None);
    assert_eq!(config.app_config_path, "settings");
    assert_eq!(config.config_env_filename, "local");
    assert_eq!(config.config_app_filename, "shop");
    assert_eq!(config.config_providers_path, "boot.providers");
    assert!(matches!(config.provider_files, ProviderSource::Directory { .. }));
    assert_eq!(config.step_timeout, Some(Duration::from_millis(1500)));
}

#[test]
#[serial]
fn test_invalid_environment_values() {
    clear_env();
    env::set_var("ARCHITECT_STEP_TIMEOUT_MS", "soon");
    let error = FactoryConfig::from_env().unwrap_err();
    assert!(matches!(error, ConfigError::InvalidValue { ref field, .. } if field == "ARCHITECT_STEP_TIMEOUT_MS"));

    env::set_var("ARCHITECT_STEP_TIMEOUT_MS", "0");
    assert!(FactoryConfig::from_env().is_err());

    clear_env();
    env::set_var("ARCHITECT_APP_CONFIG_PATH", "");
    let error = ArchitectFactory::from_env().unwrap_err();
    assert!(matches!(error, ConfigError::MissingRequired { ref field, .. } if field == "app_config_path"));
    clear_env();
}

#[tokio::test]
#[serial]
async fn test_bootstrap_from_environment() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("shop.yml"), "name: shop\nproviders: []\n").unwrap();

    clear_env();
    env::set_var("ARCHITECT_CONFIG_DIR", dir.path());
    env::set_var("ARCHITECT_CONFIG_EXT", ".yml");
    env::set_var("ARCHITECT_APP_FRAGMENT", "shop");
    env::set_var("ARCHITECT_APP_CONFIG_PATH", "settings");
    let factory = ArchitectFactory::from_env();
    clear_env();

    let app = factory.unwrap().architect(Initial::new()).init().await.unwrap();

    assert!(app.config_at("config").is_none());
    let settings = app.config_at("settings").unwrap();
    assert_eq!(settings.get("name", Value::Null), json!("shop"));
}
