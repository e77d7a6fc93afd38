//! Configuration fragments and provider manifests read from disk.

use std::fs;
use std::path::Path;

use serde_json::{json, Value};
use tempfile::TempDir;

use architect_core::{
    ArchitectError, ArchitectFactory, ConfigError, FactoryConfig, FragmentSource,
    Initial, ProviderSource,
};

fn write(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).unwrap();
}

#[tokio::test]
async fn test_directory_fragments_are_merged() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), ".env.yaml", "database:\n  host: db.internal\n");
    write(dir.path(), "app.yaml", "name: shop\ndatabase:\n  host: localhost\n  port: 5432\n");
    write(dir.path(), "mail.yaml", "driver: smtp\n");
    write(dir.path(), "empty.yaml", "");
    fs::create_dir(dir.path().join("nested")).unwrap();

    let config = FactoryConfig::default().with_config_files(FragmentSource::directory(dir.path()));
    let app = ArchitectFactory::new(config)
        .unwrap()
        .architect(Initial::new())
        .init()
        .await
        .unwrap();

    let resolved = app.config().unwrap();
    assert_eq!(resolved.get("name", Value::Null), json!("shop"));
    assert_eq!(resolved.get("database.host", Value::Null), json!("db.internal"));
    assert_eq!(resolved.get("database.port", Value::Null), json!(5432));
    assert_eq!(resolved.get("mail.driver", Value::Null), json!("smtp"));
    assert_eq!(resolved.get("empty", Value::Null), json!({}));
    assert!(!resolved.contains("nested"));
}

#[tokio::test]
async fn test_json_fragments_without_suffix_handling() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "app", "name: shop\n");
    write(dir.path(), "cache.json", r#"{"ttl": 60}"#);

    let config = FactoryConfig::default()
        .with_config_files(FragmentSource::directory(dir.path()))
        .with_config_files_ext(None);

    let failure = ArchitectFactory::new(config.clone())
        .unwrap()
        .architect(Initial::new())
        .init()
        .await
        .unwrap_err();
    // `app` has no extension, so its format cannot be chosen
    assert!(matches!(
        failure.error,
        ArchitectError::Config(ConfigError::UnsupportedFormat { ref name, .. }) if name == "app"
    ));

    fs::remove_file(dir.path().join("app")).unwrap();
    let app = ArchitectFactory::new(config)
        .unwrap()
        .architect(Initial::new())
        .init()
        .await
        .unwrap();
    assert_eq!(app.config().unwrap().get(["cache.json", "ttl"], Value::Null), json!(60));
}

#[tokio::test]
async fn test_malformed_fragment_stops_bootstrap() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "app.yaml", "name: [unclosed\n");

    let config = FactoryConfig::default().with_config_files(FragmentSource::directory(dir.path()));
    let failure = ArchitectFactory::new(config)
        .unwrap()
        .architect(Initial::new())
        .init()
        .await
        .unwrap_err();

    assert!(failure.error.is_configuration());
    assert!(failure.app.config().is_none());
}

#[tokio::test]
async fn test_missing_directory_is_a_load_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing");

    let config = FactoryConfig::default().with_config_files(FragmentSource::directory(&missing));
    let failure = ArchitectFactory::new(config)
        .unwrap()
        .architect(Initial::new())
        .init()
        .await
        .unwrap_err();

    assert!(matches!(failure.error, ArchitectError::FragmentLoad { ref path, .. } if *path == missing));
}

#[tokio::test]
async fn test_provider_manifests_from_directory() {
    let config_dir = TempDir::new().unwrap();
    write(config_dir.path(), "app.yaml", "providers:\n  - mail\n  - cache.yaml\n");

    let provider_dir = TempDir::new().unwrap();
    write(
        provider_dir.path(),
        "mail.yaml",
        "name: mail\nset:\n  mail.driver: smtp\nproviders:\n  - queue\n",
    );
    write(provider_dir.path(), "cache.yaml", "set:\n  cache.ready: true\n");
    write(provider_dir.path(), "queue.yaml", "set:\n  queue.workers: 4\n");

    let config = FactoryConfig::default()
        .with_config_files(FragmentSource::directory(config_dir.path()))
        .with_provider_files(ProviderSource::directory(provider_dir.path()));

    let mut architect = ArchitectFactory::new(config).unwrap().architect(Initial::new());
    architect.boot().await.unwrap();

    let app = architect.app();
    assert_eq!(app.get("mail.driver"), Some(&json!("smtp")));
    assert_eq!(app.get("cache.ready"), Some(&json!(true)));
    assert_eq!(app.get("queue.workers"), Some(&json!(4)));

    let stats = architect.provider_stats().unwrap();
    assert_eq!(stats.discovered_count, 2);
    assert_eq!(stats.appended_count, 1);
    assert_eq!(stats.executed_count, 3);
}

#[tokio::test]
async fn test_unknown_manifest_is_not_callable() {
    let config_dir = TempDir::new().unwrap();
    write(config_dir.path(), "app.json", r#"{"providers": ["ghost"]}"#);
    let provider_dir = TempDir::new().unwrap();

    let config = FactoryConfig::default()
        .with_config_files(FragmentSource::directory(config_dir.path()))
        .with_config_files_ext(Some(".json"))
        .with_provider_files(ProviderSource::directory(provider_dir.path()));

    let failure = ArchitectFactory::new(config)
        .unwrap()
        .architect(Initial::new())
        .init()
        .await
        .unwrap_err();

    assert!(matches!(
        failure.error,
        ArchitectError::ProviderNotCallable { position: 1, ref entry } if entry == "ghost"
    ));
}

#[tokio::test]
async fn test_invalid_manifest_is_a_load_error() {
    let config_dir = TempDir::new().unwrap();
    write(config_dir.path(), "app.yaml", "providers: broken\n");
    let provider_dir = TempDir::new().unwrap();
    write(provider_dir.path(), "broken.yaml", "set: [1, 2]\n");

    let config = FactoryConfig::default()
        .with_config_files(FragmentSource::directory(config_dir.path()))
        .with_provider_files(ProviderSource::directory(provider_dir.path()));

    let failure = ArchitectFactory::new(config)
        .unwrap()
        .architect(Initial::new())
        .init()
        .await
        .unwrap_err();

    assert!(matches!(
        failure.error,
        ArchitectError::ProviderLoad { ref identifier, .. } if identifier == "broken"
    ));
}
