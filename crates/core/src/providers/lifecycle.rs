use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::FactoryConfig;
use crate::errors::ArchitectError;
use crate::foundation::App;
use crate::pipeline::{PipelineRunner, Step, StepQueue};
use crate::providers::{ProviderEntry, ProviderRegistry};

/// Runs base and discovered providers against the application
pub struct ProviderPipeline {
    registry: Arc<ProviderRegistry>,
    providers: Vec<ProviderEntry>,
    config_path: String,
    providers_path: String,
    step_timeout: Option<Duration>,
    stats: ProviderPipelineStats,
}

impl ProviderPipeline {
    pub fn new(registry: ProviderRegistry) -> Self {
        let defaults = FactoryConfig::default();
        Self {
            registry: Arc::new(registry),
            providers: Vec::new(),
            config_path: defaults.app_config_path,
            providers_path: defaults.config_providers_path,
            step_timeout: None,
            stats: ProviderPipelineStats::new(),
        }
    }

    /// Pipeline configured from factory settings
    pub fn from_factory(config: &FactoryConfig) -> Self {
        let registry = ProviderRegistry::new(
            config.provider_files.clone(),
            config.config_files_use_ext.clone(),
        );
        Self {
            config_path: config.app_config_path.clone(),
            providers_path: config.config_providers_path.clone(),
            step_timeout: config.step_timeout,
            ..Self::new(registry)
        }
    }

    /// Set the base providers, which run before discovered ones
    pub fn with_providers(mut self, providers: Vec<ProviderEntry>) -> Self {
        self.providers = providers;
        self
    }

    pub fn with_config_path(mut self, path: impl Into<String>) -> Self {
        self.config_path = path.into();
        self
    }

    pub fn with_providers_path(mut self, path: impl Into<String>) -> Self {
        self.providers_path = path.into();
        self
    }

    pub fn with_step_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// Read the provider list from the mounted configuration.
    ///
    /// An array contributes each element, any other present value
    /// contributes itself, and an absent path contributes nothing.
    pub fn discover(&self, app: &App) -> Result<Vec<ProviderEntry>, ArchitectError> {
        let config = app
            .config_at(&self.config_path)
            .ok_or_else(|| ArchitectError::ConfigNotMounted {
                path: self.config_path.clone(),
            })?;

        let discovered = match config.get(self.providers_path.as_str(), Value::Array(Vec::new())) {
            Value::Array(items) => items
                .into_iter()
                .map(ProviderEntry::from_config_value)
                .collect(),
            other => vec![ProviderEntry::from_config_value(other)],
        };
        Ok(discovered)
    }

    /// Run every provider in order, stopping at the first failure
    pub async fn run(&mut self, app: &mut App) -> Result<ProviderPipelineStats, ArchitectError> {
        let started = Instant::now();

        let discovered = self.discover(app)?;
        let registered = app.take_pending_providers();

        self.stats.base_count = self.providers.len();
        self.stats.discovered_count = discovered.len();
        self.stats.registered_count = registered.len();

        let mut runner = PipelineRunner::new("providers").with_step_timeout(self.step_timeout);
        for entry in self
            .providers
            .iter()
            .cloned()
            .chain(discovered)
            .chain(registered)
        {
            runner.push(ProviderStep {
                entry,
                registry: Arc::clone(&self.registry),
            });
        }
        let initial_count = runner.len();

        tracing::info!("Starting provider pipeline with {} providers...", initial_count);
        let result = runner.run(app).await;

        self.stats.appended_count = runner.len() - initial_count;
        self.stats.executed_count = runner.executed();
        self.stats.total_time = started.elapsed();

        match result {
            Ok(_) => {
                tracing::info!(
                    "Provider pipeline completed in {:?} with {} providers",
                    self.stats.total_time,
                    self.stats.executed_count
                );
                Ok(self.stats.clone())
            }
            Err(error) => {
                // a panicked or timed out provider never reached its own cleanup
                app.take_pending_providers();
                tracing::error!("Provider pipeline failed: {}", error);
                Err(error)
            }
        }
    }

    /// Statistics of the last run
    pub fn stats(&self) -> &ProviderPipelineStats {
        &self.stats
    }
}

/// One queued provider: resolve, run, then queue what it registered
struct ProviderStep {
    entry: ProviderEntry,
    registry: Arc<ProviderRegistry>,
}

#[async_trait]
impl Step<App> for ProviderStep {
    fn name(&self) -> String {
        self.entry.describe()
    }

    async fn run(&self, app: &mut App, queue: &mut StepQueue<App>) -> Result<(), ArchitectError> {
        let position = queue.position();
        let provider = self.registry.resolve(&self.entry, position).await?;

        tracing::debug!("Running provider {}: {}", position, provider.name());
        if let Err(source) = provider.provide(app).await {
            app.take_pending_providers();
            return Err(ArchitectError::ProviderFailed {
                position,
                provider: provider.name().to_string(),
                source,
            });
        }

        for entry in app.take_pending_providers() {
            queue.push(ProviderStep {
                entry,
                registry: Arc::clone(&self.registry),
            });
        }
        Ok(())
    }
}

/// Statistics for provider pipeline execution
#[derive(Debug, Clone)]
pub struct ProviderPipelineStats {
    /// Providers supplied at construction
    pub base_count: usize,
    /// Providers listed in configuration
    pub discovered_count: usize,
    /// Providers registered on the application before the run
    pub registered_count: usize,
    /// Providers appended by other providers during the run
    pub appended_count: usize,
    /// Providers started, including the one that failed
    pub executed_count: usize,
    pub total_time: Duration,
}

impl ProviderPipelineStats {
    pub fn new() -> Self {
        Self {
            base_count: 0,
            discovered_count: 0,
            registered_count: 0,
            appended_count: 0,
            executed_count: 0,
            total_time: Duration::ZERO,
        }
    }
}

impl Default for ProviderPipelineStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigResolver;
    use crate::providers::{from_fn, from_sync_fn, Provider, ProviderSource};
    use serde_json::json;
    use std::sync::Mutex;

    fn recorder(log: &Arc<Mutex<Vec<String>>>, name: &'static str) -> Arc<dyn Provider> {
        let log = Arc::clone(log);
        Arc::new(from_sync_fn(name, move |_app| {
            log.lock().unwrap().push(name.to_string());
            Ok(())
        }))
    }

    fn app_with_config(tree: Value) -> App {
        let mut app = App::new();
        app.mount_config("config", ConfigResolver::new(tree));
        app
    }

    #[tokio::test]
    async fn test_discovered_providers_follow_base_providers() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = ProviderRegistry::new(
            ProviderSource::mapping([("c", recorder(&log, "C")), ("d", recorder(&log, "D"))]),
            None,
        );

        let mut app = app_with_config(json!({"providers": ["c", "d"]}));
        let mut pipeline = ProviderPipeline::new(registry)
            .with_providers(vec![recorder(&log, "A").into(), recorder(&log, "B").into()]);

        let stats = pipeline.run(&mut app).await.unwrap();

        assert_eq!(*log.lock().unwrap(), ["A", "B", "C", "D"]);
        assert_eq!(stats.base_count, 2);
        assert_eq!(stats.discovered_count, 2);
        assert_eq!(stats.executed_count, 4);
    }

    #[tokio::test]
    async fn test_single_discovered_value_is_one_entry() {
        let app = app_with_config(json!({"boot": {"list": "mailer"}}));
        let pipeline = ProviderPipeline::new(ProviderRegistry::default())
            .with_providers_path("boot.list");

        let discovered = pipeline.discover(&app).unwrap();
        assert_eq!(discovered.len(), 1);
        assert!(pipeline.discover(&app_with_config(json!({}))).unwrap().is_empty());

        let mut app = app_with_config(json!({"providers": [null]}));
        let mut pipeline = ProviderPipeline::new(ProviderRegistry::default());
        let error = pipeline.run(&mut app).await.unwrap_err();
        assert!(matches!(error, ArchitectError::ProviderNotCallable { position: 1, .. }));
    }

    #[tokio::test]
    async fn test_missing_mount_is_an_error() {
        let mut pipeline = ProviderPipeline::new(ProviderRegistry::default());
        let error = pipeline.run(&mut App::new()).await.unwrap_err();
        assert!(matches!(error, ArchitectError::ConfigNotMounted { ref path } if path == "config"));
    }

    #[tokio::test]
    async fn test_registered_providers_are_appended() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let late = ProviderEntry::from(recorder(&log, "late"));
        let spawning_log = Arc::clone(&log);
        let spawner = ProviderEntry::provider(from_sync_fn("spawner", move |app| {
            spawning_log.lock().unwrap().push("spawner".to_string());
            app.register_provider(late.clone());
            Ok(())
        }));

        let mut app = app_with_config(json!({}));
        let mut pipeline = ProviderPipeline::new(ProviderRegistry::default())
            .with_providers(vec![spawner, recorder(&log, "known").into()]);
        let stats = pipeline.run(&mut app).await.unwrap();

        assert_eq!(*log.lock().unwrap(), ["spawner", "known", "late"]);
        assert_eq!(stats.appended_count, 1);
    }

    #[tokio::test]
    async fn test_failed_provider_discards_its_registrations() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let late = ProviderEntry::from(recorder(&log, "late"));
        let failing = ProviderEntry::provider(from_sync_fn("failing", move |app| {
            app.register_provider(late.clone());
            Err("refused".into())
        }));

        let mut app = app_with_config(json!({}));
        let mut pipeline = ProviderPipeline::new(ProviderRegistry::default())
            .with_providers(vec![failing]);
        let error = pipeline.run(&mut app).await.unwrap_err();

        assert!(matches!(error, ArchitectError::ProviderFailed { position: 1, .. }));
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(app.pending_provider_count(), 0);
        assert_eq!(pipeline.stats().executed_count, 1);
    }

    #[tokio::test]
    async fn test_panicked_provider_discards_its_registrations() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let late = ProviderEntry::from(recorder(&log, "late"));
        let panicking = ProviderEntry::provider(from_sync_fn("panicking", move |app| {
            app.register_provider(late.clone());
            panic!("provider exploded")
        }));

        let mut app = app_with_config(json!({}));
        let mut pipeline = ProviderPipeline::new(ProviderRegistry::default())
            .with_providers(vec![panicking]);
        let error = pipeline.run(&mut app).await.unwrap_err();

        assert!(matches!(error, ArchitectError::StepPanicked { position: 1, .. }));
        assert_eq!(app.pending_provider_count(), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_timed_out_provider_discards_its_registrations() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let late = ProviderEntry::from(recorder(&log, "late"));
        let stalled = ProviderEntry::provider(from_fn("stalled", move |app: &mut App| {
            app.register_provider(late.clone());
            Box::pin(async move {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
        }));

        let mut app = app_with_config(json!({}));
        let mut pipeline = ProviderPipeline::new(ProviderRegistry::default())
            .with_providers(vec![stalled])
            .with_step_timeout(Some(Duration::from_millis(20)));
        let error = pipeline.run(&mut app).await.unwrap_err();

        assert!(matches!(error, ArchitectError::StepTimedOut { position: 1, .. }));
        assert_eq!(app.pending_provider_count(), 0);
    }
}
