use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{ConfigError, ConfigFragment, ConfigMerger, ConfigResolver, FactoryConfig};
use crate::errors::ArchitectError;
use crate::foundation::{App, LifecycleState};
use crate::pipeline::{PipelineRunner, Step, StepQueue};
use crate::providers::{ProviderEntry, ProviderPipeline, ProviderPipelineStats};

/// Builds architects that share one [`FactoryConfig`]
#[derive(Debug, Clone)]
pub struct ArchitectFactory {
    config: Arc<FactoryConfig>,
}

impl ArchitectFactory {
    pub fn new(config: FactoryConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
        })
    }

    /// Factory configured from `ARCHITECT_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(FactoryConfig::from_env()?)
    }

    pub fn factory_config(&self) -> &FactoryConfig {
        &self.config
    }

    /// The settings a factory uses when none are given
    pub fn default_factory_config() -> FactoryConfig {
        FactoryConfig::default()
    }

    pub fn architect(&self, initial: Initial) -> Architect {
        Architect::with_factory_config(Arc::clone(&self.config), initial)
    }
}

impl Default for ArchitectFactory {
    fn default() -> Self {
        Self {
            config: Arc::new(FactoryConfig::default()),
        }
    }
}

/// Starting state of one bootstrap
#[derive(Debug, Default)]
pub struct Initial {
    /// Application the providers run against
    pub app: App,
    /// Configuration that wins over every fragment
    pub config: Value,
    /// Providers that run before configuration-discovered ones
    pub providers: Vec<ProviderEntry>,
}

impl Initial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_app(mut self, app: App) -> Self {
        self.app = app;
        self
    }

    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    pub fn with_provider(mut self, provider: impl Into<ProviderEntry>) -> Self {
        self.providers.push(provider.into());
        self
    }

    pub fn with_providers<I, P>(mut self, providers: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<ProviderEntry>,
    {
        self.providers.extend(providers.into_iter().map(Into::into));
        self
    }
}

/// A failed bootstrap, still holding the application
#[derive(Debug, Error)]
#[error("Bootstrap failed: {error}")]
pub struct BootstrapFailure {
    #[source]
    pub error: ArchitectError,
    pub app: App,
}

impl BootstrapFailure {
    pub fn into_parts(self) -> (ArchitectError, App) {
        (self.error, self.app)
    }
}

/// Loads configuration, then runs providers, against one application
#[derive(Debug)]
pub struct Architect {
    config: Arc<FactoryConfig>,
    app: App,
    initial_config: Value,
    providers: Vec<ProviderEntry>,
    state: LifecycleState,
    booted: bool,
    provider_stats: Option<ProviderPipelineStats>,
}

impl Architect {
    /// Architect using the default factory settings
    pub fn new(initial: Initial) -> Self {
        ArchitectFactory::default().architect(initial)
    }

    fn with_factory_config(config: Arc<FactoryConfig>, initial: Initial) -> Self {
        Self {
            config,
            app: initial.app,
            initial_config: initial.config,
            providers: initial.providers,
            state: LifecycleState::Created,
            booted: false,
            provider_stats: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn factory_config(&self) -> &FactoryConfig {
        &self.config
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn app_mut(&mut self) -> &mut App {
        &mut self.app
    }

    pub fn into_app(self) -> App {
        self.app
    }

    /// Statistics of the provider phase, once it has run
    pub fn provider_stats(&self) -> Option<&ProviderPipelineStats> {
        self.provider_stats.as_ref()
    }

    /// Load fragments from the configured source, merge and mount them
    pub async fn load_config(&mut self) -> Result<(), ArchitectError> {
        self.state = LifecycleState::LoadingConfig;
        tracing::info!(
            "Loading configuration from {}",
            self.config.config_files.description()
        );

        match self.config.config_files.load().await {
            Ok(fragments) => {
                self.use_config_fragments(fragments);
                Ok(())
            }
            Err(error) => {
                self.state = LifecycleState::Failed;
                Err(error)
            }
        }
    }

    /// Merge `fragments` over the initial configuration and mount the result
    pub fn use_config_fragments<I>(&mut self, fragments: I) -> ConfigResolver
    where
        I: IntoIterator<Item = ConfigFragment>,
    {
        let merger = ConfigMerger::new(self.config.naming());
        let resolver = ConfigResolver::new(merger.merge(&self.initial_config, fragments));

        tracing::debug!("Mounting configuration at '{}'", self.config.app_config_path);
        self.app
            .mount_config(self.config.app_config_path.clone(), resolver.clone());
        resolver
    }

    /// Run base and configuration-discovered providers
    pub async fn load_providers(&mut self) -> Result<ProviderPipelineStats, ArchitectError> {
        self.state = LifecycleState::LoadingProviders;

        let mut pipeline =
            ProviderPipeline::from_factory(&self.config).with_providers(self.providers.clone());
        let result = pipeline.run(&mut self.app).await;
        self.provider_stats = Some(pipeline.stats().clone());

        if result.is_err() {
            self.state = LifecycleState::Failed;
        }
        result
    }

    /// Run the configuration phase and then the provider phase.
    ///
    /// An architect boots once; booting it again fails with
    /// [`ArchitectError::PipelineFinished`]. Phases run by hand beforehand
    /// do not count as a boot.
    pub async fn boot(&mut self) -> Result<(), ArchitectError> {
        if self.booted {
            return Err(ArchitectError::PipelineFinished {
                pipeline: "architect".to_string(),
            });
        }
        self.booted = true;

        let mut runner = PipelineRunner::new("architect");
        runner.push(ConfigPhase);
        runner.push(ProviderPhase);

        match runner.run(self).await {
            Ok(report) => {
                self.state = LifecycleState::Ready;
                tracing::info!("Application bootstrapped in {:?}", report.elapsed);
                Ok(())
            }
            Err(error) => {
                self.state = LifecycleState::Failed;
                Err(error)
            }
        }
    }

    /// Boot and hand back the application
    pub async fn init(mut self) -> Result<App, BootstrapFailure> {
        match self.boot().await {
            Ok(()) => Ok(self.app),
            Err(error) => Err(BootstrapFailure {
                error,
                app: self.app,
            }),
        }
    }

    /// Boot, then call `callback` once with the error, if any, and the
    /// application
    pub async fn init_with<F, R>(self, callback: F) -> R
    where
        F: FnOnce(Option<ArchitectError>, App) -> R,
    {
        match self.init().await {
            Ok(app) => callback(None, app),
            Err(failure) => {
                let (error, app) = failure.into_parts();
                callback(Some(error), app)
            }
        }
    }

    /// Boot without a callback. A failure is logged and the partially
    /// initialized application is returned.
    pub async fn init_and_log(self) -> App {
        match self.init().await {
            Ok(app) => app,
            Err(failure) => {
                tracing::error!("Application bootstrap failed: {}", failure.error);
                failure.app
            }
        }
    }
}

struct ConfigPhase;

#[async_trait]
impl Step<Architect> for ConfigPhase {
    fn name(&self) -> String {
        "config".to_string()
    }

    async fn run(
        &self,
        architect: &mut Architect,
        _queue: &mut StepQueue<Architect>,
    ) -> Result<(), ArchitectError> {
        architect.load_config().await
    }
}

struct ProviderPhase;

#[async_trait]
impl Step<Architect> for ProviderPhase {
    fn name(&self) -> String {
        "providers".to_string()
    }

    async fn run(
        &self,
        architect: &mut Architect,
        _queue: &mut StepQueue<Architect>,
    ) -> Result<(), ArchitectError> {
        architect.load_providers().await.map(|_| ())
    }
}
