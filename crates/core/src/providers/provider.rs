use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::errors::{ArchitectError, BoxError};
use crate::foundation::App;
use crate::pipeline::{CompletionError, Next};

/// Future returned by closure providers
pub type ProviderFuture<'a> = BoxFuture<'a, Result<(), BoxError>>;

/// An initialization step run against the application.
///
/// Completing the returned future is the provider's continuation: `Ok(())`
/// advances the pipeline, `Err` stops it. Providers queue further providers
/// with [`App::register_provider`].
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name for logs and errors
    fn name(&self) -> &str {
        "anonymous"
    }

    async fn provide(&self, app: &mut App) -> Result<(), BoxError>;
}

/// Provider backed by an async closure
pub struct FnProvider<F> {
    name: String,
    f: F,
}

/// Create a provider from a closure returning a boxed future
///
/// ```
/// use architect_core::providers::from_fn;
///
/// let provider = from_fn("cache", |app| {
///     Box::pin(async move {
///         app.set("cache.ready", true);
///         Ok(())
///     })
/// });
/// # let _ = provider;
/// ```
pub fn from_fn<F>(name: impl Into<String>, f: F) -> FnProvider<F>
where
    F: for<'a> Fn(&'a mut App) -> ProviderFuture<'a> + Send + Sync,
{
    FnProvider {
        name: name.into(),
        f,
    }
}

#[async_trait]
impl<F> Provider for FnProvider<F>
where
    F: for<'a> Fn(&'a mut App) -> ProviderFuture<'a> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn provide(&self, app: &mut App) -> Result<(), BoxError> {
        (self.f)(app).await
    }
}

/// Provider backed by a synchronous closure
pub struct SyncFnProvider<F> {
    name: String,
    f: F,
}

pub fn from_sync_fn<F>(name: impl Into<String>, f: F) -> SyncFnProvider<F>
where
    F: Fn(&mut App) -> Result<(), BoxError> + Send + Sync,
{
    SyncFnProvider {
        name: name.into(),
        f,
    }
}

#[async_trait]
impl<F> Provider for SyncFnProvider<F>
where
    F: Fn(&mut App) -> Result<(), BoxError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn provide(&self, app: &mut App) -> Result<(), BoxError> {
        (self.f)(app)
    }
}

/// Provider with an explicit continuation.
///
/// The closure gets the application and a [`Next`]; it may invoke `Next`
/// before returning or hand it to a spawned task. A dropped `Next` fails the
/// provider.
pub struct CallbackProvider<F> {
    name: String,
    f: F,
}

pub fn from_callback<F>(name: impl Into<String>, f: F) -> CallbackProvider<F>
where
    F: Fn(&mut App, Next) + Send + Sync,
{
    CallbackProvider {
        name: name.into(),
        f,
    }
}

#[async_trait]
impl<F> Provider for CallbackProvider<F>
where
    F: Fn(&mut App, Next) + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn provide(&self, app: &mut App) -> Result<(), BoxError> {
        let (next, completion) = Next::channel();
        (self.f)(app, next);

        match completion.wait().await {
            Ok(()) => Ok(()),
            Err(CompletionError::Failed(error)) => Err(error),
            Err(CompletionError::Dropped) => {
                tracing::warn!("Provider '{}' dropped its continuation", self.name);
                Err(Box::new(ArchitectError::ContinuationDropped {
                    step: self.name.clone(),
                }))
            }
        }
    }
}

/// A queued provider: either ready to run or still to be resolved
#[derive(Clone)]
pub enum ProviderEntry {
    Provider(Arc<dyn Provider>),
    Identifier(String),
    /// A discovered value that can never resolve to a provider
    Unresolvable(Value),
}

impl ProviderEntry {
    pub fn provider<P: Provider + 'static>(provider: P) -> Self {
        Self::Provider(Arc::new(provider))
    }

    /// Interpret one element of a configuration-discovered provider list
    pub fn from_config_value(value: Value) -> Self {
        match value {
            Value::String(identifier) => Self::Identifier(identifier),
            other => Self::Unresolvable(other),
        }
    }

    /// Human readable label used in logs and errors
    pub fn describe(&self) -> String {
        match self {
            Self::Provider(provider) => provider.name().to_string(),
            Self::Identifier(identifier) => identifier.clone(),
            Self::Unresolvable(value) => value.to_string(),
        }
    }
}

impl fmt::Debug for ProviderEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provider(provider) => f.debug_tuple("Provider").field(&provider.name()).finish(),
            Self::Identifier(identifier) => f.debug_tuple("Identifier").field(identifier).finish(),
            Self::Unresolvable(value) => f.debug_tuple("Unresolvable").field(value).finish(),
        }
    }
}

impl From<&str> for ProviderEntry {
    fn from(identifier: &str) -> Self {
        Self::Identifier(identifier.to_string())
    }
}

impl From<String> for ProviderEntry {
    fn from(identifier: String) -> Self {
        Self::Identifier(identifier)
    }
}

impl From<Arc<dyn Provider>> for ProviderEntry {
    fn from(provider: Arc<dyn Provider>) -> Self {
        Self::Provider(provider)
    }
}
