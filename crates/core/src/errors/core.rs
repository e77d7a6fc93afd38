use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigError;

/// Error type reported by providers and continuations
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Core error type for the bootstrap pipeline
#[derive(Debug, Error)]
pub enum ArchitectError {
    #[error("Failed to load configuration fragments from '{}': {source}", path.display())]
    FragmentLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("No configuration accessor is mounted at '{path}'")]
    ConfigNotMounted { path: String },

    #[error("Provider {position} ({entry}) is not a function")]
    ProviderNotCallable { position: usize, entry: String },

    #[error("Provider {position} ({provider}) failed: {source}")]
    ProviderFailed {
        position: usize,
        provider: String,
        #[source]
        source: BoxError,
    },

    #[error("Failed to load provider '{identifier}' from '{}': {message}", root.display())]
    ProviderLoad {
        identifier: String,
        root: PathBuf,
        message: String,
    },

    #[error("Step {position} ({step}) panicked: {message}")]
    StepPanicked {
        position: usize,
        step: String,
        message: String,
    },

    #[error("Step {position} ({step}) did not complete within {timeout:?}")]
    StepTimedOut {
        position: usize,
        step: String,
        timeout: Duration,
    },

    #[error("Continuation of '{step}' was dropped without being invoked")]
    ContinuationDropped { step: String },

    #[error("Pipeline '{pipeline}' has already finished and cannot run again")]
    PipelineFinished { pipeline: String },
}

impl ArchitectError {
    /// Create a provider-not-callable error for the given 1-based position
    pub fn not_callable(position: usize, entry: impl Into<String>) -> Self {
        Self::ProviderNotCallable {
            position,
            entry: entry.into(),
        }
    }

    /// Create a provider load error
    pub fn provider_load(
        identifier: impl Into<String>,
        root: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self::ProviderLoad {
            identifier: identifier.into(),
            root: root.into(),
            message: message.into(),
        }
    }

    /// 1-based pipeline position of the step that produced this error, if any
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::ProviderNotCallable { position, .. }
            | Self::ProviderFailed { position, .. }
            | Self::StepPanicked { position, .. }
            | Self::StepTimedOut { position, .. } => Some(*position),
            _ => None,
        }
    }

    /// Check if the error came from the configuration phase
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::FragmentLoad { .. } | Self::Config(_))
    }

    /// Check if the error came from a provider
    pub fn is_provider(&self) -> bool {
        matches!(
            self,
            Self::ProviderNotCallable { .. }
                | Self::ProviderFailed { .. }
                | Self::ProviderLoad { .. }
        )
    }

    /// The error a provider reported, when this wraps one
    pub fn provider_source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::ProviderFailed { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
