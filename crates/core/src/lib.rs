//! Application bootstrap: layered configuration followed by an ordered,
//! short-circuiting pipeline of async providers.

pub mod bootstrap;
pub mod config;
pub mod errors;
pub mod foundation;
pub mod logging;
pub mod pipeline;
pub mod providers;

// Re-export key types for convenience
pub use bootstrap::{Architect, ArchitectFactory, BootstrapFailure, Initial};
pub use config::{
    ConfigError, ConfigFragment, ConfigMerger, ConfigPath, ConfigResolver, FactoryConfig,
    FragmentSource,
};
pub use errors::{ArchitectError, BoxError};
pub use foundation::{App, LifecycleState};
pub use pipeline::{Next, PipelineRunner, PipelineState, Step, StepQueue};
pub use providers::{
    from_callback, from_fn, from_sync_fn, ModuleLoader, Provider, ProviderEntry,
    ProviderPipeline, ProviderPipelineStats, ProviderSource,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get crate version
pub fn version() -> &'static str {
    VERSION
}
