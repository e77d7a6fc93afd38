use tracing::Subscriber;
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::errors::BoxError;

/// Install a plain text subscriber for bootstrap logs.
///
/// `RUST_LOG` wins over `default_level`. Fails if a global subscriber is
/// already installed.
pub fn init_tracing(default_level: &str) -> Result<(), BoxError> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;

    subscriber(filter).try_init()?;
    Ok(())
}

fn subscriber(filter: EnvFilter) -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::registry()
        .with(filter)
        .with(Layer::new().with_target(false))
}
