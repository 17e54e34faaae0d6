//! Global tracing subscriber setup.

use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

use crate::event_layer::{DiscussionEvent, DiscussionEventLayer};

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "warn,duet=info";

/// Which outputs the global subscriber writes to.
#[derive(Debug, Default)]
pub struct TracingConfig {
    /// Human-readable log lines on stderr.
    pub stderr: bool,
    /// Structured events for a front-end.
    pub events: Option<mpsc::UnboundedSender<DiscussionEvent>>,
}

impl TracingConfig {
    pub fn stderr() -> Self {
        Self {
            stderr: true,
            events: None,
        }
    }
}

/// Builds the filter from `RUST_LOG`, falling back to [`DEFAULT_FILTER`].
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(config: TracingConfig) -> Result<(), TryInitError> {
    let fmt_layer = config.stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
    });
    let event_layer = config.events.map(DiscussionEventLayer::new);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt_layer)
        .with(event_layer)
        .try_init()
}
