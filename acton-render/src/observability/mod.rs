//! Logging setup
//!
//! The renderer logs through `tracing`: set compilation at `debug`, template
//! path changes at `info`, per-request failures at `error`. Applications that
//! do not install their own subscriber can call [`init`].

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a global `tracing` subscriber with default settings
///
/// Pretty output in debug builds, JSON in release builds. `RUST_LOG` takes
/// precedence over the built-in filter.
///
/// # Example
///
/// ```rust,no_run
/// use acton_render::observability;
///
/// # fn main() -> anyhow::Result<()> {
/// observability::init()?;
/// tracing::info!("Application started");
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init() -> anyhow::Result<()> {
    init_with(&ObservabilityConfig::default())
}

/// Install a global `tracing` subscriber from `config`
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_with(config: &ObservabilityConfig) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

    if config.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()?;
    }

    tracing::debug!(service = %config.service_name, "logging initialized");
    Ok(())
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Service name attached to the startup event
    pub service_name: String,

    /// Filter directives used when `RUST_LOG` is unset
    pub filter: String,

    /// Emit JSON lines instead of pretty output
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let (filter, json) = if cfg!(debug_assertions) {
            ("debug,acton_render=trace", false)
        } else {
            ("info", true)
        };
        Self {
            service_name: "acton-render".to_string(),
            filter: filter.to_string(),
            json,
        }
    }
}

impl ObservabilityConfig {
    /// Create a config for `service_name` with build-dependent defaults
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            ..Default::default()
        }
    }

    /// Replace the default filter directives
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Switch JSON output on or off
    #[must_use]
    pub const fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }
}
