//! # Nitro Telemetry
//!
//! Structured logging for Nitro services, built on `tracing-subscriber`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use nitro_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_telemetry(TelemetryConfig::from_env())?;
//!     tracing::info!("ready");
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `NITRO_SERVICE_NAME` | `nitro` | Service name attached to the startup event |
//! | `NITRO_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `NITRO_JSON_LOGS` | `false` | JSON formatted output |
//! | `NITRO_CONSOLE_OUTPUT` | `true` | Write logs to stdout at all |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::init_logging;

use thiserror::Error;

/// Telemetry initialization errors.
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The log filter directive did not parse.
    #[error("Invalid log filter: {0}")]
    Filter(String),

    /// A global subscriber is already installed.
    #[error("Failed to install subscriber: {0}")]
    SubscriberInit(String),
}

/// Install the global tracing subscriber described by `config`.
///
/// Fails if a subscriber is already installed; call once from `main`.
pub fn init_telemetry(config: TelemetryConfig) -> Result<(), TelemetryError> {
    init_logging(&config)?;
    tracing::info!(
        service = %config.service_name,
        level = %config.log_level,
        json = config.json_logs,
        "Telemetry initialized"
    );
    Ok(())
}

/// Convenience macro for creating a span with component context.
///
/// ```rust,ignore
/// let _span = component_span!("serve", component = "server", address = %addr).entered();
/// ```
#[macro_export]
macro_rules! component_span {
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}
