//! Tracing subscriber setup for hosts embedding the engine.
//!
//! The filter comes from `RUST_LOG`, defaulting to `info`. Call once at
//! startup; a second call reports a `Configuration` error instead of
//! replacing the global subscriber.

use serde::{Deserialize, Serialize};
use shield_types::{Result, ShieldError};
use tracing_subscriber::EnvFilter;

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Install the global `tracing` subscriber.
///
/// # Errors
/// `Configuration` if a global subscriber is already installed.
pub fn init_tracing(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| ShieldError::Configuration(format!("tracing init failed: {e}")))
}
