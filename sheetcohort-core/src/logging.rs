//! Tracing subscriber setup shared by the binaries

use crate::error::{CohortError, Result};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install a stderr fmt subscriber filtered at `level`.
///
/// Accepts tracing directives (`debug`, `sheetcohort_core=trace`) as well as
/// the usual upper-case names. An invalid filter falls back to `info`.
pub fn init_logging(level: &str) -> Result<()> {
    let normalised = match level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" | "WARN" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        "TRACE" => "trace".to_string(),
        _ => level.to_string(),
    };

    let filter = EnvFilter::try_new(&normalised).unwrap_or_else(|_| EnvFilter::new("info"));
    let layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|e| CohortError::Config(format!("logging already initialised: {}", e)))
}
