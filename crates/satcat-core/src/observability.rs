//! Observability infrastructure for satcat.
//!
//! Structured logging with consistent spans across the catalog and the
//! HTTP layer.

use std::sync::Once;
use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// Call once at application startup. Safe to call multiple times;
/// subsequent calls are no-ops.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Controls log levels (e.g., `info`, `satcat_catalog=debug`)
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let result = match format {
            LogFormat::Json => tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .try_init(),
            LogFormat::Pretty => tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .try_init(),
        };
        // A test harness may already own the global subscriber.
        let _ = result;
    });
}

/// Creates a span for catalog operations with standard fields.
///
/// ```rust
/// use satcat_core::observability::catalog_span;
///
/// let span = catalog_span("update_component");
/// let _guard = span.enter();
/// ```
#[must_use]
pub fn catalog_span(operation: &str) -> Span {
    tracing::info_span!("catalog", op = operation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_succeeds() {
        init_logging(LogFormat::Pretty);
        init_logging(LogFormat::Json);
    }

    #[test]
    fn test_span_helper_creates_span() {
        let span = catalog_span("test_operation");
        let _guard = span.enter();
        tracing::info!("test message in span");
    }
}
