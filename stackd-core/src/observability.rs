//! Observability infrastructure: tracing initialization.
//!
//! Structured logging goes through `tracing`; counters on hot failure paths
//! use the `metrics` facade. Exporter wiring (Prometheus, OTLP) is left to
//! the embedding application.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// Must be called once at application startup before any other operations.
///
/// # Panics
/// Panics if called more than once.
pub fn init() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_target(true).with_level(true))
        .init();

    tracing::info!("Observability initialized");
}
