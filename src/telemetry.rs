//! Tracing setup and request correlation.
//!
//! The subscriber is installed once at startup with the format and filter
//! taken from configuration. Request handling can run inside a task-local
//! correlation scope; [`crate::error::ApiError`] reads the scoped trace ID
//! when building a response.

use std::sync::OnceLock;

use thiserror::Error;
use tokio::task_local;
use tracing_log::LogTracer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::{SubscriberInitExt, TryInitError},
};

use crate::config::AppConfig;

task_local! {
    static TRACE_ID: String;
}

#[derive(Debug, Error)]
pub enum TelemetryInitError {
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] TryInitError),
}

static INSTALLED: OnceLock<()> = OnceLock::new();

/// Installs the global tracing subscriber. Later calls are no-ops.
///
/// `RUST_LOG` overrides the configured log level; the output format is
/// `json` unless the configuration asks for `pretty`.
pub fn init_tracing(config: &AppConfig) -> Result<(), TelemetryInitError> {
    if INSTALLED.set(()).is_err() {
        return Ok(());
    }

    // Route legacy `log` macros through tracing. A logger installed earlier
    // (test harnesses do this) keeps its sink.
    let _ = LogTracer::builder()
        .with_max_level(log::LevelFilter::Trace)
        .init();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let output = if config.log_format == "pretty" {
        fmt::layer().pretty().boxed()
    } else {
        fmt::layer().json().boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .try_init()?;

    Ok(())
}

/// Runs `future` with `trace_id` attached to the current task.
pub async fn with_trace_id<Fut, R>(trace_id: String, future: Fut) -> R
where
    Fut: Future<Output = R>,
{
    TRACE_ID.scope(trace_id, future).await
}

/// The trace ID attached to the running task, if any.
pub fn current_trace_id() -> Option<String> {
    TRACE_ID.try_with(|id| id.clone()).ok()
}
