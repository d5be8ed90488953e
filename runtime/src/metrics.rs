//! Prometheus metrics for observability and monitoring.
//!
//! Stores record through the `metrics` facade, so nothing is collected until
//! a recorder is installed. This module describes the metric set and installs
//! a Prometheus recorder:
//! - Dispatch counts and reducer latency
//! - Effect launches, skips, cancellations and failures
//! - Composite state expansions
//!
//! # Example
//!
//! ```rust,no_run
//! use statefx_runtime::metrics::install_prometheus_recorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! if let Some(handle) = install_prometheus_recorder()? {
//!     println!("{}", handle.render());
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, histogram};

/// Total actions entering `dispatch`
pub const DISPATCH_TOTAL: &str = "statefx.dispatch.total";
/// Dispatches whose reducer failed
pub const DISPATCH_FAILED: &str = "statefx.dispatch.failed";
/// Time spent inside reducers
pub const REDUCER_DURATION: &str = "statefx.reducer.duration_seconds";
/// Executions spawned
pub const EFFECTS_LAUNCHED: &str = "statefx.effects.launched";
/// Executions skipped because their id was already running
pub const EFFECTS_SKIPPED: &str = "statefx.effects.skipped";
/// Running executions cancelled by id
pub const EFFECTS_CANCELLED: &str = "statefx.effects.cancelled";
/// Executions that returned an error or panicked
pub const EFFECTS_FAILED: &str = "statefx.effects.failed";
/// Composite state expansions
pub const EXPANSIONS_TOTAL: &str = "statefx.expansions.total";

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Describe every statefx metric and install a Prometheus recorder.
///
/// Returns the handle used to render the text exposition, or `None` when a
/// recorder was already installed in this process (common in tests). Metrics
/// keep flowing to whichever recorder won.
///
/// # Errors
///
/// Returns [`MetricsError::Build`] if the exporter cannot be configured and
/// [`MetricsError::Install`] for any other installation failure.
pub fn install_prometheus_recorder() -> Result<Option<PrometheusHandle>, MetricsError> {
    describe_metrics();

    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[
                0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0,
            ],
        )
        .map_err(|e| MetricsError::Build(e.to_string()))?;

    match builder.install_recorder() {
        Ok(handle) => {
            tracing::info!("Prometheus recorder installed");
            Ok(Some(handle))
        },
        Err(e) => {
            let err_msg = e.to_string();
            if err_msg.contains("already initialized") {
                tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                Ok(None)
            } else {
                Err(MetricsError::Install(err_msg))
            }
        },
    }
}

/// Register descriptions for all statefx metrics with the current recorder.
pub fn describe_metrics() {
    describe_counter!(DISPATCH_TOTAL, "Total number of actions dispatched into stores");
    describe_counter!(DISPATCH_FAILED, "Total number of dispatches rejected by a reducer");
    describe_histogram!(REDUCER_DURATION, "Time taken to run a reducer");
    describe_counter!(EFFECTS_LAUNCHED, "Total number of effect executions spawned");
    describe_counter!(
        EFFECTS_SKIPPED,
        "Total number of executions skipped because their id was already running"
    );
    describe_counter!(EFFECTS_CANCELLED, "Total number of running executions cancelled");
    describe_counter!(EFFECTS_FAILED, "Total number of executions that failed or panicked");
    describe_counter!(EXPANSIONS_TOTAL, "Total number of composite state expansions");
}

/// Dispatch metrics recorder.
pub struct DispatchMetrics;

impl DispatchMetrics {
    /// Record a reduced action.
    pub fn record_reduce(duration: Duration) {
        counter!(DISPATCH_TOTAL).increment(1);
        histogram!(REDUCER_DURATION).record(duration.as_secs_f64());
    }

    /// Record an action forwarded by a composite store.
    pub fn record_forward() {
        counter!(DISPATCH_TOTAL).increment(1);
    }

    /// Record a reducer failure.
    pub fn record_failure() {
        counter!(DISPATCH_FAILED).increment(1);
    }
}

/// Effect metrics recorder.
pub struct EffectMetrics;

impl EffectMetrics {
    /// Record a spawned execution.
    pub fn record_launch() {
        counter!(EFFECTS_LAUNCHED).increment(1);
    }

    /// Record an execution skipped as a duplicate.
    pub fn record_skip() {
        counter!(EFFECTS_SKIPPED).increment(1);
    }

    /// Record a cancelled execution.
    pub fn record_cancel() {
        counter!(EFFECTS_CANCELLED).increment(1);
    }

    /// Record a failed execution.
    pub fn record_failure() {
        counter!(EFFECTS_FAILED).increment(1);
    }
}

/// Composite store metrics recorder.
pub struct ExpansionMetrics;

impl ExpansionMetrics {
    /// Record a state expansion.
    pub fn record_expansion() {
        counter!(EXPANSIONS_TOTAL).increment(1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_install_recorder() {
        let result = install_prometheus_recorder();
        assert!(result.is_ok());
        // Note: handle might be None if another test already installed the recorder
    }

    #[tokio::test]
    async fn test_store_metrics_render() {
        let handle = install_prometheus_recorder().unwrap();

        DispatchMetrics::record_reduce(Duration::from_micros(40));
        DispatchMetrics::record_failure();
        EffectMetrics::record_launch();
        EffectMetrics::record_skip();
        EffectMetrics::record_cancel();
        EffectMetrics::record_failure();
        ExpansionMetrics::record_expansion();

        // If this test runs after another test installed the recorder,
        // the handle is None. Metrics are still recorded globally.
        if let Some(handle) = handle {
            let rendered = handle.render();
            assert!(rendered.contains("statefx_dispatch_total"));
            assert!(rendered.contains("statefx_effects_skipped"));
            assert!(rendered.contains("statefx_expansions_total"));
        }
    }
}
