//! Prometheus metrics.

use crate::config::MetricsConfig;
use crate::{Error, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

/// Handle onto the installed recorder.
#[derive(Debug, Clone)]
pub struct MetricsHandle {
    prometheus: PrometheusHandle,
}

impl MetricsHandle {
    /// Renders the current snapshot in Prometheus text format.
    #[must_use]
    pub fn render(&self) -> String {
        self.prometheus.render()
    }
}

/// Global handle for render-on-demand.
static GLOBAL_METRICS: OnceLock<MetricsHandle> = OnceLock::new();

/// Installs the Prometheus recorder as the global `metrics` recorder.
///
/// Returns `None` when metrics are disabled.
///
/// # Errors
///
/// Returns an error if another recorder is already installed.
pub fn install_prometheus(config: &MetricsConfig) -> Result<Option<MetricsHandle>> {
    if !config.enabled {
        return Ok(None);
    }

    let prometheus = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::OperationFailed {
            operation: "metrics_recorder_install".to_string(),
            cause: e.to_string(),
        })?;
    describe();

    let handle = MetricsHandle { prometheus };
    let _ = GLOBAL_METRICS.set(handle.clone());
    Ok(Some(handle))
}

/// Renders the global snapshot, if a recorder was installed.
#[must_use]
pub fn render_global() -> Option<String> {
    GLOBAL_METRICS.get().map(MetricsHandle::render)
}

fn describe() {
    metrics::describe_counter!(
        "query_dispatch_total",
        "Dispatched queries by intent and outcome"
    );
    metrics::describe_histogram!(
        "query_dispatch_duration_ms",
        metrics::Unit::Milliseconds,
        "Wall-clock dispatch time by intent"
    );
    metrics::describe_counter!(
        "intent_classification_total",
        "Classified queries by deciding tier and intent"
    );
    metrics::describe_counter!(
        "intent_llm_completed",
        "Intent service calls by status"
    );
    metrics::describe_counter!(
        "params_llm_completed",
        "Parameter service calls by status"
    );
    metrics::describe_counter!(
        "filter_operator_dropped_total",
        "Filter constraints dropped for an unrecognized operator"
    );
    metrics::describe_histogram!(
        "query_handler_time_ms",
        metrics::Unit::Milliseconds,
        "Handler timings reported to analytics, by phase"
    );
    metrics::describe_counter!("query_failed_total", "Queries marked failed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_installs_nothing() {
        let handle = install_prometheus(&MetricsConfig { enabled: false });
        assert!(matches!(handle, Ok(None)));
    }
}
