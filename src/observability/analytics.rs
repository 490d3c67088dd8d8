//! Analytics collaborator.

use crate::models::Timings;

/// Receives per-query performance reports and failure marks.
///
/// Called by the dispatcher only for queries that carry a `query_id`.
pub trait Analytics: Send + Sync {
    /// Records handler timings for `query_id`.
    fn log_performance(&self, query_id: &str, timings: &Timings);

    /// Marks `query_id` as failed.
    fn mark_failed(&self, query_id: &str);
}

/// [`Analytics`] backed by the `metrics` facade and structured logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsAnalytics;

impl MetricsAnalytics {
    /// Creates the reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Analytics for MetricsAnalytics {
    fn log_performance(&self, query_id: &str, timings: &Timings) {
        if let Some(ms) = timings.embedding_time_ms {
            metrics::histogram!("query_handler_time_ms", "phase" => "embedding").record(ms);
        }
        if let Some(ms) = timings.search_time_ms {
            metrics::histogram!("query_handler_time_ms", "phase" => "search").record(ms);
        }
        metrics::histogram!("query_handler_time_ms", "phase" => "total")
            .record(timings.total_time_ms);

        tracing::debug!(
            query_id,
            embedding_time_ms = ?timings.embedding_time_ms,
            search_time_ms = ?timings.search_time_ms,
            total_time_ms = timings.total_time_ms,
            "Query performance"
        );
    }

    fn mark_failed(&self, query_id: &str) {
        metrics::counter!("query_failed_total").increment(1);
        tracing::info!(query_id, "Query marked failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_without_recorder() {
        let analytics = MetricsAnalytics::new();
        analytics.log_performance(
            "q-1",
            &Timings {
                embedding_time_ms: Some(1.5),
                search_time_ms: None,
                total_time_ms: 3.0,
            },
        );
        analytics.mark_failed("q-1");
    }
}
