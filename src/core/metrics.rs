use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled || PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    describe();
    Ok(())
}

fn describe() {
    metrics::describe_counter!("attempts_started_total", "Attempts opened by test-takers");
    metrics::describe_counter!(
        "attempts_finalized_total",
        "Attempts moved to a terminal state, labelled by completion reason"
    );
    metrics::describe_counter!("answers_recorded_total", "Graded answers, labelled by correctness");
    metrics::describe_counter!(
        "expired_attempts_closed_total",
        "Attempts closed by the deadline sweeper"
    );
    metrics::describe_counter!(
        "expired_attempts_failed_total",
        "Overdue attempts the sweeper could not close; retried on the next tick"
    );
    metrics::describe_counter!("http_requests_total", "HTTP responses by status");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        metrics::Unit::Seconds,
        "HTTP request latency"
    );
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}
