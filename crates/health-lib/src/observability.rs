//! Observability infrastructure for the health engine
//!
//! Provides:
//! - Prometheus metrics (verdicts by health, evaluation errors, evaluation latency)
//! - Structured JSON logging with tracing

use crate::models::{Health, HealthStatus};
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram,
    IntCounter, IntCounterVec, TextEncoder,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for evaluation latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.00001, 0.00005, 0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.05,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<EngineMetricsInner> = OnceLock::new();

struct EngineMetricsInner {
    evaluations_total: IntCounterVec,
    evaluation_errors_total: IntCounter,
    evaluation_latency_seconds: Histogram,
}

impl EngineMetricsInner {
    fn new() -> Self {
        Self {
            evaluations_total: register_int_counter_vec!(
                "health_evaluations_total",
                "Health verdicts produced, by health",
                &["health"]
            )
            .expect("Failed to register health_evaluations_total"),

            evaluation_errors_total: register_int_counter!(
                "health_evaluation_errors_total",
                "Evaluations that returned an error next to their verdict"
            )
            .expect("Failed to register health_evaluation_errors_total"),

            evaluation_latency_seconds: register_histogram!(
                "health_evaluation_latency_seconds",
                "Time spent evaluating a single resource",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register health_evaluation_latency_seconds"),
        }
    }
}

/// Engine metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct EngineMetrics {
    _private: (),
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EngineMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineMetrics").finish_non_exhaustive()
    }
}

impl EngineMetrics {
    /// Create a new metrics handle (registers the global metrics on first call)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &EngineMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    /// Count a verdict
    pub fn record_verdict(&self, health: Health) {
        self.inner()
            .evaluations_total
            .with_label_values(&[health.as_str()])
            .inc();
    }

    pub fn inc_errors(&self) {
        self.inner().evaluation_errors_total.inc();
    }

    pub fn observe_latency(&self, duration_secs: f64) {
        self.inner().evaluation_latency_seconds.observe(duration_secs);
    }

    /// Verdicts counted so far for `health`
    pub fn verdicts(&self, health: Health) -> u64 {
        self.inner()
            .evaluations_total
            .with_label_values(&[health.as_str()])
            .get()
    }

    /// Renders the default registry in the Prometheus text format.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
            warn!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

/// Structured logger for evaluation events
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    source: String,
}

impl StructuredLogger {
    /// `source` names the caller, e.g. `"cli"`
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn log_evaluation(&self, kind: &str, name: &str, namespace: &str, verdict: &HealthStatus) {
        info!(
            event = "health_evaluated",
            source = %self.source,
            kind = %kind,
            name = %name,
            namespace = %namespace,
            health = %verdict.health,
            status = %verdict.status,
            ready = verdict.ready,
            "Evaluated resource health"
        );
    }

    pub fn log_error(&self, kind: &str, name: &str, error: &dyn std::error::Error) {
        warn!(
            event = "health_evaluation_failed",
            source = %self.source,
            kind = %kind,
            name = %name,
            error = %error,
            "Health evaluation returned an error"
        );
    }

    pub fn log_startup(&self, version: &str, status_maps: usize) {
        info!(
            event = "engine_started",
            source = %self.source,
            version = %version,
            status_maps = status_maps,
            "Health engine ready"
        );
    }
}
