//! Top-level evaluation
//!
//! [`HealthEvaluator`] resolves a resource to its built-in check, lets the
//! override port and the status maps refine weak answers, and normalizes the
//! result. It holds no mutable state and can be shared across threads.

use crate::clock::{Clock, SystemClock};
use crate::cloud::{self, scan_status_field};
use crate::config::Settings;
use crate::error::{HealthError, Result};
use crate::kinds::{self, EvalContext};
use crate::models::{Health, HealthStatus, StatusCode};
use crate::observability::EngineMetrics;
use crate::resource::{lookup_str, Resource};
use crate::status_map::{StatusMaps, CNRM_KEY, CROSSPLANE_KEY};
use crate::status_name::health_from_status_name;
use crate::util::{elide, format_duration, parse_time};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Deletions pending longer than this are reported as stalled.
pub const TERMINATING_STALLED_HOURS: i64 = 1;

/// Config-type classes evaluated as Kubernetes objects.
const KUBERNETES_CLASSES: &[&str] = &["kubernetes", "crossplane", "missioncontrol", "flux", "argo"];

const PARSE_ERROR_STATUS: &str = "HealthParseError";
const PARSE_ERROR_MESSAGE_LIMIT: usize = 500;

const LAST_APPLIED_ANNOTATION: &str = "kubectl.kubernetes.io/last-applied-configuration";

const STATUS_TIME_FIELDS: &[&[&str]] = &[
    &["lastUpdateTime"],
    &["startTime"],
    &["lastSyncTime"],
    &["reconciledAt"],
    &["startedAt"],
    &["deployedAt"],
    &["finishedAt"],
    &["lastTransitionTime"],
    &["observedAt"],
    &["operationState", "startedAt"],
    &["operationState", "finishedAt"],
];

const CONDITION_TIME_FIELDS: &[&str] = &["lastProbeTime", "lastTransitionTime", "lastUpdateTime"];

const CONTAINER_TIME_FIELDS: &[&[&str]] = &[
    &["state", "running", "startedAt"],
    &["state", "terminated", "finishedAt"],
    &["lastState", "terminated", "finishedAt"],
];

/// Caller-supplied health logic, consulted when no built-in check matched or
/// the built-in answer was ambiguous.
pub trait HealthOverride: Send + Sync {
    fn resource_health(&self, resource: &Resource) -> Result<Option<HealthStatus>>;
}

impl<F> HealthOverride for F
where
    F: Fn(&Resource) -> Result<Option<HealthStatus>> + Send + Sync,
{
    fn resource_health(&self, resource: &Resource) -> Result<Option<HealthStatus>> {
        self(resource)
    }
}

/// A verdict plus the structural error, if any, met while producing it.
#[derive(Debug)]
pub struct Assessment {
    pub health: HealthStatus,
    pub error: Option<HealthError>,
}

impl Assessment {
    fn ok(health: HealthStatus) -> Self {
        Self { health, error: None }
    }

    pub fn into_result(self) -> std::result::Result<HealthStatus, (HealthStatus, HealthError)> {
        match self.error {
            None => Ok(self.health),
            Some(error) => Err((self.health, error)),
        }
    }
}

/// Shared, immutable evaluation engine.
///
/// Reloading settings means building a new evaluator and swapping it in.
#[derive(Clone)]
pub struct HealthEvaluator {
    settings: Arc<Settings>,
    status_maps: Arc<StatusMaps>,
    clock: Arc<dyn Clock>,
    metrics: Option<EngineMetrics>,
}

impl std::fmt::Debug for HealthEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthEvaluator")
            .field("settings", &self.settings)
            .field("status_maps", &self.status_maps.len())
            .finish_non_exhaustive()
    }
}

impl HealthEvaluator {
    /// Builds an evaluator with the embedded status maps and the wall clock.
    pub fn new(settings: Settings) -> Result<Self> {
        Ok(Self {
            settings: Arc::new(settings),
            status_maps: Arc::new(StatusMaps::embedded()?),
            clock: Arc::new(SystemClock),
            metrics: None,
        })
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_status_maps(mut self, status_maps: StatusMaps) -> Self {
        self.status_maps = Arc::new(status_maps);
        self
    }

    pub fn with_metrics(mut self, metrics: EngineMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn status_maps(&self) -> &StatusMaps {
        &self.status_maps
    }

    /// Built-in registrations followed by status-map entries, as `group/kind`,
    /// `group/*` or `*/kind`.
    pub fn supported_types(&self) -> Vec<String> {
        let mut types = kinds::supported_types();
        for key in self.status_maps.keys() {
            let display = status_map_type(key);
            if !types.contains(&display) {
                types.push(display);
            }
        }
        types
    }

    /// Evaluates a Kubernetes-shaped resource.
    pub fn evaluate(
        &self,
        resource: &Resource,
        health_override: Option<&dyn HealthOverride>,
    ) -> Assessment {
        let started = Instant::now();
        let ctx = EvalContext {
            now: self.clock.now(),
            settings: &self.settings,
            status_maps: &self.status_maps,
        };

        let assessment = assess(resource, health_override, &ctx);

        if let Some(metrics) = &self.metrics {
            metrics.observe_latency(started.elapsed().as_secs_f64());
            metrics.record_verdict(assessment.health.health);
            if assessment.error.is_some() {
                metrics.inc_errors();
            }
        }
        assessment
    }

    /// Evaluates a document identified by a `::`-delimited config type.
    ///
    /// Cloud providers use their classifiers, Kubernetes-like classes go
    /// through [`HealthEvaluator::evaluate`], and anything else is classified
    /// from the first supplied state or a status-like field.
    pub fn evaluate_config_type(&self, config_type: &str, obj: &Value, states: &[&str]) -> HealthStatus {
        if let Some(hs) = cloud::cloud_health(config_type, obj, states, &self.settings, self.clock.now()) {
            return hs;
        }

        let class = config_type
            .split("::")
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        if KUBERNETES_CLASSES.contains(&class.as_str()) {
            let assessment = self.evaluate(&Resource::new(obj.clone()), None);
            return match assessment.error {
                Some(error) => {
                    HealthStatus::new(Health::Unknown, StatusCode::new(PARSE_ERROR_STATUS))
                        .with_message(elide(&error.to_string(), PARSE_ERROR_MESSAGE_LIMIT))
                }
                None => assessment.health,
            };
        }

        if let Some(state) = states.first() {
            return health_from_status_name(state, &[]);
        }
        if let Some(raw) = scan_status_field(obj) {
            return health_from_status_name(&raw, &[]);
        }
        HealthStatus::default()
    }
}

fn status_map_type(key: &str) -> String {
    match key.rsplit_once('/') {
        Some((api_version, kind)) => match api_version.split_once('/') {
            Some((group, _)) => format!("{group}/{kind}"),
            None => kind.to_string(),
        },
        None if key == CROSSPLANE_KEY || key == CNRM_KEY => format!("{key}/*"),
        None => format!("*/{key}"),
    }
}

fn needs_refinement(health: &Option<HealthStatus>) -> bool {
    match health {
        None => true,
        Some(hs) => hs.status.is_empty() || hs.status.is_ambiguous(),
    }
}

fn assess(
    resource: &Resource,
    health_override: Option<&dyn HealthOverride>,
    ctx: &EvalContext<'_>,
) -> Assessment {
    if let Some(deleted) = resource.deletion_timestamp() {
        let terminating = ctx.since(deleted);
        if terminating > Duration::hours(TERMINATING_STALLED_HOURS) {
            let mut hs = HealthStatus::new(Health::Warning, StatusCode::TERMINATING_STALLED)
                .with_message(format!(
                    "terminating for {}",
                    format_duration(Duration::hours(terminating.num_hours()))
                ));
            hs.last_updated = last_updated(resource);
            return Assessment::ok(hs);
        }
    }

    let mut error = None;
    let mut health = match kinds::lookup(resource.group(), resource.kind()) {
        Some(check) => match check(resource, ctx) {
            Ok(hs) => hs,
            Err(e) => {
                warn!(
                    kind = %resource.kind(),
                    api_version = %resource.api_version(),
                    name = %resource.name(),
                    error = %e,
                    "Built-in health check failed"
                );
                let hs = HealthStatus::unknown(e.to_string());
                if e.is_structural() {
                    error = Some(e);
                }
                Some(hs)
            }
        },
        None => {
            debug!(kind = %resource.kind(), api_version = %resource.api_version(), "No built-in health check");
            None
        }
    };

    if needs_refinement(&health) {
        if let Some(health_override) = health_override {
            debug!(kind = %resource.kind(), "Consulting health override");
            match health_override.resource_health(resource) {
                Ok(Some(hs)) => health = Some(hs),
                Ok(None) => {}
                Err(e) => {
                    let mut hs = HealthStatus::unknown(e.to_string());
                    hs.last_updated = last_updated(resource);
                    return Assessment {
                        health: hs,
                        error: Some(e),
                    };
                }
            }
        }
    }

    if needs_refinement(&health) {
        if let Some(fallback) = ctx.status_maps.evaluate(resource) {
            debug!(kind = %resource.kind(), "Applying status map");
            health = Some(match health {
                None => fallback,
                Some(hs) => refine(hs, fallback),
            });
        }
    }

    let mut hs = health
        .unwrap_or_else(|| HealthStatus::new(Health::Unknown, StatusCode::UNKNOWN).with_ready(true));
    if resource.deletion_timestamp().is_some() {
        hs.status = StatusCode::TERMINATING;
        hs.ready = false;
    }
    hs.last_updated = last_updated(resource);

    Assessment { health: hs, error }
}

/// Fills gaps in `hs` from the status-map verdict; its health is kept.
fn refine(mut hs: HealthStatus, fallback: HealthStatus) -> HealthStatus {
    if hs.status.is_empty() {
        hs.status = fallback.status;
    } else if hs.status.is_ambiguous() && !fallback.status.is_empty() && !fallback.status.is_ambiguous() {
        hs.status = fallback.status;
    }
    if hs.message.is_empty() {
        hs.message = fallback.message;
    }
    hs
}

/// Most recent timestamp found in metadata, status, conditions and
/// container states.
pub fn last_updated(resource: &Resource) -> Option<DateTime<Utc>> {
    let object = resource.object();
    let mut times: Vec<DateTime<Utc>> = Vec::new();

    times.extend(resource.creation_timestamp());
    times.extend(resource.deletion_timestamp());
    times.extend(resource.annotation(LAST_APPLIED_ANNOTATION).and_then(parse_time));

    if let Some(fields) = resource.get(&["metadata", "managedFields"]).and_then(Value::as_array) {
        times.extend(
            fields
                .iter()
                .filter(|f| lookup_str(f, &["operation"]) == Some("Update"))
                .filter_map(|f| lookup_str(f, &["time"]).and_then(parse_time)),
        );
    }

    if let Some(status) = object.get("status") {
        times.extend(
            STATUS_TIME_FIELDS
                .iter()
                .filter_map(|path| lookup_str(status, path).and_then(parse_time)),
        );

        if let Some(conditions) = status.get("conditions").and_then(Value::as_array) {
            for condition in conditions {
                times.extend(
                    CONDITION_TIME_FIELDS
                        .iter()
                        .filter_map(|k| lookup_str(condition, &[*k]).and_then(parse_time)),
                );
            }
        }

        if let Some(containers) = status.get("containerStatuses").and_then(Value::as_array) {
            for container in containers {
                times.extend(
                    CONTAINER_TIME_FIELDS
                        .iter()
                        .filter_map(|path| lookup_str(container, path).and_then(parse_time)),
                );
            }
        }
    }

    times.into_iter().max()
}
