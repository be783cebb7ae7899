//! Built-in health checks for well-known kinds
//!
//! Checks are registered in [`REGISTRY`] by API group and kind. A check
//! returns `Ok(None)` when it has nothing to say about a resource, leaving the
//! verdict to the override port and the generic condition evaluator.

pub mod argo;
pub mod batch;
pub mod cert_manager;
pub mod flanksource;
pub mod flux;
pub mod hpa;
pub mod namespace;
pub mod network;
pub mod node;
pub mod pod;
pub mod replicas;
pub mod storage;
pub mod workloads;

use crate::config::Settings;
use crate::error::{HealthError, Result};
use crate::models::HealthStatus;
use crate::resource::Resource;
use crate::status_map::StatusMaps;
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;

/// Everything a check may consult besides the resource itself.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    /// Evaluation instant, read once per call
    pub now: DateTime<Utc>,
    pub settings: &'a Settings,
    pub status_maps: &'a StatusMaps,
}

impl EvalContext<'_> {
    /// Time elapsed since `at`; negative for future instants.
    pub fn since(&self, at: DateTime<Utc>) -> Duration {
        self.now - at
    }

    /// Age of the resource, `None` without a creation timestamp.
    pub fn age(&self, resource: &Resource) -> Option<Duration> {
        resource.creation_timestamp().map(|created| self.since(created))
    }
}

pub type CheckResult = Result<Option<HealthStatus>>;

/// A built-in health check
pub type HealthCheck = fn(&Resource, &EvalContext<'_>) -> CheckResult;

/// What a registration matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    /// One kind within one API group (`""` is the core group)
    GroupKind(&'static str, &'static str),
    /// Every kind of an API group
    Group(&'static str),
    /// A kind in any API group
    Kind(&'static str),
}

impl Matcher {
    fn matches(&self, group: &str, kind: &str) -> bool {
        match *self {
            Matcher::GroupKind(g, k) => g == group && k == kind,
            Matcher::Group(g) => g == group,
            Matcher::Kind(k) => k == kind,
        }
    }
}

impl std::fmt::Display for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Matcher::GroupKind("", kind) => write!(f, "{kind}"),
            Matcher::GroupKind(group, kind) => write!(f, "{group}/{kind}"),
            Matcher::Group(group) => write!(f, "{group}/*"),
            Matcher::Kind(kind) => write!(f, "*/{kind}"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Registration {
    pub matcher: Matcher,
    pub check: HealthCheck,
}

const fn register(matcher: Matcher, check: HealthCheck) -> Registration {
    Registration { matcher, check }
}

/// Ordered registrations; the first match wins, so specific kinds precede
/// group-wide entries.
pub const REGISTRY: &[Registration] = &[
    register(Matcher::Kind("Node"), node::node_health),
    register(Matcher::GroupKind("", "Pod"), pod::pod_health),
    register(Matcher::GroupKind("", "Service"), network::service_health),
    register(Matcher::GroupKind("", "PersistentVolumeClaim"), storage::pvc_health),
    register(Matcher::GroupKind("", "Namespace"), namespace::namespace_health),
    register(Matcher::GroupKind("apps", "Deployment"), workloads::deployment_health),
    register(Matcher::GroupKind("apps", "ReplicaSet"), workloads::replica_set_health),
    register(Matcher::GroupKind("apps", "StatefulSet"), workloads::stateful_set_health),
    register(Matcher::GroupKind("apps", "DaemonSet"), workloads::daemon_set_health),
    register(Matcher::GroupKind("batch", "Job"), batch::job_health),
    register(Matcher::GroupKind("batch", "CronJob"), batch::cron_job_health),
    register(Matcher::GroupKind("extensions", "Ingress"), network::ingress_health),
    register(Matcher::GroupKind("networking.k8s.io", "Ingress"), network::ingress_health),
    register(
        Matcher::GroupKind("autoscaling", "HorizontalPodAutoscaler"),
        hpa::hpa_health,
    ),
    register(
        Matcher::GroupKind("cert-manager.io", "CertificateRequest"),
        cert_manager::certificate_request_health,
    ),
    register(Matcher::Group("cert-manager.io"), cert_manager::certificate_health),
    register(Matcher::Group("kustomize.toolkit.fluxcd.io"), flux::flux_health),
    register(Matcher::Group("helm.toolkit.fluxcd.io"), flux::flux_health),
    register(Matcher::Group("source.toolkit.fluxcd.io"), flux::flux_health),
    register(Matcher::GroupKind("argoproj.io", "Workflow"), argo::workflow_health),
    register(Matcher::GroupKind("argoproj.io", "Application"), argo::application_health),
    register(
        Matcher::GroupKind("canaries.flanksource.com", "Canary"),
        flanksource::canary_health,
    ),
    register(
        Matcher::GroupKind("mission-control.flanksource.com", "Notification"),
        flanksource::notification_health,
    ),
];

/// Built-in check for a group and kind.
pub fn lookup(group: &str, kind: &str) -> Option<HealthCheck> {
    REGISTRY
        .iter()
        .find(|r| r.matcher.matches(group, kind))
        .map(|r| r.check)
}

/// Display names of every registration, in lookup order.
pub fn supported_types() -> Vec<String> {
    REGISTRY.iter().map(|r| r.matcher.to_string()).collect()
}

/// Projects a resource onto a typed API object after checking its apiVersion.
///
/// A foreign apiVersion is reported as [`HealthError::Unsupported`]; a
/// document that does not fit the typed shape as [`HealthError::Conversion`].
pub(crate) fn typed<T>(resource: &Resource) -> Result<T>
where
    T: k8s_openapi::Resource + DeserializeOwned,
{
    if resource.api_version() != T::API_VERSION {
        return Err(HealthError::unsupported(resource.kind(), resource.api_version()));
    }
    resource.typed()
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::util::parse_time;
    use std::sync::OnceLock;

    pub const NOW: &str = "2024-06-01T12:00:00Z";

    pub fn now() -> DateTime<Utc> {
        parse_time(NOW).unwrap()
    }

    pub fn settings() -> &'static Settings {
        static SETTINGS: OnceLock<Settings> = OnceLock::new();
        SETTINGS.get_or_init(Settings::default)
    }

    pub fn status_maps() -> &'static StatusMaps {
        static MAPS: OnceLock<StatusMaps> = OnceLock::new();
        MAPS.get_or_init(|| StatusMaps::embedded().unwrap())
    }

    pub fn ctx() -> EvalContext<'static> {
        EvalContext {
            now: now(),
            settings: settings(),
            status_maps: status_maps(),
        }
    }

    /// `now` shifted by `minutes`, formatted as RFC3339.
    pub fn minutes_ago(minutes: i64) -> String {
        (now() - Duration::minutes(minutes)).to_rfc3339()
    }
}
