//! Argo Workflows and Argo CD Applications
//!
//! Both are read untyped so any API version is accepted.

use super::{CheckResult, EvalContext};
use crate::models::{Health, HealthStatus, StatusCode};
use crate::resource::Resource;

pub fn workflow_health(resource: &Resource, _ctx: &EvalContext<'_>) -> CheckResult {
    let phase = resource.get_str(&["status", "phase"]).unwrap_or_default();
    let message = resource.get_str(&["status", "message"]).unwrap_or_default();

    let hs = match phase {
        "" | "Pending" => HealthStatus::new(Health::Unknown, StatusCode::PROGRESSING),
        "Running" => HealthStatus::new(Health::Unknown, StatusCode::PROGRESSING).with_ready(true),
        "Succeeded" => HealthStatus::new(Health::Healthy, StatusCode::HEALTHY).with_ready(true),
        "Failed" | "Error" => HealthStatus::new(Health::Unhealthy, StatusCode::DEGRADED),
        _ => HealthStatus::new(Health::Unknown, StatusCode::UNKNOWN),
    };
    Ok(Some(hs.with_message(message)))
}

/// Argo CD already computes a verdict; it is carried over as is and the sync
/// state decides readiness.
pub fn application_health(resource: &Resource, _ctx: &EvalContext<'_>) -> CheckResult {
    let reported = resource.get_str(&["status", "health", "status"]).unwrap_or_default();
    let message = resource.get_str(&["status", "health", "message"]).unwrap_or_default();
    let synced = resource.get_str(&["status", "sync", "status"]) == Some("Synced");

    let (health, status) = match reported {
        "Healthy" => (Health::Healthy, StatusCode::HEALTHY),
        "Degraded" => (Health::Unhealthy, StatusCode::DEGRADED),
        "Progressing" => (Health::Unknown, StatusCode::PROGRESSING),
        "Suspended" => (Health::Unknown, StatusCode::SUSPENDED),
        "Missing" => (Health::Unknown, StatusCode::MISSING),
        _ => (Health::Unknown, StatusCode::UNKNOWN),
    };
    Ok(Some(
        HealthStatus::new(health, status)
            .with_ready(synced)
            .with_message(message),
    ))
}
