use super::{typed, CheckResult, EvalContext};
use crate::models::{Health, HealthStatus, StatusCode};
use crate::resource::Resource;
use k8s_openapi::api::core::v1::Namespace;

/// An active namespace is fine but says nothing about its contents, so its
/// health stays `Unknown`.
pub fn namespace_health(resource: &Resource, _ctx: &EvalContext<'_>) -> CheckResult {
    let namespace: Namespace = typed(resource)?;
    let active = namespace
        .status
        .and_then(|s| s.phase)
        .is_some_and(|phase| phase == "Active");

    let hs = if active {
        HealthStatus::new(Health::Unknown, StatusCode::HEALTHY).with_ready(true)
    } else {
        HealthStatus::new(Health::Unknown, StatusCode::TERMINATING)
    };
    Ok(Some(hs))
}
