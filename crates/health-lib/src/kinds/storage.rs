use super::{typed, CheckResult, EvalContext};
use crate::models::{Health, HealthStatus, StatusCode};
use crate::resource::Resource;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;

pub fn pvc_health(resource: &Resource, _ctx: &EvalContext<'_>) -> CheckResult {
    let pvc: PersistentVolumeClaim = typed(resource)?;
    let phase = pvc.status.and_then(|s| s.phase).unwrap_or_default();

    let hs = match phase.as_str() {
        "Bound" => HealthStatus::new(Health::Healthy, StatusCode::HEALTHY).with_ready(true),
        "Pending" => HealthStatus::new(Health::Healthy, StatusCode::PROGRESSING),
        "Lost" => HealthStatus::new(Health::Unhealthy, StatusCode::DEGRADED),
        _ => HealthStatus::new(Health::Unknown, StatusCode::UNKNOWN),
    };
    Ok(Some(hs))
}
