//! Flux Kustomizations, HelmReleases and source objects
//!
//! Conditions are visited in priority order and the first deciding one sets
//! the verdict. A Degraded result is ambiguous, so the orchestrator lets the
//! status map refine it with the controller's reason.

use super::{CheckResult, EvalContext};
use crate::conditions::{Condition, GenericStatus};
use crate::models::{Health, HealthStatus, StatusCode};
use crate::resource::Resource;
use std::cmp::Reverse;

fn rank(condition: &Condition) -> u8 {
    match condition.type_.as_str() {
        "Healthy" => 4,
        "Ready" => 3,
        "Released" => 2,
        "Reconciling" | "FetchFailed" => 1,
        _ => 0,
    }
}

fn message(condition: &Condition) -> String {
    format!("{}: {}", condition.reason, condition.message)
}

fn decide(condition: &Condition) -> Option<HealthStatus> {
    let hs = match condition.type_.as_str() {
        "Healthy" | "Ready" | "Released" if condition.is_true() => {
            HealthStatus::new(Health::Healthy, StatusCode::HEALTHY).with_ready(true)
        }
        "Healthy" | "Ready" | "Released" => HealthStatus::new(Health::Unhealthy, StatusCode::DEGRADED),
        // any other condition should be False (Reconciling, Stalled, FetchFailed, ...)
        _ if condition.is_true() => HealthStatus::new(Health::Unhealthy, StatusCode::DEGRADED),
        _ => return None,
    };
    Some(hs.with_message(message(condition)))
}

pub fn flux_health(resource: &Resource, _ctx: &EvalContext<'_>) -> CheckResult {
    let mut conditions = GenericStatus::from_resource(resource).conditions;
    conditions.sort_by_key(|c| Reverse(rank(c)));
    Ok(Some(
        conditions
            .iter()
            .find_map(decide)
            .unwrap_or_else(|| HealthStatus::new(Health::Unknown, StatusCode::UNKNOWN)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::testing::ctx;
    use serde_json::{json, Value};

    fn kustomization(conditions: Value) -> Resource {
        Resource::new(json!({
            "apiVersion": "kustomize.toolkit.fluxcd.io/v1",
            "kind": "Kustomization",
            "metadata": {"name": "apps", "namespace": "flux-system"},
            "status": {"conditions": conditions}
        }))
    }

    #[test]
    fn test_ready_kustomization() {
        let hs = flux_health(
            &kustomization(json!([
                {"type": "Reconciling", "status": "False", "reason": "Succeeded"},
                {"type": "Ready", "status": "True", "reason": "ReconciliationSucceeded", "message": "Applied revision: main@sha1:1234"}
            ])),
            &ctx(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(hs.status, "Healthy");
        assert_eq!(hs.health, Health::Healthy);
        assert!(hs.ready);
        assert_eq!(hs.message, "ReconciliationSucceeded: Applied revision: main@sha1:1234");
    }

    #[test]
    fn test_healthy_outranks_ready() {
        let hs = flux_health(
            &kustomization(json!([
                {"type": "Ready", "status": "True", "reason": "ReconciliationSucceeded"},
                {"type": "Healthy", "status": "False", "reason": "HealthCheckFailed", "message": "timeout waiting for: [Deployment/default/web status: 'InProgress']"}
            ])),
            &ctx(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(hs.status, "Degraded");
        assert_eq!(hs.health, Health::Unhealthy);
        assert!(hs.message.starts_with("HealthCheckFailed: timeout"));
    }

    #[test]
    fn test_unexpected_true_condition() {
        let hs = flux_health(
            &kustomization(json!([
                {"type": "Stalled", "status": "True", "reason": "ArtifactFailed", "message": "source not found"}
            ])),
            &ctx(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(hs.status, "Degraded");
        assert_eq!(hs.message, "ArtifactFailed: source not found");
    }

    #[test]
    fn test_reconciling_true_is_degraded() {
        let release = Resource::new(json!({
            "apiVersion": "helm.toolkit.fluxcd.io/v2",
            "kind": "HelmRelease",
            "metadata": {"name": "podinfo"},
            "status": {"conditions": [
                {"type": "Reconciling", "status": "True", "reason": "Progressing", "message": "Running 'install' action"}
            ]}
        }));
        let hs = flux_health(&release, &ctx()).unwrap().unwrap();
        assert_eq!(hs.status, "Degraded");
        assert_eq!(hs.health, Health::Unhealthy);
        assert_eq!(hs.message, "Progressing: Running 'install' action");
    }

    #[test]
    fn test_failing_ready_outranks_reconciling() {
        let hs = flux_health(
            &kustomization(json!([
                {"type": "Reconciling", "status": "True", "reason": "ProgressingWithRetry", "message": "retrying"},
                {"type": "Ready", "status": "False", "reason": "ArtifactFailed", "message": "source not ready"}
            ])),
            &ctx(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(hs.status, "Degraded");
        assert_eq!(hs.health, Health::Unhealthy);
        assert!(!hs.ready);
        assert_eq!(hs.message, "ArtifactFailed: source not ready");
    }

    #[test]
    fn test_ready_unknown_is_degraded() {
        let hs = flux_health(
            &kustomization(json!([
                {"type": "Ready", "status": "Unknown", "reason": "Progressing", "message": "Reconciliation in progress"}
            ])),
            &ctx(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(hs.status, "Degraded");
        assert_eq!(hs.health, Health::Unhealthy);
        assert_eq!(hs.message, "Progressing: Reconciliation in progress");
    }

    #[test]
    fn test_no_deciding_condition() {
        let hs = flux_health(&kustomization(json!([])), &ctx()).unwrap().unwrap();
        assert_eq!(hs.status, "Unknown");
        assert_eq!(hs.health, Health::Unknown);
        assert!(hs.message.is_empty());

        let hs = flux_health(
            &kustomization(json!([{"type": "ArtifactInStorage", "status": "False"}])),
            &ctx(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(hs.health, Health::Unknown);
    }
}
