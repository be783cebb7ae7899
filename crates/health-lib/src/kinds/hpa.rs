//! HorizontalPodAutoscaler health
//!
//! `autoscaling/v1` has no status conditions; the controller publishes them
//! as a JSON annotation instead. All versions are read untyped.

use super::{CheckResult, EvalContext};
use crate::conditions::{parse_conditions, Condition};
use crate::models::{Health, HealthStatus, StatusCode};
use crate::resource::Resource;
use serde_json::Value;

const CONDITIONS_ANNOTATION: &str = "autoscaling.alpha.kubernetes.io/conditions";

/// `(condition type, reason)` pairs meaning the autoscaler cannot do its job
const DEGRADED: &[(&str, &str)] = &[
    ("AbleToScale", "FailedGetScale"),
    ("AbleToScale", "FailedUpdateScale"),
    ("ScalingActive", "FailedGetResourceMetric"),
    ("ScalingActive", "FailedGetContainerResourceMetric"),
    ("ScalingActive", "FailedGetPodsMetric"),
    ("ScalingActive", "FailedGetObjectMetric"),
    ("ScalingActive", "FailedGetExternalMetric"),
    ("ScalingActive", "InvalidSelector"),
];

const HEALTHY: &[(&str, &str)] = &[
    ("AbleToScale", "SucceededRescale"),
    ("ScalingLimited", "DesiredWithinRange"),
    ("ScalingLimited", "TooFewReplicas"),
    ("ScalingLimited", "TooManyReplicas"),
    ("ScalingActive", "ValidMetricFound"),
];

fn hpa_conditions(resource: &Resource) -> Vec<Condition> {
    let conditions = parse_conditions(resource.get(&["status", "conditions"]));
    if !conditions.is_empty() {
        return conditions;
    }
    resource
        .annotation(CONDITIONS_ANNOTATION)
        .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
        .map(|value| parse_conditions(Some(&value)))
        .unwrap_or_default()
}

fn find<'a>(conditions: &'a [Condition], table: &[(&str, &str)]) -> Option<&'a Condition> {
    conditions.iter().find(|c| {
        table
            .iter()
            .any(|(type_, reason)| c.type_ == *type_ && c.reason == *reason)
    })
}

pub fn hpa_health(resource: &Resource, _ctx: &EvalContext<'_>) -> CheckResult {
    let conditions = hpa_conditions(resource);

    let hs = if let Some(degraded) = find(&conditions, DEGRADED) {
        HealthStatus::new(Health::Unhealthy, StatusCode::DEGRADED)
            .with_message(degraded.message.as_str())
    } else if let Some(healthy) = find(&conditions, HEALTHY) {
        HealthStatus::new(Health::Healthy, StatusCode::HEALTHY)
            .with_ready(true)
            .with_message(healthy.message.as_str())
    } else {
        HealthStatus::new(Health::Healthy, StatusCode::PROGRESSING)
            .with_message("Waiting to Autoscale")
    };
    Ok(Some(hs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::testing::ctx;
    use serde_json::json;

    fn hpa_v2(conditions: Value) -> Resource {
        Resource::new(json!({
            "apiVersion": "autoscaling/v2",
            "kind": "HorizontalPodAutoscaler",
            "metadata": {"name": "web"},
            "status": {"conditions": conditions}
        }))
    }

    #[test]
    fn test_healthy_hpa() {
        let hs = hpa_health(
            &hpa_v2(json!([
                {"type": "AbleToScale", "status": "True", "reason": "ReadyForNewScale"},
                {"type": "ScalingLimited", "status": "False", "reason": "DesiredWithinRange", "message": "the desired count is within the acceptable range"}
            ])),
            &ctx(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(hs.status, "Healthy");
        assert_eq!(hs.health, Health::Healthy);
        assert!(hs.ready);
        assert_eq!(hs.message, "the desired count is within the acceptable range");
    }

    #[test]
    fn test_degraded_hpa_wins_over_healthy() {
        let hs = hpa_health(
            &hpa_v2(json!([
                {"type": "ScalingLimited", "status": "False", "reason": "DesiredWithinRange"},
                {"type": "ScalingActive", "status": "False", "reason": "FailedGetResourceMetric", "message": "missing request for cpu"}
            ])),
            &ctx(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(hs.status, "Degraded");
        assert_eq!(hs.health, Health::Unhealthy);
        assert!(!hs.ready);
        assert_eq!(hs.message, "missing request for cpu");
    }

    #[test]
    fn test_progressing_hpa() {
        let hs = hpa_health(&hpa_v2(json!([])), &ctx()).unwrap().unwrap();
        assert_eq!(hs.status, "Progressing");
        assert_eq!(hs.health, Health::Healthy);
        assert!(!hs.ready);
    }

    #[test]
    fn test_v1_conditions_from_annotation() {
        let conditions = json!([
            {"type": "AbleToScale", "status": "False", "reason": "FailedGetScale", "message": "deployments/scale.apps \"web\" not found"}
        ]);
        let resource = Resource::new(json!({
            "apiVersion": "autoscaling/v1",
            "kind": "HorizontalPodAutoscaler",
            "metadata": {
                "name": "web",
                "annotations": {"autoscaling.alpha.kubernetes.io/conditions": conditions.to_string()}
            },
            "status": {"currentReplicas": 1, "desiredReplicas": 1}
        }));
        let hs = hpa_health(&resource, &ctx()).unwrap().unwrap();
        assert_eq!(hs.status, "Degraded");
        assert_eq!(hs.message, "deployments/scale.apps \"web\" not found");
    }
}
