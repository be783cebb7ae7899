//! Node health
//!
//! Registered by kind alone, so the document is read leniently instead of
//! being projected onto the core `Node` type.

use super::{CheckResult, EvalContext};
use crate::conditions::{Condition, GenericStatus};
use crate::models::{Health, HealthStatus, StatusCode};
use crate::resource::Resource;

const NODE_READY: &str = "Ready";
const UNSCHEDULABLE_TAINT: &str = "node.kubernetes.io/unschedulable";
const NO_SCHEDULE: &str = "NoSchedule";

/// Expected status of a node condition and the severity of a violation.
struct Expectation {
    condition: &'static str,
    expected: &'static str,
    severity: Health,
}

const fn expect_false(condition: &'static str, severity: Health) -> Expectation {
    Expectation {
        condition,
        expected: "False",
        severity,
    }
}

const EXPECTATIONS: &[Expectation] = &[
    expect_false("MemoryPressure", Health::Warning),
    expect_false("DiskPressure", Health::Warning),
    expect_false("PIDPressure", Health::Warning),
    expect_false("NetworkUnavailable", Health::Unhealthy),
    // node-problem-detector
    expect_false("KernelDeadlock", Health::Unhealthy),
    expect_false("ReadonlyFilesystem", Health::Unhealthy),
    expect_false("CorruptDockerOverlay2", Health::Unhealthy),
    expect_false("ContainerRuntimeProblem", Health::Unhealthy),
    expect_false("FilesystemCorruptionProblem", Health::Unhealthy),
    expect_false("FrequentKubeletRestart", Health::Warning),
    expect_false("FrequentDockerRestart", Health::Warning),
    expect_false("FrequentContainerdRestart", Health::Warning),
    expect_false("FrequentUnregisterNetDevice", Health::Warning),
    expect_false("VMEventScheduled", Health::Warning),
    // informational deprecation notices
    expect_false("DeprecatedAuthsFieldInContainerdConfiguration", Health::Healthy),
    expect_false("DeprecatedConfigsFieldInContainerdConfiguration", Health::Healthy),
    expect_false("DeprecatedMirrorsFieldInContainerdConfiguration", Health::Healthy),
];

fn violation(condition: &Condition) -> Option<Health> {
    EXPECTATIONS
        .iter()
        .find(|e| e.condition == condition.type_)
        .filter(|e| e.expected != condition.status)
        .map(|e| e.severity)
}

fn is_cordoned(resource: &Resource) -> bool {
    resource
        .get(&["spec", "taints"])
        .and_then(|t| t.as_array())
        .is_some_and(|taints| {
            taints.iter().any(|taint| {
                taint.get("key").and_then(|k| k.as_str()) == Some(UNSCHEDULABLE_TAINT)
                    && taint.get("effect").and_then(|e| e.as_str()) == Some(NO_SCHEDULE)
            })
        })
}

pub fn node_health(resource: &Resource, _ctx: &EvalContext<'_>) -> CheckResult {
    let phase = resource.get_str(&["status", "phase"]).unwrap_or_default();
    if !phase.is_empty() && phase != "Running" {
        return Ok(Some(HealthStatus::new(Health::Unknown, StatusCode::new(phase))));
    }

    let status = GenericStatus::from_resource(resource);
    if status.conditions.is_empty() {
        return Ok(None);
    }

    let mut hs = HealthStatus::default();
    if let Some(ready) = status.find_condition(NODE_READY) {
        if !ready.is_true() {
            let reason = if ready.reason.is_empty() { "NotReady" } else { ready.reason.as_str() };
            return Ok(Some(
                HealthStatus::new(Health::Unhealthy, StatusCode::new(reason))
                    .with_message(ready.message.as_str()),
            ));
        }
        hs.health = Health::Healthy;
        hs.status = StatusCode::RUNNING;
        hs.ready = true;
    }

    for condition in &status.conditions {
        let Some(severity) = violation(condition) else {
            continue;
        };
        if severity > hs.health {
            hs.health = severity;
            hs.status = StatusCode::new(condition.type_.as_str());
            hs.message = format!("{}: {}", condition.type_, condition.message);
        }
    }

    if is_cordoned(resource) {
        hs.health = hs.health.worst(Health::Warning);
        hs.status = StatusCode::UNSCHEDULABLE;
        hs.ready = false;
    }

    Ok(Some(hs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::testing::ctx;
    use serde_json::{json, Value};

    fn node(conditions: Value, taints: Value) -> Resource {
        Resource::new(json!({
            "apiVersion": "v1",
            "kind": "Node",
            "metadata": {"name": "worker-1"},
            "spec": {"taints": taints},
            "status": {"conditions": conditions}
        }))
    }

    fn ready() -> Value {
        json!({"type": "Ready", "status": "True", "reason": "KubeletReady"})
    }

    #[test]
    fn test_ready_node() {
        let hs = node_health(&node(json!([ready()]), json!([])), &ctx()).unwrap().unwrap();
        assert_eq!(hs.status, "Running");
        assert_eq!(hs.health, Health::Healthy);
        assert!(hs.ready);
    }

    #[test]
    fn test_cordoned_node() {
        let taints = json!([{"key": "node.kubernetes.io/unschedulable", "effect": "NoSchedule"}]);
        let hs = node_health(&node(json!([ready()]), taints), &ctx()).unwrap().unwrap();
        assert_eq!(hs.status, "Unschedulable");
        assert!(hs.health.is_worse_than(Health::Warning));
    }

    #[test]
    fn test_not_ready_node() {
        let conditions = json!([{"type": "Ready", "status": "Unknown", "reason": "NodeStatusUnknown", "message": "Kubelet stopped posting node status."}]);
        let hs = node_health(&node(conditions, json!([])), &ctx()).unwrap().unwrap();
        assert_eq!(hs.status, "NodeStatusUnknown");
        assert_eq!(hs.health, Health::Unhealthy);
        assert!(!hs.ready);
    }

    #[test]
    fn test_pressure_conditions_escalate() {
        let conditions = json!([
            ready(),
            {"type": "DiskPressure", "status": "True", "message": "disk is almost full"},
            {"type": "NetworkUnavailable", "status": "False"},
            {"type": "DeprecatedMirrorsFieldInContainerdConfiguration", "status": "True"}
        ]);
        let hs = node_health(&node(conditions, json!([])), &ctx()).unwrap().unwrap();
        assert_eq!(hs.health, Health::Warning);
        assert_eq!(hs.status, "DiskPressure");
        assert_eq!(hs.message, "DiskPressure: disk is almost full");
        assert!(hs.ready);
    }

    #[test]
    fn test_informational_condition_keeps_status() {
        let conditions = json!([
            ready(),
            {"type": "DeprecatedAuthsFieldInContainerdConfiguration", "status": "True"}
        ]);
        let hs = node_health(&node(conditions, json!([])), &ctx()).unwrap().unwrap();
        assert_eq!(hs.status, "Running");
        assert_eq!(hs.health, Health::Healthy);
    }

    #[test]
    fn test_node_without_conditions() {
        assert!(node_health(&node(json!([]), json!([])), &ctx()).unwrap().is_none());
    }
}
