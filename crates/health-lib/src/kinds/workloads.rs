//! Deployments, ReplicaSets, StatefulSets and DaemonSets

use super::replicas::{replica_health, ReplicaStatus};
use super::{typed, CheckResult, EvalContext};
use crate::conditions::GenericStatus;
use crate::models::StatusCode;
use crate::resource::Resource;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::core::v1::{Container, PodTemplateSpec};

/// Replica count Kubernetes assumes when `spec.replicas` is omitted.
const DEFAULT_REPLICAS: i32 = 1;

const ON_DELETE: &str = "OnDelete";

fn containers(template: Option<&PodTemplateSpec>) -> Vec<Container> {
    template
        .and_then(|t| t.spec.as_ref())
        .map(|spec| spec.containers.clone())
        .unwrap_or_default()
}

/// The controller has caught up with the latest spec. Documents without
/// generation bookkeeping are taken at face value.
fn generation_observed(resource: &Resource, observed: Option<i64>) -> bool {
    match (observed, resource.generation()) {
        (Some(observed), Some(generation)) => observed >= generation,
        _ => true,
    }
}

fn base_status(resource: &Resource, template: Option<&PodTemplateSpec>) -> ReplicaStatus {
    ReplicaStatus {
        containers: containers(template),
        created: resource.creation_timestamp(),
        conditions: GenericStatus::from_resource(resource).conditions,
        ..Default::default()
    }
}

pub fn deployment_health(resource: &Resource, ctx: &EvalContext<'_>) -> CheckResult {
    let deployment: Deployment = typed(resource)?;
    let spec = deployment.spec.unwrap_or_default();
    let status = deployment.status.unwrap_or_default();

    let replicas = ReplicaStatus {
        desired: spec.replicas.unwrap_or(DEFAULT_REPLICAS),
        replicas: status.replicas.unwrap_or(0),
        ready: status.ready_replicas.unwrap_or(0),
        updated: status.updated_replicas.unwrap_or(0),
        unavailable: status.unavailable_replicas.unwrap_or(0),
        generation_observed: generation_observed(resource, status.observed_generation),
        ..base_status(resource, Some(&spec.template))
    };

    let mut hs = replica_health(&replicas, ctx.now);
    if spec.paused.unwrap_or(false) {
        hs.status = StatusCode::SUSPENDED;
        hs.ready = false;
    }
    Ok(Some(hs))
}

pub fn replica_set_health(resource: &Resource, ctx: &EvalContext<'_>) -> CheckResult {
    let replica_set: ReplicaSet = typed(resource)?;
    let spec = replica_set.spec.unwrap_or_default();
    let status = replica_set.status.unwrap_or_default();

    // a ReplicaSet never updates its pods in place
    let replicas = ReplicaStatus {
        desired: spec.replicas.unwrap_or(DEFAULT_REPLICAS),
        replicas: status.replicas,
        ready: status.ready_replicas.unwrap_or(0),
        updated: status.replicas,
        unavailable: status.replicas - status.available_replicas.unwrap_or(0),
        generation_observed: generation_observed(resource, status.observed_generation),
        ..base_status(resource, spec.template.as_ref())
    };
    Ok(Some(replica_health(&replicas, ctx.now)))
}

pub fn stateful_set_health(resource: &Resource, ctx: &EvalContext<'_>) -> CheckResult {
    let stateful_set: StatefulSet = typed(resource)?;
    let spec = stateful_set.spec.unwrap_or_default();
    let status = stateful_set.status.unwrap_or_default();

    let replicas = ReplicaStatus {
        desired: spec.replicas.unwrap_or(DEFAULT_REPLICAS),
        replicas: status.replicas,
        ready: status.ready_replicas.unwrap_or(0),
        updated: status.updated_replicas.unwrap_or(0),
        unavailable: status.replicas - status.available_replicas.unwrap_or(0),
        generation_observed: generation_observed(resource, status.observed_generation),
        ..base_status(resource, Some(&spec.template))
    };
    Ok(Some(replica_health(&replicas, ctx.now)))
}

pub fn daemon_set_health(resource: &Resource, ctx: &EvalContext<'_>) -> CheckResult {
    let daemon_set: DaemonSet = typed(resource)?;
    let spec = daemon_set.spec.unwrap_or_default();
    let status = daemon_set.status.unwrap_or_default();

    let on_delete = spec
        .update_strategy
        .as_ref()
        .and_then(|s| s.type_.as_deref())
        == Some(ON_DELETE);
    let desired = status.desired_number_scheduled;
    // with OnDelete, outdated pods are only replaced by hand
    let updated = if on_delete {
        desired
    } else {
        status.updated_number_scheduled.unwrap_or(0)
    };

    let replicas = ReplicaStatus {
        desired,
        replicas: status.current_number_scheduled,
        ready: status.number_ready,
        updated,
        unavailable: status.number_unavailable.unwrap_or(0),
        generation_observed: generation_observed(resource, status.observed_generation),
        ..base_status(resource, Some(&spec.template))
    };
    Ok(Some(replica_health(&replicas, ctx.now)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HealthError;
    use crate::kinds::testing::{ctx, minutes_ago};
    use crate::models::Health;
    use serde_json::{json, Value};

    fn template() -> Value {
        json!({
            "metadata": {"labels": {"app": "web"}},
            "spec": {"containers": [{"name": "web", "image": "nginx"}]}
        })
    }

    fn deployment(spec: Value, status: Value) -> Resource {
        let mut full_spec = json!({
            "selector": {"matchLabels": {"app": "web"}},
            "template": template()
        });
        if let (Some(target), Some(extra)) = (full_spec.as_object_mut(), spec.as_object()) {
            target.extend(extra.clone());
        }
        Resource::new(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": {"name": "web", "generation": 2, "creationTimestamp": minutes_ago(120)},
            "spec": full_spec,
            "status": status
        }))
    }

    #[test]
    fn test_deployment_running() {
        let resource = deployment(
            json!({"replicas": 3}),
            json!({"replicas": 3, "readyReplicas": 3, "updatedReplicas": 3, "observedGeneration": 2}),
        );
        let hs = deployment_health(&resource, &ctx()).unwrap().unwrap();
        assert_eq!(hs.status, "Running");
        assert_eq!(hs.health, Health::Healthy);
        assert!(hs.ready);
    }

    #[test]
    fn test_deployment_stale_generation_rolls_out() {
        let resource = deployment(
            json!({"replicas": 3}),
            json!({"replicas": 3, "readyReplicas": 3, "updatedReplicas": 3, "observedGeneration": 1}),
        );
        let hs = deployment_health(&resource, &ctx()).unwrap().unwrap();
        assert_eq!(hs.status, "Rolling Out");
    }

    #[test]
    fn test_paused_deployment_is_suspended() {
        let resource = deployment(
            json!({"replicas": 2, "paused": true}),
            json!({"replicas": 2, "readyReplicas": 2, "updatedReplicas": 2, "observedGeneration": 2}),
        );
        let hs = deployment_health(&resource, &ctx()).unwrap().unwrap();
        assert_eq!(hs.status, "Suspended");
        assert!(!hs.ready);
    }

    #[test]
    fn test_deployment_default_replicas() {
        let resource = deployment(json!({}), json!({}));
        let hs = deployment_health(&resource, &ctx()).unwrap().unwrap();
        assert_eq!(hs.message, "0/1 ready");
        assert_eq!(hs.status, "Rolling Out");
        assert_eq!(hs.health, Health::Unknown);
    }

    #[test]
    fn test_deployment_conversion_failure() {
        let resource = deployment(json!({"replicas": "many"}), json!({}));
        let err = deployment_health(&resource, &ctx()).unwrap_err();
        assert!(matches!(err, HealthError::Conversion { .. }));
    }

    #[test]
    fn test_replica_set_scaled_to_zero() {
        let resource = Resource::new(json!({
            "apiVersion": "apps/v1",
            "kind": "ReplicaSet",
            "metadata": {"name": "web-5d8f", "creationTimestamp": minutes_ago(600)},
            "spec": {"replicas": 0, "selector": {"matchLabels": {"app": "web"}}},
            "status": {"replicas": 0}
        }));
        let hs = replica_set_health(&resource, &ctx()).unwrap().unwrap();
        assert_eq!(hs.status, "Scaled to Zero");
        assert!(hs.ready);
    }

    #[test]
    fn test_stateful_set_partially_ready() {
        let resource = Resource::new(json!({
            "apiVersion": "apps/v1",
            "kind": "StatefulSet",
            "metadata": {"name": "db", "creationTimestamp": minutes_ago(600)},
            "spec": {
                "replicas": 3,
                "serviceName": "db",
                "selector": {"matchLabels": {"app": "db"}},
                "template": template()
            },
            "status": {"replicas": 3, "readyReplicas": 1, "updatedReplicas": 3}
        }));
        let hs = stateful_set_health(&resource, &ctx()).unwrap().unwrap();
        assert_eq!(hs.health, Health::Warning);
        assert_eq!(hs.message, "1/3 ready");
        assert!(!hs.ready);
    }

    fn daemon_set(strategy: &str, updated: i32) -> Resource {
        Resource::new(json!({
            "apiVersion": "apps/v1",
            "kind": "DaemonSet",
            "metadata": {"name": "agent", "creationTimestamp": minutes_ago(600)},
            "spec": {
                "selector": {"matchLabels": {"app": "agent"}},
                "template": template(),
                "updateStrategy": {"type": strategy}
            },
            "status": {
                "currentNumberScheduled": 4,
                "desiredNumberScheduled": 4,
                "numberMisscheduled": 0,
                "numberReady": 4,
                "updatedNumberScheduled": updated
            }
        }))
    }

    #[test]
    fn test_daemon_set_rolling_update() {
        let hs = daemon_set_health(&daemon_set("RollingUpdate", 2), &ctx())
            .unwrap()
            .unwrap();
        assert_eq!(hs.status, "Rolling Out");
        assert_eq!(hs.health, Health::Healthy);

        let hs = daemon_set_health(&daemon_set("RollingUpdate", 4), &ctx())
            .unwrap()
            .unwrap();
        assert_eq!(hs.status, "Running");
        assert!(hs.ready);
    }

    #[test]
    fn test_daemon_set_on_delete_ignores_outdated_pods() {
        let hs = daemon_set_health(&daemon_set("OnDelete", 1), &ctx()).unwrap().unwrap();
        assert_eq!(hs.status, "Running");
        assert_eq!(hs.health, Health::Healthy);
    }
}
