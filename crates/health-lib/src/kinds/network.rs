//! Services and Ingresses

use super::{typed, CheckResult, EvalContext};
use crate::models::{Health, HealthStatus, StatusCode};
use crate::resource::Resource;
use chrono::Duration;
use k8s_openapi::api::core::v1::Service;

const LOAD_BALANCER: &str = "LoadBalancer";

/// A load balancer still unprovisioned after this long is unhealthy.
pub const LOAD_BALANCER_PENDING_HOURS: i64 = 1;

pub fn service_health(resource: &Resource, ctx: &EvalContext<'_>) -> CheckResult {
    let service: Service = typed(resource)?;
    let service_type = service.spec.as_ref().and_then(|s| s.type_.as_deref());

    if service_type != Some(LOAD_BALANCER) {
        return Ok(Some(
            HealthStatus::new(Health::Unknown, StatusCode::UNKNOWN).with_ready(true),
        ));
    }

    let provisioned = service
        .status
        .and_then(|s| s.load_balancer)
        .and_then(|lb| lb.ingress)
        .is_some_and(|ingress| !ingress.is_empty());
    if provisioned {
        return Ok(Some(
            HealthStatus::new(Health::Healthy, StatusCode::RUNNING).with_ready(true),
        ));
    }

    let overdue = ctx
        .age(resource)
        .is_some_and(|age| age >= Duration::hours(LOAD_BALANCER_PENDING_HOURS));
    let health = if overdue { Health::Unhealthy } else { Health::Unknown };
    Ok(Some(HealthStatus::new(health, StatusCode::CREATING)))
}

/// Ingresses exist under both `extensions` and `networking.k8s.io`, so only
/// the load balancer status is read.
pub fn ingress_health(resource: &Resource, _ctx: &EvalContext<'_>) -> CheckResult {
    let Some(ingress) = resource.get(&["status", "loadBalancer", "ingress"]) else {
        return Ok(Some(
            HealthStatus::new(Health::Healthy, StatusCode::PENDING)
                .with_message("ingress loadbalancer status not found"),
        ));
    };

    let hs = match ingress.as_array() {
        Some(entries) if !entries.is_empty() => {
            HealthStatus::new(Health::Healthy, StatusCode::HEALTHY).with_ready(true)
        }
        _ => HealthStatus::new(Health::Unknown, StatusCode::PENDING),
    };
    Ok(Some(hs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::testing::{ctx, minutes_ago};
    use serde_json::{json, Value};

    fn service(service_type: &str, age_minutes: i64, status: Value) -> Resource {
        Resource::new(json!({
            "apiVersion": "v1",
            "kind": "Service",
            "metadata": {"name": "web", "creationTimestamp": minutes_ago(age_minutes)},
            "spec": {"type": service_type, "ports": [{"port": 80}]},
            "status": status
        }))
    }

    #[test]
    fn test_cluster_ip_service() {
        let hs = service_health(&service("ClusterIP", 5, json!({})), &ctx()).unwrap().unwrap();
        assert_eq!(hs.health, Health::Unknown);
        assert!(hs.ready);
    }

    #[test]
    fn test_load_balancer_service() {
        let hs = service_health(
            &service("LoadBalancer", 5, json!({"loadBalancer": {"ingress": [{"ip": "10.0.0.1"}]}})),
            &ctx(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(hs.status, "Running");
        assert_eq!(hs.health, Health::Healthy);
        assert!(hs.ready);

        let hs = service_health(&service("LoadBalancer", 5, json!({"loadBalancer": {}})), &ctx())
            .unwrap()
            .unwrap();
        assert_eq!(hs.status, "Creating");
        assert_eq!(hs.health, Health::Unknown);

        let hs = service_health(&service("LoadBalancer", 90, json!({"loadBalancer": {}})), &ctx())
            .unwrap()
            .unwrap();
        assert_eq!(hs.health, Health::Unhealthy);
    }

    fn ingress(status: Value) -> Resource {
        Resource::new(json!({
            "apiVersion": "networking.k8s.io/v1",
            "kind": "Ingress",
            "metadata": {"name": "web"},
            "status": status
        }))
    }

    #[test]
    fn test_ingress() {
        let hs = ingress_health(&ingress(json!({})), &ctx()).unwrap().unwrap();
        assert_eq!(hs.status, "Pending");
        assert_eq!(hs.health, Health::Healthy);
        assert!(!hs.ready);

        let hs = ingress_health(&ingress(json!({"loadBalancer": {"ingress": []}})), &ctx())
            .unwrap()
            .unwrap();
        assert_eq!(hs.status, "Pending");
        assert_eq!(hs.health, Health::Unknown);

        let hs = ingress_health(
            &ingress(json!({"loadBalancer": {"ingress": [{"hostname": "lb.example.com"}]}})),
            &ctx(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(hs.status, "Healthy");
        assert!(hs.ready);
    }
}
