//! GCP resources

use crate::models::{Health, HealthStatus, StatusCode};
use crate::resource::{lookup, lookup_i64, lookup_str};
use crate::status_name::health_from_status_name;
use serde_json::Value;

pub fn gcp_health(config_type: &str, obj: &Value) -> HealthStatus {
    match config_type {
        "GCP::Disk" => disk_health(obj),
        "GCP::InstanceGroupManager" => instance_group_health(obj),
        "GCP::SQLInstance" => sql_instance_health(obj),
        _ => HealthStatus::default(),
    }
}

fn disk_health(obj: &Value) -> HealthStatus {
    let Some(status) = lookup_str(obj, &["status"]) else {
        return HealthStatus::default().with_message("disk has no 'status' field");
    };
    let message = match lookup_scalar(obj, &["sizeGb"]) {
        Some(size) => format!("{size} GB"),
        None => "No size information".to_string(),
    };
    health_from_status_name(status, &[message.as_str()])
}

fn instance_group_health(obj: &Value) -> HealthStatus {
    let Some(status) = lookup(obj, &["status"]).filter(|s| s.is_object()) else {
        return HealthStatus::default().with_message("instance group has no 'status' field");
    };

    let target = lookup_i64(obj, &["targetSize"]).unwrap_or(0);
    let message = if target == 0 {
        "scaled to zero".to_string()
    } else {
        format!("{target} instances")
    };

    if status.get("isStable").and_then(Value::as_bool) == Some(true) {
        HealthStatus::new(Health::Healthy, StatusCode::READY)
            .with_ready(true)
            .with_message(message)
    } else {
        health_from_status_name("degraded", &[message.as_str()])
    }
}

fn sql_instance_health(obj: &Value) -> HealthStatus {
    let Some(state) = lookup_str(obj, &["state"]) else {
        return HealthStatus::default().with_message("SQL instance has no 'state' field");
    };

    let details: Vec<String> = [
        lookup_scalar(obj, &["databaseVersion"]),
        lookup_scalar(obj, &["settings", "dataDiskSizeGb"]).map(|size| format!("{size} GB")),
    ]
    .into_iter()
    .flatten()
    .collect();
    let message = if details.is_empty() {
        "No details available".to_string()
    } else {
        details.join(", ")
    };

    if state == "RUNNABLE" {
        HealthStatus::new(Health::Healthy, StatusCode::READY)
            .with_ready(true)
            .with_message(message)
    } else {
        health_from_status_name(state, &[message.as_str()])
    }
}

/// String or number at `path`, rendered as text.
fn lookup_scalar(obj: &Value, path: &[&str]) -> Option<String> {
    match lookup(obj, path)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_disk() {
        let hs = gcp_health("GCP::Disk", &json!({"status": "READY", "sizeGb": "100"}));
        assert_eq!(hs.status, "Ready");
        assert_eq!(hs.health, Health::Healthy);
        assert!(hs.ready);
        assert_eq!(hs.message, "100 GB");

        let hs = gcp_health("GCP::Disk", &json!({"sizeGb": "100"}));
        assert_eq!(hs.health, Health::Unknown);
    }

    #[test]
    fn test_instance_group() {
        let stable = json!({"targetSize": 3, "status": {"isStable": true}});
        let hs = gcp_health("GCP::InstanceGroupManager", &stable);
        assert_eq!(hs.health, Health::Healthy);
        assert_eq!(hs.message, "3 instances");

        let unstable = json!({"targetSize": 0, "status": {"isStable": false}});
        let hs = gcp_health("GCP::InstanceGroupManager", &unstable);
        assert_eq!(hs.health, Health::Warning);
        assert_eq!(hs.status, "Degraded");
        assert_eq!(hs.message, "scaled to zero");
    }

    #[test]
    fn test_sql_instance() {
        let sql = json!({
            "state": "RUNNABLE",
            "databaseVersion": "POSTGRES_15",
            "settings": {"dataDiskSizeGb": "10"}
        });
        let hs = gcp_health("GCP::SQLInstance", &sql);
        assert_eq!(hs.status, "Ready");
        assert_eq!(hs.message, "POSTGRES_15, 10 GB");

        let hs = gcp_health("GCP::SQLInstance", &json!({"state": "MAINTENANCE"}));
        assert_eq!(hs.status, "Maintenance");
        assert_eq!(hs.health, Health::Healthy);
        assert!(!hs.ready);
        assert_eq!(hs.message, "No details available");
    }

    #[test]
    fn test_unknown_type() {
        let hs = gcp_health("GCP::Bucket", &json!({"status": "READY"}));
        assert_eq!(hs, HealthStatus::default());
    }
}
