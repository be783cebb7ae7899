//! MongoDB replica set members

use crate::models::{Health, HealthStatus, StatusCode};
use crate::resource::lookup_str;
use serde_json::Value;

const MEMBER_STATES: &[(&str, Health, bool)] = &[
    ("PRIMARY", Health::Healthy, true),
    ("SECONDARY", Health::Healthy, true),
    ("ARBITER", Health::Healthy, true),
    ("STARTUP", Health::Unknown, false),
    ("STARTUP2", Health::Unknown, false),
    ("RECOVERING", Health::Unknown, false),
    ("DOWN", Health::Unhealthy, true),
    ("ROLLBACK", Health::Unhealthy, true),
    ("REMOVED", Health::Unhealthy, true),
    ("UNKNOWN", Health::Unhealthy, true),
];

pub fn mongo_health(obj: &Value) -> HealthStatus {
    let unknown = HealthStatus::new(Health::Unknown, StatusCode::UNKNOWN);
    if lookup_str(obj, &["clusterType"]) != Some("REPLICASET") {
        return unknown;
    }
    let Some(state) = lookup_str(obj, &["stateName"]) else {
        return unknown;
    };

    let (health, ready) = MEMBER_STATES
        .iter()
        .find(|(name, _, _)| name.eq_ignore_ascii_case(state))
        .map(|(_, health, ready)| (*health, *ready))
        .unwrap_or((Health::Unknown, true));
    HealthStatus::new(health, StatusCode::new(state)).with_ready(ready)
}
