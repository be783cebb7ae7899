//! Classifiers for cloud and database resources
//!
//! Non-Kubernetes resources arrive as flat documents plus a `::`-delimited
//! config type (`AWS::EC2::Instance`, `Azure::AppRegistration::ClientSecret`).
//! Each provider keeps per-type lookup tables and falls back to the
//! status-name heuristic for states its tables do not list.

pub mod aws;
pub mod azure;
pub mod ecs;
pub mod gcp;
pub mod mongo;

use crate::config::Settings;
use crate::models::HealthStatus;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Provider named by the first segment of a config type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Aws,
    Azure,
    Gcp,
    Mongo,
}

impl Provider {
    pub fn from_config_type(config_type: &str) -> Option<Provider> {
        let class = config_type.split("::").next().unwrap_or_default();
        match class.to_ascii_lowercase().as_str() {
            "aws" => Some(Provider::Aws),
            "azure" => Some(Provider::Azure),
            "gcp" => Some(Provider::Gcp),
            "mongo" => Some(Provider::Mongo),
            _ => None,
        }
    }
}

/// Evaluates a cloud document, `None` when the config type names no known provider.
pub fn cloud_health(
    config_type: &str,
    obj: &Value,
    states: &[&str],
    settings: &Settings,
    now: DateTime<Utc>,
) -> Option<HealthStatus> {
    let health = match Provider::from_config_type(config_type)? {
        Provider::Aws => aws::aws_health(config_type, obj, states),
        Provider::Azure => azure::azure_health(config_type, obj, settings, now),
        Provider::Gcp => gcp::gcp_health(config_type, obj),
        Provider::Mongo => mongo::mongo_health(obj),
    };
    Some(health)
}

/// First top-level field named `status`, `state` or `*status`, as a string.
pub(crate) fn scan_status_field(obj: &Value) -> Option<String> {
    let map = obj.as_object()?;
    map.iter().find_map(|(key, value)| {
        let key = key.to_ascii_lowercase();
        if key == "status" || key == "state" || key.ends_with("status") {
            match value {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            }
        } else {
            None
        }
    })
}
