//! AWS resource states
//!
//! Each supported resource type lists the raw states its API reports and the
//! verdict for each. CloudFormation stacks get a complete table because their
//! compound states (`UPDATE_ROLLBACK_COMPLETE`) need specific mappings rather
//! than keyword matches.

use super::{ecs, scan_status_field};
use crate::models::Health::{Healthy, Unhealthy, Unknown, Warning};
use crate::models::{Health, HealthStatus, StatusCode};
use crate::resource::lookup_str;
use crate::status_name::{canonical_status, health_from_status_name};
use serde_json::Value;

/// One raw state of a resource type.
#[derive(Debug, Clone, Copy)]
struct StateEntry {
    raw: &'static str,
    health: Health,
    ready: bool,
    /// Status reported instead of the canonical form of `raw`
    status: Option<&'static str>,
}

const fn state(raw: &'static str, health: Health, ready: bool) -> StateEntry {
    StateEntry {
        raw,
        health,
        ready,
        status: None,
    }
}

const fn state_as(
    raw: &'static str,
    health: Health,
    ready: bool,
    status: &'static str,
) -> StateEntry {
    StateEntry {
        raw,
        health,
        ready,
        status: Some(status),
    }
}

#[derive(Debug)]
struct ResourceTable {
    resource_type: &'static str,
    status_path: &'static [&'static str],
    reason_path: &'static [&'static str],
    states: &'static [StateEntry],
}

impl ResourceTable {
    fn find(&self, raw: &str) -> Option<&StateEntry> {
        let raw = raw.trim();
        self.states.iter().find(|s| s.raw.eq_ignore_ascii_case(raw))
    }
}

const TABLES: &[ResourceTable] = &[
    ResourceTable {
        resource_type: "EC2::Instance",
        status_path: &["State", "Name"],
        reason_path: &["StateReason", "Message"],
        states: &[
            state("pending", Unknown, false),
            state("running", Healthy, true),
            state("shutting-down", Unknown, false),
            state("stopping", Unknown, false),
            state("stopped", Unknown, true),
            state("terminated", Unknown, true),
        ],
    },
    ResourceTable {
        resource_type: "EC2::Volume",
        status_path: &["State"],
        reason_path: &[],
        states: &[
            state("creating", Unknown, false),
            state("available", Healthy, true),
            state("in-use", Healthy, true),
            state("deleting", Unknown, false),
            state("deleted", Unknown, true),
            state("error", Unhealthy, true),
        ],
    },
    ResourceTable {
        resource_type: "EKS::Cluster",
        status_path: &["Status"],
        reason_path: &[],
        states: &[
            state("CREATING", Unknown, false),
            state("ACTIVE", Healthy, true),
            state("UPDATING", Healthy, false),
            state("DELETING", Unknown, false),
            state("FAILED", Unhealthy, true),
            state("PENDING", Unknown, false),
        ],
    },
    ResourceTable {
        resource_type: "RDS::DBInstance",
        status_path: &["DBInstanceStatus"],
        reason_path: &[],
        states: &[
            state("available", Healthy, true),
            state("billed", Healthy, true),
            state_as("backing-up", Healthy, true, "Maintenance"),
            state_as("delete-precheck", Healthy, false, "Maintenance"),
            state_as("moving-to-vpc", Healthy, false, "Maintenance"),
            state_as("renaming", Healthy, false, "Maintenance"),
            state_as("converting-to-vpc", Healthy, false, "Updating"),
            state_as("storage-config-upgrade", Healthy, false, "Updating"),
            state("creating", Unknown, false),
            state("deleting", Unknown, false),
            state("failed", Unhealthy, true),
            state("restore-error", Unhealthy, true),
            state("storage-full", Unhealthy, true),
            state("insufficient-capacity", Unhealthy, true),
            state("incompatible-network", Unhealthy, true),
            state("incompatible-option-group", Unhealthy, true),
            state("incompatible-parameters", Unhealthy, true),
            state("incompatible-restore", Unhealthy, true),
            state_as("inaccessible-encryption-credentials", Unhealthy, true, "Inaccessible"),
            state_as(
                "inaccessible-encryption-credentials-recoverable",
                Unhealthy,
                true,
                "Inaccessible",
            ),
            state("maintenance", Healthy, false),
            state("modifying", Healthy, false),
            state("rebooting", Healthy, false),
            state("upgrading", Healthy, false),
            state("starting", Unknown, false),
            state("stopping", Unknown, false),
            state("stopped", Unknown, true),
        ],
    },
    ResourceTable {
        resource_type: "ElasticLoadBalancingV2::LoadBalancer",
        status_path: &["State", "Code"],
        reason_path: &["State", "Reason"],
        states: &[
            state("active", Healthy, true),
            state("provisioning", Unknown, false),
            state("active_impaired", Warning, true),
            state("failed", Unhealthy, true),
        ],
    },
    ResourceTable {
        resource_type: "CloudFormation::Stack",
        status_path: &["StackStatus"],
        reason_path: &["StackStatusReason"],
        states: &[
            state("CREATE_IN_PROGRESS", Unknown, false),
            state("CREATE_FAILED", Unhealthy, true),
            state("CREATE_COMPLETE", Healthy, true),
            state("ROLLBACK_IN_PROGRESS", Warning, false),
            state("ROLLBACK_FAILED", Unhealthy, true),
            state("ROLLBACK_COMPLETE", Unhealthy, true),
            state("DELETE_IN_PROGRESS", Unknown, false),
            state("DELETE_FAILED", Unhealthy, true),
            state("DELETE_COMPLETE", Unknown, true),
            state("UPDATE_IN_PROGRESS", Healthy, false),
            state("UPDATE_COMPLETE_CLEANUP_IN_PROGRESS", Healthy, false),
            state("UPDATE_COMPLETE", Healthy, true),
            state("UPDATE_FAILED", Unhealthy, true),
            state("UPDATE_ROLLBACK_IN_PROGRESS", Warning, false),
            state("UPDATE_ROLLBACK_FAILED", Unhealthy, true),
            state("UPDATE_ROLLBACK_COMPLETE_CLEANUP_IN_PROGRESS", Warning, false),
            state("UPDATE_ROLLBACK_COMPLETE", Warning, true),
            state("REVIEW_IN_PROGRESS", Unknown, false),
            state("IMPORT_IN_PROGRESS", Unknown, false),
            state("IMPORT_COMPLETE", Healthy, true),
            state("IMPORT_ROLLBACK_IN_PROGRESS", Warning, false),
            state("IMPORT_ROLLBACK_FAILED", Unhealthy, true),
            state("IMPORT_ROLLBACK_COMPLETE", Warning, true),
        ],
    },
];

fn table_for(resource_type: &str) -> Option<&'static ResourceTable> {
    TABLES
        .iter()
        .find(|t| t.resource_type.eq_ignore_ascii_case(resource_type))
}

/// Resource types with a dedicated table, as `AWS::<type>`.
pub fn supported_types() -> Vec<String> {
    TABLES
        .iter()
        .map(|t| format!("AWS::{}", t.resource_type))
        .chain(std::iter::once("AWS::ECS::Task".to_string()))
        .collect()
}

/// Verdict for a raw state of an AWS resource type.
///
/// Unlisted states of a known type go through the status-name heuristic;
/// states of an unknown type keep their canonical status with `Unknown` health.
pub fn aws_resource_health(resource_type: &str, raw: &str, reason: &str) -> HealthStatus {
    match table_for(resource_type) {
        Some(table) => match table.find(raw) {
            Some(entry) => HealthStatus {
                ready: entry.ready,
                health: entry.health,
                status: match entry.status {
                    Some(status) => StatusCode::from_static(status),
                    None => StatusCode::new(canonical_status(raw)),
                },
                message: reason.trim().to_string(),
                last_updated: None,
            },
            None => health_from_status_name(raw, &[reason]),
        },
        None => HealthStatus {
            status: StatusCode::new(canonical_status(raw)),
            message: reason.trim().to_string(),
            ..Default::default()
        },
    }
}

/// Evaluates an AWS document for `config_type` (`AWS::EC2::Instance`).
pub fn aws_health(config_type: &str, obj: &Value, states: &[&str]) -> HealthStatus {
    let resource_type = config_type
        .split_once("::")
        .map(|(_, rest)| rest)
        .unwrap_or_default();

    if resource_type.eq_ignore_ascii_case("ECS::Task") {
        return ecs::ecs_task_health(obj);
    }

    let table = table_for(resource_type);
    let explicit = states.iter().map(|s| s.trim()).find(|s| !s.is_empty());
    let raw = explicit
        .map(str::to_string)
        .or_else(|| {
            table
                .and_then(|t| lookup_str(obj, t.status_path))
                .map(str::to_string)
        })
        .or_else(|| scan_status_field(obj));

    let Some(raw) = raw else {
        return HealthStatus::default();
    };

    let reason = table
        .filter(|t| !t.reason_path.is_empty())
        .and_then(|t| lookup_str(obj, t.reason_path))
        .unwrap_or_default();

    aws_resource_health(resource_type, &raw, reason)
}
