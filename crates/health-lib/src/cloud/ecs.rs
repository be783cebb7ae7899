//! ECS task state machine
//!
//! `LastStatus` gives the baseline, `StopCode` overrides it and a
//! `StoppedReason` of the form `"<Reason>: <detail>"` overrides both.

use crate::models::{Health, HealthStatus, StatusCode};
use crate::resource::lookup_str;
use crate::util::human_case;
use serde_json::Value;

/// Verdicts for the reason part of `StoppedReason`; unlisted reasons are `Unhealthy`.
const STOPPED_REASONS: &[(&str, Health, bool)] = &[
    ("ContainerRuntimeError", Health::Unhealthy, false),
    ("ContainerRuntimeTimeoutError", Health::Unhealthy, false),
    ("OutOfMemoryError", Health::Unhealthy, false),
    ("ResourceInitializationError", Health::Unhealthy, true),
    ("InternalError", Health::Unhealthy, true),
    ("CannotCreateVolumeError", Health::Unhealthy, true),
    ("ResourceNotFoundException", Health::Unhealthy, true),
    ("CannotStartContainerError", Health::Unhealthy, true),
    ("SpotInterruptionError", Health::Warning, false),
    ("CannotStopContainerError", Health::Warning, false),
    ("CannotInspectContainerError", Health::Warning, false),
];

pub fn ecs_task_health(obj: &Value) -> HealthStatus {
    let last_status = lookup_str(obj, &["LastStatus"]).unwrap_or_default();
    let mut hs = HealthStatus {
        status: StatusCode::new(human_case(last_status)),
        ..Default::default()
    };

    if let Some(reported) = lookup_str(obj, &["HealthStatus"]) {
        hs.health = Health::parse(&reported.to_ascii_lowercase()).unwrap_or_default();
    }

    match last_status.to_ascii_uppercase().as_str() {
        "RUNNING" => {
            hs.health = Health::Healthy;
            hs.ready = true;
        }
        "STOPPED" | "DELETED" => {
            hs.health = Health::Unknown;
            hs.ready = true;
        }
        _ => {}
    }

    if let Some(stop_code) = lookup_str(obj, &["StopCode"]) {
        hs.status = StatusCode::new(stop_code);
        match stop_code {
            "TaskFailedToStart" => hs.health = Health::Unhealthy,
            "EssentialContainerExited" => {
                hs.status = StatusCode::CRASHED;
                hs.health = Health::Unhealthy;
            }
            "UserInitiated" => hs.status = StatusCode::STOPPED,
            "ServiceSchedulerInitiated" => hs.status = StatusCode::TERMINATING,
            _ => {}
        }
    }

    if let Some((reason, detail)) = lookup_str(obj, &["StoppedReason"])
        .and_then(|r| r.split_once(':'))
        .filter(|(reason, _)| !reason.trim().is_empty())
    {
        let reason = reason.trim();
        let (health, ready) = STOPPED_REASONS
            .iter()
            .find(|(name, _, _)| *name == reason)
            .map(|(_, health, ready)| (*health, *ready))
            .unwrap_or((Health::Unhealthy, false));
        hs.status = StatusCode::new(reason);
        hs.message = detail.trim().to_string();
        hs.health = health;
        hs.ready = ready;
    }

    hs
}
