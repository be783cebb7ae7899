//! Pod health
//!
//! Terminal phases map directly. Running and pending pods start from the
//! `Ready` condition and are downgraded by container signals: a waiting
//! container stuck on an error, or a container that terminated within the
//! last day. Young pods get the same start-up grace window as workloads.

use super::replicas::is_starting;
use super::{typed, CheckResult, EvalContext};
use crate::models::{Health, HealthStatus, StatusCode};
use crate::resource::Resource;
use crate::util::format_duration;
use chrono::{DateTime, Duration, Utc};
use k8s_openapi::api::core::v1::{ContainerStateTerminated, ContainerStatus, Pod, PodStatus};

/// A pod stuck terminating this long is worth a warning.
pub const POD_TERMINATING_STUCK_MINUTES: i64 = 15;
/// Container terminations older than this are ignored.
pub const TERMINATION_IGNORE_AFTER_HOURS: i64 = 24;
/// Container terminations younger than this are unhealthy, older ones a warning.
pub const TERMINATION_RECENT_HOURS: i64 = 1;

const EVICTED: &str = "Evicted";
const UNSCHEDULABLE: &str = "Unschedulable";
const OOM_KILLED: &str = "OOMKilled";
const COMPLETED: &str = "Completed";

/// Something a container reports that is worse than the pod's readiness.
#[derive(Debug, Clone)]
struct ContainerSignal {
    health: Health,
    status: String,
    message: String,
}

fn is_error_reason(reason: &str) -> bool {
    reason.starts_with("Err") || reason.ends_with("Error") || reason.ends_with("BackOff")
}

fn waiting_signal(container: &ContainerStatus) -> Option<ContainerSignal> {
    let waiting = container.state.as_ref()?.waiting.as_ref()?;
    let reason = waiting.reason.as_deref().unwrap_or_default();
    if reason.is_empty() || !(is_error_reason(reason) || container.restart_count > 0) {
        return None;
    }
    Some(ContainerSignal {
        health: Health::Unhealthy,
        status: reason.to_string(),
        message: waiting.message.clone().unwrap_or_default(),
    })
}

fn terminated_signal(
    name: &str,
    terminated: &ContainerStateTerminated,
    now: DateTime<Utc>,
) -> Option<ContainerSignal> {
    let reason = terminated.reason.as_deref().unwrap_or_default();
    if reason == COMPLETED && terminated.exit_code == 0 {
        return None;
    }
    // without a finish time the termination cannot be placed in any window
    let finished = terminated.finished_at.as_ref()?.0;
    let age = now - finished;
    if age > Duration::hours(TERMINATION_IGNORE_AFTER_HOURS) {
        return None;
    }

    let health = if age < Duration::hours(TERMINATION_RECENT_HOURS) {
        Health::Unhealthy
    } else {
        Health::Warning
    };
    let message = match terminated.message.as_deref() {
        Some(message) if !message.is_empty() => message.to_string(),
        _ => format!("container {name:?} exited with code {}", terminated.exit_code),
    };
    Some(ContainerSignal {
        health,
        status: if reason.is_empty() { "Error".to_string() } else { reason.to_string() },
        message,
    })
}

fn container_signals(status: &PodStatus, now: DateTime<Utc>) -> Vec<ContainerSignal> {
    let containers = status
        .init_container_statuses
        .iter()
        .flatten()
        .chain(status.container_statuses.iter().flatten());

    let mut signals = Vec::new();
    for container in containers {
        if let Some(signal) = waiting_signal(container) {
            signals.push(signal);
        }
        let terminated = [container.state.as_ref(), container.last_state.as_ref()]
            .into_iter()
            .flatten()
            .filter_map(|state| state.terminated.as_ref());
        for t in terminated {
            if let Some(signal) = terminated_signal(&container.name, t, now) {
                signals.push(signal);
            }
        }
    }
    signals
}

/// The most severe signal; the first one wins a tie.
fn worst_signal(signals: &[ContainerSignal]) -> Option<&ContainerSignal> {
    let worst = Health::worst_of(signals.iter().map(|s| s.health));
    signals.iter().find(|s| s.health == worst)
}

fn failure_message(status: &PodStatus) -> String {
    if let Some(message) = status.message.as_deref().filter(|m| !m.is_empty()) {
        return message.to_string();
    }
    status
        .init_container_statuses
        .iter()
        .flatten()
        .chain(status.container_statuses.iter().flatten())
        .find_map(|c| {
            let terminated = c.state.as_ref()?.terminated.as_ref()?;
            if let Some(message) = terminated.message.as_deref().filter(|m| !m.is_empty()) {
                Some(message.to_string())
            } else if terminated.reason.as_deref() == Some(OOM_KILLED) {
                Some(OOM_KILLED.to_string())
            } else if terminated.exit_code != 0 {
                Some(format!("container {:?} failed with exit code {}", c.name, terminated.exit_code))
            } else {
                None
            }
        })
        .unwrap_or_default()
}

fn terminating(deleted: DateTime<Utc>, ctx: &EvalContext<'_>) -> HealthStatus {
    let stuck_for = ctx.since(deleted);
    let mut hs = HealthStatus::new(Health::Unknown, StatusCode::TERMINATING);
    if stuck_for >= Duration::minutes(POD_TERMINATING_STUCK_MINUTES) {
        hs.health = Health::Warning;
        hs.message = format!("stuck in 'Terminating' for {}", format_duration(stuck_for));
    }
    hs
}

pub fn pod_health(resource: &Resource, ctx: &EvalContext<'_>) -> CheckResult {
    let pod: Pod = typed(resource)?;

    if let Some(deleted) = resource.deletion_timestamp() {
        return Ok(Some(terminating(deleted, ctx)));
    }

    let status = pod.status.unwrap_or_default();
    let pod_message = status.message.clone().unwrap_or_default();

    if status.reason.as_deref() == Some(EVICTED) {
        return Ok(Some(
            HealthStatus::new(Health::Warning, StatusCode::EVICTED)
                .with_ready(true)
                .with_message(pod_message),
        ));
    }

    let conditions = status.conditions.as_deref().unwrap_or_default();
    if let Some(unschedulable) = conditions
        .iter()
        .find(|c| c.reason.as_deref() == Some(UNSCHEDULABLE))
    {
        return Ok(Some(
            HealthStatus::new(Health::Unhealthy, StatusCode::UNSCHEDULABLE)
                .with_message(unschedulable.message.clone().unwrap_or_default()),
        ));
    }

    let phase = status.phase.as_deref().unwrap_or_default();
    let hs = match phase {
        "Succeeded" => HealthStatus::new(Health::Healthy, StatusCode::COMPLETED)
            .with_ready(true)
            .with_message(pod_message),
        "Failed" => HealthStatus::new(Health::Unhealthy, StatusCode::FAILED)
            .with_ready(true)
            .with_message(failure_message(&status)),
        "Running" | "Pending" => {
            let ready = conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True");
            let mut hs = if ready {
                HealthStatus::new(Health::Healthy, StatusCode::RUNNING).with_ready(true)
            } else {
                let status = if phase == "Running" {
                    StatusCode::RUNNING
                } else {
                    StatusCode::PENDING
                };
                HealthStatus::new(Health::Unhealthy, status)
            };
            hs.message = pod_message;

            let signals = container_signals(&status, ctx.now);
            if let Some(signal) = worst_signal(&signals) {
                if signal.health.is_worse_than(hs.health) {
                    hs.health = signal.health;
                    hs.status = StatusCode::new(signal.status.as_str());
                }
                for s in &signals {
                    hs.append_message(&s.message);
                }
            }

            let containers = pod.spec.map(|s| s.containers).unwrap_or_default();
            if hs.health > Health::Warning
                && hs.status != OOM_KILLED
                && is_starting(resource.creation_timestamp(), ctx.now, &containers)
            {
                let previous = hs.status.to_string();
                hs.health = Health::Unknown;
                hs.status = StatusCode::STARTING;
                hs.prepend_message(&previous);
            }
            hs
        }
        _ => HealthStatus::unknown(pod_message),
    };

    Ok(Some(hs))
}
