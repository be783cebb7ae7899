//! Replica health shared by Deployments, ReplicaSets, StatefulSets and DaemonSets
//!
//! Freshly created workloads get a start-up grace window sized from the
//! readiness probes of their pod template. Inside the window missing replicas
//! are reported as `Unknown` instead of `Unhealthy`.

use crate::conditions::Condition;
use crate::models::{Health, HealthStatus, StatusCode};
use chrono::{DateTime, Duration, Utc};
use k8s_openapi::api::core::v1::Container;
use std::fmt;

/// Minimum start-up grace window for any workload, in minutes
pub const START_BUFFER_MINUTES: i64 = 10;

const PROGRESS_DEADLINE_EXCEEDED: &str = "ProgressDeadlineExceeded";
const REPLICA_SET_UPDATED: &str = "ReplicaSetUpdated";

/// Replica counts and the facts around them.
#[derive(Debug, Clone, Default)]
pub struct ReplicaStatus {
    pub desired: i32,
    pub replicas: i32,
    pub ready: i32,
    pub updated: i32,
    pub unavailable: i32,
    /// Containers of the pod template
    pub containers: Vec<Container>,
    pub created: Option<DateTime<Utc>>,
    /// The controller has seen the latest spec generation
    pub generation_observed: bool,
    pub conditions: Vec<Condition>,
}

impl ReplicaStatus {
    fn condition(&self, type_: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.type_ == type_)
    }
}

impl fmt::Display for ReplicaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ready", self.ready, self.desired)?;
        if self.replicas != self.updated {
            write!(f, ", {} updating", self.replicas - self.updated)?;
        }
        if self.replicas > self.desired {
            write!(f, ", {} terminating", self.replicas - self.desired)?;
        }
        Ok(())
    }
}

fn truncate_to_minute(duration: Duration) -> Duration {
    Duration::minutes(duration.num_minutes())
}

/// Start-up grace window: the slowest readiness probe to give up, at least
/// [`START_BUFFER_MINUTES`], truncated to the minute.
pub fn start_deadline(containers: &[Container]) -> Duration {
    let buffer = Duration::minutes(START_BUFFER_MINUTES);
    let slowest = containers
        .iter()
        .filter_map(|c| c.readiness_probe.as_ref())
        .map(|probe| {
            let initial = i64::from(probe.initial_delay_seconds.unwrap_or(0));
            let failures = i64::from(probe.failure_threshold.unwrap_or(0));
            let period = i64::from(probe.period_seconds.unwrap_or(0));
            let timeout = i64::from(probe.timeout_seconds.unwrap_or(0));
            Duration::seconds(initial + failures * (period + timeout))
        })
        .max()
        .unwrap_or(buffer);
    truncate_to_minute(slowest.max(buffer))
}

/// Whether a workload created at `created` is still inside its grace window.
pub fn is_starting(created: Option<DateTime<Utc>>, now: DateTime<Utc>, containers: &[Container]) -> bool {
    match created {
        Some(created) => truncate_to_minute(now - created).abs() < start_deadline(containers),
        None => false,
    }
}

pub fn replica_health(s: &ReplicaStatus, now: DateTime<Utc>) -> HealthStatus {
    let mut hs = HealthStatus {
        message: s.to_string(),
        ..Default::default()
    };

    if s.desired == 0 && s.replicas == 0 {
        hs.status = StatusCode::SCALED_TO_ZERO;
        hs.health = Health::Unknown;
        hs.ready = true;
        return hs;
    }

    if let Some(failure) = s.condition("ReplicaFailure").filter(|c| c.is_true()) {
        hs.status = StatusCode::FAILED_CREATE;
        hs.health = Health::Unhealthy;
        hs.message = failure.message.clone();
        hs.ready = true;
        return hs;
    }

    hs.health = if s.ready >= s.desired {
        Health::Healthy
    } else if s.ready > 0 {
        Health::Warning
    } else {
        Health::Unhealthy
    };

    let starting = is_starting(s.created, now, &s.containers);
    let progressing = s.condition("Progressing");
    let deadline_exceeded =
        !starting && progressing.is_some_and(|p| p.reason == PROGRESS_DEADLINE_EXCEEDED);

    if s.replicas == 0 {
        if deadline_exceeded {
            hs.status = StatusCode::FAILED_CREATE;
            hs.health = Health::Unhealthy;
        } else {
            hs.status = StatusCode::PENDING;
            hs.health = Health::Unknown;
        }
    } else if s.ready == 0 && starting {
        hs.status = StatusCode::STARTING;
    } else if s.ready == 0 && deadline_exceeded {
        hs.status = StatusCode::CRASH_LOOP_BACKOFF;
    }

    if deadline_exceeded {
        hs.status = StatusCode::ROLLOUT_FAILED;
        hs.health = hs.health.worst(Health::Warning);
    } else if s.desired == 0 && s.replicas > 0 {
        hs.status = StatusCode::SCALING_DOWN;
    } else if s.ready == s.desired
        && s.desired == s.updated
        && s.replicas == s.desired
        && s.generation_observed
    {
        hs.status = StatusCode::RUNNING;
    } else if !starting && (s.desired != s.updated || !s.generation_observed) {
        hs.status = StatusCode::ROLLING_OUT;
    } else if s.replicas > s.desired {
        hs.status = StatusCode::SCALING_DOWN;
    } else if s.replicas < s.desired {
        hs.status = StatusCode::SCALING_UP;
    }

    if hs.status.is_empty() {
        hs.status = StatusCode::RUNNING;
    }

    if starting && matches!(hs.health, Health::Unhealthy | Health::Warning) {
        hs.health = Health::Unknown;
    }

    hs.ready = match progressing {
        Some(p) => p.is_true() && p.reason != REPLICA_SET_UPDATED,
        None => s.ready >= s.desired && hs.status == StatusCode::RUNNING,
    };

    hs
}
