//! Core data models for health verdicts
//!
//! These types are shared by every classifier in the crate and form the
//! public output contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Severity of a resource's health.
///
/// Declaration order is the severity order: `Unknown < Healthy < Warning < Unhealthy`.
/// Unknown is the weakest value, so merging it with any concrete signal keeps
/// the concrete signal.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    #[default]
    Unknown,
    Healthy,
    Warning,
    Unhealthy,
}

impl Health {
    pub const ALL: [Health; 4] = [
        Health::Unknown,
        Health::Healthy,
        Health::Warning,
        Health::Unhealthy,
    ];

    /// Returns the operand with the highest severity.
    pub fn worst(self, other: Health) -> Health {
        self.max(other)
    }

    /// Highest severity of a set, `Unknown` when empty.
    pub fn worst_of(values: impl IntoIterator<Item = Health>) -> Health {
        values.into_iter().max().unwrap_or_default()
    }

    /// Severity comparison that reports `true` for equal values.
    ///
    /// Callers such as the CLI exit-code mapping depend on `Unhealthy`
    /// being "worse than" `Unhealthy`.
    pub fn is_worse_than(self, other: Health) -> bool {
        self >= other
    }

    pub fn compare_to(self, other: Health) -> std::cmp::Ordering {
        self.cmp(&other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Health::Unknown => "unknown",
            Health::Healthy => "healthy",
            Health::Warning => "warning",
            Health::Unhealthy => "unhealthy",
        }
    }

    /// Parses the lowercase wire form.
    pub fn parse(value: &str) -> Option<Health> {
        Health::ALL.into_iter().find(|h| h.as_str() == value)
    }
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Open status tag such as `Running` or `CrashLoopBackOff`.
///
/// The associated constants are the canonical vocabulary; any other string
/// (a condition reason, a cloud state) is equally valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(Cow<'static, str>);

impl StatusCode {
    pub const UNKNOWN: StatusCode = StatusCode::from_static("Unknown");
    pub const PROGRESSING: StatusCode = StatusCode::from_static("Progressing");
    pub const HEALTHY: StatusCode = StatusCode::from_static("Healthy");
    pub const SUSPENDED: StatusCode = StatusCode::from_static("Suspended");
    pub const DEGRADED: StatusCode = StatusCode::from_static("Degraded");
    pub const MISSING: StatusCode = StatusCode::from_static("Missing");
    pub const EVICTED: StatusCode = StatusCode::from_static("Evicted");
    pub const COMPLETED: StatusCode = StatusCode::from_static("Completed");
    pub const CRASH_LOOP_BACKOFF: StatusCode = StatusCode::from_static("CrashLoopBackOff");
    pub const CRASHED: StatusCode = StatusCode::from_static("Crashed");
    pub const CREATING: StatusCode = StatusCode::from_static("Creating");
    pub const DELETED: StatusCode = StatusCode::from_static("Deleted");
    pub const DELETING: StatusCode = StatusCode::from_static("Deleting");
    pub const TERMINATING: StatusCode = StatusCode::from_static("Terminating");
    pub const TERMINATING_STALLED: StatusCode = StatusCode::from_static("TerminatingStalled");
    pub const ERROR: StatusCode = StatusCode::from_static("Error");
    pub const ROLLOUT_FAILED: StatusCode = StatusCode::from_static("Rollout Failed");
    pub const INACCESSIBLE: StatusCode = StatusCode::from_static("Inaccessible");
    pub const INFO: StatusCode = StatusCode::from_static("Info");
    pub const PENDING: StatusCode = StatusCode::from_static("Pending");
    pub const MAINTENANCE: StatusCode = StatusCode::from_static("Maintenance");
    pub const SCALING: StatusCode = StatusCode::from_static("Scaling");
    pub const RESTARTING: StatusCode = StatusCode::from_static("Restarting");
    pub const STARTING: StatusCode = StatusCode::from_static("Starting");
    pub const FAILED: StatusCode = StatusCode::from_static("Failed");
    pub const FAILED_CREATE: StatusCode = StatusCode::from_static("Failed Create");
    pub const UNSCHEDULABLE: StatusCode = StatusCode::from_static("Unschedulable");
    pub const UPGRADE_FAILED: StatusCode = StatusCode::from_static("UpgradeFailed");
    pub const OOM_KILLED: StatusCode = StatusCode::from_static("OOMKilled");
    pub const SCALING_UP: StatusCode = StatusCode::from_static("Scaling Up");
    pub const SCALED_TO_ZERO: StatusCode = StatusCode::from_static("Scaled to Zero");
    pub const SCALING_DOWN: StatusCode = StatusCode::from_static("Scaling Down");
    pub const RUNNING: StatusCode = StatusCode::from_static("Running");
    pub const ROLLING_OUT: StatusCode = StatusCode::from_static("Rolling Out");
    pub const UNHEALTHY: StatusCode = StatusCode::from_static("Unhealthy");
    pub const UPDATING: StatusCode = StatusCode::from_static("Updating");
    pub const WARNING: StatusCode = StatusCode::from_static("Warning");
    pub const STOPPED: StatusCode = StatusCode::from_static("Stopped");
    pub const STOPPING: StatusCode = StatusCode::from_static("Stopping");
    pub const EXPIRED: StatusCode = StatusCode::from_static("Expired");
    pub const EXPIRING: StatusCode = StatusCode::from_static("Expiring");
    pub const ISSUING: StatusCode = StatusCode::from_static("Issuing");
    pub const RENEWING: StatusCode = StatusCode::from_static("Renewing");
    pub const READY: StatusCode = StatusCode::from_static("Ready");

    pub const fn from_static(value: &'static str) -> StatusCode {
        StatusCode(Cow::Borrowed(value))
    }

    pub fn new(value: impl Into<String>) -> StatusCode {
        StatusCode(Cow::Owned(value.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Generic reconciliation states that carry no concrete verdict and may be
    /// refined by an override or by the condition evaluator.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self.as_str(), "Suspended" | "Degraded" | "Progressing")
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StatusCode {
    fn from(value: &str) -> Self {
        StatusCode::new(value)
    }
}

impl From<String> for StatusCode {
    fn from(value: String) -> Self {
        StatusCode(Cow::Owned(value))
    }
}

impl PartialEq<str> for StatusCode {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for StatusCode {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// Health verdict for a single resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub ready: bool,
    pub health: Health,
    #[serde(default, skip_serializing_if = "StatusCode::is_empty")]
    pub status: StatusCode,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl HealthStatus {
    pub fn new(health: Health, status: StatusCode) -> Self {
        Self {
            health,
            status,
            ..Default::default()
        }
    }

    /// Bare `Unknown` verdict carrying only a message.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNKNOWN,
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_ready(mut self, ready: bool) -> Self {
        self.ready = ready;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Combines verdicts: `ready` is the conjunction, `health` the worst,
    /// `status` the first non-empty and messages are joined with `", "`.
    pub fn merge<'a>(mut self, others: impl IntoIterator<Item = &'a HealthStatus>) -> HealthStatus {
        for other in others {
            self.ready = self.ready && other.ready;
            self.health = self.health.worst(other.health);
            if self.status.is_empty() {
                self.status = other.status.clone();
            }
            self.append_message(&other.message);
        }
        self
    }

    pub fn append_message(&mut self, message: &str) {
        if message.is_empty() {
            return;
        }
        if !self.message.is_empty() {
            self.message.push_str(", ");
        }
        self.message.push_str(message);
    }

    pub fn prepend_message(&mut self, message: &str) {
        if message.is_empty() {
            return;
        }
        if self.message.is_empty() {
            self.message = message.to_string();
        } else {
            self.message = format!("{message}, {}", self.message);
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.status, self.health, self.message)
    }
}
