//! Flanksource canaries and Mission Control notifications

use super::{CheckResult, EvalContext};
use crate::conditions::GenericStatus;
use crate::models::{Health, HealthStatus, StatusCode};
use crate::resource::Resource;
use crate::util::format_duration;
use chrono::Duration;
use regex::Regex;
use std::sync::OnceLock;

/// Passing canaries below this 1h uptime percentage are a warning.
pub const CANARY_UPTIME_WARNING_PERCENT: f64 = 80.0;
/// Notification failures within these windows are unhealthy, then a warning.
pub const NOTIFICATION_FAILED_UNHEALTHY_HOURS: i64 = 1;
pub const NOTIFICATION_FAILED_WARNING_HOURS: i64 = 12;

fn uptime_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?:\((\d+\.?\d*)%\))|(\d+\.?\d*)%").expect("uptime pattern is valid")
    })
}

/// Percentage out of an uptime summary such as `"12 passed, 1 failed (92.3%)"`.
pub fn parse_uptime(uptime: &str) -> Option<f64> {
    let captures = uptime_pattern().captures(uptime)?;
    captures
        .get(1)
        .or_else(|| captures.get(2))
        .and_then(|m| m.as_str().parse().ok())
}

pub fn canary_health(resource: &Resource, _ctx: &EvalContext<'_>) -> CheckResult {
    let canary_status = resource.get_str(&["status", "status"]).unwrap_or_default();

    if let Some(error) = resource.get_str(&["status", "errorMessage"]) {
        let status = if canary_status.is_empty() { StatusCode::ERROR } else { StatusCode::new(canary_status) };
        return Ok(Some(HealthStatus::new(Health::Unhealthy, status).with_message(error)));
    }

    let uptime = resource.get_str(&["status", "uptime1h"]).unwrap_or_default();
    let message = match resource.get_str(&["status", "message"]) {
        Some(message) => message.to_string(),
        None => format!("uptime: {uptime}"),
    };

    let (health, ready) = match canary_status {
        "Passed" => {
            let degraded = parse_uptime(uptime).is_some_and(|p| p < CANARY_UPTIME_WARNING_PERCENT);
            (if degraded { Health::Warning } else { Health::Healthy }, true)
        }
        "Failed" => (Health::Unhealthy, true),
        // needs manual intervention
        "Invalid" => (Health::Unhealthy, false),
        _ => (Health::Unknown, true),
    };

    Ok(Some(
        HealthStatus::new(health, StatusCode::new(canary_status))
            .with_ready(ready)
            .with_message(message),
    ))
}

fn health_code(health: Health) -> StatusCode {
    match health {
        Health::Healthy => StatusCode::HEALTHY,
        Health::Warning => StatusCode::WARNING,
        Health::Unhealthy => StatusCode::UNHEALTHY,
        Health::Unknown => StatusCode::UNKNOWN,
    }
}

pub fn notification_health(resource: &Resource, ctx: &EvalContext<'_>) -> CheckResult {
    if let Some(error) = resource.get_str(&["status", "error"]) {
        return Ok(Some(
            HealthStatus::new(Health::Unhealthy, StatusCode::ERROR).with_message(error),
        ));
    }

    let status = GenericStatus::from_resource(resource);
    let count = |field: &str| status.int(field).unwrap_or(0);
    let (sent, failed, pending) = (count("sent"), count("failed"), count("pending"));

    let mut health = if sent > 0 {
        if failed > 0 || pending > 0 {
            Health::Warning
        } else {
            Health::Healthy
        }
    } else if failed > 0 {
        Health::Unhealthy
    } else if pending > 0 {
        Health::Warning
    } else {
        Health::Unknown
    };

    let mut message = String::new();
    if let Some(last_failed) = resource.try_time(&["status", "lastFailed"])? {
        let elapsed = ctx.since(last_failed);
        if elapsed <= Duration::hours(NOTIFICATION_FAILED_WARNING_HOURS) {
            health = if elapsed <= Duration::hours(NOTIFICATION_FAILED_UNHEALTHY_HOURS) {
                Health::Unhealthy
            } else {
                Health::Warning
            };
            message = format!("Failed {} ago", format_duration(elapsed));
        }
    }

    Ok(Some(
        HealthStatus::new(health, health_code(health))
            .with_ready(true)
            .with_message(message),
    ))
}
