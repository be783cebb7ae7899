//! Jobs and CronJobs

use super::{typed, CheckResult, EvalContext};
use crate::models::{Health, HealthStatus, StatusCode};
use crate::resource::Resource;
use crate::util::{format_duration, format_time};
use k8s_openapi::api::batch::v1::{CronJob, Job};

pub fn job_health(resource: &Resource, _ctx: &EvalContext<'_>) -> CheckResult {
    let job: Job = typed(resource)?;
    let conditions = job
        .status
        .and_then(|s| s.conditions)
        .unwrap_or_default();

    for condition in conditions.iter().filter(|c| c.status == "True") {
        let message = condition.message.clone().unwrap_or_default();
        let hs = match condition.type_.as_str() {
            "Failed" => {
                let reason = condition.reason.as_deref().unwrap_or("Failed");
                HealthStatus::new(Health::Unhealthy, StatusCode::new(reason)).with_ready(true)
            }
            "Complete" => HealthStatus::new(Health::Healthy, StatusCode::COMPLETED).with_ready(true),
            "Suspended" => HealthStatus::new(Health::Unknown, StatusCode::SUSPENDED),
            _ => continue,
        };
        return Ok(Some(hs.with_message(message)));
    }

    Ok(Some(HealthStatus::new(Health::Healthy, StatusCode::RUNNING)))
}

pub fn cron_job_health(resource: &Resource, _ctx: &EvalContext<'_>) -> CheckResult {
    let cron_job: CronJob = typed(resource)?;
    let status = cron_job.status.unwrap_or_default();

    let Some(scheduled) = status.last_schedule_time.map(|t| t.0) else {
        return Ok(Some(HealthStatus::unknown("Not scheduled yet")));
    };
    let Some(succeeded) = status.last_successful_time.map(|t| t.0) else {
        return Ok(Some(
            HealthStatus::new(Health::Unhealthy, StatusCode::ERROR)
                .with_message("No successful run yet"),
        ));
    };

    if status.active.is_some_and(|active| !active.is_empty()) {
        return Ok(Some(
            HealthStatus::new(Health::Healthy, StatusCode::RUNNING)
                .with_message(format!("Running since {}", format_time(&scheduled))),
        ));
    }

    // a failed run still ran, so the CronJob stays ready
    if succeeded < scheduled {
        return Ok(Some(
            HealthStatus::new(Health::Unhealthy, StatusCode::ERROR)
                .with_ready(true)
                .with_message(format!(
                    "Last run failed, last successful run was {}",
                    format_time(&succeeded)
                )),
        ));
    }

    Ok(Some(
        HealthStatus::new(Health::Healthy, StatusCode::COMPLETED)
            .with_ready(true)
            .with_message(format!(
                "Last run at {} in {}",
                format_time(&scheduled),
                format_duration(succeeded - scheduled)
            )),
    ))
}
