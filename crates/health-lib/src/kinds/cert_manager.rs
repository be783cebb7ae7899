//! cert-manager Certificates and CertificateRequests
//!
//! Both kinds are read untyped. Timestamps that fail to parse surface as
//! [`HealthError::Timestamp`](crate::error::HealthError::Timestamp) and end up
//! as an `Unknown` verdict.

use super::{CheckResult, EvalContext};
use crate::conditions::{Condition, GenericStatus};
use crate::models::{Health, HealthStatus, StatusCode};
use crate::resource::Resource;
use crate::util::format_duration;
use chrono::{DateTime, Duration, Utc};

/// A manually triggered or first-time issuance should finish within this window.
pub const CERT_ISSUING_OVERDUE_MINUTES: i64 = 30;
/// An approved request should be signed within this window.
pub const CERT_REQUEST_APPROVED_OVERDUE_MINUTES: i64 = 60;
/// Issuance still running after these windows is a warning, then unhealthy.
pub const CERT_ISSUING_WARNING_MINUTES: i64 = 15;
pub const CERT_ISSUING_FAILED_MINUTES: i64 = 60;

/// Issuing reasons that mean the stored certificate breaks its spec.
const POLICY_VIOLATIONS: &[(&str, &str)] = &[
    ("MissingData", "Issuing certificate as Secret does not contain a certificate"),
    ("InvalidKeyPair", "Issuing certificate as Secret contains an invalid key-pair"),
    ("InvalidCertificate", "Issuing certificate as Secret contains an invalid certificate"),
    ("SecretMismatch", "Issuing certificate as Secret does not match the Certificate spec"),
    ("IncorrectCertificate", "Issuing certificate as Secret was issued for a different Certificate"),
    ("SecretTemplateMismatch", "Secret labels or annotations do not match the secret template"),
    ("SecretManagedMetadataMismatch", "Secret metadata managed by cert-manager was modified"),
    ("AdditionalOutputFormatsMismatch", "Secret additional output formats do not match the Certificate spec"),
    ("ManagedFieldsParseError", "Secret managed fields could not be parsed"),
    ("SecretOwnerRefMismatch", "Secret owner reference does not match the Certificate"),
];

fn policy_violation(reason: &str) -> Option<&'static str> {
    POLICY_VIOLATIONS
        .iter()
        .find(|(r, _)| *r == reason)
        .map(|(_, message)| *message)
}

/// When a condition entered its current state, falling back to the resource creation.
fn since(condition: &Condition, resource: &Resource, ctx: &EvalContext<'_>) -> Option<Duration> {
    condition
        .transition_time()
        .or_else(|| resource.creation_timestamp())
        .map(|at| ctx.since(at))
}

pub fn certificate_request_health(resource: &Resource, ctx: &EvalContext<'_>) -> CheckResult {
    let status = GenericStatus::from_resource(resource);

    for type_ in ["Denied", "InvalidRequest"] {
        if let Some(c) = status.find_condition(type_).filter(|c| c.is_true()) {
            return Ok(Some(
                HealthStatus::new(Health::Unhealthy, StatusCode::new(type_))
                    .with_ready(true)
                    .with_message(c.message.as_str()),
            ));
        }
    }

    if let Some(ready) = status.find_condition("Ready") {
        let reason = if ready.reason.is_empty() { "Issued" } else { ready.reason.as_str() };
        if ready.is_true() {
            return Ok(Some(
                HealthStatus::new(Health::Healthy, StatusCode::new(reason))
                    .with_ready(true)
                    .with_message(ready.message.as_str()),
            ));
        }
        match ready.reason.as_str() {
            "Failed" | "Denied" => {
                return Ok(Some(
                    HealthStatus::new(Health::Unhealthy, StatusCode::new(reason))
                        .with_ready(true)
                        .with_message(ready.message.as_str()),
                ));
            }
            "Pending" => {
                let overdue = since(ready, resource, ctx)
                    .is_some_and(|pending| pending > ctx.settings.cert_renewal_grace());
                let health = if overdue { Health::Unhealthy } else { Health::Unknown };
                return Ok(Some(
                    HealthStatus::new(health, StatusCode::PENDING)
                        .with_message(ready.message.as_str()),
                ));
            }
            _ => {}
        }
    }

    if let Some(approved) = status.find_condition("Approved").filter(|c| c.is_true()) {
        let overdue = since(approved, resource, ctx)
            .is_some_and(|d| d > Duration::minutes(CERT_REQUEST_APPROVED_OVERDUE_MINUTES));
        let health = if overdue { Health::Unhealthy } else { Health::Healthy };
        return Ok(Some(
            HealthStatus::new(health, StatusCode::new("Approved"))
                .with_message(approved.message.as_str()),
        ));
    }

    Ok(None)
}

fn issuing_health(
    issuing: &Condition,
    resource: &Resource,
    renewal: Option<DateTime<Utc>>,
    not_before: Option<DateTime<Utc>>,
    ctx: &EvalContext<'_>,
) -> HealthStatus {
    let reason = issuing.reason.as_str();
    match reason {
        "ManuallyTriggered" | "DoesNotExist" => {
            let overdue = since(issuing, resource, ctx)
                .is_some_and(|d| d > Duration::minutes(CERT_ISSUING_OVERDUE_MINUTES));
            let health = if overdue { Health::Unhealthy } else { Health::Unknown };
            return HealthStatus::new(health, StatusCode::ISSUING)
                .with_message(issuing.message.as_str());
        }
        "Renewing" => {
            let grace = ctx.settings.cert_renewal_grace();
            return match renewal.map(|at| ctx.since(at)) {
                Some(elapsed) if elapsed > grace => {
                    HealthStatus::new(Health::Warning, StatusCode::RENEWING).with_message(format!(
                        "Certificate has been in renewal state for > {}",
                        format_duration(elapsed)
                    ))
                }
                _ => HealthStatus::new(Health::Healthy, StatusCode::RENEWING)
                    .with_message(issuing.message.as_str()),
            };
        }
        _ => {}
    }

    if let Some(message) = policy_violation(reason) {
        return HealthStatus::new(Health::Unhealthy, StatusCode::new(reason))
            .with_ready(true)
            .with_message(message);
    }

    let age = not_before
        .or_else(|| issuing.transition_time())
        .or_else(|| resource.creation_timestamp())
        .map(|at| ctx.since(at))
        .unwrap_or_else(Duration::zero);
    let health = if age > Duration::minutes(CERT_ISSUING_FAILED_MINUTES) {
        Health::Unhealthy
    } else if age > Duration::minutes(CERT_ISSUING_WARNING_MINUTES) {
        Health::Warning
    } else {
        Health::Unknown
    };
    let status = if reason.is_empty() { StatusCode::ISSUING } else { StatusCode::new(reason) };
    HealthStatus::new(health, status).with_message(issuing.message.as_str())
}

/// Expiry and overdue renewal, checked whatever the Issuing condition says.
fn expiry_health(
    resource: &Resource,
    not_after: Option<DateTime<Utc>>,
    renewal: Option<DateTime<Utc>>,
    ctx: &EvalContext<'_>,
) -> Option<HealthStatus> {
    if let Some(not_after) = not_after {
        if not_after < ctx.now {
            return Some(
                HealthStatus::new(Health::Unhealthy, StatusCode::EXPIRED)
                    .with_ready(true)
                    .with_message("Certificate has expired"),
            );
        }
        if not_after - ctx.now < ctx.settings.cert_expiry_warning() {
            let raw = resource.get_str(&["status", "notAfter"]).unwrap_or_default();
            return Some(
                HealthStatus::new(Health::Warning, StatusCode::WARNING)
                    .with_ready(true)
                    .with_message(format!("Certificate is expiring soon ({raw})")),
            );
        }
    }

    let renewal = renewal?;
    if ctx.since(renewal) > ctx.settings.cert_renewal_grace() {
        let raw = resource.get_str(&["status", "renewalTime"]).unwrap_or_default();
        return Some(
            HealthStatus::new(Health::Warning, StatusCode::WARNING)
                .with_ready(true)
                .with_message(format!("Certificate should have been renewed at {raw}")),
        );
    }
    None
}

pub fn certificate_health(resource: &Resource, ctx: &EvalContext<'_>) -> CheckResult {
    let not_after = resource.try_time(&["status", "notAfter"])?;
    let not_before = resource.try_time(&["status", "notBefore"])?;
    let renewal = resource.try_time(&["status", "renewalTime"])?;

    let expiry = expiry_health(resource, not_after, renewal, ctx);
    let status = GenericStatus::from_resource(resource);
    let issuing = status
        .find_condition("Issuing")
        .filter(|c| c.is_true())
        .map(|c| issuing_health(c, resource, renewal, not_before, ctx));

    // The worse verdict wins; on a tie the Issuing detail is kept.
    Ok(match (issuing, expiry) {
        (Some(issuing), Some(expiry)) if expiry.health > issuing.health => Some(expiry),
        (Some(issuing), _) => Some(issuing),
        (None, expiry) => expiry,
    })
}
