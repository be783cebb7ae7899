//! Azure resources
//!
//! App registration secrets and certificates run an expiry state machine;
//! everything else is classified from its `provisioningState`.

use crate::config::Settings;
use crate::models::{Health, HealthStatus, StatusCode};
use crate::resource::lookup_str;
use crate::status_name::health_from_status_name;
use crate::util::{format_duration, parse_time};
use chrono::{DateTime, Utc};
use serde_json::Value;

const APP_REGISTRATION_PREFIX: &str = "Azure::AppRegistration::";

const PROVISIONING_STATES: &[(&str, Health, bool)] = &[
    ("Succeeded", Health::Healthy, true),
    ("Failed", Health::Unhealthy, true),
    ("Canceled", Health::Warning, true),
    ("Creating", Health::Unknown, false),
    ("Updating", Health::Healthy, false),
    ("Deleting", Health::Unknown, false),
    ("Accepted", Health::Unknown, false),
];

pub fn azure_health(
    config_type: &str,
    obj: &Value,
    settings: &Settings,
    now: DateTime<Utc>,
) -> HealthStatus {
    match config_type.strip_prefix(APP_REGISTRATION_PREFIX) {
        Some(credential @ ("ClientSecret" | "Certificate")) => {
            credential_health(credential, obj, settings, now)
        }
        _ => provisioning_health(obj),
    }
}

fn credential_health(
    credential: &str,
    obj: &Value,
    settings: &Settings,
    now: DateTime<Utc>,
) -> HealthStatus {
    let Some(end) = lookup_str(obj, &["endDateTime"]) else {
        return HealthStatus::default().with_message("End date time is not set");
    };
    let Some(end_time) = parse_time(end) else {
        return HealthStatus::default().with_message(format!("{end} is not a valid date time"));
    };

    // Compare the remaining time, not `now + window`, which overflows for large windows.
    let remaining = end_time - now;
    if end_time < now {
        HealthStatus::new(Health::Unhealthy, StatusCode::EXPIRED)
            .with_message(format!("{credential} has expired"))
    } else if remaining < settings.azure_secret_expiry_warning() {
        HealthStatus::new(Health::Warning, StatusCode::EXPIRING).with_message(format!(
            "{credential} is expiring in {}",
            format_duration(remaining)
        ))
    } else {
        HealthStatus::new(Health::Healthy, StatusCode::HEALTHY)
            .with_message(format!("{credential} is valid"))
    }
}

fn provisioning_health(obj: &Value) -> HealthStatus {
    let state = lookup_str(obj, &["properties", "provisioningState"])
        .or_else(|| lookup_str(obj, &["provisioningState"]));
    let Some(state) = state else {
        return HealthStatus::default();
    };

    match PROVISIONING_STATES
        .iter()
        .find(|(name, _, _)| name.eq_ignore_ascii_case(state))
    {
        Some((name, health, ready)) => {
            HealthStatus::new(*health, StatusCode::from_static(*name)).with_ready(*ready)
        }
        None => health_from_status_name(state, &[]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        parse_time("2024-07-01T00:00:00Z").unwrap()
    }

    fn secret(end: &str) -> Value {
        json!({"displayName": "deploy", "keyId": "abc", "endDateTime": end})
    }

    #[test]
    fn test_client_secret_valid() {
        let hs = azure_health(
            "Azure::AppRegistration::ClientSecret",
            &secret("2025-07-01T00:00:00Z"),
            &Settings::default(),
            now(),
        );
        assert_eq!(hs.health, Health::Healthy);
        assert_eq!(hs.status, "Healthy");
        assert_eq!(hs.message, "ClientSecret is valid");
    }

    #[test]
    fn test_client_secret_expiring() {
        let hs = azure_health(
            "Azure::AppRegistration::ClientSecret",
            &secret("2024-07-15T00:00:00Z"),
            &Settings::default(),
            now(),
        );
        assert_eq!(hs.health, Health::Warning);
        assert_eq!(hs.status, "Expiring");
        assert_eq!(hs.message, "ClientSecret is expiring in 14d");
    }

    #[test]
    fn test_certificate_expired() {
        let hs = azure_health(
            "Azure::AppRegistration::Certificate",
            &secret("2024-06-01T00:00:00Z"),
            &Settings::default(),
            now(),
        );
        assert_eq!(hs.health, Health::Unhealthy);
        assert_eq!(hs.status, "Expired");
        assert_eq!(hs.message, "Certificate has expired");
    }

    #[test]
    fn test_window_comes_from_settings() {
        let settings = Settings {
            azure_secret_expiry_warning_secs: Duration::days(7).num_seconds() as u64,
            ..Settings::default()
        };
        let hs = azure_health(
            "Azure::AppRegistration::ClientSecret",
            &secret("2024-07-15T00:00:00Z"),
            &settings,
            now(),
        );
        assert_eq!(hs.health, Health::Healthy);
    }

    #[test]
    fn test_window_boundary() {
        let settings = Settings {
            azure_secret_expiry_warning_secs: Duration::days(14).num_seconds() as u64,
            ..Settings::default()
        };
        let hs = azure_health(
            "Azure::AppRegistration::ClientSecret",
            &secret("2024-07-15T00:00:00Z"),
            &settings,
            now(),
        );
        assert_eq!(hs.health, Health::Healthy);

        let hs = azure_health(
            "Azure::AppRegistration::ClientSecret",
            &secret("2024-07-14T23:59:59Z"),
            &settings,
            now(),
        );
        assert_eq!(hs.health, Health::Warning);
        assert_eq!(hs.status, "Expiring");
    }

    #[test]
    fn test_huge_window_does_not_overflow() {
        let settings = Settings {
            azure_secret_expiry_warning_secs: u64::MAX,
            ..Settings::default()
        };
        let hs = azure_health(
            "Azure::AppRegistration::ClientSecret",
            &secret("9999-12-31T23:59:59Z"),
            &settings,
            now(),
        );
        assert_eq!(hs.health, Health::Warning);
        assert_eq!(hs.status, "Expiring");
    }

    #[test]
    fn test_missing_or_invalid_end_date() {
        let hs = azure_health(
            "Azure::AppRegistration::ClientSecret",
            &json!({"displayName": "deploy"}),
            &Settings::default(),
            now(),
        );
        assert_eq!(hs.health, Health::Unknown);
        assert_eq!(hs.message, "End date time is not set");

        let hs = azure_health(
            "Azure::AppRegistration::ClientSecret",
            &secret("soon"),
            &Settings::default(),
            now(),
        );
        assert_eq!(hs.health, Health::Unknown);
        assert_eq!(hs.message, "soon is not a valid date time");
    }

    #[test]
    fn test_provisioning_state() {
        let vm = json!({"name": "vm-1", "properties": {"provisioningState": "Failed"}});
        let hs = azure_health("Azure::VirtualMachine", &vm, &Settings::default(), now());
        assert_eq!(hs.health, Health::Unhealthy);
        assert_eq!(hs.status, "Failed");

        let hs = azure_health(
            "Azure::Storage",
            &json!({"provisioningState": "Migrating"}),
            &Settings::default(),
            now(),
        );
        assert_eq!(hs.status, "Migrating");
        assert_eq!(hs.health, Health::Unknown);
    }
}
