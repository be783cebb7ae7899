//! Evaluation settings

use crate::error::Result;
use chrono::Duration;
use serde::Deserialize;
use std::path::Path;

/// Adjustable thresholds used by the time-windowed checks.
///
/// Values are plain seconds so they can come from environment variables
/// (`HEALTH_CERT_EXPIRY_WARNING_SECS=3600`) or a config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Warn when a certificate expires within this window
    #[serde(default = "default_cert_expiry_warning")]
    pub cert_expiry_warning_secs: u64,

    /// Grace period for certificate renewals and pending requests
    #[serde(default = "default_cert_renewal_grace")]
    pub cert_renewal_grace_secs: u64,

    /// Warn when an Azure client secret or certificate expires within this window
    #[serde(default = "default_azure_secret_expiry_warning")]
    pub azure_secret_expiry_warning_secs: u64,
}

fn default_cert_expiry_warning() -> u64 {
    48 * 3600
}

fn default_cert_renewal_grace() -> u64 {
    30 * 60
}

fn default_azure_secret_expiry_warning() -> u64 {
    30 * 24 * 3600
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cert_expiry_warning_secs: default_cert_expiry_warning(),
            cert_renewal_grace_secs: default_cert_renewal_grace(),
            azure_secret_expiry_warning_secs: default_azure_secret_expiry_warning(),
        }
    }
}

impl Settings {
    /// Load settings from `HEALTH_*` environment variables
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from an optional file, overridden by `HEALTH_*` environment variables
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path));
        }
        let config = builder
            .add_source(::config::Environment::with_prefix("HEALTH"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    pub fn cert_expiry_warning(&self) -> Duration {
        secs(self.cert_expiry_warning_secs)
    }

    pub fn cert_renewal_grace(&self) -> Duration {
        secs(self.cert_renewal_grace_secs)
    }

    pub fn azure_secret_expiry_warning(&self) -> Duration {
        secs(self.azure_secret_expiry_warning_secs)
    }
}

fn secs(value: u64) -> Duration {
    let value = i64::try_from(value).unwrap_or(i64::MAX).min(i64::MAX / 1000);
    Duration::seconds(value)
}
