//! Mutable per-Host options, applied live at the start of the next tick.

use crate::core::domain::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_SCAN_INTERVAL_SECS: u64 = 20;
pub const MIN_SCAN_INTERVAL_SECS: u64 = 5;
pub const MAX_SCAN_INTERVAL_SECS: u64 = 3600;
pub const DEFAULT_IP_PREFIX: &str = "192.168.";

/// How a guest's preferred address is chosen, as configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum IpMode {
    #[default]
    #[serde(rename = "prefer_192168")]
    Prefer192168,
    #[serde(rename = "prefer_private")]
    PreferPrivate,
    #[serde(rename = "any")]
    Any,
    #[serde(rename = "custom_prefix")]
    CustomPrefix,
}

/// Resolved selection rule handed to the preferred-IP service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpPolicy {
    Prefer192168,
    PreferPrivate,
    Any,
    CustomPrefix(String),
}

/// Options that may change while a Host is running.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct HostOptions {
    pub scan_interval_secs: u64,
    pub ip_mode: IpMode,
    /// Only consulted in `custom_prefix` mode.
    pub ip_prefix: String,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            scan_interval_secs: DEFAULT_SCAN_INTERVAL_SECS,
            ip_mode: IpMode::default(),
            ip_prefix: DEFAULT_IP_PREFIX.to_string(),
        }
    }
}

impl HostOptions {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(MIN_SCAN_INTERVAL_SECS..=MAX_SCAN_INTERVAL_SECS).contains(&self.scan_interval_secs) {
            return Err(ValidationError::Field {
                field: "scan_interval_secs".to_string(),
                message: format!(
                    "Scan interval must be between {} and {} seconds, got {}",
                    MIN_SCAN_INTERVAL_SECS, MAX_SCAN_INTERVAL_SECS, self.scan_interval_secs
                ),
            });
        }
        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn ip_policy(&self) -> IpPolicy {
        match self.ip_mode {
            IpMode::Prefer192168 => IpPolicy::Prefer192168,
            IpMode::PreferPrivate => IpPolicy::PreferPrivate,
            IpMode::Any => IpPolicy::Any,
            IpMode::CustomPrefix => IpPolicy::CustomPrefix(self.ip_prefix.trim().to_string()),
        }
    }
}
