use crate::core::domain::{
    error::ValidationError,
    value_object::{proxmox_host::ProxmoxHost, proxmox_port::ProxmoxPort},
};
use url::Url;

const API_PREFIX: &str = "api2/json";

/// Base URL of a Proxmox VE API endpoint, e.g. `https://pve.lan:8006/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxmoxUrl(Url);

impl ProxmoxUrl {
    /// Builds the HTTPS base URL for a host and port.
    pub fn new(host: &ProxmoxHost, port: &ProxmoxPort) -> Result<Self, ValidationError> {
        let raw = format!("https://{}:{}/", host.authority(), port.get());
        Url::parse(&raw)
            .map(Self)
            .map_err(|e| ValidationError::Format(format!("Invalid URL format: {}", e)))
    }

    /// Wraps an already-formed base URL (used for plain-HTTP test servers).
    pub(crate) fn new_unchecked(base: &str) -> Result<Self, ValidationError> {
        let normalized = format!("{}/", base.trim_end_matches('/'));
        Url::parse(&normalized)
            .map(Self)
            .map_err(|e| ValidationError::Format(format!("Invalid URL format: {}", e)))
    }

    /// Returns the base URL as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Full URL of an API path relative to `/api2/json`.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}{}/{}",
            self.0.as_str(),
            API_PREFIX,
            path.trim_start_matches('/')
        )
    }
}
