//! Settings for the client and for every configured Host.
//!
//! A settings file is TOML with an optional `[client]` table and one
//! `[[hosts]]` table per Proxmox endpoint:
//!
//! ```toml
//! [client]
//! request_timeout_secs = 10
//! agent_timeout_secs = 5
//!
//! [[hosts]]
//! id = "home"
//! host = "pve.lan"
//! token_id = "root@pam!sync"
//! token_secret = "..."
//! verify_ssl = false
//! scan_interval_secs = 30
//! ip_mode = "prefer_private"
//! ```

use crate::core::domain::{
    error::{PveError, PveResult, ValidationError},
    model::{host_connection::HostConnection, host_options::HostOptions},
    value_object::{DEFAULT_PORT, HostId},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Token-bucket limit applied to every request of one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct RateLimitConfig {
    pub requests_per_second: u32,
    pub burst_size: u32,
}

/// Tuning shared by every `ApiClient`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Timeout of a regular API request.
    pub request_timeout_secs: u64,
    /// Timeout of a guest network query; agents often never answer.
    pub agent_timeout_secs: u64,
    pub rate_limit: Option<RateLimitConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 10,
            agent_timeout_secs: 5,
            rate_limit: None,
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn agent_timeout(&self) -> Duration {
        Duration::from_secs(self.agent_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.request_timeout_secs == 0 || self.agent_timeout_secs == 0 {
            return Err(ValidationError::ConstraintViolation(
                "Timeouts must be at least one second".to_string(),
            ));
        }
        if self
            .rate_limit
            .is_some_and(|rl| rl.requests_per_second == 0 || rl.burst_size == 0)
        {
            return Err(ValidationError::ConstraintViolation(
                "Rate limit and burst size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_verify_ssl() -> bool {
    true
}

/// One configured Proxmox endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct HostSettings {
    pub id: HostId,
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,
    pub token_id: String,
    pub token_secret: SecretString,
    #[serde(flatten)]
    pub options: HostOptions,
}

impl HostSettings {
    pub fn new(
        id: impl Into<HostId>,
        host: impl Into<String>,
        token_id: impl Into<String>,
        token_secret: SecretString,
    ) -> Self {
        Self {
            id: id.into(),
            host: host.into(),
            port: DEFAULT_PORT,
            verify_ssl: true,
            token_id: token_id.into(),
            token_secret,
            options: HostOptions::default(),
        }
    }

    /// Validated connection parameters.
    pub fn connection(&self) -> PveResult<HostConnection> {
        HostConnection::new(
            &self.host,
            self.port,
            &self.token_id,
            self.token_secret.clone(),
            self.verify_ssl,
        )
    }

    pub fn validate(&self) -> PveResult<()> {
        if self.id.as_str().trim().is_empty() {
            return Err(ValidationError::Field {
                field: "id".to_string(),
                message: "Host id cannot be empty".to_string(),
            }
            .into());
        }
        self.connection()?;
        self.options.validate()?;
        Ok(())
    }
}

/// Contents of a settings file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub hosts: Vec<HostSettings>,
}

impl Settings {
    /// Reads and validates a TOML settings file.
    pub async fn load(path: impl AsRef<Path>) -> PveResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PveError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> PveResult<Self> {
        let settings: Settings =
            toml::from_str(raw).map_err(|e| PveError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> PveResult<()> {
        self.client.validate()?;
        let mut seen = HashSet::new();
        for host in &self.hosts {
            if !seen.insert(host.id.as_str()) {
                return Err(PveError::Config(format!("duplicate host id '{}'", host.id)));
            }
            host.validate()?;
        }
        Ok(())
    }
}
