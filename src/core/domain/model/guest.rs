//! Domain models for guests (QEMU virtual machines and LXC containers).
//!
//! Both `/nodes/{node}/qemu` and `/nodes/{node}/lxc` return records of the same
//! shape, so a single [`GuestListItem`] covers both listings.

use crate::core::domain::{error::ValidationError, value_object::serde_helpers};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GuestType {
    /// A QEMU/KVM virtual machine.
    #[default]
    Qemu,
    /// An LXC container.
    Lxc,
}

impl GuestType {
    /// The path segment used by the API (`qemu` or `lxc`).
    pub fn as_str(&self) -> &'static str {
        match self {
            GuestType::Qemu => "qemu",
            GuestType::Lxc => "lxc",
        }
    }
}

impl fmt::Display for GuestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GuestType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "qemu" => Ok(GuestType::Qemu),
            "lxc" => Ok(GuestType::Lxc),
            other => Err(ValidationError::Field {
                field: "type".to_string(),
                message: format!("Unknown guest type '{}', expected qemu or lxc", other),
            }),
        }
    }
}

/// Run state of a guest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum GuestStatus {
    Running,
    Stopped,
    Paused,
    /// Any state Proxmox reports that has no dedicated variant.
    Other(String),
}

impl GuestStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, GuestStatus::Running)
    }

    pub fn as_str(&self) -> &str {
        match self {
            GuestStatus::Running => "running",
            GuestStatus::Stopped => "stopped",
            GuestStatus::Paused => "paused",
            GuestStatus::Other(s) => s,
        }
    }
}

impl From<String> for GuestStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "running" => GuestStatus::Running,
            "stopped" => GuestStatus::Stopped,
            "paused" => GuestStatus::Paused,
            _ => GuestStatus::Other(s),
        }
    }
}

impl From<GuestStatus> for String {
    fn from(status: GuestStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for GuestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A guest as returned by the per-node `qemu` and `lxc` listings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GuestListItem {
    /// The guest identifier. LXC listings may send it as a string.
    #[serde(deserialize_with = "serde_helpers::vmid")]
    pub vmid: u32,
    /// Guest type. Absent from the qemu listing, hence the default.
    #[serde(default, rename = "type")]
    pub guest_type: GuestType,
    /// Human-readable name (may be absent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Current status.
    pub status: GuestStatus,
    /// CPU usage fraction (0.0 to 1.0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<f64>,
    /// Memory usage in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem: Option<u64>,
    /// Maximum memory in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxmem: Option<u64>,
    /// Uptime in seconds (if running).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime: Option<u64>,
    /// Bytes received over the guest's network interfaces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub netin: Option<u64>,
    /// Bytes sent over the guest's network interfaces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub netout: Option<u64>,
}

/// A power action that can be requested for a guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GuestAction {
    Start,
    /// Graceful shutdown through ACPI or the container's init.
    Shutdown,
    /// Hard stop, equivalent to pulling the plug.
    #[serde(alias = "stop_hard")]
    Stop,
    Reboot,
}

impl GuestAction {
    pub const ALL: [GuestAction; 4] = [
        GuestAction::Start,
        GuestAction::Shutdown,
        GuestAction::Stop,
        GuestAction::Reboot,
    ];

    /// The final segment of `POST /nodes/{node}/{type}/{vmid}/status/{action}`.
    pub fn api_path(&self) -> &'static str {
        match self {
            GuestAction::Start => "start",
            GuestAction::Shutdown => "shutdown",
            GuestAction::Stop => "stop",
            GuestAction::Reboot => "reboot",
        }
    }

    /// The name under which the action is offered to callers.
    pub fn service_name(&self) -> &'static str {
        match self {
            GuestAction::Stop => "stop_hard",
            other => other.api_path(),
        }
    }
}

impl fmt::Display for GuestAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.service_name())
    }
}

impl FromStr for GuestAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(GuestAction::Start),
            "shutdown" => Ok(GuestAction::Shutdown),
            "stop" | "stop_hard" => Ok(GuestAction::Stop),
            "reboot" => Ok(GuestAction::Reboot),
            other => Err(ValidationError::Field {
                field: "action".to_string(),
                message: format!("Unknown guest action '{}'", other),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lxc_record_with_string_vmid() {
        let json = r#"{"vmid": "105", "type": "lxc", "name": "dns", "status": "running",
                       "cpu": 0.01, "mem": 1024, "maxmem": 4096, "uptime": 60,
                       "netin": 10, "netout": 20}"#;
        let item: GuestListItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.vmid, 105);
        assert_eq!(item.guest_type, GuestType::Lxc);
        assert!(item.status.is_running());
    }

    #[test]
    fn test_qemu_record_defaults_type() {
        let json = r#"{"vmid": 100, "status": "suspended"}"#;
        let item: GuestListItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.guest_type, GuestType::Qemu);
        assert_eq!(item.status, GuestStatus::Other("suspended".to_string()));
        assert_eq!(item.name, None);
    }

    #[test]
    fn test_action_names() {
        assert_eq!("stop_hard".parse::<GuestAction>().unwrap(), GuestAction::Stop);
        assert_eq!("stop".parse::<GuestAction>().unwrap(), GuestAction::Stop);
        assert_eq!(GuestAction::Stop.api_path(), "stop");
        assert_eq!(GuestAction::Stop.service_name(), "stop_hard");
        assert!("hibernate".parse::<GuestAction>().is_err());
    }

    #[test]
    fn test_every_action_parses_from_its_service_name() {
        for action in GuestAction::ALL {
            assert_eq!(action.service_name().parse::<GuestAction>().unwrap(), action);
        }
    }

    #[test]
    fn test_guest_type_parse() {
        assert_eq!("LXC".parse::<GuestType>().unwrap(), GuestType::Lxc);
        assert!("vm".parse::<GuestType>().is_err());
    }
}
