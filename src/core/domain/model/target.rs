//! Target of a guest action request.
//!
//! Callers describe the guest loosely ([`RawTarget`]: a device id as a string
//! or a list, optional host hints, an optional tuple). [`RawTarget::normalize`]
//! turns that into the single [`TargetSpec`] shape the resolver works with.

use crate::core::domain::{
    error::ValidationError,
    model::{guest::GuestType, snapshot::GuestKey},
    value_object::{HostId, serde_helpers},
};
use serde::{Deserialize, Serialize};

/// A value given either once or as a list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    /// First non-blank entry, trimmed.
    pub fn first(&self) -> Option<&str> {
        match self {
            OneOrMany::One(s) => Some(s.trim()).filter(|s| !s.is_empty()),
            OneOrMany::Many(v) => v.iter().map(|s| s.trim()).find(|s| !s.is_empty()),
        }
    }
}

/// Action target as supplied by a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RawTarget {
    /// Host identifier (the config entry the Host was set up from).
    #[serde(default, alias = "host_id")]
    pub config_entry_id: Option<String>,
    #[serde(default)]
    pub device_id: Option<OneOrMany>,
    /// Host network address, as configured.
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default, deserialize_with = "serde_helpers::optional_vmid")]
    pub vmid: Option<u32>,
    /// `qemu` when omitted.
    #[serde(default, rename = "type")]
    pub guest_type: Option<String>,
}

/// Where the guest triple comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuestRef {
    /// A managed device; its identifier carries the triple.
    Device(String),
    /// An explicit `(node, vmid, type)`.
    Tuple(GuestKey),
}

/// Canonical action target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    pub host_id: Option<HostId>,
    pub host_address: Option<String>,
    pub guest: GuestRef,
}

impl TargetSpec {
    /// Target a guest by tuple with no Host hint.
    pub fn tuple(key: GuestKey) -> Self {
        Self {
            host_id: None,
            host_address: None,
            guest: GuestRef::Tuple(key),
        }
    }

    /// Target a guest through its managed device.
    pub fn device(device_id: impl Into<String>) -> Self {
        Self {
            host_id: None,
            host_address: None,
            guest: GuestRef::Device(device_id.into()),
        }
    }

    pub fn on_host(mut self, host_id: HostId) -> Self {
        self.host_id = Some(host_id);
        self
    }

    pub fn at_address(mut self, address: impl Into<String>) -> Self {
        self.host_address = Some(address.into());
        self
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl RawTarget {
    /// Normalizes the caller's shape into a [`TargetSpec`].
    ///
    /// A device reference supplies the guest triple when present; otherwise
    /// `node` and `vmid` are required.
    pub fn normalize(&self) -> Result<TargetSpec, ValidationError> {
        let guest = match self.device_id.as_ref().and_then(OneOrMany::first) {
            Some(device) => GuestRef::Device(device.to_string()),
            None => {
                let (Some(node), Some(vmid)) = (non_blank(&self.node), self.vmid) else {
                    return Err(ValidationError::Field {
                        field: "target".to_string(),
                        message: "Provide a device target or node + vmid (+ optional type/host/config_entry_id)"
                            .to_string(),
                    });
                };
                let guest_type = match non_blank(&self.guest_type) {
                    Some(t) => t.parse()?,
                    None => GuestType::Qemu,
                };
                GuestRef::Tuple(GuestKey::new(node, vmid, guest_type))
            }
        };

        Ok(TargetSpec {
            host_id: non_blank(&self.config_entry_id).map(HostId::new),
            host_address: non_blank(&self.host),
            guest,
        })
    }
}
