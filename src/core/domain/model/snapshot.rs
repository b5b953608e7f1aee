//! Point-in-time view of one Host's cluster.
//!
//! A [`ClusterSnapshot`] is produced whole by a successful poll tick and is the
//! only input of reconciliation. Nodes are keyed by name, guests by the
//! immutable [`GuestKey`]; display names are plain attributes.

use crate::core::domain::{
    error::ValidationError,
    model::guest::{GuestStatus, GuestType},
    value_object::serde_helpers,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Identity of a guest: `(node, vmid, type)`.
///
/// Rendered as `node:type:vmid`, which is also the guest's device identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GuestKey {
    pub node: String,
    pub vmid: u32,
    pub guest_type: GuestType,
}

impl GuestKey {
    pub fn new(node: impl Into<String>, vmid: u32, guest_type: GuestType) -> Self {
        Self {
            node: node.into(),
            vmid,
            guest_type,
        }
    }
}

impl fmt::Display for GuestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.node, self.guest_type, self.vmid)
    }
}

impl FromStr for GuestKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.rsplitn(3, ':');
        let (Some(vmid), Some(guest_type), Some(node)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(ValidationError::Format(format!(
                "Guest key '{}' must be in format node:type:vmid",
                s
            )));
        };
        if node.is_empty() {
            return Err(ValidationError::Format("Guest key has an empty node".to_string()));
        }
        let vmid = vmid
            .parse::<u32>()
            .map_err(|_| ValidationError::Format(format!("Invalid vmid '{}'", vmid)))?;
        Ok(Self::new(node, vmid, guest_type.parse()?))
    }
}

/// Used/total/free triple, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Usage {
    pub used: u64,
    pub total: u64,
    pub free: u64,
}

impl Usage {
    /// Builds a triple where only used and total are known.
    pub fn from_used_total(used: u64, total: u64) -> Self {
        Self {
            used,
            total,
            free: total.saturating_sub(used),
        }
    }
}

/// One cluster node at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeSnapshot {
    pub name: String,
    pub online: bool,
    pub cpu: f64,
    pub load_1m: Option<f64>,
    pub memory: Usage,
    pub swap: Option<Usage>,
    pub rootfs: Option<Usage>,
    pub uptime: u64,
    /// Set when this node's guests were carried over from the previous tick
    /// because they could not be listed.
    pub guests_stale: bool,
}

/// One guest at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuestSnapshot {
    pub key: GuestKey,
    /// Name as configured in Proxmox; may be empty.
    pub name: String,
    pub status: GuestStatus,
    pub cpu: f64,
    pub mem: u64,
    pub maxmem: u64,
    pub uptime: u64,
    pub netin: u64,
    pub netout: u64,
    /// Discovered addresses in report order, loopback and link-local removed.
    pub ip_addresses: Vec<String>,
    pub preferred_ip: Option<String>,
}

impl GuestSnapshot {
    /// Name shown for the guest's device: `web (VMID 100)`, or
    /// `qemu 100 (VMID 100)` when the guest has no name.
    pub fn display_name(&self) -> String {
        let name = self.name.trim();
        if name.is_empty() {
            format!("{} {} (VMID {})", self.key.guest_type, self.key.vmid, self.key.vmid)
        } else {
            format!("{} (VMID {})", name, self.key.vmid)
        }
    }

    /// Compares everything except the name.
    pub fn same_live_state(&self, other: &GuestSnapshot) -> bool {
        self.key == other.key
            && self.status == other.status
            && self.cpu == other.cpu
            && self.mem == other.mem
            && self.maxmem == other.maxmem
            && self.uptime == other.uptime
            && self.netin == other.netin
            && self.netout == other.netout
            && self.ip_addresses == other.ip_addresses
            && self.preferred_ip == other.preferred_ip
    }
}

/// Every node and guest of one successful tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSnapshot {
    pub nodes: BTreeMap<String, NodeSnapshot>,
    #[serde(skip)]
    pub guests: BTreeMap<GuestKey, GuestSnapshot>,
    #[serde(with = "serde_helpers::system_time")]
    pub fetched_at: SystemTime,
}

impl Default for ClusterSnapshot {
    fn default() -> Self {
        Self {
            nodes: BTreeMap::new(),
            guests: BTreeMap::new(),
            fetched_at: UNIX_EPOCH,
        }
    }
}

impl ClusterSnapshot {
    /// Guests hosted on `node`.
    pub fn guests_on<'a>(&'a self, node: &'a str) -> impl Iterator<Item = &'a GuestSnapshot> + 'a {
        self.guests.values().filter(move |g| g.key.node == node)
    }

    /// Number of guests of the given type.
    pub fn count_of(&self, guest_type: GuestType) -> usize {
        self.guests
            .keys()
            .filter(|k| k.guest_type == guest_type)
            .count()
    }
}
