//! Domain model for node list items from the `/nodes` endpoint.
//!
//! The listing is the authoritative node set for a tick: a node missing from
//! it is gone from the cluster.

use serde::{Deserialize, Serialize};

/// A node in the Proxmox cluster.
///
/// This struct represents a node as returned by the `/api2/json/nodes` endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NodeListItem {
    /// The node name (e.g., "pve1").
    pub node: String,
    /// Current node status (e.g., "online", "offline", "unknown").
    #[serde(default)]
    pub status: String,
    /// CPU usage fraction (0.0 to 1.0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<f64>,
    /// Memory usage in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem: Option<u64>,
    /// Maximum memory in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxmem: Option<u64>,
    /// Disk usage in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk: Option<u64>,
    /// Maximum disk space in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxdisk: Option<u64>,
    /// System uptime in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime: Option<u64>,
}

impl NodeListItem {
    /// Whether the cluster reports this node as reachable.
    pub fn is_online(&self) -> bool {
        self.status == "online"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sparse_offline_record() {
        let item: NodeListItem =
            serde_json::from_str(r#"{"node": "pve2", "status": "offline"}"#).unwrap();
        assert!(!item.is_online());
        assert_eq!(item.cpu, None);
        assert_eq!(item.uptime, None);
    }
}
