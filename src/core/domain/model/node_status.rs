//! Domain model for node status from the `/nodes/{node}/status` endpoint.
//!
//! This endpoint carries the figures `/nodes` lacks: load average, swap and
//! the root filesystem.

use crate::core::domain::value_object::serde_helpers;
use serde::{Deserialize, Serialize};

/// Detailed status information for a Proxmox node.
///
/// Returned by the `/api2/json/nodes/{node}/status` endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NodeStatus {
    /// CPU usage fraction (0.0 to 1.0).
    #[serde(default)]
    pub cpu: f64,
    /// Memory usage in bytes.
    pub memory: MemoryInfo,
    /// Swap usage in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap: Option<MemoryInfo>,
    /// Root filesystem usage in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rootfs: Option<RootFsInfo>,
    /// System uptime in seconds.
    #[serde(default)]
    pub uptime: u64,
    /// Load average over 1, 5, and 15 minutes.
    #[serde(
        default,
        deserialize_with = "serde_helpers::loadavg",
        skip_serializing_if = "Option::is_none"
    )]
    pub loadavg: Option<Vec<f64>>,
}

impl NodeStatus {
    /// The 1-minute load average, if reported.
    pub fn load_1m(&self) -> Option<f64> {
        self.loadavg.as_ref().and_then(|l| l.first().copied())
    }
}

/// Memory or swap usage information.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MemoryInfo {
    /// Total memory in bytes.
    #[serde(default)]
    pub total: u64,
    /// Used memory in bytes.
    #[serde(default)]
    pub used: u64,
    /// Free memory in bytes.
    #[serde(default)]
    pub free: u64,
}

/// Root filesystem usage.
///
/// Proxmox reports both `avail` (usable by unprivileged users) and `free`;
/// older releases send only `free`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RootFsInfo {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub used: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avail: Option<u64>,
    #[serde(default)]
    pub free: u64,
}

impl RootFsInfo {
    /// Space still usable, preferring `avail` over `free`.
    pub fn available(&self) -> u64 {
        self.avail.unwrap_or(self.free)
    }
}
