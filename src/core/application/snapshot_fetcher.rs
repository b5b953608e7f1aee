//! Builds one [`ClusterSnapshot`] per poll tick.
//!
//! Only the node listing is load-bearing: if it fails the tick fails. Every
//! other call degrades just its own node or guest.

use crate::core::{
    domain::{
        error::PveResult,
        model::{
            guest::GuestListItem,
            host_options::IpPolicy,
            node_list_item::NodeListItem,
            node_status::NodeStatus,
            snapshot::{ClusterSnapshot, GuestKey, GuestSnapshot, NodeSnapshot, Usage},
        },
        service::preferred_ip,
    },
    infrastructure::api_client::ClusterApi,
};
use futures::future::join_all;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, warn};

/// Fetches snapshots of one Host's cluster.
#[derive(Clone)]
pub struct SnapshotFetcher {
    api: Arc<dyn ClusterApi>,
}

impl SnapshotFetcher {
    pub fn new(api: Arc<dyn ClusterApi>) -> Self {
        Self { api }
    }

    /// Fetches a complete snapshot.
    ///
    /// `previous` is the last committed snapshot; guests of a node that is
    /// offline or cannot be listed are carried over from it.
    ///
    /// # Errors
    /// Fails only when the node listing fails.
    pub async fn fetch(
        &self,
        previous: Option<&ClusterSnapshot>,
        policy: &IpPolicy,
    ) -> PveResult<ClusterSnapshot> {
        let nodes = self.api.list_nodes().await?;

        let per_node = join_all(
            nodes
                .iter()
                .filter(|item| !item.node.is_empty())
                .map(|item| self.fetch_node(item, previous, policy)),
        )
        .await;

        let mut snapshot = ClusterSnapshot {
            fetched_at: SystemTime::now(),
            ..Default::default()
        };
        for (node, guests) in per_node {
            snapshot
                .guests
                .extend(guests.into_iter().map(|g| (g.key.clone(), g)));
            snapshot.nodes.insert(node.name.clone(), node);
        }
        Ok(snapshot)
    }

    async fn fetch_node(
        &self,
        item: &NodeListItem,
        previous: Option<&ClusterSnapshot>,
        policy: &IpPolicy,
    ) -> (NodeSnapshot, Vec<GuestSnapshot>) {
        let name = item.node.as_str();

        if !item.is_online() {
            debug!(node = name, status = %item.status, "node not online, keeping its guests");
            let node = node_from_listing(item, true);
            return (node, carried_guests(previous, name, policy));
        }

        let (status, guests) = tokio::join!(self.api.node_status(name), self.api.list_guests(name));

        let mut node = match status {
            Ok(status) => node_from_status(item, &status),
            Err(e) => {
                warn!(node = name, error = %e, "node status unavailable, using listing metrics");
                node_from_listing(item, false)
            }
        };

        let guests = match guests {
            Ok(listed) => self.build_guests(name, listed, policy).await,
            Err(e) => {
                warn!(node = name, error = %e, "guest listing failed, keeping previous guests");
                node.guests_stale = true;
                carried_guests(previous, name, policy)
            }
        };

        (node, guests)
    }

    async fn build_guests(
        &self,
        node: &str,
        listed: Vec<GuestListItem>,
        policy: &IpPolicy,
    ) -> Vec<GuestSnapshot> {
        let addresses = join_all(listed.iter().map(|g| async move {
            if g.status.is_running() {
                self.api.guest_network(node, g.vmid, g.guest_type).await
            } else {
                Vec::new()
            }
        }))
        .await;

        listed
            .into_iter()
            .zip(addresses)
            .map(|(g, ip_addresses)| {
                let preferred_ip = preferred_ip::select(&ip_addresses, policy);
                GuestSnapshot {
                    key: GuestKey::new(node, g.vmid, g.guest_type),
                    name: g.name.unwrap_or_default(),
                    status: g.status,
                    cpu: g.cpu.unwrap_or_default(),
                    mem: g.mem.unwrap_or_default(),
                    maxmem: g.maxmem.unwrap_or_default(),
                    uptime: g.uptime.unwrap_or_default(),
                    netin: g.netin.unwrap_or_default(),
                    netout: g.netout.unwrap_or_default(),
                    ip_addresses,
                    preferred_ip,
                }
            })
            .collect()
    }
}

fn node_from_listing(item: &NodeListItem, guests_stale: bool) -> NodeSnapshot {
    NodeSnapshot {
        name: item.node.clone(),
        online: item.is_online(),
        cpu: item.cpu.unwrap_or_default(),
        load_1m: None,
        memory: Usage::from_used_total(
            item.mem.unwrap_or_default(),
            item.maxmem.unwrap_or_default(),
        ),
        swap: None,
        rootfs: match (item.disk, item.maxdisk) {
            (Some(used), Some(total)) => Some(Usage::from_used_total(used, total)),
            _ => None,
        },
        uptime: item.uptime.unwrap_or_default(),
        guests_stale,
    }
}

fn node_from_status(item: &NodeListItem, status: &NodeStatus) -> NodeSnapshot {
    NodeSnapshot {
        name: item.node.clone(),
        online: true,
        cpu: status.cpu,
        load_1m: status.load_1m(),
        memory: Usage {
            used: status.memory.used,
            total: status.memory.total,
            free: status.memory.free,
        },
        swap: status.swap.as_ref().map(|s| Usage {
            used: s.used,
            total: s.total,
            free: s.free,
        }),
        rootfs: status.rootfs.as_ref().map(|r| Usage {
            used: r.used,
            total: r.total,
            free: r.available(),
        }),
        uptime: status.uptime,
        guests_stale: false,
    }
}

/// Previous guests of `node`, with the preferred address re-derived under the
/// current policy.
fn carried_guests(
    previous: Option<&ClusterSnapshot>,
    node: &str,
    policy: &IpPolicy,
) -> Vec<GuestSnapshot> {
    previous
        .map(|snapshot| {
            snapshot
                .guests_on(node)
                .cloned()
                .map(|mut g| {
                    g.preferred_ip = preferred_ip::select(&g.ip_addresses, policy);
                    g
                })
                .collect()
        })
        .unwrap_or_default()
}
