//! Diffs two snapshots into the events that bring the managed objects in line.
//!
//! Pure: no I/O, no platform access. The registry bridge applies the plan.

use crate::core::domain::model::snapshot::{ClusterSnapshot, GuestKey, GuestSnapshot, NodeSnapshot};

/// One change to the managed object set.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileEvent {
    NodeCreated(NodeSnapshot),
    NodeUpdated(NodeSnapshot),
    NodeRemoved(String),
    GuestCreated(GuestSnapshot),
    /// Live attributes changed; the name did not necessarily.
    GuestUpdated(GuestSnapshot),
    /// The display name changed. Identity and entity ids stay as they are.
    GuestRenamed {
        key: GuestKey,
        previous_name: String,
        guest: GuestSnapshot,
    },
    GuestRemoved(GuestKey),
}

/// Ordered events of one tick: node events first, then guest events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilePlan {
    pub events: Vec<ReconcileEvent>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Counts of (created, updated, renamed, removed) events.
    pub fn summary(&self) -> (usize, usize, usize, usize) {
        self.events.iter().fold((0, 0, 0, 0), |(c, u, n, r), event| match event {
            ReconcileEvent::NodeCreated(_) | ReconcileEvent::GuestCreated(_) => (c + 1, u, n, r),
            ReconcileEvent::NodeUpdated(_) | ReconcileEvent::GuestUpdated(_) => (c, u + 1, n, r),
            ReconcileEvent::GuestRenamed { .. } => (c, u, n + 1, r),
            ReconcileEvent::NodeRemoved(_) | ReconcileEvent::GuestRemoved(_) => (c, u, n, r + 1),
        })
    }
}

/// Computes the plan that turns `previous` into `next`.
///
/// `None` means nothing has been committed yet, so everything is created.
/// Identical snapshots yield an empty plan.
pub fn reconcile(previous: Option<&ClusterSnapshot>, next: &ClusterSnapshot) -> ReconcilePlan {
    let empty = ClusterSnapshot::default();
    let previous = previous.unwrap_or(&empty);
    let mut events = Vec::new();

    for (name, node) in &next.nodes {
        match previous.nodes.get(name) {
            None => events.push(ReconcileEvent::NodeCreated(node.clone())),
            Some(old) if old != node => events.push(ReconcileEvent::NodeUpdated(node.clone())),
            Some(_) => {}
        }
    }
    for name in previous.nodes.keys() {
        if !next.nodes.contains_key(name) {
            events.push(ReconcileEvent::NodeRemoved(name.clone()));
        }
    }

    for (key, guest) in &next.guests {
        match previous.guests.get(key) {
            None => events.push(ReconcileEvent::GuestCreated(guest.clone())),
            Some(old) => {
                if old.name != guest.name {
                    events.push(ReconcileEvent::GuestRenamed {
                        key: key.clone(),
                        previous_name: old.name.clone(),
                        guest: guest.clone(),
                    });
                }
                if !old.same_live_state(guest) {
                    events.push(ReconcileEvent::GuestUpdated(guest.clone()));
                }
            }
        }
    }
    for key in previous.guests.keys() {
        if !next.guests.contains_key(key) {
            events.push(ReconcileEvent::GuestRemoved(key.clone()));
        }
    }

    ReconcilePlan { events }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::model::{
        guest::{GuestStatus, GuestType},
        snapshot::Usage,
    };

    fn node(name: &str) -> NodeSnapshot {
        NodeSnapshot {
            name: name.to_string(),
            online: true,
            cpu: 0.1,
            load_1m: Some(0.5),
            memory: Usage::from_used_total(1, 2),
            swap: None,
            rootfs: None,
            uptime: 10,
            guests_stale: false,
        }
    }

    fn guest(node: &str, vmid: u32, name: &str) -> GuestSnapshot {
        GuestSnapshot {
            key: GuestKey::new(node, vmid, GuestType::Qemu),
            name: name.to_string(),
            status: GuestStatus::Running,
            cpu: 0.2,
            mem: 100,
            maxmem: 200,
            uptime: 30,
            netin: 1,
            netout: 1,
            ip_addresses: vec![],
            preferred_ip: None,
        }
    }

    fn snapshot(nodes: &[&str], guests: Vec<GuestSnapshot>) -> ClusterSnapshot {
        let mut s = ClusterSnapshot::default();
        for n in nodes {
            s.nodes.insert(n.to_string(), node(n));
        }
        for g in guests {
            s.guests.insert(g.key.clone(), g);
        }
        s
    }

    #[test]
    fn test_first_tick_creates_nodes_before_guests() {
        let next = snapshot(&["pve1"], vec![guest("pve1", 100, "web")]);
        let plan = reconcile(None, &next);
        assert_eq!(plan.len(), 2);
        assert!(matches!(plan.events[0], ReconcileEvent::NodeCreated(_)));
        assert!(matches!(plan.events[1], ReconcileEvent::GuestCreated(_)));
    }

    #[test]
    fn test_identical_snapshots_yield_empty_plan() {
        let a = snapshot(&["pve1", "pve2"], vec![guest("pve1", 100, "web"), guest("pve2", 200, "db")]);
        let b = a.clone();
        assert!(reconcile(Some(&a), &b).is_empty());
    }

    #[test]
    fn test_rename_is_not_delete_create() {
        let a = snapshot(&["pve1"], vec![guest("pve1", 100, "web")]);
        let b = snapshot(&["pve1"], vec![guest("pve1", 100, "frontend")]);
        let plan = reconcile(Some(&a), &b);
        assert_eq!(plan.summary(), (0, 0, 1, 0));
        match &plan.events[0] {
            ReconcileEvent::GuestRenamed {
                key,
                previous_name,
                guest,
            } => {
                assert_eq!(key, &GuestKey::new("pve1", 100, GuestType::Qemu));
                assert_eq!(previous_name, "web");
                assert_eq!(guest.name, "frontend");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_rename_with_metric_change_emits_both() {
        let a = snapshot(&["pve1"], vec![guest("pve1", 100, "web")]);
        let mut renamed = guest("pve1", 100, "frontend");
        renamed.cpu = 0.9;
        let b = snapshot(&["pve1"], vec![renamed]);
        assert_eq!(reconcile(Some(&a), &b).summary(), (0, 1, 1, 0));
    }

    #[test]
    fn test_removed_guest_and_node() {
        let a = snapshot(&["pve1", "pve2"], vec![guest("pve1", 100, "web"), guest("pve2", 200, "db")]);
        let b = snapshot(&["pve1"], vec![guest("pve1", 100, "web")]);
        let plan = reconcile(Some(&a), &b);
        assert_eq!(
            plan.events,
            vec![
                ReconcileEvent::NodeRemoved("pve2".to_string()),
                ReconcileEvent::GuestRemoved(GuestKey::new("pve2", 200, GuestType::Qemu)),
            ]
        );
    }

    #[test]
    fn test_same_vmid_other_type_is_distinct() {
        let a = snapshot(&["pve1"], vec![guest("pve1", 100, "web")]);
        let mut ct = guest("pve1", 100, "web");
        ct.key.guest_type = GuestType::Lxc;
        let b = snapshot(&["pve1"], vec![ct]);
        assert_eq!(reconcile(Some(&a), &b).summary(), (1, 0, 0, 1));
    }

    #[test]
    fn test_node_metric_change_is_update() {
        let a = snapshot(&["pve1"], vec![]);
        let mut b = a.clone();
        if let Some(n) = b.nodes.get_mut("pve1") {
            n.cpu = 0.8;
        }
        assert_eq!(reconcile(Some(&a), &b).events.len(), 1);
        assert!(matches!(
            reconcile(Some(&a), &b).events[0],
            ReconcileEvent::NodeUpdated(_)
        ));
    }
}
