//! Applies reconcile plans to the host platform's device/entity registry.
//!
//! [`RegistryBridge`] is the only code that writes to a [`PlatformRegistry`].
//! Every node and guest becomes one device plus the entities listed in
//! [`catalogue`]. Entity unique ids derive from the immutable identity key,
//! so a rename only touches display names.

pub mod catalogue;
mod in_memory;

pub use in_memory::InMemoryRegistry;

use crate::core::{
    application::reconciler::{ReconcileEvent, ReconcilePlan},
    domain::{
        model::{
            guest::GuestAction,
            snapshot::{ClusterSnapshot, GuestSnapshot, NodeSnapshot},
        },
        value_object::HostId,
    },
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// A device as the platform stores it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceRecord {
    pub host_id: HostId,
    /// `node:{node}` or `{node}:{type}:{vmid}`.
    pub identifier: String,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    /// Identifier of the parent device on the same Host.
    pub via: Option<String>,
}

/// What an entity is and, for controls, which action it dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "actions", rename_all = "snake_case")]
pub enum EntityKind {
    Sensor,
    Switch { on: GuestAction, off: GuestAction },
    Button(GuestAction),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRecord {
    pub unique_id: String,
    pub host_id: HostId,
    pub device_identifier: String,
    pub kind: EntityKind,
    pub name: String,
    pub unit: Option<String>,
    pub state: Value,
    pub attributes: Map<String, Value>,
}

/// The host platform's device and entity registry.
///
/// Devices are addressed by `(host, identifier)`; the platform assigns its
/// own device id on upsert. Entities are addressed by unique id.
pub trait PlatformRegistry: Send + Sync {
    /// Creates or updates a device and returns its platform id.
    fn upsert_device(&self, device: DeviceRecord) -> String;

    fn rename_device(&self, host_id: &HostId, identifier: &str, name: &str);

    fn remove_device(&self, host_id: &HostId, identifier: &str);

    /// Looks a device up by platform id.
    fn device(&self, device_id: &str) -> Option<DeviceRecord>;

    /// Platform id of the device with this identifier, if registered.
    fn find_device(&self, host_id: &HostId, identifier: &str) -> Option<String>;

    fn devices(&self, host_id: &HostId) -> Vec<DeviceRecord>;

    fn upsert_entity(&self, entity: EntityRecord);

    fn rename_entity(&self, unique_id: &str, name: &str);

    fn remove_entity(&self, unique_id: &str);

    fn entity(&self, unique_id: &str) -> Option<EntityRecord>;

    fn entities(&self, host_id: &HostId, device_identifier: &str) -> Vec<EntityRecord>;
}

/// Writes one Host's managed objects.
#[derive(Clone)]
pub struct RegistryBridge {
    host_id: HostId,
    registry: Arc<dyn PlatformRegistry>,
}

impl RegistryBridge {
    pub fn new(host_id: HostId, registry: Arc<dyn PlatformRegistry>) -> Self {
        Self { host_id, registry }
    }

    pub fn host_id(&self) -> &HostId {
        &self.host_id
    }

    pub fn registry(&self) -> &Arc<dyn PlatformRegistry> {
        &self.registry
    }

    /// Applies every event of `plan` in order.
    pub fn apply(&self, plan: &ReconcilePlan) {
        for event in &plan.events {
            match event {
                ReconcileEvent::NodeCreated(node) => self.write_node(node),
                ReconcileEvent::NodeUpdated(node) => self.update_node(node),
                ReconcileEvent::NodeRemoved(name) => {
                    self.remove(&catalogue::node_identifier(name));
                }
                ReconcileEvent::GuestCreated(guest) => self.write_guest(guest),
                ReconcileEvent::GuestUpdated(guest) => self.update_guest(guest),
                ReconcileEvent::GuestRenamed {
                    key,
                    previous_name,
                    guest,
                } => {
                    info!(
                        host = %self.host_id,
                        guest = %key,
                        from = %previous_name,
                        to = %guest.name,
                        "guest renamed"
                    );
                    self.rename_guest(guest);
                }
                ReconcileEvent::GuestRemoved(key) => self.remove(&key.to_string()),
            }
        }

        if !plan.is_empty() {
            let (created, updated, renamed, removed) = plan.summary();
            debug!(
                host = %self.host_id,
                created,
                updated,
                renamed,
                removed,
                "applied reconcile plan"
            );
        }
    }

    /// Removes devices of this Host that `snapshot` does not know.
    ///
    /// Used once, before the first plan of a loop is applied, so objects left
    /// behind by an earlier run do not outlive their cluster counterpart.
    pub fn prune(&self, snapshot: &ClusterSnapshot) {
        let known: HashSet<String> = snapshot
            .nodes
            .keys()
            .map(|n| catalogue::node_identifier(n))
            .chain(snapshot.guests.keys().map(|k| k.to_string()))
            .collect();

        for device in self.registry.devices(&self.host_id) {
            if !known.contains(&device.identifier) {
                debug!(host = %self.host_id, device = %device.identifier, "pruning orphaned device");
                self.remove(&device.identifier);
            }
        }
    }

    /// Removes every device and entity of this Host.
    pub fn teardown(&self) {
        let devices = self.registry.devices(&self.host_id);
        let count = devices.len();
        // Children first so no guest outlives its node device.
        let (children, parents): (Vec<_>, Vec<_>) =
            devices.into_iter().partition(|d| d.via.is_some());
        for device in children.into_iter().chain(parents) {
            self.remove(&device.identifier);
        }
        info!(host = %self.host_id, devices = count, "removed all managed objects");
    }

    fn write_node(&self, node: &NodeSnapshot) {
        self.registry
            .upsert_device(catalogue::node_device(&self.host_id, node));
        for entity in catalogue::node_entities(&self.host_id, node) {
            self.registry.upsert_entity(entity);
        }
    }

    fn update_node(&self, node: &NodeSnapshot) {
        let identifier = catalogue::node_identifier(&node.name);
        if self.registry.find_device(&self.host_id, &identifier).is_none() {
            self.write_node(node);
            return;
        }
        for entity in catalogue::node_entities(&self.host_id, node) {
            self.registry.upsert_entity(entity);
        }
    }

    fn write_guest(&self, guest: &GuestSnapshot) {
        self.registry
            .upsert_device(catalogue::guest_device(&self.host_id, guest));
        for entity in catalogue::guest_entities(&self.host_id, guest) {
            self.registry.upsert_entity(entity);
        }
    }

    fn update_guest(&self, guest: &GuestSnapshot) {
        let identifier = guest.key.to_string();
        if self.registry.find_device(&self.host_id, &identifier).is_none() {
            self.write_guest(guest);
            return;
        }
        for entity in catalogue::guest_entities(&self.host_id, guest) {
            self.registry.upsert_entity(entity);
        }
    }

    fn rename_guest(&self, guest: &GuestSnapshot) {
        let device = catalogue::guest_device(&self.host_id, guest);
        self.registry
            .rename_device(&self.host_id, &device.identifier, &device.name);
        for entity in catalogue::guest_entities(&self.host_id, guest) {
            self.registry.rename_entity(&entity.unique_id, &entity.name);
        }
    }

    fn remove(&self, identifier: &str) {
        for entity in self.registry.entities(&self.host_id, identifier) {
            self.registry.remove_entity(&entity.unique_id);
        }
        self.registry.remove_device(&self.host_id, identifier);
    }
}
