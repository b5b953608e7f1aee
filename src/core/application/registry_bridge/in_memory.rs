use super::{DeviceRecord, EntityRecord, PlatformRegistry};
use crate::core::domain::value_object::HostId;
use dashmap::DashMap;

/// Concurrent in-process registry.
///
/// Device ids are `{host}/{identifier}`, so the same cluster object polled
/// through two Hosts yields two distinct devices.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    devices: DashMap<String, DeviceRecord>,
    entities: DashMap<String, EntityRecord>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    fn device_id(host_id: &HostId, identifier: &str) -> String {
        format!("{}/{}", host_id, identifier)
    }
}

impl PlatformRegistry for InMemoryRegistry {
    fn upsert_device(&self, device: DeviceRecord) -> String {
        let id = Self::device_id(&device.host_id, &device.identifier);
        self.devices.insert(id.clone(), device);
        id
    }

    fn rename_device(&self, host_id: &HostId, identifier: &str, name: &str) {
        if let Some(mut device) = self.devices.get_mut(&Self::device_id(host_id, identifier)) {
            device.name = name.to_string();
        }
    }

    fn remove_device(&self, host_id: &HostId, identifier: &str) {
        self.devices.remove(&Self::device_id(host_id, identifier));
    }

    fn device(&self, device_id: &str) -> Option<DeviceRecord> {
        self.devices.get(device_id).map(|d| d.value().clone())
    }

    fn find_device(&self, host_id: &HostId, identifier: &str) -> Option<String> {
        let id = Self::device_id(host_id, identifier);
        self.devices.contains_key(&id).then_some(id)
    }

    fn devices(&self, host_id: &HostId) -> Vec<DeviceRecord> {
        let mut devices: Vec<DeviceRecord> = self
            .devices
            .iter()
            .filter(|d| &d.host_id == host_id)
            .map(|d| d.value().clone())
            .collect();
        devices.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        devices
    }

    fn upsert_entity(&self, entity: EntityRecord) {
        self.entities.insert(entity.unique_id.clone(), entity);
    }

    fn rename_entity(&self, unique_id: &str, name: &str) {
        if let Some(mut entity) = self.entities.get_mut(unique_id) {
            entity.name = name.to_string();
        }
    }

    fn remove_entity(&self, unique_id: &str) {
        self.entities.remove(unique_id);
    }

    fn entity(&self, unique_id: &str) -> Option<EntityRecord> {
        self.entities.get(unique_id).map(|e| e.value().clone())
    }

    fn entities(&self, host_id: &HostId, device_identifier: &str) -> Vec<EntityRecord> {
        let mut entities: Vec<EntityRecord> = self
            .entities
            .iter()
            .filter(|e| &e.host_id == host_id && e.device_identifier == device_identifier)
            .map(|e| e.value().clone())
            .collect();
        entities.sort_by(|a, b| a.unique_id.cmp(&b.unique_id));
        entities
    }
}
