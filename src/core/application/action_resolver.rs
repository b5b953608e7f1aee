//! Resolves an action target to exactly one `(Host, guest)` pair.
//!
//! The Host is chosen by, in order: explicit Host id, the Host owning the
//! referenced device, the configured Host address, and finally a search for
//! the guest across every Host's latest committed snapshot. The guest triple
//! comes from the referenced device when there is one, else from the tuple.

use crate::core::{
    application::registry_bridge::{PlatformRegistry, catalogue},
    domain::{
        error::{PveError, PveResult, ValidationError},
        model::{
            snapshot::{ClusterSnapshot, GuestKey},
            target::{GuestRef, TargetSpec},
        },
        value_object::HostId,
    },
};
use std::sync::Arc;
use tracing::debug;

/// What the resolver may know about one configured Host.
#[derive(Debug, Clone)]
pub struct HostView {
    pub host_id: HostId,
    /// Address as configured, compared verbatim.
    pub address: String,
    /// Latest committed snapshot; `None` before the first successful tick.
    pub snapshot: Option<Arc<ClusterSnapshot>>,
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub host_id: HostId,
    pub guest: GuestKey,
}

pub struct ActionResolver {
    registry: Arc<dyn PlatformRegistry>,
}

impl ActionResolver {
    pub fn new(registry: Arc<dyn PlatformRegistry>) -> Self {
        Self { registry }
    }

    /// Resolves `spec` against `hosts`.
    ///
    /// # Errors
    /// * `TargetNotFound` - unknown Host id, device, address or guest
    /// * `AmbiguousTarget` - the address or the bare tuple matches several Hosts
    /// * `Validation` - the device is not a guest device
    pub fn resolve(&self, spec: &TargetSpec, hosts: &[HostView]) -> PveResult<ResolvedTarget> {
        let (guest, device_host) = match &spec.guest {
            GuestRef::Device(device_id) => {
                let device = self
                    .registry
                    .device(device_id)
                    .ok_or_else(|| PveError::TargetNotFound(format!("device {}", device_id)))?;
                (guest_key_of(&device.identifier)?, Some(device.host_id))
            }
            GuestRef::Tuple(key) => (key.clone(), None),
        };

        let host_id = if let Some(host_id) = &spec.host_id {
            known_host(hosts, host_id)?
        } else if let Some(host_id) = device_host {
            known_host(hosts, &host_id)?
        } else if let Some(address) = &spec.host_address {
            by_address(hosts, address)?
        } else {
            by_guest(hosts, &guest)?
        };

        debug!(host = %host_id, guest = %guest, "resolved action target");
        Ok(ResolvedTarget { host_id, guest })
    }
}

fn guest_key_of(identifier: &str) -> PveResult<GuestKey> {
    if identifier.starts_with(&catalogue::node_identifier("")) {
        return Err(ValidationError::Field {
            field: "device_id".to_string(),
            message: format!("Device '{}' is a node, not a guest", identifier),
        }
        .into());
    }
    Ok(identifier.parse()?)
}

fn known_host(hosts: &[HostView], host_id: &HostId) -> PveResult<HostId> {
    hosts
        .iter()
        .find(|h| &h.host_id == host_id)
        .map(|h| h.host_id.clone())
        .ok_or_else(|| PveError::TargetNotFound(format!("host {} is not loaded", host_id)))
}

fn by_address(hosts: &[HostView], address: &str) -> PveResult<HostId> {
    let address = address.trim();
    let matches: Vec<&HostView> = hosts.iter().filter(|h| h.address == address).collect();
    match matches.as_slice() {
        [] => Err(PveError::TargetNotFound(format!("no host with address {}", address))),
        [only] => Ok(only.host_id.clone()),
        many => Err(PveError::AmbiguousTarget {
            target: address.to_string(),
            candidates: many.iter().map(|h| h.host_id.to_string()).collect(),
        }),
    }
}

fn by_guest(hosts: &[HostView], guest: &GuestKey) -> PveResult<HostId> {
    let matches: Vec<&HostView> = hosts
        .iter()
        .filter(|h| {
            h.snapshot
                .as_ref()
                .is_some_and(|s| s.guests.contains_key(guest))
        })
        .collect();
    match matches.as_slice() {
        [] => Err(PveError::TargetNotFound(format!(
            "guest {} is not known to any configured host",
            guest
        ))),
        [only] => Ok(only.host_id.clone()),
        many => Err(PveError::AmbiguousTarget {
            target: guest.to_string(),
            candidates: many.iter().map(|h| h.host_id.to_string()).collect(),
        }),
    }
}
