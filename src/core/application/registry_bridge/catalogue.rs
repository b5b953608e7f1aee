//! The devices and entities each node and guest is exposed as.

use super::{DeviceRecord, EntityKind, EntityRecord};
use crate::core::domain::{
    model::{
        guest::{GuestAction, GuestType},
        snapshot::{GuestSnapshot, NodeSnapshot, Usage},
    },
    value_object::HostId,
};
use serde_json::{Map, Value, json};

pub const MANUFACTURER: &str = "Proxmox VE";

const MIB: f64 = 1024.0 * 1024.0;
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Device identifier of a node.
pub fn node_identifier(node: &str) -> String {
    format!("node:{}", node)
}

pub fn node_display_name(node: &str) -> String {
    format!("Proxmox Node {}", node)
}

/// `{host}_{object}_{suffix}`; stable across renames.
pub fn unique_id(host_id: &HostId, object_id: &str, suffix: &str) -> String {
    format!("{}_{}_{}", host_id, object_id, suffix)
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

fn mb(bytes: u64) -> Value {
    json!(round_to(bytes as f64 / MIB, 2))
}

fn gb(bytes: u64) -> Value {
    json!(round_to(bytes as f64 / GIB, 3))
}

fn percent(fraction: f64) -> Value {
    json!(round_to(fraction * 100.0, 2))
}

/// Renders uptime as `3d 4h 05m`.
pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3600;
    let minutes = (seconds % 3600) / 60;
    format!("{}d {}h {:02}m", days, hours, minutes)
}

pub fn node_device(host_id: &HostId, node: &NodeSnapshot) -> DeviceRecord {
    DeviceRecord {
        host_id: host_id.clone(),
        identifier: node_identifier(&node.name),
        name: node_display_name(&node.name),
        manufacturer: MANUFACTURER.to_string(),
        model: "Node".to_string(),
        via: None,
    }
}

pub fn guest_device(host_id: &HostId, guest: &GuestSnapshot) -> DeviceRecord {
    let model = match guest.key.guest_type {
        GuestType::Qemu => "Virtual Machine",
        GuestType::Lxc => "Container",
    };
    DeviceRecord {
        host_id: host_id.clone(),
        identifier: guest.key.to_string(),
        name: guest.display_name(),
        manufacturer: MANUFACTURER.to_string(),
        model: model.to_string(),
        via: Some(node_identifier(&guest.key.node)),
    }
}

struct Template {
    suffix: &'static str,
    label: &'static str,
    kind: EntityKind,
    unit: Option<&'static str>,
    state: Value,
}

fn sensor(suffix: &'static str, label: &'static str, unit: Option<&'static str>, state: Value) -> Template {
    Template {
        suffix,
        label,
        kind: EntityKind::Sensor,
        unit,
        state,
    }
}

fn build(
    host_id: &HostId,
    device: &DeviceRecord,
    attributes: Map<String, Value>,
    templates: Vec<Template>,
) -> Vec<EntityRecord> {
    templates
        .into_iter()
        .map(|t| EntityRecord {
            unique_id: unique_id(host_id, &device.identifier, t.suffix),
            host_id: host_id.clone(),
            device_identifier: device.identifier.clone(),
            kind: t.kind,
            name: format!("{} {}", device.name, t.label),
            unit: t.unit.map(str::to_string),
            state: t.state,
            attributes: attributes.clone(),
        })
        .collect()
}

pub fn node_entities(host_id: &HostId, node: &NodeSnapshot) -> Vec<EntityRecord> {
    let device = node_device(host_id, node);
    let mut attributes = Map::new();
    attributes.insert("node".to_string(), json!(node.name));

    let swap = |f: fn(&Usage) -> u64| {
        node.swap.as_ref().map(|s| mb(f(s))).unwrap_or(Value::Null)
    };
    let disk = |f: fn(&Usage) -> u64| {
        node.rootfs.as_ref().map(|s| gb(f(s))).unwrap_or(Value::Null)
    };

    let templates = vec![
        sensor("cpu", "CPU", Some("%"), percent(node.cpu)),
        sensor(
            "load1",
            "Load (1m)",
            None,
            node.load_1m.map(|l| json!(l)).unwrap_or(Value::Null),
        ),
        sensor("ram_used_mb", "RAM Used", Some("MB"), mb(node.memory.used)),
        sensor("ram_total_mb", "RAM Total", Some("MB"), mb(node.memory.total)),
        sensor("ram_free_mb", "RAM Free", Some("MB"), mb(node.memory.free)),
        sensor("swap_used_mb", "Swap Used", Some("MB"), swap(|s| s.used)),
        sensor("swap_total_mb", "Swap Total", Some("MB"), swap(|s| s.total)),
        sensor("swap_free_mb", "Swap Free", Some("MB"), swap(|s| s.free)),
        sensor("storage_used_gb", "Storage Used", Some("GB"), disk(|s| s.used)),
        sensor("storage_total_gb", "Storage Total", Some("GB"), disk(|s| s.total)),
        sensor("storage_free_gb", "Storage Free", Some("GB"), disk(|s| s.free)),
        sensor("uptime", "Uptime", None, json!(format_uptime(node.uptime))),
    ];

    build(host_id, &device, attributes, templates)
}

pub fn guest_entities(host_id: &HostId, guest: &GuestSnapshot) -> Vec<EntityRecord> {
    let device = guest_device(host_id, guest);
    let mut attributes = Map::new();
    attributes.insert("vmid".to_string(), json!(guest.key.vmid));
    attributes.insert("node".to_string(), json!(guest.key.node));
    attributes.insert("type".to_string(), json!(guest.key.guest_type));

    let templates = vec![
        sensor("status", "Status", None, json!(guest.status.as_str())),
        sensor("cpu", "CPU", Some("%"), percent(guest.cpu)),
        sensor("ram_used_mb", "RAM Used", Some("MB"), mb(guest.mem)),
        sensor(
            "uptime_pretty",
            "Uptime",
            None,
            json!(format_uptime(guest.uptime)),
        ),
        sensor("netin_mb", "Network In", Some("MB"), mb(guest.netin)),
        sensor("netout_mb", "Network Out", Some("MB"), mb(guest.netout)),
        Template {
            suffix: "power",
            label: "Power",
            kind: EntityKind::Switch {
                on: GuestAction::Start,
                off: GuestAction::Shutdown,
            },
            unit: None,
            state: json!(guest.status.is_running()),
        },
        Template {
            suffix: "reboot",
            label: "Reboot",
            kind: EntityKind::Button(GuestAction::Reboot),
            unit: None,
            state: Value::Null,
        },
        Template {
            suffix: "stop_hard",
            label: "Stop (hard)",
            kind: EntityKind::Button(GuestAction::Stop),
            unit: None,
            state: Value::Null,
        },
    ];

    let mut entities = build(host_id, &device, attributes.clone(), templates);

    let mut ip_attributes = attributes;
    ip_attributes.insert("ip_addresses".to_string(), json!(guest.ip_addresses));
    entities.extend(build(
        host_id,
        &device,
        ip_attributes,
        vec![sensor(
            "ip_preferred",
            "IP",
            None,
            guest
                .preferred_ip
                .as_ref()
                .map(|ip| json!(ip))
                .unwrap_or(Value::Null),
        )],
    ));

    entities
}
