//! Shareable diagnostics for one Host.
//!
//! Everything is redacted before it leaves the process: the token secret and
//! token id are masked and every IPv4 address anywhere in the output keeps
//! only its first two octets.

use crate::config::HostSettings;
use crate::core::domain::{
    model::{
        guest::GuestType,
        host_options::HostOptions,
        snapshot::ClusterSnapshot,
        version::ApiVersion,
    },
    value_object::HostId,
};
use crate::runtime::LastPoll;
use regex::Regex;
use secrecy::ExposeSecret;
use serde::Serialize;
use serde_json::Value;
use std::sync::LazyLock;

const NODE_PREVIEW_LIMIT: usize = 15;
const GUEST_PREVIEW_LIMIT: usize = 25;

const IPV4_PATTERN: &str =
    r"\b(?:(?:25[0-5]|2[0-4]\d|1?\d?\d)\.){3}(?:25[0-5]|2[0-4]\d|1?\d?\d)\b";

static IPV4: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(IPV4_PATTERN).expect("IPv4 pattern is a valid regex"));

/// `abc***xyz`; short secrets become `***`.
pub fn redact_secret(secret: &str) -> String {
    let s = secret.trim();
    if s.is_empty() {
        return String::new();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= 6 {
        return "***".to_string();
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 3..].iter().collect();
    format!("{}***{}", head, tail)
}

/// First and last two characters; four or fewer become all `*`.
pub fn mask_token_id(token_id: &str) -> String {
    let s = token_id.trim();
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", head, tail)
}

/// Rewrites every IPv4 address in `text` as `a.b.xxx.xxx`.
pub fn mask_ipv4(text: &str) -> String {
    IPV4.replace_all(text, |caps: &regex::Captures<'_>| {
        let mut octets = caps[0].split('.');
        match (octets.next(), octets.next()) {
            (Some(a), Some(b)) => format!("{}.{}.xxx.xxx", a, b),
            _ => caps[0].to_string(),
        }
    })
    .into_owned()
}

fn mask_value(value: &mut Value) {
    match value {
        Value::String(s) => *s = mask_ipv4(s),
        Value::Array(items) => items.iter_mut().for_each(mask_value),
        Value::Object(map) => map.values_mut().for_each(mask_value),
        _ => {}
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RedactedSettings {
    pub host: String,
    pub port: u16,
    pub verify_ssl: bool,
    pub token_id: String,
    pub token_secret: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub nodes: usize,
    pub vms: usize,
    pub containers: usize,
    pub total_guests: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct NodePreview {
    pub node: String,
    pub online: bool,
    pub uptime: u64,
    pub cpu: f64,
    pub mem: u64,
    pub maxmem: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GuestPreview {
    #[serde(rename = "type")]
    pub guest_type: GuestType,
    pub node: String,
    pub vmid: u32,
    pub name: String,
    pub status: String,
    pub preferred_ip: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HostDiagnostics {
    pub host_id: HostId,
    pub settings: RedactedSettings,
    pub options: HostOptions,
    pub version: Result<ApiVersion, String>,
    pub last_poll: Option<LastPoll>,
    pub counts: Counts,
    pub nodes_preview: Vec<NodePreview>,
    pub guests_preview: Vec<GuestPreview>,
}

impl HostDiagnostics {
    pub fn collect(
        settings: &HostSettings,
        options: &HostOptions,
        last_poll: Option<LastPoll>,
        snapshot: Option<&ClusterSnapshot>,
        version: Result<ApiVersion, String>,
    ) -> Self {
        let mut options = options.clone();
        options.ip_prefix = mask_ipv4(&options.ip_prefix);

        let (counts, nodes_preview, guests_preview) = match snapshot {
            Some(snapshot) => (
                Counts {
                    nodes: snapshot.nodes.len(),
                    vms: snapshot.count_of(GuestType::Qemu),
                    containers: snapshot.count_of(GuestType::Lxc),
                    total_guests: snapshot.guests.len(),
                },
                snapshot
                    .nodes
                    .values()
                    .take(NODE_PREVIEW_LIMIT)
                    .map(|n| NodePreview {
                        node: n.name.clone(),
                        online: n.online,
                        uptime: n.uptime,
                        cpu: n.cpu,
                        mem: n.memory.used,
                        maxmem: n.memory.total,
                    })
                    .collect(),
                snapshot
                    .guests
                    .values()
                    .take(GUEST_PREVIEW_LIMIT)
                    .map(|g| GuestPreview {
                        guest_type: g.key.guest_type,
                        node: g.key.node.clone(),
                        vmid: g.key.vmid,
                        name: g.name.clone(),
                        status: g.status.as_str().to_string(),
                        preferred_ip: g.preferred_ip.as_deref().map(mask_ipv4),
                    })
                    .collect(),
            ),
            None => (Counts::default(), Vec::new(), Vec::new()),
        };

        Self {
            host_id: settings.id.clone(),
            settings: RedactedSettings {
                host: mask_ipv4(&settings.host),
                port: settings.port,
                verify_ssl: settings.verify_ssl,
                token_id: mask_token_id(&settings.token_id),
                token_secret: redact_secret(settings.token_secret.expose_secret()),
            },
            options,
            version,
            last_poll: last_poll.map(|mut p| {
                p.error = p.error.as_deref().map(mask_ipv4);
                p
            }),
            counts,
            nodes_preview,
            guests_preview,
        }
    }

    /// JSON form with a final IPv4 pass over every string.
    pub fn to_json(&self) -> serde_json::Result<Value> {
        let mut value = serde_json::to_value(self)?;
        mask_value(&mut value);
        Ok(value)
    }
}
