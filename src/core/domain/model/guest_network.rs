//! Network interface payloads reported from inside a guest.
//!
//! QEMU guests answer through the guest agent
//! (`/nodes/{node}/qemu/{vmid}/agent/network-get-interfaces`), containers
//! through `/nodes/{node}/lxc/{vmid}/interfaces`. Both are reduced to a flat
//! list of address strings in report order.

use serde::{Deserialize, Serialize};

/// Guest agent reply to `network-get-interfaces`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct AgentNetworkInterfaces {
    #[serde(default)]
    pub result: Vec<AgentInterface>,
}

/// One interface as seen by the guest agent.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AgentInterface {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "hardware-address", skip_serializing_if = "Option::is_none")]
    pub hardware_address: Option<String>,
    #[serde(default, rename = "ip-addresses")]
    pub ip_addresses: Vec<AgentIpAddress>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AgentIpAddress {
    #[serde(default, rename = "ip-address")]
    pub ip_address: Option<String>,
    #[serde(default, rename = "ip-address-type", skip_serializing_if = "Option::is_none")]
    pub ip_address_type: Option<String>,
}

impl AgentNetworkInterfaces {
    /// Every reported address, in interface order.
    pub fn addresses(&self) -> Vec<String> {
        self.result
            .iter()
            .flat_map(|iface| iface.ip_addresses.iter())
            .filter_map(|ip| ip.ip_address.clone())
            .filter(|addr| !addr.is_empty())
            .collect()
    }
}

/// One container interface from the LXC `interfaces` endpoint.
///
/// Addresses carry a prefix length (`10.0.0.5/24`).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LxcInterface {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hwaddr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inet6: Option<String>,
}

/// Flattens container interfaces to bare addresses, IPv4 before IPv6 per interface.
pub fn lxc_addresses(interfaces: &[LxcInterface]) -> Vec<String> {
    interfaces
        .iter()
        .flat_map(|iface| [iface.inet.as_deref(), iface.inet6.as_deref()])
        .flatten()
        .flat_map(|field| field.split([' ', ',']))
        .map(|cidr| cidr.split('/').next().unwrap_or_default().trim())
        .filter(|addr| !addr.is_empty())
        .map(str::to_string)
        .collect()
}
