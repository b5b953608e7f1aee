//! Preferred-address selection for guests.
//!
//! Everything here is pure and order-stable: the same list and policy always
//! select the same address.

use crate::core::domain::model::host_options::IpPolicy;
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};

/// Whether an address is worth reporting: parseable, not loopback, not
/// link-local, not unspecified.
pub fn is_usable(addr: &str) -> bool {
    match addr.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => !(v4.is_loopback() || v4.is_link_local() || v4.is_unspecified()),
        Ok(IpAddr::V6(v6)) => {
            let link_local = (v6.segments()[0] & 0xffc0) == 0xfe80;
            !(v6.is_loopback() || link_local || v6.is_unspecified())
        }
        Err(_) => false,
    }
}

fn is_private_v4(addr: &str) -> bool {
    addr.parse::<Ipv4Addr>().is_ok_and(|v4| v4.is_private())
}

/// Reduces raw reported addresses to the guest's address list: unusable
/// entries dropped, duplicates removed, first occurrence kept.
pub fn discovered_addresses<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    raw.into_iter()
        .map(|a| a.as_ref().trim().to_string())
        .filter(|a| is_usable(a))
        .filter(|a| seen.insert(a.clone()))
        .collect()
}

/// Picks the preferred address from `ips` under `policy`.
///
/// When the policy finds nothing, the first usable address is returned;
/// `None` only if there is none.
pub fn select(ips: &[String], policy: &IpPolicy) -> Option<String> {
    let first = |pred: &dyn Fn(&str) -> bool| ips.iter().find(|ip| pred(ip)).cloned();

    let by_policy = match policy {
        IpPolicy::Prefer192168 => first(&|ip: &str| ip.starts_with("192.168."))
            .or_else(|| first(&is_private_v4)),
        IpPolicy::PreferPrivate => first(&is_private_v4),
        IpPolicy::Any => first(&is_usable),
        IpPolicy::CustomPrefix(prefix) if !prefix.is_empty() => {
            first(&|ip: &str| ip.starts_with(prefix.as_str()))
        }
        IpPolicy::CustomPrefix(_) => None,
    };

    by_policy.or_else(|| first(&is_usable))
}
