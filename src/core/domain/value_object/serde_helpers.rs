//! Serde helpers for custom serialization.
//!
//! Proxmox is loose about numeric types: LXC listings may send `vmid` as a
//! string and node status reports the load average as an array of strings.

use serde::{Deserialize, Deserializer, Serializer};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Serialization and deserialization for `SystemTime` as seconds since UNIX epoch.
pub mod system_time {
    use super::*;

    /// Serialize a `SystemTime` as a u64 representing seconds since UNIX epoch.
    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let duration = time
            .duration_since(UNIX_EPOCH)
            .map_err(|_| serde::ser::Error::custom("SystemTime before UNIX epoch"))?;
        serializer.serialize_u64(duration.as_secs())
    }

    /// Deserialize a u64 representing seconds since UNIX epoch into a `SystemTime`.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + Duration::from_secs(secs))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Int(u64),
    Float(f64),
    Str(String),
}

impl NumberOrString {
    fn as_f64(&self) -> Option<f64> {
        match self {
            NumberOrString::Int(n) => Some(*n as f64),
            NumberOrString::Float(f) => Some(*f),
            NumberOrString::Str(s) => s.trim().parse().ok(),
        }
    }

    fn as_u32(&self) -> Option<u32> {
        match self {
            NumberOrString::Int(n) => u32::try_from(*n).ok(),
            NumberOrString::Float(_) => None,
            NumberOrString::Str(s) => s.trim().parse().ok(),
        }
    }
}

/// Deserialize a guest id that may be encoded as a number or a string.
pub fn vmid<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = NumberOrString::deserialize(deserializer)?;
    raw.as_u32()
        .ok_or_else(|| serde::de::Error::custom("vmid is not a valid guest id"))
}

/// Like [`vmid`], for optional fields. `null` maps to `None`.
pub fn optional_vmid<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) => raw
            .as_u32()
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("vmid is not a valid guest id")),
    }
}

/// Deserialize a load average array whose entries may be numbers or strings.
///
/// Entries that do not parse are skipped.
pub fn loadavg<'de, D>(deserializer: D) -> Result<Option<Vec<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<NumberOrString>>::deserialize(deserializer)?;
    Ok(raw.map(|values| values.iter().filter_map(NumberOrString::as_f64).collect()))
}
