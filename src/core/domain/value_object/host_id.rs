use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one configured host (a config entry on the platform side).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostId(String);

impl HostId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HostId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for HostId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
