mod api_token_id;
mod api_token_secret;
mod host_id;
mod proxmox_host;
mod proxmox_port;
mod proxmox_uri;
pub(crate) mod serde_helpers;

pub use api_token_id::ApiTokenId;
pub use api_token_secret::ApiTokenSecret;
pub use host_id::HostId;
pub use proxmox_host::ProxmoxHost;
pub use proxmox_port::{DEFAULT_PORT, ProxmoxPort};
pub use proxmox_uri::ProxmoxUrl;

// Re-export validation functions for internal use
pub(crate) use api_token_id::validate_token_id;
pub(crate) use api_token_secret::validate_token_secret;
pub(crate) use proxmox_host::validate_host;
pub(crate) use proxmox_port::validate_port;
