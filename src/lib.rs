//! Keeps a platform-side device registry in sync with live Proxmox VE clusters.
//!
//! Every configured Host gets its own poll loop. Each tick fetches a
//! [`ClusterSnapshot`], diffs it against the last committed one and applies
//! the resulting plan to a [`PlatformRegistry`]: one device per node and per
//! guest, each with its sensor, switch and button entities. Guests are keyed
//! by `(node, vmid, type)`, so renames never recreate anything.
//!
//! Guest power actions are resolved to exactly one Host and dispatched
//! through the same API token.
//!
//! # Examples
//!
//! ```no_run
//! use pve_sync::{HostSettings, HostSupervisor, InMemoryRegistry, PveResult};
//! use secrecy::SecretString;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> PveResult<()> {
//!     let registry = Arc::new(InMemoryRegistry::new());
//!     let supervisor = HostSupervisor::new(registry.clone(), Default::default());
//!
//!     let mut settings = HostSettings::new(
//!         "home",
//!         "pve.example.com",
//!         "root@pam!sync",
//!         SecretString::from("xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx"),
//!     );
//!     settings.verify_ssl = false;
//!     supervisor.add_host(settings).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
mod core;
pub mod diagnostics;
pub mod runtime;

pub use crate::config::{ClientConfig, HostSettings, RateLimitConfig, Settings};
pub use crate::core::application::{
    action_resolver::{ActionResolver, HostView, ResolvedTarget},
    reconciler::{ReconcileEvent, ReconcilePlan, reconcile},
    registry_bridge::{
        DeviceRecord, EntityKind, EntityRecord, InMemoryRegistry, PlatformRegistry,
        RegistryBridge, catalogue,
    },
    snapshot_fetcher::SnapshotFetcher,
};
pub use crate::core::domain::{
    error::{PveError, PveResult, ValidationError},
    model::{
        ApiVersion, ClusterSnapshot, GuestAction, GuestKey, GuestListItem, GuestRef,
        GuestSnapshot, GuestStatus, GuestType, HostConnection, HostOptions, IpMode, IpPolicy,
        NodeListItem, NodeSnapshot, NodeStatus, OneOrMany, RawTarget, TargetSpec, Usage,
    },
    service::preferred_ip,
    value_object::{ApiTokenId, ApiTokenSecret, HostId, ProxmoxHost, ProxmoxPort, ProxmoxUrl},
};
pub use crate::core::infrastructure::api_client::{ApiClient, ClusterApi};
pub use crate::diagnostics::HostDiagnostics;
pub use crate::runtime::{EntityCommand, HostSupervisor, LastPoll, TickOutcome};

#[cfg(test)]
mod tests;
