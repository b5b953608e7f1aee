//! Per-Host poll loops and the supervisor that owns them.

mod host_runtime;
mod supervisor;

pub use host_runtime::{LastPoll, TickOutcome};
pub use supervisor::{EntityCommand, HostSupervisor};
