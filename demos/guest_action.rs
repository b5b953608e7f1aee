//! Sends one power action to a guest.
//!
//! ```text
//! cargo run --example guest_action -- pve_sync.toml start pve1 100 [qemu|lxc] [host-id]
//! ```

use pve_sync::{
    GuestAction, HostSupervisor, InMemoryRegistry, PveError, PveResult, RawTarget, Settings,
    TickOutcome,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> PveResult<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let actions = GuestAction::ALL
        .iter()
        .map(GuestAction::service_name)
        .collect::<Vec<_>>()
        .join("|");
    let [path, action, node, vmid, rest @ ..] = args.as_slice() else {
        return Err(PveError::Config(format!(
            "usage: guest_action <settings> <{}> <node> <vmid> [type] [host-id]",
            actions
        )));
    };
    let action: GuestAction = action.parse()?;
    let target = RawTarget {
        node: Some(node.clone()),
        vmid: Some(
            vmid.parse()
                .map_err(|_| PveError::Config(format!("invalid vmid '{}'", vmid)))?,
        ),
        guest_type: rest.first().cloned(),
        config_entry_id: rest.get(1).cloned(),
        ..RawTarget::default()
    };

    let settings = Settings::load(path).await?;
    let supervisor = HostSupervisor::from_settings(settings, Arc::new(InMemoryRegistry::new())).await?;

    // Tuple lookups need a committed snapshot of every Host.
    for host_id in supervisor.hosts().await {
        match supervisor.refresh_now(&host_id).await? {
            TickOutcome::Failed { error } => eprintln!("{}: {}", host_id, error),
            TickOutcome::Skipped => {
                let mut committed = supervisor.subscribe(&host_id).await?;
                let _ = tokio::time::timeout(
                    Duration::from_secs(30),
                    committed.wait_for(|s| s.is_some()),
                )
                .await;
            }
            _ => {}
        }
    }

    let upid = supervisor.perform_raw_action(action, &target).await?;
    println!("{} -> {}", action, upid);

    supervisor.shutdown().await;
    Ok(())
}
