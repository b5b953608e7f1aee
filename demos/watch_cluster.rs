//! Polls the Hosts of a settings file and prints every committed snapshot.
//!
//! ```text
//! RUST_LOG=pve_sync=debug cargo run --example watch_cluster -- pve_sync.toml
//! ```

use pve_sync::{HostSupervisor, InMemoryRegistry, PveResult, Settings};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> PveResult<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "pve_sync.toml".to_string());
    let settings = Settings::load(&path).await?;

    let registry = Arc::new(InMemoryRegistry::new());
    let supervisor = HostSupervisor::from_settings(settings, registry.clone()).await?;

    for host_id in supervisor.hosts().await {
        let mut committed = supervisor.subscribe(&host_id).await?;
        let registry = registry.clone();
        tokio::spawn(async move {
            while committed.changed().await.is_ok() {
                let Some(snapshot) = committed.borrow_and_update().clone() else {
                    continue;
                };
                println!(
                    "[{}] {} nodes, {} guests, {} devices, {} entities",
                    host_id,
                    snapshot.nodes.len(),
                    snapshot.guests.len(),
                    registry.device_count(),
                    registry.entity_count()
                );
                for guest in snapshot.guests.values() {
                    println!(
                        "  {:<28} {:<8} {}",
                        guest.display_name(),
                        guest.status,
                        guest.preferred_ip.as_deref().unwrap_or("-")
                    );
                }
            }
        });
    }

    let _ = tokio::signal::ctrl_c().await;
    supervisor.shutdown().await;
    Ok(())
}
