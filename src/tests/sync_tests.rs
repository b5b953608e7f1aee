use crate::core::infrastructure::api_client::MockClusterApi;
use crate::{
    ClientConfig, ClusterSnapshot, EntityCommand, GuestAction, GuestKey, GuestListItem,
    GuestStatus, GuestType, HostId, HostOptions, HostSettings, HostSupervisor, InMemoryRegistry,
    IpMode, NodeListItem, PlatformRegistry, PveError, RawTarget, TargetSpec, TickOutcome,
};
use secrecy::SecretString;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const UPID: &str = "UPID:pve1:00001234:00ABCDEF:66000000:qmstart:100:root@pam!sync:";

fn settings(id: &str, address: &str) -> HostSettings {
    HostSettings::new(id, address, "root@pam!sync", SecretString::from("secret-value-1"))
}

fn node(name: &str) -> NodeListItem {
    NodeListItem {
        node: name.to_string(),
        status: "online".to_string(),
        cpu: Some(0.2),
        mem: Some(512),
        maxmem: Some(1024),
        disk: None,
        maxdisk: None,
        uptime: Some(600),
    }
}

fn guest(vmid: u32, name: &str, status: GuestStatus) -> GuestListItem {
    GuestListItem {
        vmid,
        guest_type: GuestType::Qemu,
        name: Some(name.to_string()),
        status,
        cpu: Some(0.01),
        mem: Some(256),
        maxmem: Some(512),
        uptime: Some(60),
        netin: Some(0),
        netout: Some(0),
    }
}

/// A cluster with node `pve1` hosting one running VM 100.
fn cluster_api() -> MockClusterApi {
    let mut api = MockClusterApi::new();
    api.expect_list_nodes().returning(|| Ok(vec![node("pve1")]));
    api.expect_node_status()
        .returning(|_| Err(PveError::Network("status unavailable".into())));
    api.expect_list_guests()
        .returning(|_| Ok(vec![guest(100, "web", GuestStatus::Running)]));
    api.expect_guest_network()
        .returning(|_, _, _| vec!["10.0.0.5".to_string(), "192.168.1.20".to_string()]);
    api
}

async fn committed(supervisor: &HostSupervisor, host_id: &HostId) -> Arc<ClusterSnapshot> {
    let mut rx = supervisor.subscribe(host_id).await.unwrap();
    let snapshot = timeout(Duration::from_secs(5), rx.wait_for(|s| s.is_some()))
        .await
        .expect("no snapshot committed in time")
        .unwrap()
        .clone();
    snapshot.unwrap()
}

fn web() -> GuestKey {
    GuestKey::new("pve1", 100, GuestType::Qemu)
}

#[tokio::test]
async fn test_same_guest_on_two_hosts_needs_host_id() {
    let registry = Arc::new(InMemoryRegistry::new());
    let supervisor = HostSupervisor::new(registry, ClientConfig::default());

    let mut h1 = cluster_api();
    h1.expect_perform_action().never();
    let mut h2 = cluster_api();
    h2.expect_perform_action()
        .withf(|node, vmid, t, action| {
            node == "pve1" && *vmid == 100 && *t == GuestType::Qemu && *action == GuestAction::Start
        })
        .times(1)
        .returning(|_, _, _, _| Ok(UPID.to_string()));

    supervisor
        .add_host_with_api(settings("h1", "10.0.0.1"), Arc::new(h1))
        .await
        .unwrap();
    supervisor
        .add_host_with_api(settings("h2", "10.0.0.2"), Arc::new(h2))
        .await
        .unwrap();
    committed(&supervisor, &HostId::new("h1")).await;
    committed(&supervisor, &HostId::new("h2")).await;

    match supervisor
        .perform_action(GuestAction::Start, &TargetSpec::tuple(web()))
        .await
    {
        Err(PveError::AmbiguousTarget { candidates, .. }) => {
            assert_eq!(candidates, vec!["h1".to_string(), "h2".to_string()]);
        }
        other => panic!("expected ambiguity, got {:?}", other),
    }

    let upid = supervisor
        .perform_action(
            GuestAction::Start,
            &TargetSpec::tuple(web()).on_host(HostId::new("h2")),
        )
        .await
        .unwrap();
    assert_eq!(upid, UPID);

    supervisor.shutdown().await;
}

#[tokio::test]
async fn test_raw_device_target_dispatches_to_owner() {
    let registry = Arc::new(InMemoryRegistry::new());
    let supervisor = HostSupervisor::new(registry.clone(), ClientConfig::default());

    let mut api = cluster_api();
    api.expect_perform_action()
        .withf(|_, vmid, _, action| *vmid == 100 && *action == GuestAction::Reboot)
        .times(1)
        .returning(|_, _, _, _| Ok(UPID.to_string()));
    supervisor
        .add_host_with_api(settings("home", "pve.lan"), Arc::new(api))
        .await
        .unwrap();
    let host = HostId::new("home");
    committed(&supervisor, &host).await;

    let device_id = registry.find_device(&host, "pve1:qemu:100").unwrap();
    let raw: RawTarget = serde_json::from_value(json!({ "device_id": [device_id] })).unwrap();
    let upid = supervisor
        .perform_raw_action(GuestAction::Reboot, &raw)
        .await
        .unwrap();
    assert_eq!(upid, UPID);

    let raw: RawTarget = serde_json::from_value(json!({ "node": "pve1" })).unwrap();
    assert!(matches!(
        supervisor.perform_raw_action(GuestAction::Reboot, &raw).await,
        Err(PveError::Validation(_))
    ));

    supervisor.shutdown().await;
}

#[tokio::test]
async fn test_power_switch_turn_off_shuts_down() {
    let registry = Arc::new(InMemoryRegistry::new());
    let supervisor = HostSupervisor::new(registry.clone(), ClientConfig::default());

    let mut api = cluster_api();
    api.expect_perform_action()
        .withf(|_, _, _, action| *action == GuestAction::Shutdown)
        .times(1)
        .returning(|_, _, _, _| Ok(UPID.to_string()));
    supervisor
        .add_host_with_api(settings("home", "pve.lan"), Arc::new(api))
        .await
        .unwrap();
    committed(&supervisor, &HostId::new("home")).await;

    let power = "home_pve1:qemu:100_power";
    supervisor
        .trigger_entity(power, EntityCommand::TurnOff)
        .await
        .unwrap();

    assert!(matches!(
        supervisor.trigger_entity(power, EntityCommand::Press).await,
        Err(PveError::Validation(_))
    ));
    assert!(matches!(
        supervisor
            .trigger_entity("home_pve1:qemu:100_cpu", EntityCommand::Press)
            .await,
        Err(PveError::Validation(_))
    ));

    supervisor.shutdown().await;
}

#[tokio::test]
async fn test_options_change_reselects_preferred_ip() {
    let registry = Arc::new(InMemoryRegistry::new());
    let supervisor = HostSupervisor::new(registry.clone(), ClientConfig::default());
    let host = HostId::new("home");
    supervisor
        .add_host_with_api(settings("home", "pve.lan"), Arc::new(cluster_api()))
        .await
        .unwrap();

    let snapshot = committed(&supervisor, &host).await;
    assert_eq!(
        snapshot.guests[&web()].preferred_ip.as_deref(),
        Some("192.168.1.20")
    );

    let options = HostOptions {
        ip_mode: IpMode::CustomPrefix,
        ip_prefix: "10.".to_string(),
        ..HostOptions::default()
    };
    supervisor.update_options(&host, options).await.unwrap();

    let mut rx = supervisor.subscribe(&host).await.unwrap();
    timeout(
        Duration::from_secs(5),
        rx.wait_for(|s| {
            s.as_ref()
                .and_then(|s| s.guests.get(&web()))
                .and_then(|g| g.preferred_ip.as_deref())
                == Some("10.0.0.5")
        }),
    )
    .await
    .expect("options were not applied")
    .unwrap();

    let ip = registry.entity("home_pve1:qemu:100_ip_preferred").unwrap();
    assert_eq!(ip.state, json!("10.0.0.5"));

    let invalid = HostOptions {
        scan_interval_secs: 1,
        ..HostOptions::default()
    };
    assert!(supervisor.update_options(&host, invalid).await.is_err());

    supervisor.shutdown().await;
}

#[tokio::test]
async fn test_remove_host_tears_down_only_its_objects() {
    let registry = Arc::new(InMemoryRegistry::new());
    let supervisor = HostSupervisor::new(registry.clone(), ClientConfig::default());
    let home = HostId::new("home");
    let lab = HostId::new("lab");

    supervisor
        .add_host_with_api(settings("home", "10.0.0.1"), Arc::new(cluster_api()))
        .await
        .unwrap();
    supervisor
        .add_host_with_api(settings("lab", "10.0.0.2"), Arc::new(cluster_api()))
        .await
        .unwrap();
    committed(&supervisor, &home).await;
    committed(&supervisor, &lab).await;
    assert_eq!(registry.device_count(), 4);

    supervisor.remove_host(&home).await.unwrap();
    assert!(registry.devices(&home).is_empty());
    assert_eq!(registry.devices(&lab).len(), 2);
    assert_eq!(supervisor.hosts().await, vec![lab.clone()]);
    assert!(matches!(
        supervisor.remove_host(&home).await,
        Err(PveError::TargetNotFound(_))
    ));

    supervisor.shutdown().await;
}

#[tokio::test]
async fn test_duplicate_host_is_rejected() {
    let supervisor = HostSupervisor::new(Arc::new(InMemoryRegistry::new()), ClientConfig::default());
    supervisor
        .add_host_with_api(settings("home", "pve.lan"), Arc::new(cluster_api()))
        .await
        .unwrap();
    let result = supervisor
        .add_host_with_api(settings("home", "pve2.lan"), Arc::new(cluster_api()))
        .await;
    assert!(matches!(result, Err(PveError::Config(_))));
    supervisor.shutdown().await;
}

#[tokio::test]
async fn test_auth_failure_suspends_until_reconfigured() {
    let registry = Arc::new(InMemoryRegistry::new());
    let supervisor = HostSupervisor::new(registry.clone(), ClientConfig::default());
    let host = HostId::new("home");

    let mut rejected = MockClusterApi::new();
    rejected
        .expect_list_nodes()
        .times(1)
        .returning(|| Err(PveError::Auth("authentication failure (401)".into())));
    supervisor
        .add_host_with_api(settings("home", "pve.lan"), Arc::new(rejected))
        .await
        .unwrap();

    let suspended = timeout(Duration::from_secs(5), async {
        loop {
            if supervisor.refresh_now(&host).await.unwrap() == TickOutcome::Suspended {
                break;
            }
            tokio::task::yield_now().await;
        }
    })
    .await;
    assert!(suspended.is_ok());
    assert!(supervisor.snapshot(&host).await.unwrap().is_none());
    assert_eq!(registry.device_count(), 0);

    supervisor
        .reconfigure_host_with_api(settings("home", "pve.lan"), Arc::new(cluster_api()))
        .await
        .unwrap();
    committed(&supervisor, &host).await;
    assert_eq!(registry.devices(&host).len(), 2);

    supervisor.shutdown().await;
}

#[tokio::test]
async fn test_diagnostics_are_redacted() {
    let supervisor = HostSupervisor::new(Arc::new(InMemoryRegistry::new()), ClientConfig::default());
    let host = HostId::new("home");
    let mut api = cluster_api();
    api.expect_version()
        .returning(|| Err(PveError::Network("connect to 10.0.0.1:8006 refused".into())));
    supervisor
        .add_host_with_api(settings("home", "10.0.0.1"), Arc::new(api))
        .await
        .unwrap();
    committed(&supervisor, &host).await;

    let diagnostics = supervisor.diagnostics(&host).await.unwrap();
    assert_eq!(diagnostics.counts.nodes, 1);
    assert_eq!(diagnostics.counts.vms, 1);
    assert!(diagnostics.last_poll.as_ref().is_some_and(|p| p.success));

    let text = diagnostics.to_json().unwrap().to_string();
    assert!(!text.contains("secret-value-1"));
    assert!(!text.contains("10.0.0.1"));
    assert!(text.contains("10.0.xxx.xxx"));

    supervisor.shutdown().await;
}
