use crate::tests::create_test_client;
use crate::{ClusterApi, GuestStatus, GuestType, PveError};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

#[tokio::test]
async fn test_nodes_list_success() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);

    Mock::given(method("GET"))
        .and(path("/api2/json/nodes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [
                {
                    "node": "pve1",
                    "status": "online",
                    "cpu": 0.15,
                    "maxcpu": 8,
                    "mem": 8589934592_i64,
                    "maxmem": 17179869184_i64,
                    "disk": 1099511627776_i64,
                    "maxdisk": 2199023255552_i64,
                    "uptime": 86400
                },
                {
                    "node": "pve2",
                    "status": "offline"
                }
            ]
        })))
        .mount(&mock_server)
        .await;

    let nodes = client.list_nodes().await.unwrap();
    assert_eq!(nodes.len(), 2);
    assert_eq!(nodes[0].node, "pve1");
    assert!(nodes[0].is_online());
    assert_eq!(nodes[0].maxmem, Some(17179869184));
    assert!(!nodes[1].is_online());
    assert_eq!(nodes[1].cpu, None);
}

#[tokio::test]
async fn test_node_status_reads_load_swap_and_rootfs() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);

    Mock::given(method("GET"))
        .and(path("/api2/json/nodes/pve1/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {
                "cpu": 0.05,
                "loadavg": ["0.91", "0.80", "0.75"],
                "memory": {"total": 1000, "used": 250, "free": 750},
                "swap": {"total": 500, "used": 0, "free": 500},
                "rootfs": {"total": 100, "used": 30, "avail": 70, "free": 70},
                "uptime": 3600
            }
        })))
        .mount(&mock_server)
        .await;

    let status = client.node_status("pve1").await.unwrap();
    assert_eq!(status.load_1m(), Some(0.91));
    assert_eq!(status.swap.unwrap().total, 500);
    assert_eq!(status.rootfs.unwrap().available(), 70);
}

#[tokio::test]
async fn test_list_guests_merges_qemu_then_lxc() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);

    Mock::given(method("GET"))
        .and(path("/api2/json/nodes/pve1/qemu"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [
                {"vmid": 100, "name": "web", "status": "running", "cpu": 0.02, "mem": 1024, "maxmem": 2048}
            ]
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api2/json/nodes/pve1/lxc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [
                {"vmid": "200", "name": "dns", "status": "stopped", "type": "lxc"}
            ]
        })))
        .mount(&mock_server)
        .await;

    let guests = client.list_guests("pve1").await.unwrap();
    assert_eq!(guests.len(), 2);
    assert_eq!(guests[0].vmid, 100);
    assert_eq!(guests[0].guest_type, GuestType::Qemu);
    assert_eq!(guests[0].status, GuestStatus::Running);
    assert_eq!(guests[1].vmid, 200);
    assert_eq!(guests[1].guest_type, GuestType::Lxc);
    assert_eq!(guests[1].status, GuestStatus::Stopped);
}

#[tokio::test]
async fn test_list_guests_fails_when_one_listing_fails() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);

    Mock::given(method("GET"))
        .and(path("/api2/json/nodes/pve1/qemu"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api2/json/nodes/pve1/lxc"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "data": null,
            "message": "node pve1 unreachable"
        })))
        .mount(&mock_server)
        .await;

    let result = client.list_guests("pve1").await;
    match result {
        Err(PveError::Api { status, message }) => {
            assert_eq!(status, Some(500));
            assert!(message.contains("unreachable"));
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_version() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);

    Mock::given(method("GET"))
        .and(path("/api2/json/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {"version": "8.2.4", "release": "8.2", "repoid": "faa83925c9641325"}
        })))
        .mount(&mock_server)
        .await;

    let version = client.version().await.unwrap();
    assert_eq!(version.version, "8.2.4");
    assert_eq!(version.release, "8.2");
}
