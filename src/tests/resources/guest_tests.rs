use crate::tests::create_test_client;
use crate::{ClusterApi, GuestAction, GuestType, PveError};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

#[tokio::test]
async fn test_qemu_agent_addresses_are_filtered() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);

    Mock::given(method("GET"))
        .and(path("/api2/json/nodes/pve1/qemu/100/agent/network-get-interfaces"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {
                "result": [
                    {
                        "name": "lo",
                        "ip-addresses": [
                            {"ip-address": "127.0.0.1", "ip-address-type": "ipv4", "prefix": 8},
                            {"ip-address": "::1", "ip-address-type": "ipv6", "prefix": 128}
                        ]
                    },
                    {
                        "name": "eth0",
                        "hardware-address": "bc:24:11:00:00:01",
                        "ip-addresses": [
                            {"ip-address": "10.0.0.5", "ip-address-type": "ipv4", "prefix": 24},
                            {"ip-address": "fe80::be24:11ff:fe00:1", "ip-address-type": "ipv6", "prefix": 64},
                            {"ip-address": "192.168.1.20", "ip-address-type": "ipv4", "prefix": 24}
                        ]
                    },
                    {
                        "name": "eth1",
                        "ip-addresses": [
                            {"ip-address": "10.0.0.5", "ip-address-type": "ipv4", "prefix": 24}
                        ]
                    }
                ]
            }
        })))
        .mount(&mock_server)
        .await;

    let addresses = client.guest_network("pve1", 100, GuestType::Qemu).await;
    assert_eq!(addresses, vec!["10.0.0.5", "192.168.1.20"]);
}

#[tokio::test]
async fn test_lxc_interfaces_strip_prefix() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);

    Mock::given(method("GET"))
        .and(path("/api2/json/nodes/pve1/lxc/200/interfaces"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [
                {"name": "lo", "inet": "127.0.0.1/8", "inet6": "::1/128"},
                {"name": "eth0", "hwaddr": "bc:24:11:00:00:02", "inet": "192.168.1.30/24", "inet6": "fd00::30/64"}
            ]
        })))
        .mount(&mock_server)
        .await;

    let addresses = client.guest_network("pve1", 200, GuestType::Lxc).await;
    assert_eq!(addresses, vec!["192.168.1.30", "fd00::30"]);
}

#[tokio::test]
async fn test_agent_error_yields_empty_list() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);

    Mock::given(method("GET"))
        .and(path("/api2/json/nodes/pve1/qemu/101/agent/network-get-interfaces"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "data": null,
            "message": "QEMU guest agent is not running"
        })))
        .mount(&mock_server)
        .await;

    assert!(client.guest_network("pve1", 101, GuestType::Qemu).await.is_empty());
}

#[tokio::test]
async fn test_perform_action_returns_upid() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);
    let upid = "UPID:pve1:0000A1B2:0012C3D4:65F0A1B2:qmstart:100:root@pam!sync:";

    Mock::given(method("POST"))
        .and(path("/api2/json/nodes/pve1/qemu/100/status/start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": upid})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = client
        .perform_action("pve1", 100, GuestType::Qemu, GuestAction::Start)
        .await
        .unwrap();
    assert_eq!(result, upid);
}

#[tokio::test]
async fn test_hard_stop_posts_stop() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);

    Mock::given(method("POST"))
        .and(path("/api2/json/nodes/pve1/lxc/200/status/stop"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": "UPID:pve1:00000001:00000002:00000003:vzstop:200:root@pam!sync:"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    client
        .perform_action("pve1", 200, GuestType::Lxc, GuestAction::Stop)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_rejected_action_is_action_error() {
    let mock_server = MockServer::start().await;
    let client = create_test_client(&mock_server);

    Mock::given(method("POST"))
        .and(path("/api2/json/nodes/pve1/qemu/100/status/shutdown"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "data": null,
            "message": "VM 100 not running"
        })))
        .mount(&mock_server)
        .await;

    let err = client
        .perform_action("pve1", 100, GuestType::Qemu, GuestAction::Shutdown)
        .await
        .unwrap_err();
    match err {
        PveError::Action { status, message } => {
            assert_eq!(status, Some(500));
            assert_eq!(message, "VM 100 not running");
        }
        other => panic!("expected action error, got {:?}", other),
    }
}
