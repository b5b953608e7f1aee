mod resources;
mod sync_tests;

use crate::{ApiClient, ClientConfig, HostConnection};
use secrecy::SecretString;
use wiremock::MockServer;

pub(crate) fn create_test_connection(server_url: &str) -> HostConnection {
    HostConnection::new(
        "pve.test",
        8006,
        "root@pam!sync",
        SecretString::from("11111111-2222-3333"),
        true,
    )
    .unwrap()
    .with_base_url(server_url)
    .unwrap()
}

pub(crate) fn create_test_client(server: &MockServer) -> ApiClient {
    ApiClient::new(create_test_connection(&server.uri()), ClientConfig::default()).unwrap()
}
