//! HTTP client for the Proxmox VE API, authenticated with an API token.

use crate::{
    config::ClientConfig,
    core::domain::{
        error::{PveError, PveResult},
        model::{
            guest::{GuestAction, GuestListItem, GuestType},
            guest_network::{AgentNetworkInterfaces, LxcInterface, lxc_addresses},
            host_connection::HostConnection,
            node_list_item::NodeListItem,
            node_status::NodeStatus,
            version::ApiVersion,
        },
        service::preferred_ip::discovered_addresses,
    },
};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota};
#[cfg(test)]
use mockall::automock;
use reqwest::{Client, Method, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Read and control operations the poller needs from one cluster.
///
/// This trait is the seam between the poll loop and HTTP, so snapshot
/// building and action dispatch can be tested without a server.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// `GET /nodes`.
    async fn list_nodes(&self) -> PveResult<Vec<NodeListItem>>;

    /// `GET /nodes/{node}/status`.
    async fn node_status(&self, node: &str) -> PveResult<NodeStatus>;

    /// QEMU guests followed by LXC guests of one node, each tagged with its type.
    async fn list_guests(&self, node: &str) -> PveResult<Vec<GuestListItem>>;

    /// Usable addresses reported from inside the guest.
    ///
    /// Never fails: an unreachable agent yields an empty list.
    async fn guest_network(&self, node: &str, vmid: u32, guest_type: GuestType) -> Vec<String>;

    /// Requests a power action and returns the task UPID.
    async fn perform_action(
        &self,
        node: &str,
        vmid: u32,
        guest_type: GuestType,
        action: GuestAction,
    ) -> PveResult<String>;

    /// `GET /version`.
    async fn version(&self) -> PveResult<ApiVersion>;
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Token-authenticated client for one Host.
///
/// Every request carries `Authorization: PVEAPIToken=<id>=<secret>`. TLS
/// verification follows the Host's setting for the lifetime of the client.
#[derive(Debug)]
pub struct ApiClient {
    http_client: Client,
    connection: Arc<HostConnection>,
    config: Arc<ClientConfig>,
    rate_limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl ApiClient {
    /// Creates a new `ApiClient`.
    ///
    /// # Errors
    /// Returns `PveError::Config` if the rate limit is zero or the HTTP client
    /// cannot be built.
    pub fn new(connection: HostConnection, config: ClientConfig) -> PveResult<Self> {
        let http_client = Client::builder()
            .danger_accept_invalid_certs(!connection.verify_ssl())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| PveError::Config(format!("cannot build HTTP client: {}", e)))?;

        let rate_limiter = match config.rate_limit {
            Some(rl) => {
                let rate = NonZeroU32::new(rl.requests_per_second).ok_or_else(|| {
                    PveError::Config("requests_per_second must be positive".to_string())
                })?;
                let burst = NonZeroU32::new(rl.burst_size)
                    .ok_or_else(|| PveError::Config("burst_size must be positive".to_string()))?;
                let quota = Quota::per_second(rate).allow_burst(burst);
                Some(Arc::new(DefaultDirectRateLimiter::direct(quota)))
            }
            None => None,
        };

        Ok(Self {
            http_client,
            connection: Arc::new(connection),
            config: Arc::new(config),
            rate_limiter,
        })
    }

    /// Returns a reference to the underlying connection details.
    pub fn connection(&self) -> &HostConnection {
        &self.connection
    }

    /// Sends one request. Only transport failures are errors here.
    async fn send(
        &self,
        method: Method,
        path: &str,
        timeout: Option<Duration>,
    ) -> PveResult<Response> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        let url = self.connection.url().endpoint(path);
        let mut req_builder = self
            .http_client
            .request(method, &url)
            .header("Authorization", self.connection.authorization());

        if let Some(timeout) = timeout {
            req_builder = req_builder.timeout(timeout);
        }

        req_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                PveError::Network(format!("request to {} timed out", path))
            } else {
                PveError::Network(format!("HTTP request failed: {}", e))
            }
        })
    }

    /// Core request execution: send, classify the status, unwrap `data`.
    async fn execute_request<T>(
        &self,
        method: Method,
        path: &str,
        timeout: Option<Duration>,
    ) -> PveResult<T>
    where
        T: DeserializeOwned,
    {
        let response = self.send(method, path, timeout).await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let message = error_message(response).await;
            return Err(PveError::Auth(format!("{} ({})", message, status)));
        }

        if !status.is_success() {
            return Err(PveError::Api {
                status: Some(status.as_u16()),
                message: error_message(response).await,
            });
        }

        decode(response).await
    }

    pub async fn get<T>(&self, path: &str) -> PveResult<T>
    where
        T: DeserializeOwned,
    {
        self.execute_request(Method::GET, path, None).await
    }
}

/// Extracts the most useful message from an error response.
///
/// Proxmox answers errors with `{"data": null, "message": ..., "errors": {...}}`
/// or plain text.
async fn error_message(response: Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    if let Ok(body) = serde_json::from_str::<serde_json::Value>(&text) {
        let message = body.get("message").and_then(|m| m.as_str()).map(str::trim);
        let errors = body.get("errors").filter(|e| !e.is_null());
        match (message, errors) {
            (Some(m), Some(e)) => return format!("{} {}", m, e),
            (Some(m), None) if !m.is_empty() => return m.to_string(),
            (_, Some(e)) => return e.to_string(),
            _ => {}
        }
    }

    let text = text.trim();
    if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    } else {
        text.to_string()
    }
}

async fn decode<T>(response: Response) -> PveResult<T>
where
    T: DeserializeOwned,
{
    let status = response.status().as_u16();
    response
        .json::<Envelope<T>>()
        .await
        .map(|envelope| envelope.data)
        .map_err(|e| PveError::Api {
            status: Some(status),
            message: format!("Failed to parse response: {}", e),
        })
}

#[async_trait]
impl ClusterApi for ApiClient {
    async fn list_nodes(&self) -> PveResult<Vec<NodeListItem>> {
        self.get("nodes").await
    }

    async fn node_status(&self, node: &str) -> PveResult<NodeStatus> {
        self.get(&format!("nodes/{}/status", node)).await
    }

    async fn list_guests(&self, node: &str) -> PveResult<Vec<GuestListItem>> {
        let mut guests = Vec::new();
        for guest_type in [GuestType::Qemu, GuestType::Lxc] {
            let listed: Vec<GuestListItem> =
                self.get(&format!("nodes/{}/{}", node, guest_type)).await?;
            guests.extend(listed.into_iter().map(|mut g| {
                g.guest_type = guest_type;
                g
            }));
        }
        Ok(guests)
    }

    async fn guest_network(&self, node: &str, vmid: u32, guest_type: GuestType) -> Vec<String> {
        let timeout = Some(self.config.agent_timeout());
        let raw = match guest_type {
            GuestType::Qemu => self
                .execute_request::<AgentNetworkInterfaces>(
                    Method::GET,
                    &format!("nodes/{}/qemu/{}/agent/network-get-interfaces", node, vmid),
                    timeout,
                )
                .await
                .map(|agent| agent.addresses()),
            GuestType::Lxc => self
                .execute_request::<Vec<LxcInterface>>(
                    Method::GET,
                    &format!("nodes/{}/lxc/{}/interfaces", node, vmid),
                    timeout,
                )
                .await
                .map(|interfaces| lxc_addresses(&interfaces)),
        };

        match raw {
            Ok(addresses) => discovered_addresses(addresses),
            Err(e) => {
                trace!(node, vmid, guest_type = %guest_type, error = %e, "guest network unavailable");
                Vec::new()
            }
        }
    }

    async fn perform_action(
        &self,
        node: &str,
        vmid: u32,
        guest_type: GuestType,
        action: GuestAction,
    ) -> PveResult<String> {
        let path = format!(
            "nodes/{}/{}/{}/status/{}",
            node,
            guest_type,
            vmid,
            action.api_path()
        );
        let response = self.send(Method::POST, &path, None).await?;
        let status = response.status();

        if !status.is_success() {
            return Err(PveError::Action {
                status: Some(status.as_u16()),
                message: error_message(response).await,
            });
        }

        let upid: Option<String> = decode(response).await.map_err(|e| PveError::Action {
            status: Some(status.as_u16()),
            message: e.to_string(),
        })?;
        Ok(upid.unwrap_or_default())
    }

    async fn version(&self) -> PveResult<ApiVersion> {
        self.get("version").await
    }
}
