use crate::core::domain::{
    error::PveResult,
    value_object::{
        ApiTokenId, ApiTokenSecret, ProxmoxHost, ProxmoxPort, ProxmoxUrl, validate_host,
        validate_port, validate_token_id, validate_token_secret,
    },
};
use secrecy::{ExposeSecret, SecretString};

/// Validated connection parameters of one Host.
#[derive(Debug, Clone)]
pub struct HostConnection {
    host: ProxmoxHost,
    port: ProxmoxPort,
    token_id: ApiTokenId,
    token_secret: ApiTokenSecret,
    verify_ssl: bool,
    url: ProxmoxUrl,
}

impl HostConnection {
    pub fn new(
        host: &str,
        port: u16,
        token_id: &str,
        token_secret: SecretString,
        verify_ssl: bool,
    ) -> PveResult<Self> {
        let host = host.trim();
        validate_host(host)?;
        validate_port(port)?;
        validate_token_id(token_id.trim())?;
        validate_token_secret(token_secret.expose_secret())?;

        let host = ProxmoxHost::new_unchecked(host.to_string());
        let port = ProxmoxPort::new_unchecked(port);
        let url = ProxmoxUrl::new(&host, &port)?;
        Ok(Self {
            host,
            port,
            token_id: ApiTokenId::new_unchecked(token_id.trim().to_string()),
            token_secret: ApiTokenSecret::new_unchecked(token_secret),
            verify_ssl,
            url,
        })
    }

    /// Points an otherwise validated connection at a different base URL.
    ///
    /// Used to aim the client at a local mock server.
    pub(crate) fn with_base_url(mut self, base: &str) -> PveResult<Self> {
        self.url = ProxmoxUrl::new_unchecked(base)?;
        Ok(self)
    }

    pub fn host(&self) -> &ProxmoxHost {
        &self.host
    }

    pub fn port(&self) -> &ProxmoxPort {
        &self.port
    }

    pub fn token_id(&self) -> &ApiTokenId {
        &self.token_id
    }

    pub(crate) fn token_secret(&self) -> &ApiTokenSecret {
        &self.token_secret
    }

    pub fn verify_ssl(&self) -> bool {
        self.verify_ssl
    }

    pub fn url(&self) -> &ProxmoxUrl {
        &self.url
    }

    /// Value of the `Authorization` header.
    pub(crate) fn authorization(&self) -> String {
        format!(
            "PVEAPIToken={}={}",
            self.token_id.as_str(),
            self.token_secret.expose()
        )
    }
}
