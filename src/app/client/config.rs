//! HTTP client configuration and building logic
//!
//! This module handles the gateway location and the construction of the
//! reqwest client used for parameter downloads.

use std::time::Duration;

use reqwest::Client;
use url::Url;

use crate::constants::{env, http, paths};
use crate::errors::{DownloadError, DownloadResult};

/// Configuration for the gateway HTTP client
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Gateway base URL; content ids are appended to it
    pub gateway: String,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// TCP keep-alive settings
    pub tcp_keepalive: Option<Duration>,
    /// TCP nodelay (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
    /// Connection pool idle timeout
    pub pool_idle_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway: paths::DEFAULT_GATEWAY.to_string(),
            connect_timeout: http::CONNECT_TIMEOUT,
            tcp_keepalive: Some(http::TCP_KEEPALIVE),
            tcp_nodelay: true,
            pool_idle_timeout: None,
        }
    }
}

impl ClientConfig {
    /// Use a custom gateway
    pub fn with_gateway(mut self, gateway: impl Into<String>) -> Self {
        self.gateway = gateway.into();
        self
    }

    /// Default configuration with `IPFS_GATEWAY` applied
    pub fn from_env() -> Self {
        Self::default().apply_env_values(std::env::var(env::GATEWAY).ok())
    }

    /// Overlay the gateway override; empty values are ignored
    pub fn apply_env_values(mut self, gateway: Option<String>) -> Self {
        if let Some(gateway) = gateway.filter(|g| !g.is_empty()) {
            self.gateway = gateway;
        }
        self
    }

    /// URL of the artifact with content id `content_id`
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::InvalidUrl` if the result does not parse.
    pub fn artifact_url(&self, content_id: &str) -> DownloadResult<Url> {
        let mut raw = self.gateway.clone();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        raw.push_str(content_id);

        Url::parse(&raw).map_err(|e| DownloadError::InvalidUrl {
            url: raw.clone(),
            error: e.to_string(),
        })
    }

    /// Builds the HTTP client with the specified configuration
    pub fn build_http_client(&self) -> DownloadResult<Client> {
        let mut client_builder = Client::builder()
            .connect_timeout(self.connect_timeout)
            .user_agent(http::USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(http::MAX_REDIRECTS))
            .tcp_nodelay(self.tcp_nodelay);

        if let Some(keepalive) = self.tcp_keepalive {
            client_builder = client_builder.tcp_keepalive(keepalive);
        }

        if let Some(idle_timeout) = self.pool_idle_timeout {
            client_builder = client_builder.pool_idle_timeout(idle_timeout);
        }

        client_builder.build().map_err(DownloadError::Http)
    }
}
