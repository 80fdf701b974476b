//! HTTP client construction

use pkgfetch_errors::{Error, NetworkError};
use reqwest::Client;
use std::time::Duration;

/// Network client configuration
#[derive(Debug, Clone)]
pub struct NetConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub user_agent: String,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300), // 5 minutes for large downloads
            connect_timeout: Duration::from_secs(30),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
            user_agent: format!("pkgfetch/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Produces ready-to-use HTTP clients
///
/// The fetch pipeline asks for a client once for the manifest and once per
/// part, passing the part's time budget as an override of the overall
/// request timeout.
pub trait ClientFactory: Send + Sync {
    /// Build a client, replacing the request timeout when `timeout_override` is set
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be constructed.
    fn make_client(&self, timeout_override: Option<Duration>) -> Result<Client, Error>;
}

/// `ClientFactory` backed by reqwest with pooled connections
#[derive(Debug, Clone, Default)]
pub struct NetClientFactory {
    config: NetConfig,
}

impl NetClientFactory {
    #[must_use]
    pub fn new(config: NetConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &NetConfig {
        &self.config
    }
}

impl ClientFactory for NetClientFactory {
    fn make_client(&self, timeout_override: Option<Duration>) -> Result<Client, Error> {
        Client::builder()
            .timeout(timeout_override.unwrap_or(self.config.timeout))
            .connect_timeout(self.config.connect_timeout)
            .pool_idle_timeout(self.config.pool_idle_timeout)
            .pool_max_idle_per_host(self.config.pool_max_idle_per_host)
            .user_agent(&self.config.user_agent)
            .build()
            .map_err(|e| NetworkError::ClientBuildFailed(e.to_string()).into())
    }
}

/// Classify a reqwest transport failure
pub(crate) fn transport_error(url: &str, error: &reqwest::Error) -> NetworkError {
    if error.is_timeout() {
        NetworkError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        NetworkError::ConnectionRefused(error.to_string())
    } else if error.is_builder() {
        NetworkError::InvalidUrl(url.to_string())
    } else {
        NetworkError::HttpError {
            status: error.status().map_or(0, |s| s.as_u16()),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_builds_clients() {
        let factory = NetClientFactory::default();
        assert_eq!(factory.config().timeout, Duration::from_secs(300));
        factory.make_client(None).unwrap();
        factory
            .make_client(Some(Duration::from_secs(120)))
            .unwrap();
    }
}
