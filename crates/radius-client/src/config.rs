//! Client configuration

use crate::error::{ClientError, ClientResult};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Retransmission and failover tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Seconds before the first retransmission
    #[serde(default = "default_first_wait")]
    pub first_wait: u64,
    /// Ceiling in seconds for the doubling retransmission interval
    #[serde(default = "default_max_wait")]
    pub max_wait: u64,
    /// Transmission attempts before a request is abandoned
    #[serde(default = "default_max_retries")]
    pub max_retries: u8,
    /// Attempts after which a request counts toward server failover
    #[serde(default = "default_failover_threshold")]
    pub failover_threshold: u8,
    /// Minimum seconds between failovers for one server role
    #[serde(default = "default_failover_cooldown")]
    pub failover_cooldown: u64,
}

fn default_first_wait() -> u64 {
    3
}

fn default_max_wait() -> u64 {
    120
}

fn default_max_retries() -> u8 {
    10
}

fn default_failover_threshold() -> u8 {
    4
}

fn default_failover_cooldown() -> u64 {
    60
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            first_wait: default_first_wait(),
            max_wait: default_max_wait(),
            max_retries: default_max_retries(),
            failover_threshold: default_failover_threshold(),
            failover_cooldown: default_failover_cooldown(),
        }
    }
}

impl RetryConfig {
    /// Validate configuration
    pub fn validate(&self) -> ClientResult<()> {
        if self.first_wait == 0 {
            return Err(ClientError::Configuration(
                "first_wait cannot be 0".to_string(),
            ));
        }

        if self.max_wait < self.first_wait {
            return Err(ClientError::Configuration(
                "max_wait cannot be smaller than first_wait".to_string(),
            ));
        }

        if self.max_retries == 0 {
            return Err(ClientError::Configuration(
                "max_retries cannot be 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// One RADIUS server endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server address (host:port)
    pub address: String,

    /// Shared secret for this server
    pub secret: String,

    /// Optional server name/description
    #[serde(default)]
    pub name: Option<String>,
}

impl ServerConfig {
    /// Parse the configured address
    pub fn socket_addr(&self) -> ClientResult<SocketAddr> {
        self.address.parse().map_err(|e: std::net::AddrParseError| {
            ClientError::Configuration(format!(
                "Invalid server address '{}': {}",
                self.address, e
            ))
        })
    }

    /// Get shared secret as bytes
    pub fn get_secret(&self) -> &[u8] {
        self.secret.as_bytes()
    }

    /// Validate configuration
    pub fn validate(&self) -> ClientResult<()> {
        self.socket_addr()?;

        if self.secret.is_empty() {
            return Err(ClientError::Configuration(
                "Server secret cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Top-level client configuration
///
/// Server lists are ordered by preference: the first entry is the primary
/// and later entries are tried in turn when the active server stops
/// answering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Authentication servers in failover order
    #[serde(default)]
    pub auth_servers: Vec<ServerConfig>,

    /// Accounting servers in failover order
    #[serde(default)]
    pub acct_servers: Vec<ServerConfig>,

    /// Retransmission and failover tuning
    #[serde(default)]
    pub retry: RetryConfig,

    /// Maximum un-ACKed requests kept for retransmission
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,

    /// Seconds between attempts to return to the primary server (0 disables)
    #[serde(default)]
    pub retry_primary_interval: u64,

    /// Log full message dumps at debug level
    #[serde(default)]
    pub msg_dumps: bool,
}

fn default_max_pending() -> usize {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            auth_servers: Vec::new(),
            acct_servers: Vec::new(),
            retry: RetryConfig::default(),
            max_pending: default_max_pending(),
            retry_primary_interval: 0,
            msg_dumps: false,
        }
    }
}

impl ClientConfig {
    /// Validate configuration
    pub fn validate(&self) -> ClientResult<()> {
        if self.auth_servers.is_empty() && self.acct_servers.is_empty() {
            return Err(ClientError::Configuration(
                "No RADIUS servers configured".to_string(),
            ));
        }

        for server in self.auth_servers.iter().chain(self.acct_servers.iter()) {
            server.validate()?;
        }

        self.retry.validate()?;

        if self.max_pending == 0 {
            return Err(ClientError::Configuration(
                "max_pending cannot be 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_server(address: &str) -> ServerConfig {
        ServerConfig {
            address: address.to_string(),
            secret: "test_secret".to_string(),
            name: None,
        }
    }

    #[test]
    fn test_retry_defaults() {
        let retry = RetryConfig::default();
        assert_eq!(retry.first_wait, 3);
        assert_eq!(retry.max_wait, 120);
        assert_eq!(retry.max_retries, 10);
        assert_eq!(retry.failover_threshold, 4);
        assert_eq!(retry.failover_cooldown, 60);
        assert!(retry.validate().is_ok());
    }

    #[test]
    fn test_retry_validation() {
        let mut retry = RetryConfig::default();
        retry.first_wait = 0;
        assert!(retry.validate().is_err());

        let mut retry = RetryConfig::default();
        retry.max_wait = 1;
        assert!(retry.validate().is_err());

        let mut retry = RetryConfig::default();
        retry.max_retries = 0;
        assert!(retry.validate().is_err());
    }

    #[test]
    fn test_server_config_validation() {
        assert!(test_server("192.168.1.1:1812").validate().is_ok());
        assert!(test_server("[2001:db8::1]:1812").validate().is_ok());
        assert!(test_server("not_an_address").validate().is_err());

        let mut server = test_server("192.168.1.1:1812");
        server.secret = String::new();
        assert!(server.validate().is_err());
    }

    #[test]
    fn test_server_config_secret_bytes() {
        let server = test_server("192.168.1.1:1812");
        assert_eq!(server.get_secret(), b"test_secret");
    }

    #[test]
    fn test_client_config_requires_a_server() {
        let config = ClientConfig::default();
        assert!(config.validate().is_err());

        let config = ClientConfig {
            auth_servers: vec![test_server("192.168.1.1:1812")],
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let config = ClientConfig {
            acct_servers: vec![test_server("192.168.1.1:1813")],
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_client_config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.max_pending, 30);
        assert_eq!(config.retry_primary_interval, 0);
        assert!(!config.msg_dumps);
    }

    #[test]
    fn test_client_config_rejects_zero_pending() {
        let config = ClientConfig {
            auth_servers: vec![test_server("192.168.1.1:1812")],
            max_pending: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
