//! Connection configuration

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{DriverError, DriverResult};
use crate::protocol::codec::DEFAULT_MAX_MESSAGE_SIZE;
use crate::protocol::handshake::DEFAULT_MAX_ROUNDS;
use crate::protocol::message::FetchOptions;
use crate::protocol::Credentials;

/// Default server port
pub const DEFAULT_PORT: u16 = 8222;

// ============================================================================
// ServerAddress
// ============================================================================

/// Server address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerAddress {
    /// Host
    pub host: String,
    /// Port
    pub port: u16,
    /// Whether the URL asked for TLS
    pub ssl: bool,
}

impl ServerAddress {
    /// Create a plain TCP address
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ssl: false,
        }
    }

    /// Parse `tcp://host:port` or `ssl://host:port`. The scheme defaults to
    /// `tcp` and the port to 8222.
    pub fn from_url(url: &str) -> DriverResult<Self> {
        let (ssl, rest) = if let Some(rest) = url.strip_prefix("ssl://") {
            (true, rest)
        } else if let Some(rest) = url.strip_prefix("tcp://") {
            (false, rest)
        } else if url.contains("://") {
            return Err(DriverError::configuration(format!("Unsupported scheme in '{}'", url)));
        } else {
            (false, url)
        };

        let rest = rest.trim_end_matches('/');
        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse()
                    .map_err(|_| DriverError::configuration(format!("Invalid port in '{}'", url)))?;
                (host, port)
            }
            None => (rest, DEFAULT_PORT),
        };
        if host.is_empty() {
            return Err(DriverError::configuration(format!("Missing host in '{}'", url)));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            ssl,
        })
    }

    /// Socket address string
    pub fn to_socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = if self.ssl { "ssl" } else { "tcp" };
        write!(f, "{}://{}:{}", scheme, self.host, self.port)
    }
}

impl Default for ServerAddress {
    fn default() -> Self {
        Self::new("localhost", DEFAULT_PORT)
    }
}

// ============================================================================
// ConnectionConfig
// ============================================================================

/// Connection configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Server address
    pub address: ServerAddress,
    /// User name
    pub user_name: String,
    /// Password
    #[serde(skip_serializing)]
    pub password: String,
    /// Client identifier
    pub client_id: Option<String>,
    /// Inbox address
    pub inbox_address: Option<String>,
    /// Request TLS during the handshake
    pub ssl_mode: bool,
    /// Connect timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Largest frame accepted or sent
    pub max_message_size: usize,
    /// Default paging and traversal limits
    pub fetch: FetchOptions,
    /// Cap on handshake challenge rounds
    pub max_handshake_rounds: u32,
}

impl ConnectionConfig {
    /// Configuration for a server URL
    pub fn new(url: &str) -> DriverResult<Self> {
        let address = ServerAddress::from_url(url)?;
        Ok(Self {
            ssl_mode: address.ssl,
            address,
            ..Self::default()
        })
    }

    /// Start a builder
    pub fn builder(url: &str) -> DriverResult<ConnectionConfigBuilder> {
        Ok(ConnectionConfigBuilder {
            config: Self::new(url)?,
        })
    }

    /// Connect timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Credentials for the authentication step
    pub fn credentials(&self) -> Credentials {
        let mut credentials = Credentials::new(self.user_name.clone(), self.password.as_bytes().to_vec());
        credentials.client_id = self.client_id.clone();
        credentials.inbox_address = self.inbox_address.clone();
        credentials
    }

    /// Check the configuration before connecting
    pub fn validate(&self) -> DriverResult<()> {
        if self.user_name.is_empty() {
            return Err(DriverError::configuration("User name is required"));
        }
        if self.max_message_size < crate::protocol::HEADER_LENGTH {
            return Err(DriverError::configuration("Maximum message size is smaller than a header"));
        }
        if self.max_handshake_rounds == 0 {
            return Err(DriverError::configuration("At least one handshake round is required"));
        }
        Ok(())
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            address: ServerAddress::default(),
            user_name: String::new(),
            password: String::new(),
            client_id: None,
            inbox_address: None,
            ssl_mode: false,
            connect_timeout_ms: 30_000,
            request_timeout_ms: 60_000,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            fetch: FetchOptions::default(),
            max_handshake_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("address", &self.address)
            .field("user_name", &self.user_name)
            .field("password", &"<redacted>")
            .field("client_id", &self.client_id)
            .field("inbox_address", &self.inbox_address)
            .field("ssl_mode", &self.ssl_mode)
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("max_message_size", &self.max_message_size)
            .field("fetch", &self.fetch)
            .field("max_handshake_rounds", &self.max_handshake_rounds)
            .finish()
    }
}

// ============================================================================
// ConnectionConfigBuilder
// ============================================================================

/// Connection configuration builder
pub struct ConnectionConfigBuilder {
    config: ConnectionConfig,
}

impl ConnectionConfigBuilder {
    /// Set the credentials
    pub fn with_credentials(mut self, user_name: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.user_name = user_name.into();
        self.config.password = password.into();
        self
    }

    /// Set the client id
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.config.client_id = Some(client_id.into());
        self
    }

    /// Set the inbox address
    pub fn with_inbox_address(mut self, inbox_address: impl Into<String>) -> Self {
        self.config.inbox_address = Some(inbox_address.into());
        self
    }

    /// Request TLS during the handshake
    pub fn with_ssl_mode(mut self, ssl_mode: bool) -> Self {
        self.config.ssl_mode = ssl_mode;
        self
    }

    /// Set the connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the maximum frame size
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.config.max_message_size = size;
        self
    }

    /// Set the default fetch options
    pub fn with_fetch(mut self, fetch: FetchOptions) -> Self {
        self.config.fetch = fetch;
        self
    }

    /// Cap handshake challenge rounds
    pub fn with_max_handshake_rounds(mut self, rounds: u32) -> Self {
        self.config.max_handshake_rounds = rounds;
        self
    }

    /// Build
    pub fn build(self) -> ConnectionConfig {
        self.config
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_parsing() {
        let addr = ServerAddress::from_url("tcp://db.example.com:9000").unwrap();
        assert_eq!(addr.host, "db.example.com");
        assert_eq!(addr.port, 9000);
        assert!(!addr.ssl);

        let addr = ServerAddress::from_url("ssl://secure").unwrap();
        assert_eq!(addr.port, DEFAULT_PORT);
        assert!(addr.ssl);

        let addr = ServerAddress::from_url("localhost:8223").unwrap();
        assert_eq!(addr.to_socket_addr(), "localhost:8223");
    }

    #[test]
    fn test_address_errors() {
        assert!(ServerAddress::from_url("http://x:1").is_err());
        assert!(ServerAddress::from_url("tcp://x:notaport").is_err());
        assert!(ServerAddress::from_url("tcp://:8222").is_err());
    }

    #[test]
    fn test_address_display() {
        let addr = ServerAddress::from_url("ssl://h:1").unwrap();
        assert_eq!(addr.to_string(), "ssl://h:1");
    }

    #[test]
    fn test_config_builder() {
        let config = ConnectionConfig::builder("ssl://h:1")
            .unwrap()
            .with_credentials("admin", "secret")
            .with_client_id("c1")
            .with_request_timeout(Duration::from_secs(5))
            .with_max_handshake_rounds(5)
            .build();
        assert!(config.ssl_mode);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.max_handshake_rounds, 5);
        assert!(config.validate().is_ok());

        let credentials = config.credentials();
        assert_eq!(credentials.user_name, "admin");
        assert_eq!(credentials.password, b"secret".to_vec());
        assert_eq!(credentials.client_id.as_deref(), Some("c1"));
    }

    #[test]
    fn test_config_validation() {
        let config = ConnectionConfig::new("tcp://h").unwrap();
        assert!(matches!(config.validate(), Err(DriverError::Configuration(_))));
    }

    #[test]
    fn test_config_serde_skips_password() {
        let config = ConnectionConfig::builder("tcp://h:1")
            .unwrap()
            .with_credentials("u", "hidden")
            .build();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("hidden"));
        assert!(!format!("{:?}", config).contains("hidden"));

        let parsed: ConnectionConfig =
            serde_json::from_str(r#"{"user_name": "u", "fetch": {"batch_size": 1}}"#).unwrap();
        assert_eq!(parsed.user_name, "u");
        assert_eq!(parsed.fetch.batch_size(), 50);
        assert_eq!(parsed.address.port, DEFAULT_PORT);
    }
}
