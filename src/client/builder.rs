//! Builder pattern for client configuration.
//!
//! # Example
//!
//! ```no_run
//! use devtools_wire::Client;
//! use devtools_wire::transport::ConnectionConfig;
//!
//! # async fn example() -> devtools_wire::Result<()> {
//! let client = Client::builder()
//!     .endpoint("127.0.0.1:9333")
//!     .config(ConnectionConfig::new().with_outbound_capacity(32))
//!     .connect()
//!     .await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use crate::discovery::Directory;
use crate::error::{Error, Result};
use crate::transport::{Connection, ConnectionConfig};

use super::core::Client;

// ============================================================================
// Endpoint
// ============================================================================

/// Where to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// A target's WebSocket URL; discovery is skipped.
    WebSocket(String),
    /// A directory address (`host:port` or `http(s)://...`); the first page
    /// target is resolved before connecting.
    Directory(String),
}

impl Endpoint {
    /// Classifies an address by its scheme.
    ///
    /// `ws://` and `wss://` are WebSocket URLs; anything else is a directory.
    #[must_use]
    pub fn parse(address: &str) -> Self {
        let trimmed = address.trim();
        if trimmed.starts_with("ws://") || trimmed.starts_with("wss://") {
            Self::WebSocket(trimmed.to_string())
        } else {
            Self::Directory(trimmed.to_string())
        }
    }

    /// Resolves the endpoint to a WebSocket URL.
    ///
    /// # Errors
    ///
    /// - [`Error::Discovery`] if the directory cannot be queried
    /// - [`Error::NoPageTarget`] if it lists no page target
    pub async fn resolve(&self) -> Result<String> {
        match self {
            Self::WebSocket(url) => Ok(url.clone()),
            Self::Directory(address) => Directory::new(address)?.page_ws_url().await,
        }
    }
}

impl From<&str> for Endpoint {
    fn from(address: &str) -> Self {
        Self::parse(address)
    }
}

impl From<String> for Endpoint {
    fn from(address: String) -> Self {
        Self::parse(&address)
    }
}

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`Client`].
///
/// Use [`Client::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct ClientBuilder {
    /// Connection target.
    endpoint: Option<Endpoint>,
    /// Transport options.
    config: ConnectionConfig,
}

impl ClientBuilder {
    /// Creates a new builder with no endpoint and default transport options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects directly to a WebSocket URL.
    #[inline]
    #[must_use]
    pub fn ws_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint = Some(Endpoint::WebSocket(url.into()));
        self
    }

    /// Discovers the first page target through a directory address.
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, address: impl Into<String>) -> Self {
        self.endpoint = Some(Endpoint::Directory(address.into()));
        self
    }

    /// Sets the target from an already classified [`Endpoint`].
    #[inline]
    #[must_use]
    pub fn target(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Sets the transport options.
    #[inline]
    #[must_use]
    pub fn config(mut self, config: ConnectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Resolves the endpoint, connects, and waits for the handshake.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no endpoint was set
    /// - [`Error::Discovery`] / [`Error::NoPageTarget`] on discovery failure
    /// - [`Error::Connection`] if the handshake fails
    pub async fn connect(self) -> Result<Client> {
        let endpoint = self.validate_endpoint()?;
        let url = endpoint.resolve().await?;
        let connection = Connection::connect(url, self.config).await?;
        Ok(Client::from_connection(connection))
    }

    /// Starts connecting to a WebSocket URL without waiting.
    ///
    /// Calls made before the handshake completes are queued.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no endpoint was set, or it needs discovery
    pub fn open(self) -> Result<Client> {
        match self.validate_endpoint()? {
            Endpoint::WebSocket(url) => Ok(Client::from_connection(Connection::open(
                url,
                self.config,
            ))),
            Endpoint::Directory(address) => Err(Error::config(format!(
                "Cannot open '{address}' without discovery. Use .connect() instead."
            ))),
        }
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    fn validate_endpoint(&self) -> Result<Endpoint> {
        let endpoint = self.endpoint.clone().ok_or_else(|| {
            Error::config(
                "Endpoint is required. Use .ws_url() or .endpoint() to set it.\n\
                 Example: Client::builder().endpoint(\"localhost:9222\")",
            )
        })?;

        let address = match &endpoint {
            Endpoint::WebSocket(url) | Endpoint::Directory(url) => url,
        };
        if address.trim().is_empty() {
            return Err(Error::config("Endpoint must not be empty"));
        }
        Ok(endpoint)
    }
}

// ============================================================================
// Tests
// ============================================================================
