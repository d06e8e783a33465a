//! Client handle over one debugging connection.
//!
//! The [`Client`] is what domain wrappers build on: "invoke remote method,
//! await typed result" and "subscribe to named notification, receive typed
//! payload". Clones share the same connection.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tracing::warn;

use crate::error::Result;
use crate::transport::{Connection, ConnectionConfig, ConnectionState, Subscription};

use super::builder::{ClientBuilder, Endpoint};

// ============================================================================
// Client
// ============================================================================

/// Handle to a live debugging connection.
///
/// Disconnection happens through [`Client::close`], a transport error, or the
/// remote end going away; all three end in the same cleanup: pending calls
/// fail with [`crate::Error::ConnectionClosed`], subscribers are removed and
/// the state becomes [`ConnectionState::Closed`].
///
/// # Examples
///
/// ```no_run
/// use devtools_wire::Client;
/// use serde_json::json;
///
/// # async fn example() -> devtools_wire::Result<()> {
/// let client = Client::connect_ws("ws://localhost:9222/devtools/page/ABC").await?;
/// let result = client.send("Runtime.evaluate", json!({"expression": "1 + 1"})).await?;
/// println!("{result}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    /// Shared connection.
    inner: Arc<Connection>,
}

// ============================================================================
// Client - Display
// ============================================================================

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("url", &self.inner.url())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Client - Constructors
// ============================================================================

impl Client {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Connects to an address, which may be a WebSocket URL or a directory.
    ///
    /// Directory addresses (`host:port`, `http://...`) are resolved to their
    /// first page target first.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::Discovery`] / [`crate::Error::NoPageTarget`] on discovery failure
    /// - [`crate::Error::Connection`] if the handshake fails
    pub async fn connect(address: &str) -> Result<Self> {
        ClientBuilder::new()
            .target(Endpoint::parse(address))
            .connect()
            .await
    }

    /// Connects directly to a WebSocket URL, skipping discovery.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::Connection`] if the handshake fails
    pub async fn connect_ws(url: impl Into<String>) -> Result<Self> {
        ClientBuilder::new().ws_url(url).connect().await
    }

    /// Starts connecting to a WebSocket URL and returns immediately.
    ///
    /// Calls made before the handshake completes are queued and flushed
    /// once connected. Must be called from within a tokio runtime.
    #[must_use]
    pub fn open_ws(url: impl Into<String>) -> Self {
        Self::from_connection(Connection::open(url, ConnectionConfig::default()))
    }

    /// Wraps an existing connection.
    #[must_use]
    pub fn from_connection(connection: Connection) -> Self {
        Self {
            inner: Arc::new(connection),
        }
    }
}

// ============================================================================
// Client - Method Calls
// ============================================================================

impl Client {
    /// Invokes a remote method and waits for its raw result.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::Protocol`] if the remote returned an `error` object
    /// - [`crate::Error::ConnectionClosed`] if the connection closes first
    pub async fn send(&self, method: &str, params: Value) -> Result<Value> {
        self.inner.send(method, params).await
    }

    /// Invokes a remote method, waiting at most `timeout` for the result.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::RequestTimeout`] if no response arrives in time
    /// - Same as [`Client::send`] otherwise
    pub async fn send_with_timeout(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value> {
        self.inner.send_with_timeout(method, params, timeout).await
    }

    /// Invokes a remote method with typed params and result.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::Json`] if params or result do not (de)serialize
    /// - Same as [`Client::send`] otherwise
    pub async fn call<P, R>(&self, method: &str, params: &P) -> Result<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let params = serde_json::to_value(params)?;
        let result = self.inner.send(method, params).await?;
        Ok(serde_json::from_value(result)?)
    }
}

// ============================================================================
// Client - Notifications
// ============================================================================

impl Client {
    /// Subscribes to every notification named `method`.
    ///
    /// Handlers run on the connection's I/O task, in registration order;
    /// keep them short and hand heavy work to another task.
    pub fn on<F>(&self, method: &str, handler: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.inner.subscribe(method, Arc::new(handler), false)
    }

    /// Subscribes to the next notification named `method` only.
    pub fn once<F>(&self, method: &str, handler: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.inner.subscribe(method, Arc::new(handler), true)
    }

    /// Subscribes with the payload decoded into `T`.
    ///
    /// Payloads that fail to decode are logged and skipped.
    pub fn on_typed<T, F>(&self, method: &str, handler: F) -> Subscription
    where
        T: DeserializeOwned,
        F: Fn(T) + Send + Sync + 'static,
    {
        let name = method.to_string();
        self.on(method, move |params| {
            match serde_json::from_value::<T>(params.clone()) {
                Ok(payload) => handler(payload),
                Err(e) => warn!(method = %name, error = %e, "Failed to decode notification payload"),
            }
        })
    }

    /// Removes a subscription. Returns `true` if it was still registered.
    pub fn off(&self, subscription: &Subscription) -> bool {
        self.inner.unsubscribe(subscription)
    }
}

// ============================================================================
// Client - Lifecycle
// ============================================================================

impl Client {
    /// Returns `true` while the connection is established.
    #[inline]
    #[must_use]
    pub fn connected(&self) -> bool {
        self.inner.is_connected()
    }

    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    /// Returns a receiver observing state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.watch_state()
    }

    /// Returns the target WebSocket URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        self.inner.url()
    }

    /// Returns the number of calls awaiting a response.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending_count()
    }

    /// Waits until the handshake completes.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::Connection`] if the handshake failed
    /// - [`crate::Error::ConnectionClosed`] if closed before connecting
    pub async fn wait_connected(&self) -> Result<()> {
        self.inner.wait_connected().await
    }

    /// Waits until the connection is closed, for whatever reason.
    pub async fn closed(&self) {
        self.inner.closed().await;
    }

    /// Closes the connection. Idempotent.
    pub async fn close(&self) {
        self.inner.close().await;
    }
}

// ============================================================================
// Tests
// ============================================================================
