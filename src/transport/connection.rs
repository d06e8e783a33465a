//! WebSocket connection and I/O loop.
//!
//! This module owns the socket to the browser, including request/response
//! correlation (through the [`Dispatcher`]) and notification routing.
//!
//! # I/O Loop
//!
//! Each connection spawns exactly one tokio task that:
//!
//! - Performs the WebSocket handshake
//! - Writes queued outbound frames in FIFO order
//! - Decodes inbound frames and hands them to the dispatcher, in socket order
//! - Runs the single cleanup path when the socket closes, fails, or
//!   [`Connection::close`] is called
//!
//! Frames queued by `send` while the handshake is still running wait in the
//! bounded outbound queue and are flushed once connected.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{Notify, mpsc, watch};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async_with_config};
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{RequestId, RequestIdAllocator};
use crate::protocol::{InboundMessage, Request};

use super::config::ConnectionConfig;
use super::dispatcher::{Dispatcher, NotificationHandler, Subscription};
use super::state::{ConnectionState, StateCell};

// ============================================================================
// Types
// ============================================================================

/// Client-side WebSocket stream.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A serialized request waiting for the socket.
struct OutboundFrame {
    id: RequestId,
    text: String,
}

/// Why the I/O loop stopped.
#[derive(Debug)]
enum CloseReason {
    /// `close()` was called, or every handle was dropped.
    Local,
    /// Remote sent a close frame or the stream ended.
    Remote,
    /// Socket error.
    Failed(String),
}

/// State shared between the handle and the I/O task.
struct Shared {
    dispatcher: Dispatcher,
    state: StateCell,
    shutdown: Notify,
    /// Handshake failure message, reported by `wait_connected`.
    failure: Mutex<Option<String>>,
}

// ============================================================================
// PendingGuard
// ============================================================================

/// Removes a pending entry if the awaiting `send` is dropped or times out.
struct PendingGuard<'a> {
    dispatcher: &'a Dispatcher,
    id: RequestId,
    armed: bool,
}

impl PendingGuard<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed && self.dispatcher.forget(self.id) {
            trace!(id = %self.id, "Abandoned pending request removed");
        }
    }
}

// ============================================================================
// Connection
// ============================================================================

/// WebSocket connection to a debugging target.
///
/// Handles request/response correlation and notification routing.
/// The connection spawns an internal I/O task.
///
/// # Thread Safety
///
/// `Connection` is `Send + Sync`; share it behind an `Arc` to call `send`
/// from many tasks concurrently.
pub struct Connection {
    /// Target WebSocket URL.
    url: String,
    /// Request id source.
    ids: RequestIdAllocator,
    /// Outbound queue to the I/O task.
    outbound_tx: mpsc::Sender<OutboundFrame>,
    /// State shared with the I/O task.
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("url", &self.url)
            .field("state", &self.state())
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Connection - Constructors
// ============================================================================

impl Connection {
    /// Starts connecting to `url` and returns immediately.
    ///
    /// The connection is in [`ConnectionState::Connecting`] until the
    /// handshake completes. Calls to [`Connection::send`] made meanwhile are
    /// queued and flushed in order once connected.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn open(url: impl Into<String>, config: ConnectionConfig) -> Self {
        let url = url.into();
        let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_capacity.max(1));

        let shared = Arc::new(Shared {
            dispatcher: Dispatcher::new(),
            state: StateCell::new(),
            shutdown: Notify::new(),
            failure: Mutex::new(None),
        });
        shared.state.transition(ConnectionState::Connecting);

        debug!(url = %url, "Opening WebSocket connection");
        tokio::spawn(run_io_loop(
            url.clone(),
            config,
            outbound_rx,
            Arc::clone(&shared),
        ));

        Self {
            url,
            ids: RequestIdAllocator::new(),
            outbound_tx,
            shared,
        }
    }

    /// Connects to `url` and waits for the handshake to complete.
    ///
    /// # Errors
    ///
    /// - [`Error::Connection`] if the handshake fails
    pub async fn connect(url: impl Into<String>, config: ConnectionConfig) -> Result<Self> {
        let connection = Self::open(url, config);
        connection.wait_connected().await?;
        Ok(connection)
    }
}

// ============================================================================
// Connection - Requests
// ============================================================================

impl Connection {
    /// Sends a method call and waits for its result.
    ///
    /// There is no built-in timeout; the call completes when the response
    /// arrives or the connection closes. Use
    /// [`Connection::send_with_timeout`] to bound the wait.
    ///
    /// # Errors
    ///
    /// - [`Error::Protocol`] if the remote returned an `error` object
    /// - [`Error::ConnectionClosed`] if the connection closes first
    pub async fn send(&self, method: &str, params: Value) -> Result<Value> {
        self.send_inner(method, params, None).await
    }

    /// Sends a method call and waits at most `request_timeout` for its result.
    ///
    /// On timeout the pending entry is discarded; a late response is dropped.
    ///
    /// # Errors
    ///
    /// - [`Error::RequestTimeout`] if no response arrives in time
    /// - [`Error::Protocol`] if the remote returned an `error` object
    /// - [`Error::ConnectionClosed`] if the connection closes first
    pub async fn send_with_timeout(
        &self,
        method: &str,
        params: Value,
        request_timeout: Duration,
    ) -> Result<Value> {
        self.send_inner(method, params, Some(request_timeout)).await
    }

    async fn send_inner(
        &self,
        method: &str,
        params: Value,
        request_timeout: Option<Duration>,
    ) -> Result<Value> {
        if self.state().is_closing_or_closed() {
            return Err(Error::ConnectionClosed);
        }

        let id = self.ids.next();
        let text = Request::new(id, method, params).to_wire()?;

        let dispatcher = &self.shared.dispatcher;
        let response_rx = dispatcher.register(id, method)?;
        let mut guard = PendingGuard {
            dispatcher,
            id,
            armed: true,
        };

        // Bounded queue: waits here when the socket falls behind.
        if self
            .outbound_tx
            .send(OutboundFrame { id, text })
            .await
            .is_err()
        {
            return Err(Error::ConnectionClosed);
        }
        trace!(%id, method, "Request queued");

        let outcome = match request_timeout {
            None => response_rx.await,
            Some(limit) => match timeout(limit, response_rx).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(%id, method, timeout_ms = limit.as_millis() as u64, "Request timed out");
                    return Err(Error::request_timeout(id, method, limit.as_millis() as u64));
                }
            },
        };
        guard.disarm();

        // A dropped sender means the table was torn down without completion.
        outcome.unwrap_or(Err(Error::ConnectionClosed))
    }

    /// Returns the number of pending requests.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared.dispatcher.pending_count()
    }
}

// ============================================================================
// Connection - Notifications
// ============================================================================

impl Connection {
    /// Registers a subscriber for notifications named `method`.
    pub fn subscribe(&self, method: &str, handler: NotificationHandler, once: bool) -> Subscription {
        self.shared.dispatcher.subscribe(method, handler, once)
    }

    /// Removes a subscriber. Returns `true` if it was registered.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        self.shared.dispatcher.unsubscribe(subscription)
    }

    /// Returns the number of subscribers for `method`.
    #[inline]
    #[must_use]
    pub fn subscriber_count(&self, method: &str) -> usize {
        self.shared.dispatcher.subscriber_count(method)
    }
}

// ============================================================================
// Connection - Lifecycle
// ============================================================================

impl Connection {
    /// Returns the target WebSocket URL.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.shared.state.get()
    }

    /// Returns `true` while the connection is established.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Returns a receiver that observes every state change.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Waits until the handshake has completed.
    ///
    /// # Errors
    ///
    /// - [`Error::Connection`] if the handshake failed
    /// - [`Error::ConnectionClosed`] if the connection closed first
    pub async fn wait_connected(&self) -> Result<()> {
        let mut rx = self.shared.state.subscribe();
        let reached = *rx
            .wait_for(|state| {
                *state == ConnectionState::Connected || state.is_closing_or_closed()
            })
            .await
            .map_err(|_| Error::ConnectionClosed)?;

        if reached == ConnectionState::Connected {
            return Ok(());
        }
        match self.shared.failure.lock().clone() {
            Some(message) => Err(Error::connection(message)),
            None => Err(Error::ConnectionClosed),
        }
    }

    /// Waits until the connection has fully closed.
    pub async fn closed(&self) {
        let mut rx = self.shared.state.subscribe();
        let _ = rx
            .wait_for(|state| *state == ConnectionState::Closed)
            .await;
    }

    /// Closes the connection and waits until it is [`ConnectionState::Closed`].
    ///
    /// Every pending request is rejected with [`Error::ConnectionClosed`] and
    /// all subscribers are removed. Safe to call repeatedly and concurrently
    /// with `send`.
    pub async fn close(&self) {
        if self.state() != ConnectionState::Closed {
            debug!(url = %self.url, "Close requested");
            self.shared.shutdown.notify_one();
        }
        self.closed().await;
    }
}

// ============================================================================
// I/O Loop
// ============================================================================

/// Handshake, then pump frames until the connection ends.
async fn run_io_loop(
    url: String,
    config: ConnectionConfig,
    mut outbound_rx: mpsc::Receiver<OutboundFrame>,
    shared: Arc<Shared>,
) {
    let handshake = tokio::select! {
        biased;

        () = shared.shutdown.notified() => {
            debug!(url = %url, "Closed before handshake completed");
            None
        }

        result = connect_async_with_config(url.as_str(), Some(config.websocket_config()), true) => {
            match result {
                Ok((ws_stream, _response)) => Some(ws_stream),
                Err(e) => {
                    warn!(url = %url, error = %e, "WebSocket handshake failed");
                    *shared.failure.lock() = Some(format!("WebSocket handshake with {url} failed: {e}"));
                    None
                }
            }
        }
    };

    let reason = match handshake {
        Some(ws_stream) if shared.state.transition(ConnectionState::Connected) => {
            info!(url = %url, "WebSocket connection established");
            pump(ws_stream, &mut outbound_rx, &shared, config.close_timeout).await
        }
        Some(ws_stream) => {
            // Lost a race with close(); drop the fresh socket.
            drop(ws_stream);
            CloseReason::Local
        }
        None => CloseReason::Local,
    };

    shared.state.transition(ConnectionState::Closing);
    let rejected = shared.dispatcher.close();
    outbound_rx.close();
    while outbound_rx.try_recv().is_ok() {}
    shared.state.transition(ConnectionState::Closed);

    debug!(url = %url, ?reason, rejected, "I/O loop terminated");
}

/// Runs the connected phase of the loop and closes the socket.
async fn pump(
    ws_stream: WsStream,
    outbound_rx: &mut mpsc::Receiver<OutboundFrame>,
    shared: &Shared,
    close_timeout: Duration,
) -> CloseReason {
    let (mut ws_write, mut ws_read) = ws_stream.split();

    // Unbiased: a flood of inbound frames must not starve queued requests.
    let reason = loop {
        tokio::select! {
            () = shared.shutdown.notified() => {
                debug!("Shutdown requested");
                break CloseReason::Local;
            }

            // Incoming messages from the browser
            message = ws_read.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        handle_incoming_text(text.as_str(), &shared.dispatcher);
                    }

                    Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                        Ok(text) => handle_incoming_text(text, &shared.dispatcher),
                        Err(_) => warn!(len = bytes.len(), "Dropping non-UTF-8 binary frame"),
                    },

                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "WebSocket closed by remote");
                        break CloseReason::Remote;
                    }

                    Some(Err(e)) => {
                        error!(error = %e, "WebSocket error");
                        break CloseReason::Failed(e.to_string());
                    }

                    None => {
                        debug!("WebSocket stream ended");
                        break CloseReason::Remote;
                    }

                    // Ping, Pong, raw frames
                    Some(Ok(_)) => {}
                }
            }

            // Outgoing requests
            frame = outbound_rx.recv() => {
                let Some(OutboundFrame { id, text }) = frame else {
                    debug!("All connection handles dropped");
                    break CloseReason::Local;
                };

                // A peer that stops reading must not block shutdown.
                tokio::select! {
                    biased;

                    () = shared.shutdown.notified() => {
                        debug!(%id, "Shutdown requested during a stalled write");
                        break CloseReason::Local;
                    }

                    written = ws_write.send(Message::Text(text.into())) => {
                        if let Err(e) = written {
                            error!(%id, error = %e, "Failed to write request");
                            shared
                                .dispatcher
                                .fail(id, Error::connection(format!("Failed to write request: {e}")));
                            break CloseReason::Failed(e.to_string());
                        }
                        trace!(%id, "Request sent");
                    }
                }
            }
        }
    };

    if !matches!(reason, CloseReason::Failed(_)) {
        shared.state.transition(ConnectionState::Closing);
        match timeout(close_timeout, ws_write.close()).await {
            Ok(Ok(())) => trace!("Close frame sent"),
            Ok(Err(e)) => trace!(error = %e, "Close frame not delivered"),
            Err(_) => debug!("Timed out closing WebSocket"),
        }
    }

    reason
}

/// Decodes one inbound frame and routes it.
///
/// Malformed frames are logged and dropped.
fn handle_incoming_text(text: &str, dispatcher: &Dispatcher) {
    match InboundMessage::parse(text) {
        Ok(message) => {
            dispatcher.on_message(message);
        }
        Err(e) => {
            warn!(error = %e, len = text.len(), "Dropping malformed frame");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
