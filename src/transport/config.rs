//! Connection configuration.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use devtools_wire::transport::ConnectionConfig;
//!
//! let config = ConnectionConfig::new()
//!     .with_outbound_capacity(64)
//!     .with_close_timeout(Duration::from_secs(2));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;

// ============================================================================
// Constants
// ============================================================================

/// Default capacity of the outbound frame queue.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

/// Default maximum size of one inbound message (256 MiB).
///
/// Screenshots and heap snapshots travel as single messages, so this is
/// generous.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 256 << 20;

/// Default maximum size of the socket write buffer (64 MiB).
pub const DEFAULT_MAX_WRITE_BUFFER_SIZE: usize = 64 << 20;

/// Default bound on the WebSocket close handshake.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// ConnectionConfig
// ============================================================================

/// Transport tuning options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Number of outbound frames that may wait for the socket before
    /// `send` applies backpressure.
    pub outbound_capacity: usize,

    /// Maximum accepted inbound message size in bytes.
    pub max_message_size: usize,

    /// Maximum buffered outbound bytes before writes fail.
    pub max_write_buffer_size: usize,

    /// How long to wait for the remote to acknowledge a close frame.
    pub close_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionConfig {
    /// Creates a configuration with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_write_buffer_size: DEFAULT_MAX_WRITE_BUFFER_SIZE,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }

    /// Sets the outbound queue capacity (minimum 1).
    #[inline]
    #[must_use]
    pub fn with_outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity.max(1);
        self
    }

    /// Sets the maximum inbound message size.
    #[inline]
    #[must_use]
    pub fn with_max_message_size(mut self, bytes: usize) -> Self {
        self.max_message_size = bytes;
        self
    }

    /// Sets the maximum write buffer size.
    #[inline]
    #[must_use]
    pub fn with_max_write_buffer_size(mut self, bytes: usize) -> Self {
        self.max_write_buffer_size = bytes;
        self
    }

    /// Sets the close handshake timeout.
    #[inline]
    #[must_use]
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Builds the WebSocket configuration.
    ///
    /// Per-message compression is never negotiated.
    pub(crate) fn websocket_config(&self) -> WebSocketConfig {
        WebSocketConfig::default()
            .max_message_size(Some(self.max_message_size))
            .max_frame_size(Some(self.max_message_size))
            .max_write_buffer_size(self.max_write_buffer_size)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConnectionConfig::default();
        assert_eq!(config.outbound_capacity, 256);
        assert_eq!(config.max_message_size, 256 * 1024 * 1024);
        assert_eq!(config.close_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_builder_chain() {
        let config = ConnectionConfig::new()
            .with_outbound_capacity(8)
            .with_max_message_size(1024)
            .with_max_write_buffer_size(4096)
            .with_close_timeout(Duration::from_millis(250));

        assert_eq!(config.outbound_capacity, 8);
        assert_eq!(config.max_message_size, 1024);
        assert_eq!(config.max_write_buffer_size, 4096);
        assert_eq!(config.close_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_outbound_capacity_minimum() {
        let config = ConnectionConfig::new().with_outbound_capacity(0);
        assert_eq!(config.outbound_capacity, 1);
    }
}
