//! Connection state machine.
//!
//! ```text
//! Disconnected ──► Connecting ──► Connected ──► Closing ──► Closed
//!                      │                           ▲
//!                      └───────────────────────────┘
//! ```
//!
//! Once `Connected` has been reached the connection always passes through
//! `Closing` before `Closed`. `Closed` is terminal.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tokio::sync::watch;
use tracing::trace;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Not yet started.
    Disconnected,
    /// WebSocket handshake in progress; sends are queued.
    Connecting,
    /// Handshake complete; frames flow both ways.
    Connected,
    /// Shutdown in progress.
    Closing,
    /// Terminal state.
    Closed,
}

impl ConnectionState {
    /// Returns `true` if moving from `self` to `next` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Disconnected, Self::Connecting)
                | (Self::Connecting, Self::Connected)
                | (Self::Connecting, Self::Closing)
                | (Self::Connected, Self::Closing)
                | (Self::Closing, Self::Closed)
        )
    }

    /// Returns `true` once shutdown has started.
    #[inline]
    #[must_use]
    pub const fn is_closing_or_closed(self) -> bool {
        matches!(self, Self::Closing | Self::Closed)
    }

    /// Returns the state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// StateCell
// ============================================================================

/// Observable holder of a [`ConnectionState`].
///
/// Readers can query the current value or await a change; only legal
/// transitions are applied.
#[derive(Debug)]
pub(crate) struct StateCell {
    tx: watch::Sender<ConnectionState>,
}

impl StateCell {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(ConnectionState::Disconnected);
        Self { tx }
    }

    pub(crate) fn get(&self) -> ConnectionState {
        *self.tx.borrow()
    }

    /// Applies `next` if legal from the current state.
    ///
    /// Returns `true` if the state changed.
    pub(crate) fn transition(&self, next: ConnectionState) -> bool {
        self.tx.send_if_modified(|current| {
            if current.can_transition_to(next) {
                trace!(from = %current, to = %next, "Connection state transition");
                *current = next;
                true
            } else {
                false
            }
        })
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.tx.subscribe()
    }
}

// ============================================================================
// Tests
// ============================================================================
