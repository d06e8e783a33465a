//! WebSocket transport layer.
//!
//! This module handles communication between the local end (Rust) and the
//! browser's debugging endpoint over one WebSocket.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐                         ┌─────────────────┐
//! │  Connection          │        WebSocket        │  Browser        │
//! │   send ─► queue ─────┼────────────────────────►│  debug target   │
//! │   I/O task ◄─────────┼─────────────────────────│                 │
//! │     └► Dispatcher    │   responses + notifs    │                 │
//! │         ├ pending    │                         │                 │
//! │         └ subscribers│                         │                 │
//! └──────────────────────┘                         └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Connection::open` - spawn the I/O task, state `Connecting`
//! 2. Handshake completes - state `Connected`, queued sends are flushed
//! 3. `send` / `subscribe` - correlated calls and notifications
//! 4. `close`, remote close or socket error - state `Closing`
//! 5. Pending requests rejected, subscribers cleared - state `Closed`
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `config` | Transport tuning options |
//! | `connection` | WebSocket connection and I/O loop |
//! | `dispatcher` | Pending-request table and subscriber registry |
//! | `state` | Connection state machine |

// ============================================================================
// Submodules
// ============================================================================

/// Transport tuning options.
pub mod config;

/// WebSocket connection and I/O loop.
pub mod connection;

/// Inbound message routing.
pub mod dispatcher;

/// Connection state machine.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::ConnectionConfig;
pub use connection::Connection;
pub use dispatcher::{Dispatch, Dispatcher, NotificationHandler, PendingReceiver, Subscription};
pub use state::ConnectionState;
