//! Wire protocol message types.
//!
//! This module defines the JSON messages exchanged over the debugging
//! WebSocket. One message per frame.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Shape |
//! |--------------|-----------|-------|
//! | `Request` | Local → Remote | `{"id", "method", "params"}` |
//! | Response | Remote → Local | `{"id", "result"}` or `{"id", "error"}` |
//! | `Notification` | Remote → Local | `{"method", "params"}` |
//!
//! Inbound frames are decoded into a single [`InboundMessage`] shape first;
//! whether a frame is a response or a notification depends on which request
//! ids are still outstanding, so the final classification is done by the
//! dispatcher.
//!
//! # Method Naming
//!
//! Methods and notifications follow `Domain.name` format:
//!
//! - `Page.navigate`
//! - `Target.getTargets`
//! - `Network.requestWillBeSent`

// ============================================================================
// Submodules
// ============================================================================

/// Notification message type.
pub mod event;

/// Decoded inbound frame.
pub mod message;

/// Outbound request and remote error types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use event::Notification;
pub use message::InboundMessage;
pub use request::{RemoteError, Request};
