//! Connection lifecycle.
//!
//! This module provides the main entry point for talking to a debugging
//! target: one object that hides discovery, the transport and the dispatcher
//! behind `send`, `on`/`once`, `close` and `connected`.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Client`] | Cloneable handle to one live connection |
//! | [`ClientBuilder`] | Fluent configuration builder |
//! | [`Endpoint`] | Direct WebSocket URL or directory address |
//!
//! # Example
//!
//! ```no_run
//! use devtools_wire::{Client, Result};
//! use serde_json::json;
//!
//! # async fn example() -> Result<()> {
//! // Discover the first page target on localhost:9222
//! let client = Client::connect("localhost:9222").await?;
//!
//! client.on("Page.loadEventFired", |params| {
//!     println!("loaded: {params}");
//! });
//! client.send("Page.enable", json!({})).await?;
//! client.send("Page.navigate", json!({"url": "https://example.com"})).await?;
//!
//! client.close().await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder for client configuration.
pub mod builder;

/// Core client implementation.
pub mod core;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{ClientBuilder, Endpoint};
pub use core::Client;
