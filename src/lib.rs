//! Devtools Wire - connection layer for browser remote-debugging protocols.
//!
//! This library launches a debuggable browser (or finds a running one),
//! connects to one of its page targets over WebSocket, and exposes an
//! asynchronous request/response and notification API on top of it.
//!
//! # Architecture
//!
//! - **Discovery**: HTTP JSON directory (`/json/list`) maps targets to
//!   WebSocket URLs
//! - **Transport**: one WebSocket per target, one I/O task per connection
//! - **Dispatcher**: correlates responses to requests by id, fans
//!   notifications out to subscribers by method name
//! - **Launcher**: spawns the browser, polls discovery, owns cleanup
//!
//! Domain-specific wrappers (`Page`, `Network`, `Runtime`, ...) are expected
//! to be built on [`Client::send`] and [`Client::on`]; this crate does not
//! interpret method names or payloads.
//!
//! # Quick Start
//!
//! ```no_run
//! use devtools_wire::{LaunchOptions, Result, launch};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let options = LaunchOptions::headless().with_executable("/usr/bin/chromium");
//!     let (client, process) = launch(options).await?;
//!
//!     client.on("Page.loadEventFired", |params| println!("loaded: {params}"));
//!     client.send("Page.enable", json!({})).await?;
//!     client.send("Page.navigate", json!({"url": "https://example.com"})).await?;
//!
//!     process.kill().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`Client`] handle and connection builder |
//! | [`discovery`] | HTTP directory client and target types |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`launcher`] | Browser process launcher and [`ProcessHandle`] |
//! | [`protocol`] | Wire message types |
//! | [`transport`] | WebSocket connection and dispatcher |

// ============================================================================
// Modules
// ============================================================================

/// Connection lifecycle.
///
/// Use [`Client::connect()`] or [`Client::builder()`] to attach to a target.
pub mod client;

/// HTTP discovery directory.
pub mod discovery;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Browser process launcher.
///
/// Use [`launch()`] or [`Launcher::builder()`] to start a browser.
pub mod launcher;

/// Wire protocol message types.
pub mod protocol;

/// WebSocket transport layer.
///
/// Connection I/O loop, request correlation and subscriber registry.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{Client, ClientBuilder, Endpoint};

// Discovery types
pub use discovery::{Directory, TargetDescriptor, VersionInfo};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{RequestId, SubscriptionId, TargetId};

// Launcher types
pub use launcher::{LaunchOptions, Launcher, LauncherBuilder, ProcessHandle, UserDataDir, launch};

// Protocol types
pub use protocol::{Notification, RemoteError};

// Transport types
pub use transport::{ConnectionConfig, ConnectionState, Subscription};
