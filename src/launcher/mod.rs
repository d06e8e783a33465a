//! Browser process launcher.
//!
//! This module starts a debuggable browser and hands back a connected
//! [`Client`](crate::Client) together with a [`ProcessHandle`] that owns the
//! process.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Launcher`] | Validated executable plus options |
//! | [`LauncherBuilder`] | Fluent configuration builder |
//! | [`LaunchOptions`] | Browser launch options |
//! | [`ProcessHandle`] | Kill and inspect a launched browser |
//! | [`UserDataDir`] | Temporary or caller-owned profile directory |
//!
//! # Example
//!
//! ```no_run
//! use devtools_wire::{LaunchOptions, Result, launch};
//!
//! # async fn example() -> Result<()> {
//! let options = LaunchOptions::headless().with_executable("/usr/bin/chromium");
//! let (client, process) = launch(options).await?;
//!
//! client.send("Page.navigate", serde_json::json!({"url": "https://example.com"})).await?;
//! process.kill().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for launcher configuration.
pub mod builder;

/// Core launcher implementation.
pub mod core;

/// Browser launch options and arguments.
pub mod options;

/// Launched process handle.
pub mod process;

/// Profile directory management.
pub mod profile;

/// OS signal hooks.
mod signals;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::LauncherBuilder;
pub use core::{Launcher, launch};
pub use options::LaunchOptions;
pub use process::ProcessHandle;
pub use profile::UserDataDir;
