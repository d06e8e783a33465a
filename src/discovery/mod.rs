//! HTTP discovery directory.
//!
//! A debuggable browser exposes a small JSON directory next to its WebSocket
//! endpoint. This module queries it to list targets and obtain a target's
//! WebSocket URL.
//!
//! # Endpoints
//!
//! | Path | Result |
//! |------|--------|
//! | `/json`, `/json/list` | [`TargetDescriptor`] array |
//! | `/json/new` | [`TargetDescriptor`] of the new target |
//! | `/json/version` | [`VersionInfo`] |
//! | `/json/protocol` | protocol schema document |
//! | `/json/activate/{id}` | acknowledgement text |
//! | `/json/close/{id}` | acknowledgement text |
//!
//! Calls are plain request/response; nothing is retried here. Retry policy
//! belongs to the caller (see [`crate::launcher`]).

// ============================================================================
// Submodules
// ============================================================================

/// HTTP client for the directory.
pub mod directory;

/// Target descriptor and version types.
pub mod target;

// ============================================================================
// Re-exports
// ============================================================================

pub use directory::{DEFAULT_ENDPOINT, Directory};
pub use target::{TargetDescriptor, VersionInfo, find_first_page};
