//! Error types for the devtools wire client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use devtools_wire::{Client, Result};
//!
//! async fn example(client: &Client) -> Result<()> {
//!     let version = client.send("Browser.getVersion", serde_json::json!({})).await?;
//!     println!("{version}");
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::ExecutableNotFound`] |
//! | Launch | [`Error::ProcessLaunchFailed`], [`Error::ProcessExited`], [`Error::LaunchTimeout`] |
//! | Discovery | [`Error::Discovery`], [`Error::NoPageTarget`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`] |
//! | Protocol | [`Error::Protocol`], [`Error::RequestTimeout`] |
//! | Cleanup | [`Error::Cleanup`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::path::PathBuf;
use std::result::Result as StdResult;

use serde_json::Value;
use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::RequestId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when a required launch option is missing or invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Browser executable not found at path.
    #[error("Executable not found at: {path}")]
    ExecutableNotFound {
        /// Path where the executable was expected.
        path: PathBuf,
    },

    // ========================================================================
    // Launch Errors
    // ========================================================================
    /// Failed to spawn the browser process.
    #[error("Failed to launch browser: {message}")]
    ProcessLaunchFailed {
        /// Description of the launch failure.
        message: String,
    },

    /// Browser process exited before its debug endpoint became reachable.
    #[error("Browser exited before the debug endpoint was ready: {status}")]
    ProcessExited {
        /// Exit status as reported by the OS.
        status: String,
    },

    /// Debug endpoint never became reachable within the polling budget.
    #[error("Debug endpoint on port {port} not reachable after {attempts} attempts")]
    LaunchTimeout {
        /// Number of polling attempts made.
        attempts: u32,
        /// Remote debugging port that was polled.
        port: u16,
    },

    // ========================================================================
    // Discovery Errors
    // ========================================================================
    /// HTTP directory request failed or returned unparsable JSON.
    #[error("Discovery failed for {url}: {message}")]
    Discovery {
        /// URL that was requested.
        url: String,
        /// Description of the failure.
        message: String,
    },

    /// Directory reachable but no `page` target listed.
    #[error("No page target found")]
    NoPageTarget,

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection could not be established.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection closed while a request was outstanding, or before it was sent.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// The remote end answered a request with an `error` object.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Numeric error code, when the remote sent one.
        code: Option<i64>,
        /// Error message from the remote end.
        message: String,
        /// Additional error data, when the remote sent any.
        data: Option<Value>,
    },

    /// Request did not receive a response in time.
    #[error("Request {request_id} ({method}) timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The request ID that timed out.
        request_id: RequestId,
        /// Method name of the request.
        method: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Cleanup Errors
    // ========================================================================
    /// Temporary user-data directory could not be removed.
    #[error("Failed to remove {path} after {attempts} attempts: {message}")]
    Cleanup {
        /// Directory that could not be removed.
        path: PathBuf,
        /// Number of removal attempts made.
        attempts: u32,
        /// Last removal error.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an executable not found error.
    #[inline]
    pub fn executable_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ExecutableNotFound { path: path.into() }
    }

    /// Creates a process launch failed error.
    #[inline]
    pub fn process_launch_failed(err: IoError) -> Self {
        Self::ProcessLaunchFailed {
            message: err.to_string(),
        }
    }

    /// Creates a launch timeout error.
    #[inline]
    pub fn launch_timeout(attempts: u32, port: u16) -> Self {
        Self::LaunchTimeout { attempts, port }
    }

    /// Creates a discovery error.
    #[inline]
    pub fn discovery(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Discovery {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a protocol error carrying only a message.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            code: None,
            message: message.into(),
            data: None,
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(request_id: RequestId, method: impl Into<String>, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            request_id,
            method: method.into(),
            timeout_ms,
        }
    }

    /// Creates a cleanup error.
    #[inline]
    pub fn cleanup(path: impl Into<PathBuf>, attempts: u32, err: &IoError) -> Self {
        Self::Cleanup {
            path: path.into(),
            attempts,
            message: err.to_string(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::LaunchTimeout { .. } | Self::RequestTimeout { .. }
        )
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ConnectionClosed | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this is an error reported by the remote end.
    #[inline]
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Self::Protocol { .. })
    }

    /// Returns `true` if this error is recoverable.
    ///
    /// Recoverable errors may succeed on retry.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Discovery { .. } | Self::RequestTimeout { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
