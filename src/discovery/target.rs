//! Target descriptor and version types.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identifiers::TargetId;

// ============================================================================
// Constants
// ============================================================================

/// Target type of a regular page.
pub const PAGE_TARGET_TYPE: &str = "page";

// ============================================================================
// TargetDescriptor
// ============================================================================

/// A debuggable target as listed by the directory.
///
/// # Format
///
/// ```json
/// {
///   "id": "9B5C...",
///   "type": "page",
///   "title": "about:blank",
///   "url": "about:blank",
///   "webSocketDebuggerUrl": "ws://localhost:9222/devtools/page/9B5C..."
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDescriptor {
    /// Target identifier. Empty when the server omits it.
    #[serde(default)]
    pub id: TargetId,

    /// Target type (`page`, `iframe`, `service_worker`, `browser`, ...).
    #[serde(rename = "type")]
    pub target_type: String,

    /// Document title.
    #[serde(default)]
    pub title: String,

    /// Document URL.
    #[serde(default)]
    pub url: String,

    /// Free-form description.
    #[serde(default)]
    pub description: String,

    /// WebSocket URL to debug this target. Absent while another client is
    /// attached.
    #[serde(default)]
    pub web_socket_debugger_url: Option<String>,

    /// URL of the bundled DevTools frontend for this target.
    #[serde(default)]
    pub devtools_frontend_url: Option<String>,

    /// Favicon URL.
    #[serde(default)]
    pub favicon_url: Option<String>,

    /// Parent target, for nested targets.
    #[serde(default)]
    pub parent_id: Option<TargetId>,
}

impl TargetDescriptor {
    /// Returns `true` if this target is a page.
    #[inline]
    #[must_use]
    pub fn is_page(&self) -> bool {
        self.target_type == PAGE_TARGET_TYPE
    }
}

/// Returns the first `page` target, in the order the server listed them.
///
/// # Errors
///
/// Returns [`Error::NoPageTarget`] if no descriptor has type `page`.
pub fn find_first_page(descriptors: &[TargetDescriptor]) -> Result<&TargetDescriptor> {
    descriptors
        .iter()
        .find(|descriptor| descriptor.is_page())
        .ok_or(Error::NoPageTarget)
}

// ============================================================================
// VersionInfo
// ============================================================================

/// Browser version metadata from `/json/version`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Browser name and version, e.g. `HeadlessChrome/120.0.6099.71`.
    #[serde(rename = "Browser", default)]
    pub browser: Option<String>,

    /// Protocol version, e.g. `1.3`.
    #[serde(rename = "Protocol-Version", default)]
    pub protocol_version: Option<String>,

    /// User agent string.
    #[serde(rename = "User-Agent", default)]
    pub user_agent: Option<String>,

    /// V8 version.
    #[serde(rename = "V8-Version", default)]
    pub v8_version: Option<String>,

    /// WebKit version.
    #[serde(rename = "WebKit-Version", default)]
    pub webkit_version: Option<String>,

    /// Browser-level WebSocket URL.
    #[serde(rename = "webSocketDebuggerUrl", default)]
    pub web_socket_debugger_url: Option<String>,
}

// ============================================================================
// Tests
// ============================================================================
