//! Notification message type.
//!
//! Notifications are unsolicited messages pushed by the remote end. They
//! carry a method name and params but no request id.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Notification
// ============================================================================

/// A notification from remote end to local end.
///
/// # Format
///
/// ```json
/// {
///   "method": "Domain.eventName",
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Notification name in `Domain.eventName` format.
    pub method: String,

    /// Notification payload.
    #[serde(default)]
    pub params: Value,
}

impl Notification {
    /// Returns the domain part of the method.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let n = Notification { method: "Page.loadEventFired".into(), params: json!({}) };
    /// assert_eq!(n.domain(), "Page");
    /// ```
    #[inline]
    #[must_use]
    pub fn domain(&self) -> &str {
        self.method.split('.').next().unwrap_or_default()
    }

    /// Returns the event name part of the method.
    #[inline]
    #[must_use]
    pub fn event_name(&self) -> &str {
        self.method.split_once('.').map(|(_, name)| name).unwrap_or_default()
    }
}

// ============================================================================
// Tests
// ============================================================================
