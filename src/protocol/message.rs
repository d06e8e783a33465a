//! Decoded inbound frame.
//!
//! Every inbound text frame is decoded into an [`InboundMessage`] before the
//! dispatcher decides whether it answers a pending request or is a
//! notification.

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::identifiers::RequestId;

use super::{Notification, RemoteError};

// ============================================================================
// InboundMessage
// ============================================================================

/// A message received from the remote end, before classification.
///
/// Responses carry `id` and either `result` or `error`; notifications carry
/// `method` and `params`. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InboundMessage {
    /// Request id, present on responses.
    #[serde(default)]
    pub id: Option<RequestId>,

    /// Notification name, present on notifications.
    #[serde(default)]
    pub method: Option<String>,

    /// Notification payload.
    #[serde(default)]
    pub params: Option<Value>,

    /// Successful response payload.
    #[serde(default)]
    pub result: Option<Value>,

    /// Failed response payload.
    #[serde(default)]
    pub error: Option<Value>,

    /// Session id used by flattened target sessions.
    #[serde(default, rename = "sessionId")]
    pub session_id: Option<String>,
}

impl InboundMessage {
    /// Decodes a frame's text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the text is not a JSON object.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Converts a response into the value or error delivered to the caller.
    ///
    /// An `error` field wins over `result`; a response with neither resolves
    /// to an empty object.
    pub fn into_outcome(self) -> Result<Value> {
        if let Some(error) = self.error {
            return Err(Error::from(RemoteError::from_value(error)));
        }
        Ok(self.result.unwrap_or_else(|| Value::Object(Map::new())))
    }

    /// Converts the message into a notification, if it names a method.
    ///
    /// Missing params are delivered as an empty object.
    #[must_use]
    pub fn into_notification(self) -> Option<Notification> {
        let method = self.method?;
        let params = match self.params {
            None | Some(Value::Null) => Value::Object(Map::new()),
            Some(params) => params,
        };
        Some(Notification { method, params })
    }
}

// ============================================================================
// Tests
// ============================================================================
