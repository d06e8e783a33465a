//! Outbound request and remote error types.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;
use crate::identifiers::RequestId;

// ============================================================================
// Request
// ============================================================================

/// A method call from local end to remote end.
///
/// # Format
///
/// ```json
/// {
///   "id": 1,
///   "method": "Domain.command",
///   "params": { ... }
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// Identifier for request/response correlation.
    pub id: RequestId,

    /// Method name in `Domain.command` format.
    pub method: String,

    /// Method parameters; always an object on the wire.
    pub params: Value,
}

impl Request {
    /// Creates a new request.
    ///
    /// `null` params are sent as an empty object.
    #[must_use]
    pub fn new(id: RequestId, method: impl Into<String>, params: Value) -> Self {
        let params = match params {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        Self {
            id,
            method: method.into(),
            params,
        }
    }

    /// Serializes the request to its wire text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the params cannot be serialized.
    pub fn to_wire(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// RemoteError
// ============================================================================

/// The `error` object of a failed response.
///
/// # Format
///
/// ```json
/// { "code": -32601, "message": "'Foo.bar' wasn't found", "data": "..." }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RemoteError {
    /// Numeric error code.
    #[serde(default)]
    pub code: Option<i64>,

    /// Human readable message.
    #[serde(default)]
    pub message: String,

    /// Additional data.
    #[serde(default)]
    pub data: Option<Value>,
}

impl RemoteError {
    /// Builds a remote error from whatever the `error` field contained.
    ///
    /// Objects are decoded field by field; a bare string becomes the message;
    /// anything else is kept as its JSON text.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(message) => Self {
                message,
                ..Self::default()
            },
            Value::Object(_) => serde_json::from_value(value.clone()).unwrap_or_else(|_| Self {
                message: value.to_string(),
                ..Self::default()
            }),
            other => Self {
                message: other.to_string(),
                ..Self::default()
            },
        }
    }
}

impl From<RemoteError> for Error {
    fn from(err: RemoteError) -> Self {
        Error::Protocol {
            code: err.code,
            message: err.message,
            data: err.data,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
