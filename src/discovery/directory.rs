//! HTTP client for the debugging directory.
//!
//! # Example
//!
//! ```no_run
//! use devtools_wire::discovery::{Directory, find_first_page};
//!
//! # async fn example() -> devtools_wire::Result<()> {
//! let directory = Directory::new("localhost:9222")?;
//! let targets = directory.list_targets().await?;
//! let page = find_first_page(&targets)?;
//! println!("{:?}", page.web_socket_debugger_url);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::TargetId;

use super::target::{TargetDescriptor, VersionInfo, find_first_page};

// ============================================================================
// Constants
// ============================================================================

/// Default directory endpoint.
pub const DEFAULT_ENDPOINT: &str = "localhost:9222";

/// Timeout for a single directory request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Directory
// ============================================================================

/// Client for a browser's HTTP JSON directory.
///
/// Holds only the base URL and an HTTP client; every call is an independent
/// request.
#[derive(Debug, Clone)]
pub struct Directory {
    /// Base URL without trailing slash, e.g. `http://localhost:9222`.
    base: String,
    /// HTTP client.
    http: reqwest::Client,
}

impl Directory {
    /// Creates a directory client.
    ///
    /// Accepts `host:port`, `http(s)://host:port`, or a `ws(s)://` URL whose
    /// host and port are reused.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the endpoint cannot be parsed.
    pub fn new(endpoint: &str) -> Result<Self> {
        Self::with_request_timeout(endpoint, REQUEST_TIMEOUT)
    }

    /// Creates a directory client whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the endpoint cannot be parsed.
    pub fn with_request_timeout(endpoint: &str, timeout: Duration) -> Result<Self> {
        let base = normalize_endpoint(endpoint)?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;

        debug!(base = %base, timeout_ms = timeout.as_millis() as u64, "Directory client created");
        Ok(Self { base, http })
    }

    /// Creates a directory client for `localhost:{port}`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the HTTP client cannot be built.
    pub fn localhost(port: u16) -> Result<Self> {
        Self::new(&format!("http://localhost:{port}"))
    }

    /// Returns the base URL.
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base
    }
}

// ============================================================================
// Directory - Listing
// ============================================================================

impl Directory {
    /// Lists debuggable targets via `/json/list`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Discovery`] on network, status or decode failure.
    pub async fn list_targets(&self) -> Result<Vec<TargetDescriptor>> {
        self.get_json("/json/list").await
    }

    /// Lists debuggable targets via the root `/json` listing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Discovery`] on network, status or decode failure.
    pub async fn list(&self) -> Result<Vec<TargetDescriptor>> {
        self.get_json("/json").await
    }

    /// Returns the WebSocket URL of the first page target.
    ///
    /// # Errors
    ///
    /// - [`Error::Discovery`] if the listing fails
    /// - [`Error::NoPageTarget`] if no page target has a WebSocket URL
    pub async fn page_ws_url(&self) -> Result<String> {
        let targets = self.list_targets().await?;
        let page = find_first_page(&targets)?;
        page.web_socket_debugger_url
            .clone()
            .ok_or(Error::NoPageTarget)
    }
}

// ============================================================================
// Directory - Metadata & Target Control
// ============================================================================

impl Directory {
    /// Fetches browser version metadata from `/json/version`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Discovery`] on network, status or decode failure.
    pub async fn version(&self) -> Result<VersionInfo> {
        self.get_json("/json/version").await
    }

    /// Fetches the full protocol schema from `/json/protocol`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Discovery`] on network, status or decode failure.
    pub async fn protocol(&self) -> Result<Value> {
        self.get_json("/json/protocol").await
    }

    /// Opens a new target via `/json/new`, optionally navigating to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Discovery`] on network, status or decode failure.
    pub async fn new_target(&self, url: Option<&str>) -> Result<TargetDescriptor> {
        let path = match url {
            Some(url) => format!("/json/new?{}", urlencoding::encode(url)),
            None => "/json/new".to_string(),
        };
        self.get_json(&path).await
    }

    /// Brings a target to the foreground via `/json/activate/{id}`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Discovery`] on network or status failure.
    pub async fn activate(&self, id: &TargetId) -> Result<String> {
        self.get_text(&format!("/json/activate/{}", urlencoding::encode(id.as_str())))
            .await
    }

    /// Closes a target via `/json/close/{id}`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Discovery`] on network or status failure.
    pub async fn close_target(&self, id: &TargetId) -> Result<String> {
        self.get_text(&format!("/json/close/{}", urlencoding::encode(id.as_str())))
            .await
    }
}

// ============================================================================
// Directory - Internal
// ============================================================================

impl Directory {
    /// Builds the full URL for a directory path.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn get_text(&self, path: &str) -> Result<String> {
        let url = self.url(path);
        trace!(url = %url, "Directory request");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| Error::discovery(&url, e))?;

        response.text().await.map_err(|e| Error::discovery(&url, e))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let body = self.get_text(path).await?;
        serde_json::from_str(&body).map_err(|e| Error::discovery(self.url(path), e))
    }
}

// ============================================================================
// Endpoint Normalization
// ============================================================================

/// Turns an endpoint into an `http(s)://host[:port][/prefix]` base without
/// trailing slash.
fn normalize_endpoint(endpoint: &str) -> Result<String> {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return Err(Error::config("Directory endpoint is empty"));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    let mut url = Url::parse(&with_scheme)
        .map_err(|e| Error::config(format!("Invalid directory endpoint '{endpoint}': {e}")))?;

    let was_ws = matches!(url.scheme(), "ws" | "wss");
    let scheme = match url.scheme() {
        "http" | "ws" => "http",
        "https" | "wss" => "https",
        other => {
            return Err(Error::config(format!(
                "Unsupported directory scheme '{other}' in '{endpoint}'"
            )));
        }
    };
    if url.scheme() != scheme && url.set_scheme(scheme).is_err() {
        return Err(Error::config(format!(
            "Cannot use '{endpoint}' as a directory endpoint"
        )));
    }
    if url.host_str().is_none() {
        return Err(Error::config(format!(
            "Directory endpoint '{endpoint}' has no host"
        )));
    }

    // A WebSocket URL carries the target path; only host and port matter.
    if was_ws {
        url.set_path("");
    }
    url.set_query(None);
    url.set_fragment(None);

    Ok(url.as_str().trim_end_matches('/').to_string())
}

// ============================================================================
// Tests
// ============================================================================
