//! Browser launch options and command-line arguments.
//!
//! Provides a type-safe interface for configuring how the debuggable browser
//! process is started.
//!
//! # Example
//!
//! ```ignore
//! use devtools_wire::LaunchOptions;
//!
//! let options = LaunchOptions::new()
//!     .with_headless()
//!     .with_port(9333)
//!     .with_arg("--window-size=1280,800");
//!
//! let args = options.to_args(std::path::Path::new("/tmp/profile"));
//! // [..baseline.., "--headless", .., "--remote-debugging-port=9333",
//! //  "--user-data-dir=/tmp/profile", "--window-size=1280,800", "about:blank"]
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::transport::ConnectionConfig;

// ============================================================================
// Constants
// ============================================================================

/// Default remote debugging port.
pub const DEFAULT_PORT: u16 = 9222;

/// Default interval between discovery polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default number of discovery polls before giving up (~10s).
pub const DEFAULT_POLL_ATTEMPTS: u32 = 100;

/// Page opened when no bare argument is given.
pub const DEFAULT_START_URL: &str = "about:blank";

/// Flags passed to every launch: disable background activity, telemetry and
/// first-run UI that make automation flaky.
const BASELINE_ARGS: &[&str] = &[
    "--disable-background-networking",
    "--disable-background-timer-throttling",
    "--disable-breakpad",
    "--disable-client-side-phishing-detection",
    "--disable-default-apps",
    "--disable-dev-shm-usage",
    "--disable-hang-monitor",
    "--disable-popup-blocking",
    "--disable-prompt-on-repost",
    "--disable-sync",
    "--disable-translate",
    "--metrics-recording-only",
    "--no-first-run",
    "--safebrowsing-disable-auto-update",
    "--password-store=basic",
    "--use-mock-keychain",
];

/// Flag marking the session as automated; omitted in app mode.
const AUTOMATION_ARG: &str = "--enable-automation";

/// Flags added in headless mode.
const HEADLESS_ARGS: &[&str] = &["--headless", "--hide-scrollbars", "--mute-audio"];

// ============================================================================
// LaunchOptions
// ============================================================================

/// Browser process configuration.
///
/// Controls the executable, debugging port, profile directory, extra
/// arguments, environment and readiness polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    /// Path to the browser executable. Required.
    pub executable_path: Option<PathBuf>,

    /// Remote debugging port.
    pub port: u16,

    /// Additional command-line arguments (flags or a start URL).
    pub args: Vec<String>,

    /// Run without a visible window.
    pub headless: bool,

    /// Run as an app window: never headless, not marked as automated.
    pub app_mode: bool,

    /// Profile directory; `None` allocates a temporary one owned by the launch.
    pub user_data_dir: Option<PathBuf>,

    /// Replacement environment; `None` inherits the parent's.
    pub env: Option<BTreeMap<String, String>>,

    /// Kill the browser on SIGINT / Ctrl-C.
    pub handle_sigint: bool,

    /// Kill the browser on SIGTERM.
    pub handle_sigterm: bool,

    /// Kill the browser on SIGHUP.
    pub handle_sighup: bool,

    /// Forward the browser's stdout/stderr instead of discarding them.
    pub dumpio: bool,

    /// Interval between discovery polls.
    pub poll_interval: Duration,

    /// Number of discovery polls before [`crate::Error::LaunchTimeout`].
    pub poll_attempts: u32,

    /// Page opened when `args` contains no bare argument.
    pub start_url: String,

    /// Options for the resulting connection.
    pub connection: ConnectionConfig,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl LaunchOptions {
    /// Creates a new options instance with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            executable_path: None,
            port: DEFAULT_PORT,
            args: Vec::new(),
            headless: false,
            app_mode: false,
            user_data_dir: None,
            env: None,
            handle_sigint: true,
            handle_sigterm: true,
            handle_sighup: true,
            dumpio: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_attempts: DEFAULT_POLL_ATTEMPTS,
            start_url: DEFAULT_START_URL.to_string(),
            connection: ConnectionConfig::new(),
        }
    }

    /// Creates options configured for headless mode.
    #[inline]
    #[must_use]
    pub fn headless() -> Self {
        Self {
            headless: true,
            ..Self::new()
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl LaunchOptions {
    /// Sets the browser executable.
    #[inline]
    #[must_use]
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable_path = Some(path.into());
        self
    }

    /// Sets the remote debugging port.
    #[inline]
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Enables headless mode.
    #[inline]
    #[must_use]
    pub fn with_headless(mut self) -> Self {
        self.headless = true;
        self
    }

    /// Enables app mode.
    #[inline]
    #[must_use]
    pub fn with_app_mode(mut self) -> Self {
        self.app_mode = true;
        self
    }

    /// Uses a caller-owned profile directory; it is never deleted.
    #[inline]
    #[must_use]
    pub fn with_user_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.user_data_dir = Some(path.into());
        self
    }

    /// Adds a custom command-line argument.
    #[inline]
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Adds multiple custom command-line arguments.
    #[inline]
    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Adds an environment variable; switches from inheriting to an explicit
    /// environment.
    #[inline]
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Enables or disables all signal hooks at once.
    #[inline]
    #[must_use]
    pub fn with_signal_handling(mut self, enabled: bool) -> Self {
        self.handle_sigint = enabled;
        self.handle_sigterm = enabled;
        self.handle_sighup = enabled;
        self
    }

    /// Forwards the browser's stdout/stderr.
    #[inline]
    #[must_use]
    pub fn with_dumpio(mut self) -> Self {
        self.dumpio = true;
        self
    }

    /// Sets the discovery polling budget.
    #[inline]
    #[must_use]
    pub fn with_polling(mut self, interval: Duration, attempts: u32) -> Self {
        self.poll_interval = interval;
        self.poll_attempts = attempts;
        self
    }

    /// Sets the page opened when no bare argument is given.
    #[inline]
    #[must_use]
    pub fn with_start_url(mut self, url: impl Into<String>) -> Self {
        self.start_url = url.into();
        self
    }

    /// Sets the options for the resulting connection.
    #[inline]
    #[must_use]
    pub fn with_connection(mut self, config: ConnectionConfig) -> Self {
        self.connection = config;
        self
    }
}

// ============================================================================
// Conversion Methods
// ============================================================================

impl LaunchOptions {
    /// Converts options to browser command-line arguments.
    ///
    /// `user_data_dir` is the resolved profile directory (caller-supplied or
    /// temporary).
    #[must_use]
    pub fn to_args(&self, user_data_dir: &Path) -> Vec<String> {
        let mut args = Vec::with_capacity(BASELINE_ARGS.len() + 8 + self.args.len());

        args.extend(BASELINE_ARGS.iter().map(|arg| (*arg).to_string()));

        if !self.app_mode {
            args.push(AUTOMATION_ARG.to_string());
        }

        if self.is_headless() {
            args.extend(HEADLESS_ARGS.iter().map(|arg| (*arg).to_string()));
        }

        args.push(format!("--remote-debugging-port={}", self.port));
        args.push(format!("--user-data-dir={}", user_data_dir.display()));

        args.extend(self.args.iter().cloned());

        if !self.args.iter().any(|arg| !arg.starts_with('-')) {
            args.push(self.start_url.clone());
        }

        args
    }

    /// Validates the options configuration.
    ///
    /// # Errors
    ///
    /// Returns error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("Remote debugging port must be non-zero".to_string());
        }
        if self.poll_attempts == 0 {
            return Err("Polling attempts must be greater than zero".to_string());
        }
        if self.args.iter().any(|arg| {
            arg.starts_with("--remote-debugging-port") || arg.starts_with("--user-data-dir")
        }) {
            return Err(
                "Set the port and profile directory through options, not raw arguments"
                    .to_string(),
            );
        }
        Ok(())
    }

    /// Returns `true` if the browser will run headless.
    ///
    /// App mode always wins over headless.
    #[inline]
    #[must_use]
    pub const fn is_headless(&self) -> bool {
        self.headless && !self.app_mode
    }
}

// ============================================================================
// Tests
// ============================================================================
