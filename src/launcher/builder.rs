//! Builder pattern for launcher configuration.
//!
//! Provides a fluent API for configuring and creating [`Launcher`] instances.
//!
//! # Example
//!
//! ```no_run
//! use devtools_wire::Launcher;
//!
//! # async fn example() -> devtools_wire::Result<()> {
//! let launcher = Launcher::builder()
//!     .executable("/usr/bin/chromium")
//!     .headless()
//!     .port(9333)
//!     .build()?;
//!
//! let (client, process) = launcher.launch().await?;
//! # drop(client);
//! process.kill().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::ConnectionConfig;

use super::core::Launcher;
use super::options::LaunchOptions;

// ============================================================================
// LauncherBuilder
// ============================================================================

/// Builder for configuring a [`Launcher`] instance.
///
/// Use [`Launcher::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct LauncherBuilder {
    /// Accumulated launch options.
    options: LaunchOptions,
}

// ============================================================================
// LauncherBuilder Implementation
// ============================================================================

impl LauncherBuilder {
    /// Creates a new launcher builder with default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a complete set of options.
    #[inline]
    #[must_use]
    pub fn with_options(options: LaunchOptions) -> Self {
        Self { options }
    }

    /// Sets the path to the browser executable.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the browser (e.g., "/usr/bin/chromium")
    #[inline]
    #[must_use]
    pub fn executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.executable_path = Some(path.into());
        self
    }

    /// Sets the remote debugging port.
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.options.port = port;
        self
    }

    /// Runs the browser headless.
    #[inline]
    #[must_use]
    pub fn headless(mut self) -> Self {
        self.options.headless = true;
        self
    }

    /// Runs the browser as an app window.
    #[inline]
    #[must_use]
    pub fn app_mode(mut self) -> Self {
        self.options.app_mode = true;
        self
    }

    /// Adds a command-line argument.
    #[inline]
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.options.args.push(arg.into());
        self
    }

    /// Adds multiple command-line arguments.
    #[inline]
    #[must_use]
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.options.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Uses a caller-owned profile directory.
    #[inline]
    #[must_use]
    pub fn user_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.user_data_dir = Some(path.into());
        self
    }

    /// Adds an environment variable for the browser process.
    #[inline]
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options = self.options.with_env(key, value);
        self
    }

    /// Enables or disables the SIGINT/SIGTERM/SIGHUP hooks.
    #[inline]
    #[must_use]
    pub fn handle_signals(mut self, enabled: bool) -> Self {
        self.options = self.options.with_signal_handling(enabled);
        self
    }

    /// Forwards the browser's stdout/stderr.
    #[inline]
    #[must_use]
    pub fn dumpio(mut self) -> Self {
        self.options.dumpio = true;
        self
    }

    /// Sets the discovery polling budget.
    #[inline]
    #[must_use]
    pub fn polling(mut self, interval: Duration, attempts: u32) -> Self {
        self.options.poll_interval = interval;
        self.options.poll_attempts = attempts;
        self
    }

    /// Sets the options for the resulting connection.
    #[inline]
    #[must_use]
    pub fn connection(mut self, config: ConnectionConfig) -> Self {
        self.options.connection = config;
        self
    }

    /// Builds the launcher with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the executable is not set or options are invalid
    /// - [`Error::ExecutableNotFound`] if the executable path doesn't exist
    pub fn build(self) -> Result<Launcher> {
        let executable = self.validate_executable()?;
        self.options.validate().map_err(Error::config)?;
        Ok(Launcher::new(executable, self.options))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl LauncherBuilder {
    /// Validates the executable path configuration.
    fn validate_executable(&self) -> Result<PathBuf> {
        let executable = self.options.executable_path.clone().ok_or_else(|| {
            Error::config(
                "Browser executable path is required. Use .executable() to set it.\n\
                 Example: Launcher::builder().executable(\"/usr/bin/chromium\")",
            )
        })?;

        if !executable.exists() {
            return Err(Error::executable_not_found(&executable));
        }

        Ok(executable)
    }
}

// ============================================================================
// Tests
// ============================================================================
