//! Browser launcher.
//!
//! Spawns a debuggable browser, waits for its HTTP directory to list a page
//! target, and connects to that page.
//!
//! # Launch Flow
//!
//! 1. Resolve the profile directory (caller-supplied or temporary)
//! 2. Spawn the browser with the computed arguments
//! 3. Install signal hooks for the new process
//! 4. Poll `/json/list` until a page target appears
//! 5. Connect to the page's WebSocket URL
//!
//! Any failure after step 2 kills the process and cleans up the profile
//! before the error is returned.

// ============================================================================
// Imports
// ============================================================================

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::{debug, info, trace, warn};

use crate::client::Client;
use crate::discovery::{Directory, find_first_page};
use crate::error::{Error, Result};
use crate::transport::Connection;

use super::builder::LauncherBuilder;
use super::options::LaunchOptions;
use super::process::ProcessHandle;
use super::profile::UserDataDir;
use super::signals::{SignalHooks, SignalSet};

// ============================================================================
// Constants
// ============================================================================

/// Minimum per-probe HTTP timeout while polling.
const PROBE_TIMEOUT_FLOOR: Duration = Duration::from_millis(500);

// ============================================================================
// Launcher
// ============================================================================

/// Launches debuggable browser processes.
///
/// A launcher is a validated executable plus options; each
/// [`Launcher::launch`] starts an independent browser. Cloning is cheap.
///
/// # Example
///
/// ```no_run
/// use devtools_wire::Launcher;
///
/// # async fn example() -> devtools_wire::Result<()> {
/// let launcher = Launcher::builder()
///     .executable("/usr/bin/chromium")
///     .headless()
///     .build()?;
///
/// let (client, process) = launcher.launch().await?;
/// let version = client.send("Browser.getVersion", serde_json::json!({})).await?;
/// println!("{version}");
/// process.kill().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Launcher {
    inner: Arc<LauncherInner>,
}

/// Immutable launcher configuration.
#[derive(Debug)]
struct LauncherInner {
    /// Validated browser executable.
    executable: PathBuf,
    /// Launch options.
    options: LaunchOptions,
}

// ============================================================================
// Launcher - Public API
// ============================================================================

impl Launcher {
    /// Creates a configuration builder for the launcher.
    #[inline]
    #[must_use]
    pub fn builder() -> LauncherBuilder {
        LauncherBuilder::new()
    }

    /// Returns the browser executable.
    #[inline]
    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.inner.executable
    }

    /// Returns the launch options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &LaunchOptions {
        &self.inner.options
    }

    /// Starts a browser and connects to its first page.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the profile directory cannot be prepared
    /// - [`Error::ProcessLaunchFailed`] if the process cannot be spawned
    /// - [`Error::ProcessExited`] if the browser exits while being polled
    /// - [`Error::LaunchTimeout`] if the directory never becomes reachable
    /// - [`Error::NoPageTarget`] if the directory lists no page target
    /// - [`Error::Connection`] if the WebSocket handshake fails
    pub async fn launch(&self) -> Result<(Client, ProcessHandle)> {
        let options = &self.inner.options;

        let user_data_dir = match &options.user_data_dir {
            Some(path) => UserDataDir::persistent(path)?,
            None => UserDataDir::temporary()?,
        };

        let child = match self.spawn_browser_process(user_data_dir.path()) {
            Ok(child) => child,
            Err(e) => {
                user_data_dir.remove_now();
                return Err(e);
            }
        };

        let handle = ProcessHandle::new(child, options.port, user_data_dir);
        info!(
            pid = ?handle.pid(),
            port = options.port,
            executable = %self.inner.executable.display(),
            "Browser process started"
        );

        if let Some(hooks) = SignalHooks::install(&handle, SignalSet::from_options(options)) {
            handle.attach_hooks(hooks);
        }

        match self.connect_to_page(&handle).await {
            Ok(client) => {
                handle.attach_client(client.clone());
                info!(pid = ?handle.pid(), url = %client.url(), "Browser ready");
                Ok((client, handle))
            }
            Err(e) => {
                warn!(pid = ?handle.pid(), error = %e, "Launch failed, killing browser");
                if let Err(cleanup) = handle.kill().await {
                    warn!(error = %cleanup, "Cleanup after failed launch incomplete");
                }
                Err(e)
            }
        }
    }
}

// ============================================================================
// Launcher - Internal
// ============================================================================

impl Launcher {
    /// Creates a launcher from a validated executable and options.
    pub(crate) fn new(executable: PathBuf, options: LaunchOptions) -> Self {
        Self {
            inner: Arc::new(LauncherInner {
                executable,
                options,
            }),
        }
    }

    /// Spawns the browser process.
    ///
    /// # Errors
    ///
    /// Returns an error if the process fails to spawn.
    fn spawn_browser_process(&self, user_data_dir: &Path) -> Result<Child> {
        let options = &self.inner.options;
        let mut cmd = Command::new(&self.inner.executable);

        cmd.args(options.to_args(user_data_dir));

        if let Some(env) = &options.env {
            cmd.env_clear().envs(env);
        }

        cmd.stdin(Stdio::null());
        if options.dumpio {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }

        // Backstop in case every handle is leaked without a kill.
        cmd.kill_on_drop(true);

        cmd.spawn().map_err(Error::process_launch_failed)
    }

    /// Polls discovery then connects to the first page target.
    async fn connect_to_page(&self, handle: &ProcessHandle) -> Result<Client> {
        let ws_url = self.wait_for_page_target(handle).await?;
        debug!(url = %ws_url, "Connecting to page target");

        let connection =
            Connection::connect(ws_url, self.inner.options.connection.clone()).await?;
        Ok(Client::from_connection(connection))
    }

    /// Polls the directory until a page target is listed.
    ///
    /// The budget is `poll_attempts` polls spaced `poll_interval` apart. An
    /// early process exit ends polling immediately.
    async fn wait_for_page_target(&self, handle: &ProcessHandle) -> Result<String> {
        let options = &self.inner.options;
        // The browser binds its debug port on IPv4 loopback; `localhost` may
        // resolve to `::1` first.
        let directory = Directory::with_request_timeout(
            &format!("127.0.0.1:{}", options.port),
            options.poll_interval.max(PROBE_TIMEOUT_FLOOR),
        )?;

        for attempt in 1..=options.poll_attempts {
            if let Some(status) = handle.try_wait()? {
                return Err(Error::ProcessExited {
                    status: status.to_string(),
                });
            }

            match directory.list_targets().await {
                Ok(targets) => {
                    debug!(attempt, count = targets.len(), "Debug endpoint reachable");
                    let page = find_first_page(&targets)?;
                    return page
                        .web_socket_debugger_url
                        .clone()
                        .ok_or(Error::NoPageTarget);
                }
                Err(e) => trace!(attempt, error = %e, "Debug endpoint not ready"),
            }

            tokio::time::sleep(options.poll_interval).await;
        }

        Err(Error::launch_timeout(options.poll_attempts, options.port))
    }
}

// ============================================================================
// Free Functions
// ============================================================================

/// Validates `options`, starts a browser and connects to its first page.
///
/// # Errors
///
/// - [`Error::Config`] / [`Error::ExecutableNotFound`] if validation fails
/// - Same as [`Launcher::launch`] otherwise
pub async fn launch(options: LaunchOptions) -> Result<(Client, ProcessHandle)> {
    LauncherBuilder::with_options(options).build()?.launch().await
}

// ============================================================================
// Tests
// ============================================================================
