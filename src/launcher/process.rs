//! Handle to a launched browser process.
//!
//! The handle owns the child process, the profile directory and the
//! connection opened during launch. [`ProcessHandle::kill`] tears all three
//! down exactly once, whoever triggers it: the caller, a signal hook, or the
//! launcher after a failed launch.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::path::Path;
use std::process::ExitStatus;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::json;
use tokio::process::Child;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::client::Client;
use crate::error::Result;

use super::profile::{CLEANUP_ATTEMPTS, CLEANUP_INTERVAL, UserDataDir};
use super::signals::SignalHooks;

// ============================================================================
// Constants
// ============================================================================

/// How long `Browser.close` may take before the process is handled directly.
const BROWSER_CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// How long a browser with a caller-owned profile gets to exit on its own.
const EXIT_GRACE: Duration = Duration::from_secs(5);

// ============================================================================
// ProcessStatus
// ============================================================================

/// Lifecycle of a launched process as seen by its handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessStatus {
    /// Browser running, not yet killed.
    Running,
    /// Kill in progress.
    Killing,
    /// Kill finished; process gone and profile cleaned up.
    Dead,
}

// ============================================================================
// ProcessInner
// ============================================================================

/// Shared state behind every clone of a [`ProcessHandle`].
pub(crate) struct ProcessInner {
    /// OS process id, captured at spawn.
    pid: Option<u32>,
    /// Remote debugging port.
    port: u16,
    /// Child process; taken by whoever terminates it.
    child: Mutex<Option<Child>>,
    /// Profile directory used by the browser.
    user_data_dir: UserDataDir,
    /// Connection opened by the launcher, closed on kill.
    client: Mutex<Option<Client>>,
    /// Set once kill has started.
    dead: AtomicBool,
    /// Observable lifecycle, also used to stop signal hooks.
    status: watch::Sender<ProcessStatus>,
    /// Installed signal hooks.
    hooks: Mutex<Option<SignalHooks>>,
}

impl ProcessInner {
    /// Returns a receiver observing the process lifecycle.
    pub(crate) fn watch_status(&self) -> watch::Receiver<ProcessStatus> {
        self.status.subscribe()
    }
}

impl Drop for ProcessInner {
    fn drop(&mut self) {
        if self.dead.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(mut child) = self.child.get_mut().take()
            && let Err(e) = child.start_kill()
        {
            debug!(pid = ?self.pid, error = %e, "Failed to send kill signal in Drop");
        }
        self.user_data_dir.remove_now();
    }
}

// ============================================================================
// ProcessHandle
// ============================================================================

/// Handle to a launched browser process.
///
/// Cloning is cheap and every clone controls the same process.
///
/// Dropping the last clone without a kill is a fallback only: the process
/// gets a kill signal, but no `Browser.close` is sent, the exit is not
/// awaited, and a temporary profile gets a single removal attempt. A browser
/// still holding files open can leave that directory behind. Call
/// [`ProcessHandle::kill`] or [`ProcessHandle::shutdown`] before exiting to
/// run the full cleanup with retries.
#[derive(Clone)]
pub struct ProcessHandle {
    pub(crate) inner: Arc<ProcessInner>,
}

impl fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("pid", &self.inner.pid)
            .field("port", &self.inner.port)
            .field("user_data_dir", &self.inner.user_data_dir.path())
            .field("dead", &self.is_dead())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ProcessHandle - Constructors
// ============================================================================

impl ProcessHandle {
    /// Wraps a freshly spawned child process.
    pub(crate) fn new(child: Child, port: u16, user_data_dir: UserDataDir) -> Self {
        let pid = child.id();
        let (status, _) = watch::channel(ProcessStatus::Running);
        debug!(?pid, port, "Process handle created");

        Self {
            inner: Arc::new(ProcessInner {
                pid,
                port,
                child: Mutex::new(Some(child)),
                user_data_dir,
                client: Mutex::new(None),
                dead: AtomicBool::new(false),
                status,
                hooks: Mutex::new(None),
            }),
        }
    }

    /// Attaches the connection that kill should close.
    pub(crate) fn attach_client(&self, client: Client) {
        *self.inner.client.lock() = Some(client);
    }

    /// Attaches signal hooks; they are dropped with the handle.
    pub(crate) fn attach_hooks(&self, hooks: SignalHooks) {
        *self.inner.hooks.lock() = Some(hooks);
    }
}

// ============================================================================
// ProcessHandle - Accessors
// ============================================================================

impl ProcessHandle {
    /// Returns the OS process id, if the OS reported one at spawn.
    #[inline]
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.inner.pid
    }

    /// Returns the remote debugging port.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.inner.port
    }

    /// Returns the profile directory.
    #[inline]
    #[must_use]
    pub fn user_data_dir(&self) -> &Path {
        self.inner.user_data_dir.path()
    }

    /// Returns `true` if the profile directory is owned by this launch.
    #[inline]
    #[must_use]
    pub fn owns_user_data_dir(&self) -> bool {
        self.inner.user_data_dir.is_temporary()
    }

    /// Returns `true` once kill has started.
    #[inline]
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.inner.dead.load(Ordering::SeqCst)
    }

    /// Waits until kill has finished, whoever triggered it.
    pub async fn terminated(&self) {
        let mut rx = self.inner.watch_status();
        // The sender lives in `inner`, which we hold; the wait cannot fail.
        let _ = rx.wait_for(|status| *status == ProcessStatus::Dead).await;
    }

    /// Polls the child for an exit status without blocking.
    ///
    /// Returns `None` while it runs, or once it has been reaped by kill.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Io`] if the OS query fails.
    pub fn try_wait(&self) -> Result<Option<ExitStatus>> {
        let mut guard = self.inner.child.lock();
        match guard.as_mut() {
            Some(child) => Ok(child.try_wait()?),
            None => Ok(None),
        }
    }
}

// ============================================================================
// ProcessHandle - Termination
// ============================================================================

impl ProcessHandle {
    /// Terminates the browser and cleans up. Idempotent.
    ///
    /// 1. If connected, asks the browser to close via `Browser.close` and
    ///    closes the connection.
    /// 2. With a temporary profile, kills the process and waits for it.
    ///    With a caller-owned profile, gives it a grace period to exit after
    ///    `Browser.close`; without one it is killed right away.
    /// 3. Removes a temporary profile, retrying while the OS holds it busy.
    ///
    /// Only the first call does any work; later calls return `Ok(())`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Cleanup`] if the temporary profile could not be
    /// removed. The process is terminated regardless.
    pub async fn kill(&self) -> Result<()> {
        if self.inner.dead.swap(true, Ordering::SeqCst) {
            debug!(pid = ?self.inner.pid, "Kill already performed");
            return Ok(());
        }

        self.inner.status.send_replace(ProcessStatus::Killing);
        let result = self.cleanup().await;
        self.inner.status.send_replace(ProcessStatus::Dead);

        match &result {
            Ok(()) => info!(pid = ?self.inner.pid, "Browser terminated"),
            Err(e) => error!(pid = ?self.inner.pid, error = %e, "Browser cleanup failed"),
        }
        result
    }

    /// Alias for [`ProcessHandle::kill`].
    ///
    /// # Errors
    ///
    /// Same as [`ProcessHandle::kill`].
    #[inline]
    pub async fn shutdown(&self) -> Result<()> {
        self.kill().await
    }

    async fn cleanup(&self) -> Result<()> {
        let mut close_requested = false;
        let client = self.inner.client.lock().take();
        if let Some(client) = client {
            if client.connected() {
                close_requested = true;
                match client
                    .send_with_timeout("Browser.close", json!({}), BROWSER_CLOSE_TIMEOUT)
                    .await
                {
                    Ok(_) => debug!("Browser.close acknowledged"),
                    Err(e) => debug!(error = %e, "Browser.close failed"),
                }
            }
            client.close().await;
        }

        let child = self.inner.child.lock().take();
        if let Some(mut child) = child {
            // Without a Browser.close the process has no reason to exit.
            if self.inner.user_data_dir.is_temporary() || !close_requested {
                terminate(&mut child, self.inner.pid).await;
            } else {
                match tokio::time::timeout(EXIT_GRACE, child.wait()).await {
                    Ok(Ok(status)) => debug!(pid = ?self.inner.pid, %status, "Browser exited"),
                    Ok(Err(e)) => {
                        debug!(pid = ?self.inner.pid, error = %e, "Failed to wait for process");
                    }
                    Err(_) => {
                        warn!(pid = ?self.inner.pid, "Browser did not exit in time, killing");
                        terminate(&mut child, self.inner.pid).await;
                    }
                }
            }
        }

        self.inner
            .user_data_dir
            .remove_with_retry(CLEANUP_ATTEMPTS, CLEANUP_INTERVAL)
            .await
    }
}

/// Kills the process and waits for it to exit.
async fn terminate(child: &mut Child, pid: Option<u32>) {
    debug!(?pid, "Killing browser process");
    if let Err(e) = child.start_kill() {
        debug!(?pid, error = %e, "Failed to send kill signal");
    }
    if let Err(e) = child.wait().await {
        debug!(?pid, error = %e, "Failed to wait for process");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    use tokio::process::Command;

    fn spawn_sleeper() -> Child {
        Command::new("sleep")
            .arg("30")
            .kill_on_drop(true)
            .spawn()
            .expect("spawn sleep")
    }

    #[tokio::test]
    async fn test_kill_terminates_and_removes_temporary_profile() {
        let dir = UserDataDir::temporary().expect("temp profile");
        let path = dir.path().to_path_buf();
        let handle = ProcessHandle::new(spawn_sleeper(), 9222, dir);

        assert!(handle.pid().is_some());
        assert!(!handle.is_dead());

        handle.kill().await.expect("kill");

        assert!(handle.is_dead());
        assert!(!path.exists());
        assert!(handle.try_wait().expect("try_wait").is_none());
    }

    #[tokio::test]
    async fn test_kill_twice_is_noop() {
        let dir = UserDataDir::temporary().expect("temp profile");
        let handle = ProcessHandle::new(spawn_sleeper(), 9222, dir);

        handle.kill().await.expect("first kill");
        handle.kill().await.expect("second kill");
        handle.shutdown().await.expect("shutdown after kill");
        assert!(handle.is_dead());
    }

    #[tokio::test]
    async fn test_concurrent_kills_run_cleanup_once() {
        let dir = UserDataDir::temporary().expect("temp profile");
        let handle = ProcessHandle::new(spawn_sleeper(), 9222, dir);
        let other = handle.clone();

        let (a, b) = tokio::join!(handle.kill(), other.kill());
        assert!(a.is_ok() && b.is_ok());

        handle.terminated().await;
    }

    #[tokio::test]
    async fn test_kill_keeps_persistent_profile() {
        let temp = tempfile::tempdir().expect("temp dir");
        let dir = UserDataDir::persistent(temp.path().join("profile")).expect("profile");
        let path = dir.path().to_path_buf();

        let child = Command::new("true").spawn().expect("spawn true");
        let handle = ProcessHandle::new(child, 9222, dir);

        handle.kill().await.expect("kill");
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_kill_without_client_skips_exit_grace() {
        let temp = tempfile::tempdir().expect("temp dir");
        let dir = UserDataDir::persistent(temp.path().join("profile")).expect("profile");
        let path = dir.path().to_path_buf();
        let handle = ProcessHandle::new(spawn_sleeper(), 9222, dir);

        let started = std::time::Instant::now();
        handle.kill().await.expect("kill");

        assert!(started.elapsed() < EXIT_GRACE);
        assert!(handle.is_dead());
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_drop_removes_temporary_profile_best_effort() {
        let dir = UserDataDir::temporary().expect("temp profile");
        let path = dir.path().to_path_buf();

        drop(ProcessHandle::new(spawn_sleeper(), 9222, dir));

        assert!(!path.exists());
    }
}
