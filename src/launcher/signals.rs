//! OS signal hooks that kill a launched browser.
//!
//! Each [`ProcessHandle`] gets its own listener task holding only a weak
//! reference, so hooks never keep a handle alive. The task ends as soon as the
//! process is killed by any path, and is aborted when the handle is dropped.
//!
//! Registering a listener replaces the default disposition of that signal for
//! the whole program; applications that want to exit on Ctrl-C should await
//! [`ProcessHandle::terminated`] and exit themselves.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::options::LaunchOptions;
use super::process::{ProcessHandle, ProcessStatus};

// ============================================================================
// SignalSet
// ============================================================================

/// Signals that should kill the browser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SignalSet {
    pub interrupt: bool,
    pub terminate: bool,
    pub hangup: bool,
}

impl SignalSet {
    /// Reads the signal flags from launch options.
    pub(crate) fn from_options(options: &LaunchOptions) -> Self {
        Self {
            interrupt: options.handle_sigint,
            terminate: options.handle_sigterm,
            hangup: options.handle_sighup,
        }
    }

    #[inline]
    pub(crate) fn is_empty(self) -> bool {
        !(self.interrupt || self.terminate || self.hangup)
    }
}

// ============================================================================
// SignalHooks
// ============================================================================

/// Listener task bound to one process handle.
#[derive(Debug)]
pub(crate) struct SignalHooks {
    task: JoinHandle<()>,
}

impl SignalHooks {
    /// Starts listening for `set` on behalf of `handle`.
    ///
    /// Returns `None` if nothing was requested or no listener could be
    /// registered. Must be called from within a tokio runtime.
    pub(crate) fn install(handle: &ProcessHandle, set: SignalSet) -> Option<Self> {
        if set.is_empty() {
            return None;
        }

        let mut listeners = Listeners::register(set)?;
        let weak = Arc::downgrade(&handle.inner);
        let mut status = handle.inner.watch_status();

        let task = tokio::spawn(async move {
            // `watch::Ref` is not `Send`; release it before the kill below.
            let stopped = async move {
                let _ = status.wait_for(|s| *s != ProcessStatus::Running).await;
            };

            tokio::select! {
                name = listeners.recv() => {
                    let Some(inner) = weak.upgrade() else {
                        return;
                    };
                    info!(signal = name, "Signal received, killing browser");
                    let handle = ProcessHandle { inner };
                    if let Err(e) = handle.kill().await {
                        error!(signal = name, error = %e, "Cleanup after signal failed");
                    }
                }
                () = stopped => {
                    debug!("Process killed, signal hooks stopped");
                }
            }
        });

        Some(Self { task })
    }
}

impl Drop for SignalHooks {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ============================================================================
// Listeners (unix)
// ============================================================================

#[cfg(unix)]
struct Listeners {
    sigint: Option<tokio::signal::unix::Signal>,
    sigterm: Option<tokio::signal::unix::Signal>,
    sighup: Option<tokio::signal::unix::Signal>,
}

#[cfg(unix)]
impl Listeners {
    fn register(set: SignalSet) -> Option<Self> {
        use tokio::signal::unix::SignalKind;

        let listeners = Self {
            sigint: set
                .interrupt
                .then(|| listen(SignalKind::interrupt(), "SIGINT"))
                .flatten(),
            sigterm: set
                .terminate
                .then(|| listen(SignalKind::terminate(), "SIGTERM"))
                .flatten(),
            sighup: set
                .hangup
                .then(|| listen(SignalKind::hangup(), "SIGHUP"))
                .flatten(),
        };

        if listeners.sigint.is_none() && listeners.sigterm.is_none() && listeners.sighup.is_none() {
            return None;
        }
        Some(listeners)
    }

    /// Waits for the first registered signal and returns its name.
    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            Some(()) = recv_opt(&mut self.sigint) => "SIGINT",
            Some(()) = recv_opt(&mut self.sigterm) => "SIGTERM",
            Some(()) = recv_opt(&mut self.sighup) => "SIGHUP",
            else => std::future::pending().await,
        }
    }
}

#[cfg(unix)]
fn listen(kind: tokio::signal::unix::SignalKind, name: &'static str) -> Option<tokio::signal::unix::Signal> {
    match tokio::signal::unix::signal(kind) {
        Ok(signal) => Some(signal),
        Err(e) => {
            warn!(signal = name, error = %e, "Failed to install signal handler");
            None
        }
    }
}

#[cfg(unix)]
async fn recv_opt(signal: &mut Option<tokio::signal::unix::Signal>) -> Option<()> {
    match signal {
        Some(signal) => signal.recv().await,
        None => None,
    }
}

// ============================================================================
// Listeners (other platforms)
// ============================================================================

#[cfg(not(unix))]
struct Listeners;

#[cfg(not(unix))]
impl Listeners {
    fn register(set: SignalSet) -> Option<Self> {
        if set.terminate || set.hangup {
            debug!("Only Ctrl-C can be hooked on this platform");
        }
        set.interrupt.then_some(Self)
    }

    async fn recv(&mut self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
        "Ctrl-C"
    }
}

// ============================================================================
// Tests
// ============================================================================
