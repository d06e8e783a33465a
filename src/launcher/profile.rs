//! Browser user-data directory management.
//!
//! A launch either allocates a temporary profile, which it owns and deletes
//! on kill, or uses a caller-supplied directory, which is never deleted.

// ============================================================================
// Imports
// ============================================================================

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Prefix for temporary profile directories.
const TEMP_PREFIX: &str = "devtools-wire-profile-";

/// Removal attempts before giving up on a temporary profile.
pub const CLEANUP_ATTEMPTS: u32 = 100;

/// Pause between removal attempts.
pub const CLEANUP_INTERVAL: Duration = Duration::from_millis(100);

// ============================================================================
// UserDataDir
// ============================================================================

/// A browser profile directory.
///
/// Temporary directories are not deleted on drop: the browser may still hold
/// files open, so removal is driven by the process handle once the browser
/// has exited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDataDir {
    /// Path to the profile directory.
    path: PathBuf,
    /// Whether the launch allocated (and owns) the directory.
    temporary: bool,
}

// ============================================================================
// UserDataDir - Constructors
// ============================================================================

impl UserDataDir {
    /// Allocates a fresh temporary profile directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the directory cannot be created.
    pub fn temporary() -> Result<Self> {
        let path = TempDir::with_prefix(TEMP_PREFIX)?.keep();
        debug!(path = %path.display(), "Created temporary profile");

        Ok(Self {
            path,
            temporary: true,
        })
    }

    /// Uses a caller-supplied profile directory, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the directory cannot be created.
    pub fn persistent(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if path.exists() {
            debug!(path = %path.display(), "Using existing profile directory");
        } else {
            fs::create_dir_all(&path).map_err(|e| {
                Error::config(format!(
                    "Failed to create profile directory at {}: {e}",
                    path.display()
                ))
            })?;
            debug!(path = %path.display(), "Created profile directory");
        }

        Ok(Self {
            path,
            temporary: false,
        })
    }
}

// ============================================================================
// UserDataDir - Accessors
// ============================================================================

impl UserDataDir {
    /// Returns the path to the profile directory.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if the directory was allocated by the launch.
    #[inline]
    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        self.temporary
    }
}

// ============================================================================
// UserDataDir - Removal
// ============================================================================

impl UserDataDir {
    /// Removes a temporary directory, retrying while the OS reports it busy.
    ///
    /// Persistent directories are left untouched. A directory that is
    /// already gone counts as removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cleanup`] if every attempt fails.
    pub async fn remove_with_retry(&self, attempts: u32, interval: Duration) -> Result<()> {
        if !self.temporary {
            return Ok(());
        }

        let attempts = attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match tokio::fs::remove_dir_all(&self.path).await {
                Ok(()) => {
                    debug!(path = %self.path.display(), attempt, "Removed temporary profile");
                    return Ok(());
                }
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
                Err(e) => {
                    debug!(path = %self.path.display(), attempt, error = %e, "Profile removal failed");
                    last_error = Some(e);
                }
            }

            if attempt < attempts {
                tokio::time::sleep(interval).await;
            }
        }

        let err = last_error.unwrap_or_else(|| ErrorKind::Other.into());
        Err(Error::cleanup(&self.path, attempts, &err))
    }

    /// Single synchronous removal attempt, for drop paths.
    pub(crate) fn remove_now(&self) {
        if !self.temporary {
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.path)
            && e.kind() != ErrorKind::NotFound
        {
            warn!(path = %self.path.display(), error = %e, "Failed to remove temporary profile");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
