#![warn(missing_docs)]
//! # mtpdesk-instance
//!
//! ## Purpose
//! Enforces that one `mtpdesk` process runs per user profile.
//!
//! ## Responsibilities
//! - Define the [`InstanceLock`] seam consumed by the lifecycle.
//! - Provide [`LockFileInstance`], an exclusive OS advisory lock on a file in
//!   the profile directory.
//!
//! ## Ownership and lifetimes
//! The lock lives as long as the open file handle. Dropping the
//! [`LockFileInstance`] (or calling [`LockFileInstance::release`]) closes the
//! handle and the OS releases the lock, including after a crash.
//!
//! ## Error model
//! [`InstanceLock::try_acquire`] answers a yes/no question. I/O failures are
//! logged and count as "not acquired", because a process that cannot prove it
//! is alone must not open windows.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Lock file name inside the profile directory.
pub const LOCK_FILE_NAME: &str = "mtpdesk.lock";

/// Single-instance lock seam.
pub trait InstanceLock: Send + Sync {
    /// Attempts to become the single running instance.
    ///
    /// Returns `true` when this process holds the lock, including when it
    /// already held it before the call.
    fn try_acquire(&self) -> bool;
}

/// Exclusive advisory lock on `<dir>/mtpdesk.lock`.
#[derive(Debug)]
pub struct LockFileInstance {
    path: PathBuf,
    held: Mutex<Option<File>>,
}

impl LockFileInstance {
    /// Creates an unacquired lock for `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::at_path(dir.as_ref().join(LOCK_FILE_NAME))
    }

    /// Creates an unacquired lock at an explicit file path.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            held: Mutex::new(None),
        }
    }

    /// Returns the lock file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` while this value holds the lock.
    pub fn is_held(&self) -> bool {
        self.held.lock().map(|held| held.is_some()).unwrap_or(false)
    }

    /// Attempts to take the lock, surfacing I/O failures.
    ///
    /// # Errors
    /// Returns [`InstanceError::Io`] when the lock file cannot be opened,
    /// locked for a reason other than contention, or written.
    pub fn acquire(&self) -> Result<bool, InstanceError> {
        let mut held = self.held.lock().map_err(|_| InstanceError::Poisoned)?;
        if held.is_some() {
            return Ok(true);
        }

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }

        // Open without truncating so a running holder keeps its PID on disk.
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|source| self.io_error(source))?;

        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(error) if is_contention(&error) => {
                debug!(path = %self.path.display(), "instance lock is held elsewhere");
                return Ok(false);
            }
            Err(source) => return Err(self.io_error(source)),
        }

        file.set_len(0).map_err(|source| self.io_error(source))?;
        writeln!(file, "{}", std::process::id()).map_err(|source| self.io_error(source))?;
        info!(path = %self.path.display(), pid = std::process::id(), "acquired instance lock");

        *held = Some(file);
        Ok(true)
    }

    /// Releases the lock if held. Safe to call repeatedly.
    pub fn release(&self) {
        if let Ok(mut held) = self.held.lock()
            && held.take().is_some()
        {
            debug!(path = %self.path.display(), "released instance lock");
        }
    }

    /// Reads the PID recorded by the current holder, if any.
    pub fn holder_pid(&self) -> Option<u32> {
        fs::read_to_string(&self.path)
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
    }

    fn io_error(&self, source: io::Error) -> InstanceError {
        InstanceError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl InstanceLock for LockFileInstance {
    fn try_acquire(&self) -> bool {
        match self.acquire() {
            Ok(acquired) => acquired,
            Err(error) => {
                warn!(%error, "instance lock unavailable; treating as duplicate launch");
                false
            }
        }
    }
}

fn is_contention(error: &io::Error) -> bool {
    error.kind() == io::ErrorKind::WouldBlock
        || error.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// Instance lock errors.
#[derive(Debug, Error)]
pub enum InstanceError {
    /// Filesystem failure on the lock file.
    #[error("instance lock io failure at {path}: {source}")]
    Io {
        /// Lock file path.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
    /// Internal state lock poisoned by a panic.
    #[error("instance lock state poisoned")]
    Poisoned,
}
