#![warn(missing_docs)]
//! # mtpdesk-update
//!
//! ## Purpose
//! Schedules the one-shot deferred update check after the primary window
//! appears.
//!
//! ## Responsibilities
//! - Define the settings, update handle, and timer seams.
//! - Decide from persisted settings whether a check is scheduled.
//! - Bind the pending timer to the window it was scheduled for, so closing
//!   that window cancels the check.
//!
//! ## Data flow
//! Lifecycle reads `enableAutoUpdateCheck` from a [`SettingsStore`] ->
//! [`UpdateScheduler::schedule`] registers a [`Timer`] callback -> the timer
//! fires a token back into the lifecycle -> [`UpdateScheduler::on_timer_fired`]
//! confirms it -> lifecycle calls [`UpdateHandle::check_for_updates`].
//!
//! ## Error model
//! Nothing in this crate retries. Update and settings failures are plain
//! values for the lifecycle to report.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mtpdesk_core::{ENABLE_AUTO_UPDATE_CHECK_KEY, WindowId};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

/// Key-value settings persisted outside the lifecycle.
pub trait SettingsStore: Send + Sync {
    /// Returns the stored values for `keys`. Missing keys are absent.
    fn get_items(&self, keys: &[&str]) -> Result<Map<String, Value>, SettingsError>;
}

/// In-process settings store.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: Mutex<HashMap<String, Value>>,
}

impl MemorySettings {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with one value.
    pub fn with_item(key: impl Into<String>, value: Value) -> Self {
        let store = Self::new();
        store.set_item(key, value);
        store
    }

    /// Stores one value, replacing any previous one.
    pub fn set_item(&self, key: impl Into<String>, value: Value) {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key.into(), value);
        }
    }
}

impl SettingsStore for MemorySettings {
    fn get_items(&self, keys: &[&str]) -> Result<Map<String, Value>, SettingsError> {
        let values = self.values.lock().map_err(|_| SettingsError::Poisoned)?;
        Ok(keys
            .iter()
            .filter_map(|key| {
                values
                    .get(*key)
                    .map(|value| ((*key).to_string(), value.clone()))
            })
            .collect())
    }
}

/// File name of the persisted settings object inside a profile directory.
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Settings store backed by one JSON object on disk.
///
/// The file is re-read on every call so edits made while the app runs are
/// picked up by the next scheduling attempt. A missing file holds no keys.
#[derive(Debug, Clone)]
pub struct JsonFileSettings {
    path: PathBuf,
}

impl JsonFileSettings {
    /// Uses `<profile_dir>/settings.json`.
    pub fn in_profile(profile_dir: impl AsRef<Path>) -> Self {
        Self::at_path(profile_dir.as_ref().join(SETTINGS_FILE_NAME))
    }

    /// Uses an explicit settings file path.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Map<String, Value>, SettingsError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "settings file missing; using no stored keys");
                return Ok(Map::new());
            }
            Err(error) => {
                return Err(SettingsError::Unavailable(format!(
                    "failed to read {}: {error}",
                    self.path.display()
                )));
            }
        };
        parse_settings_json(&content).map_err(|reason| {
            SettingsError::Unavailable(format!("{}: {reason}", self.path.display()))
        })
    }
}

impl SettingsStore for JsonFileSettings {
    fn get_items(&self, keys: &[&str]) -> Result<Map<String, Value>, SettingsError> {
        let mut stored = self.load()?;
        Ok(keys
            .iter()
            .filter_map(|key| stored.remove(*key).map(|value| ((*key).to_string(), value)))
            .collect())
    }
}

fn parse_settings_json(content: &str) -> Result<Map<String, Value>, String> {
    let raw: Value =
        serde_json::from_str(content).map_err(|e| format!("failed to parse settings: {e}"))?;
    match raw {
        Value::Object(map) => Ok(map),
        other => Err(format!("settings must be a JSON object, found {other}")),
    }
}

/// Update mechanism bound to the current window.
pub trait UpdateHandle: Send + Sync {
    /// Prepares the update mechanism.
    fn init(&self) -> Result<(), UpdateError>;

    /// Starts one update check. Completion is not awaited by the lifecycle.
    fn check_for_updates(&self) -> Result<(), UpdateError>;

    /// Rebinds the handle; `None` means the window is gone and operations
    /// should become no-ops.
    fn bind_window(&self, window: Option<WindowId>);
}

/// Factory for the per-boot update handle.
pub trait UpdateProvider: Send + Sync {
    /// Creates a handle bound to `window`.
    fn create_handle(&self, window: WindowId) -> Arc<dyn UpdateHandle>;
}

/// Opaque id of one deferred callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(pub u64);

/// One-shot deferred callbacks delivered back to the lifecycle.
pub trait Timer: Send + Sync {
    /// Registers a callback after `delay` and returns its token.
    fn schedule(&self, delay: Duration) -> TimerToken;

    /// Cancels a pending callback. Unknown or fired tokens are ignored.
    fn cancel(&self, token: TimerToken);
}

/// Returns `true` unless settings explicitly disable automatic checks.
///
/// Missing keys and any value other than JSON `false` leave checks on.
pub fn auto_update_check_enabled(settings: &Map<String, Value>) -> bool {
    !matches!(
        settings.get(ENABLE_AUTO_UPDATE_CHECK_KEY),
        Some(Value::Bool(false))
    )
}

/// Result of one scheduling attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// Timer registered.
    Scheduled(TimerToken),
    /// Automatic checks are disabled; nothing registered.
    Disabled,
}

/// Pending check and the window it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingCheck {
    /// Timer token.
    pub token: TimerToken,
    /// Window whose lifetime bounds the timer.
    pub window: WindowId,
}

/// Delay-guarded one-shot update check scheduler.
#[derive(Debug, Clone)]
pub struct UpdateScheduler {
    delay: Duration,
    pending: Option<PendingCheck>,
}

impl UpdateScheduler {
    /// Creates a scheduler with the given fire-up delay.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Returns the configured delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Returns the pending check, if any.
    pub fn pending(&self) -> Option<PendingCheck> {
        self.pending
    }

    /// Registers the deferred check for `window` unless settings disable it.
    ///
    /// A previously pending check is cancelled first.
    pub fn schedule(
        &mut self,
        settings: &Map<String, Value>,
        timer: &dyn Timer,
        window: WindowId,
    ) -> ScheduleOutcome {
        if !auto_update_check_enabled(settings) {
            info!("automatic update check disabled by settings");
            return ScheduleOutcome::Disabled;
        }

        if let Some(previous) = self.pending.take() {
            timer.cancel(previous.token);
        }

        let token = timer.schedule(self.delay);
        self.pending = Some(PendingCheck { token, window });
        let delay_ms = u64::try_from(self.delay.as_millis()).unwrap_or(u64::MAX);
        debug!(token = token.0, window_id = %window, delay_ms, "update check scheduled");
        ScheduleOutcome::Scheduled(token)
    }

    /// Consumes the pending check when `token` matches it.
    ///
    /// Returns the bound window, or `None` for stale or cancelled tokens.
    pub fn on_timer_fired(&mut self, token: TimerToken) -> Option<WindowId> {
        match self.pending {
            Some(pending) if pending.token == token => {
                self.pending = None;
                Some(pending.window)
            }
            _ => None,
        }
    }

    /// Cancels the pending check if it is bound to `window`.
    pub fn cancel_for_window(&mut self, window: WindowId, timer: &dyn Timer) -> bool {
        match self.pending {
            Some(pending) if pending.window == window => {
                timer.cancel(pending.token);
                self.pending = None;
                debug!(token = pending.token.0, window_id = %window, "update check cancelled");
                true
            }
            _ => false,
        }
    }
}

/// Settings store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// Backing storage could not be read.
    #[error("settings unavailable: {0}")]
    Unavailable(String),
    /// Internal lock poisoned.
    #[error("settings state poisoned")]
    Poisoned,
}

/// Update mechanism errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpdateError {
    /// Update mechanism could not be initialized.
    #[error("update init failed: {0}")]
    Init(String),
    /// Update check could not be started.
    #[error("update check failed: {0}")]
    Check(String),
}
