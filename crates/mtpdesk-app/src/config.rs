//! Launch configuration resolved from environment variables.
//!
//! Every variable is optional. [`LaunchConfig::from_lookup`] takes any key
//! lookup so callers (and tests) can resolve a config without touching the
//! process environment.

use std::path::PathBuf;
use std::time::Duration;

use mtpdesk_core::{AUTO_UPDATE_CHECK_FIREUP_DELAY, Platform, RunProfile};
use thiserror::Error;
use url::Url;

use crate::logging::LogConfig;

/// Selects `development` or `production`.
pub const ENV_RUN_PROFILE: &str = "MTPDESK_ENV";
/// `true` turns a production run into a debug-production run.
pub const ENV_DEBUG_PROD: &str = "DEBUG_PROD";
/// Minimize instead of showing the window once content loads.
pub const ENV_START_MINIMIZED: &str = "START_MINIMIZED";
/// Force developer extensions to re-download.
pub const ENV_UPGRADE_EXTENSIONS: &str = "UPGRADE_EXTENSIONS";
/// Overrides the update check delay in milliseconds.
pub const ENV_UPDATE_CHECK_DELAY_MS: &str = "MTPDESK_UPDATE_CHECK_DELAY_MS";
/// Overrides the profile directory.
pub const ENV_PROFILE_DIR: &str = "MTPDESK_PROFILE_DIR";
/// Overrides the primary window entry URL.
pub const ENV_ENTRY_URL: &str = "MTPDESK_ENTRY_URL";
/// Log level filter.
pub const ENV_LOG_LEVEL: &str = "MTPDESK_LOG";
/// Optional log file path.
pub const ENV_LOG_FILE: &str = "MTPDESK_LOG_FILE";
/// How long the headless shell keeps its window open.
pub const ENV_HEADLESS_LINGER_MS: &str = "MTPDESK_HEADLESS_LINGER_MS";

/// Entry point loaded by the primary window.
pub const DEFAULT_ENTRY_URL: &str = "app://mtpdesk/index.html";

/// Default headless window lifetime; long enough for the update check to fire.
pub const DEFAULT_HEADLESS_LINGER: Duration = Duration::from_millis(8_000);

/// Resolved launch configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    /// Build/run profile.
    pub profile: RunProfile,
    /// Platform whose close policy applies.
    pub platform: Platform,
    /// Minimize on first load instead of showing.
    pub start_minimized: bool,
    /// Force developer extension download.
    pub upgrade_extensions: bool,
    /// Delay before the automatic update check.
    pub update_check_delay: Duration,
    /// Directory holding the boot profile and instance lock.
    pub profile_dir: PathBuf,
    /// Absolute URL loaded by the primary window.
    pub entry_url: String,
    /// Logging setup.
    pub log: LogConfig,
    /// Headless shell window lifetime.
    pub headless_linger: Duration,
}

impl LaunchConfig {
    /// Resolves configuration from the process environment.
    ///
    /// # Errors
    /// See [`LaunchConfig::from_lookup`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration from an arbitrary key lookup.
    ///
    /// # Errors
    /// Returns [`ConfigError`] for an unknown run profile, a non-numeric
    /// duration, or an unparsable entry URL.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let mut profile = match lookup(ENV_RUN_PROFILE) {
            Some(raw) => parse_profile(&raw)?,
            None => defaults.profile,
        };
        if profile == RunProfile::Production
            && lookup(ENV_DEBUG_PROD).is_some_and(|raw| raw.trim() == "true")
        {
            profile = RunProfile::DebugProduction;
        }

        let update_check_delay = match lookup(ENV_UPDATE_CHECK_DELAY_MS) {
            Some(raw) => Duration::from_millis(parse_millis(ENV_UPDATE_CHECK_DELAY_MS, &raw)?),
            None => defaults.update_check_delay,
        };
        let headless_linger = match lookup(ENV_HEADLESS_LINGER_MS) {
            Some(raw) => Duration::from_millis(parse_millis(ENV_HEADLESS_LINGER_MS, &raw)?),
            None => defaults.headless_linger,
        };

        let entry_url = match lookup(ENV_ENTRY_URL) {
            Some(raw) => Url::parse(raw.trim())
                .map_err(|error| ConfigError::InvalidUrl {
                    key: ENV_ENTRY_URL,
                    detail: error.to_string(),
                })?
                .to_string(),
            None => defaults.entry_url,
        };

        Ok(Self {
            profile,
            platform: defaults.platform,
            start_minimized: flag_enabled(lookup(ENV_START_MINIMIZED)),
            upgrade_extensions: flag_enabled(lookup(ENV_UPGRADE_EXTENSIONS)),
            update_check_delay,
            profile_dir: lookup(ENV_PROFILE_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.profile_dir),
            entry_url,
            log: LogConfig {
                level: lookup(ENV_LOG_LEVEL).unwrap_or(defaults.log.level),
                file: lookup(ENV_LOG_FILE).map(PathBuf::from),
            },
            headless_linger,
        })
    }
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            profile: RunProfile::Production,
            platform: Platform::current(),
            start_minimized: false,
            upgrade_extensions: false,
            update_check_delay: AUTO_UPDATE_CHECK_FIREUP_DELAY,
            profile_dir: default_profile_dir(),
            entry_url: DEFAULT_ENTRY_URL.to_string(),
            log: LogConfig::default(),
            headless_linger: DEFAULT_HEADLESS_LINGER,
        }
    }
}

/// Returns `<data dir>/mtpdesk`, falling back to the temp dir.
pub fn default_profile_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("mtpdesk")
}

/// Flag semantics:
/// - Unset or empty => off.
/// - `0`, `false`, `off`, `no` (case-insensitive) => off.
/// - Any other value => on.
fn flag_enabled(value: Option<String>) -> bool {
    match value {
        Some(raw) => {
            let normalized = raw.trim().to_ascii_lowercase();
            !(normalized.is_empty()
                || normalized == "0"
                || normalized == "false"
                || normalized == "off"
                || normalized == "no")
        }
        None => false,
    }
}

fn parse_profile(raw: &str) -> Result<RunProfile, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "development" | "dev" => Ok(RunProfile::Development),
        "production" | "prod" | "" => Ok(RunProfile::Production),
        other => Err(ConfigError::InvalidProfile(other.to_string())),
    }
}

fn parse_millis(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidNumber {
            key,
            value: raw.to_string(),
        })
}

/// Launch configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Run profile name not recognized.
    #[error("unknown run profile {0:?}; expected development or production")]
    InvalidProfile(String),
    /// Value must be a non-negative integer.
    #[error("{key} must be a whole number of milliseconds, got {value:?}")]
    InvalidNumber {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
    },
    /// Value must be an absolute URL.
    #[error("{key} is not a valid URL: {detail}")]
    InvalidUrl {
        /// Variable name.
        key: &'static str,
        /// Parser message.
        detail: String,
    },
}
