//! Structured logging and error routing.
//!
//! Logging is `tracing` based. Call [`init_logging`] once at startup; the
//! `RUST_LOG` environment variable overrides [`LogConfig::level`].
//!
//! [`TracingReporter`] is the production [`ErrorReporter`]: every lifecycle
//! error becomes one `error`-level event tagged with its [`ErrorContext`].
//! [`install_panic_hook`] routes panics to a reporter and is only installed
//! for the production run profile.

use std::fs::{self, OpenOptions};
use std::io;
use std::panic::{self, PanicHookInfo};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};

use mtpdesk_core::{ErrorContext, ErrorReporter, LifecycleError};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

static LOGGING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Filter directive (`info`, `mtpdesk_app=debug`, ...).
    pub level: String,
    /// Append plain-text logs here instead of stderr.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Installs the global `tracing` subscriber.
///
/// # Errors
/// Returns [`LogError::AlreadyInitialized`] on a second call,
/// [`LogError::InvalidLevel`] for a bad filter directive, and
/// [`LogError::FileCreate`] when the log file cannot be opened.
pub fn init_logging(config: &LogConfig) -> Result<(), LogError> {
    if LOGGING_INITIALIZED.get().is_some() {
        return Err(LogError::AlreadyInitialized);
    }

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|error| LogError::InvalidLevel(format!("{}: {error}", config.level)))?,
    };

    match &config.file {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|error| LogError::SetSubscriber(error.to_string()))?;
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .try_init()
                .map_err(|error| LogError::SetSubscriber(error.to_string()))?;
        }
    }

    let _ = LOGGING_INITIALIZED.set(());
    Ok(())
}

/// Reporter that emits one `tracing` error event per lifecycle error.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn error(&self, error: &LifecycleError, context: ErrorContext) {
        tracing::error!(
            context = context.as_str(),
            fatal = error.is_fatal(),
            %error,
            "lifecycle error"
        );
    }
}

/// Routes panics to `reporter`, then runs the previously installed hook.
pub fn install_panic_hook(reporter: Arc<dyn ErrorReporter>) {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        reporter.error(
            &LifecycleError::Uncaught(panic_message(info)),
            ErrorContext::Uncaught,
        );
        previous(info);
    }));
}

fn panic_message(info: &PanicHookInfo<'_>) -> String {
    let payload = info.payload();
    let message = payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());

    match info.location() {
        Some(location) => format!("{message} at {}:{}", location.file(), location.line()),
        None => message,
    }
}

/// Logging initialization errors.
#[derive(Debug, Error)]
pub enum LogError {
    /// Subscriber already installed by this module.
    #[error("logging already initialized")]
    AlreadyInitialized,
    /// Filter directive did not parse.
    #[error("invalid log level: {0}")]
    InvalidLevel(String),
    /// Log file could not be created.
    #[error("failed to create log file: {0}")]
    FileCreate(#[from] io::Error),
    /// Another global subscriber is already set.
    #[error("failed to set global subscriber: {0}")]
    SetSubscriber(String),
}
