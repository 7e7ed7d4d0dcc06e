#![warn(missing_docs)]
//! # mtpdesk-app
//!
//! ## Purpose
//! Orchestrates instance locking, boot verification, window management, and
//! the deferred update check for `mtpdesk`.
//!
//! ## Responsibilities
//! - Drive the process lifecycle FSM from platform signals.
//! - Route every collaborator failure to a single error reporter.
//! - Resolve launch configuration and set up structured logging.
//! - Provide the signal queue, timer, and event loop used by the binary.
//!
//! ## Data flow
//! Instance lock -> boot decision -> `Ready` -> window creation -> update
//! handle + menu -> deferred update check -> close/quit policy.
//!
//! ## Ownership and lifetimes
//! [`Lifecycle`] owns the whole process context and is mutated only on the
//! control thread. Timer threads communicate through [`SignalSender`] and never
//! touch lifecycle state.
//!
//! ## Error model
//! Collaborator errors are converted into [`mtpdesk_core::LifecycleError`] and
//! reported with a fixed [`mtpdesk_core::ErrorContext`]; none of them abort the
//! sequence. Only a failed boot verification ends the process early.

pub mod config;
pub mod headless;
pub mod lifecycle;
pub mod logging;
pub mod runtime;

pub use config::{ConfigError, LaunchConfig};
pub use lifecycle::{
    AppControl, Branch, Collaborators, ControlError, DevExtensions, ExtensionError, Flow,
    Lifecycle, LifecyclePhase, MenuBuilder, MenuError, ProcessContext, Signal,
};
pub use logging::{LogConfig, LogError, TracingReporter, init_logging, install_panic_hook};
pub use runtime::{LoopExit, SignalSender, ThreadTimer, run_event_loop, signal_queue};

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("MTPDESK_VERSION");

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}
