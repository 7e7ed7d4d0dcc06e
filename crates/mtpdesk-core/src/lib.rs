#![warn(missing_docs)]
//! # mtpdesk-core
//!
//! ## Purpose
//! Defines the shared lifecycle model used across the `mtpdesk` workspace.
//!
//! ## Responsibilities
//! - Represent the boot decision, window identity, and window chrome specs.
//! - Describe the platform and run profile that shape lifecycle policy.
//! - Provide the lifecycle error taxonomy and the error reporter seam.
//!
//! ## Data flow
//! The boot gate produces a [`BootDecision`]. The orchestrator picks a
//! [`WindowSpec`] from it and hands the spec to the window host, which returns
//! a [`WindowId`]. Any failure along the way becomes a [`LifecycleError`] that
//! is routed to one [`ErrorReporter`] together with an [`ErrorContext`] tag.
//!
//! ## Wire types
//! [`WindowSpec`] and [`WindowKind`] are the only serializable types. They
//! form the window request a host bridge forwards to the native shell process
//! as JSON; every other type here stays inside the control thread.
//!
//! ## Ownership and lifetimes
//! All values here are small owned values (`Copy` where possible) so lifecycle
//! steps can pass them by value without borrowing from long-lived state.
//!
//! ## Error model
//! [`LifecycleError`] separates fatal boot errors, consistency errors,
//! collaborator failures, and platform failures. Only the first two can change
//! lifecycle state; the rest are caught and reported.
//!
//! ## Example
//! ```rust
//! use mtpdesk_core::{WindowKind, WindowSpec, PRIMARY_MIN_WIDTH};
//!
//! let spec = WindowSpec::for_kind(WindowKind::Primary, "MTP Desk");
//! assert_eq!(spec.min_width, Some(PRIMARY_MIN_WIDTH));
//! assert!(!spec.show);
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Product name shown in window titles and support mail.
pub const APP_NAME: &str = "MTP Desk";

/// Support address used by the degraded window mail link.
pub const AUTHOR_EMAIL: &str = "support@mtpdesk.app";

/// Default delay before the first automatic update check.
pub const AUTO_UPDATE_CHECK_FIREUP_DELAY: Duration = Duration::from_millis(5_000);

/// Settings key controlling automatic update checks.
pub const ENABLE_AUTO_UPDATE_CHECK_KEY: &str = "enableAutoUpdateCheck";

/// Minimum primary window width in logical pixels.
pub const PRIMARY_MIN_WIDTH: u32 = 854;

/// Minimum primary window height in logical pixels.
pub const PRIMARY_MIN_HEIGHT: u32 = 640;

/// Fixed degraded window width in logical pixels.
pub const DEGRADED_WIDTH: u32 = 480;

/// Fixed degraded window height in logical pixels.
pub const DEGRADED_HEIGHT: u32 = 320;

/// Outcome of boot verification, decided once per process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootDecision {
    /// Profile is present and valid.
    Bootable,
    /// Verification ran cleanly but reported the profile unusable.
    NotBootable,
    /// A verifier step failed; the process cannot decide a boot state.
    VerificationFailed(String),
}

impl BootDecision {
    /// Returns `true` for [`BootDecision::Bootable`].
    pub fn is_bootable(&self) -> bool {
        matches!(self, Self::Bootable)
    }
}

/// Opaque handle of one native window, issued by the window host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window-{}", self.0)
    }
}

/// Which of the two window flavours is being managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowKind {
    /// Main application window after a successful boot.
    Primary,
    /// Fixed-size informational window after a failed boot.
    Degraded,
}

/// Chrome attributes applied when a window is constructed.
///
/// Serialized as-is when a host forwards the request across a process boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    /// Window kind this spec was built for.
    pub kind: WindowKind,
    /// Title bar text.
    pub title: String,
    /// Center on the active display.
    pub center: bool,
    /// Initial visibility; primary windows stay hidden until content loads.
    pub show: bool,
    /// Fixed width, when the window is not freely sized.
    pub width: Option<u32>,
    /// Fixed height, when the window is not freely sized.
    pub height: Option<u32>,
    /// Minimum width constraint.
    pub min_width: Option<u32>,
    /// Minimum height constraint.
    pub min_height: Option<u32>,
    /// User may resize the window.
    pub resizable: bool,
    /// User may maximize the window.
    pub maximizable: bool,
    /// User may minimize the window.
    pub minimizable: bool,
    /// Hide the native title bar and draw custom chrome.
    pub hidden_title_bar: bool,
}

impl WindowSpec {
    /// Builds the chrome spec for `kind`.
    pub fn for_kind(kind: WindowKind, title: impl Into<String>) -> Self {
        let title = title.into();
        match kind {
            WindowKind::Primary => Self {
                kind,
                title,
                center: true,
                show: false,
                width: None,
                height: None,
                min_width: Some(PRIMARY_MIN_WIDTH),
                min_height: Some(PRIMARY_MIN_HEIGHT),
                resizable: true,
                maximizable: true,
                minimizable: true,
                hidden_title_bar: true,
            },
            WindowKind::Degraded => Self {
                kind,
                title,
                center: true,
                show: true,
                width: Some(DEGRADED_WIDTH),
                height: Some(DEGRADED_HEIGHT),
                min_width: None,
                min_height: None,
                resizable: false,
                maximizable: false,
                minimizable: false,
                hidden_title_bar: false,
            },
        }
    }
}

/// What a window loads once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowContent {
    /// Application entry point URL.
    Url(String),
    /// Self-contained HTML document; no navigation or external resources.
    Document(String),
}

/// Desktop platform, as far as lifecycle policy cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// macOS.
    MacOs,
    /// Windows.
    Windows,
    /// Linux and other unix desktops.
    Linux,
    /// Anything else.
    Other,
}

impl Platform {
    /// Returns the platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(windows) {
            Self::Windows
        } else if cfg!(target_os = "linux") {
            Self::Linux
        } else {
            Self::Other
        }
    }

    /// Returns `true` when apps conventionally stay alive without windows.
    pub fn keeps_app_resident(self) -> bool {
        self == Self::MacOs
    }
}

/// Build/run profile selected at launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunProfile {
    /// Local development build.
    Development,
    /// Production build.
    Production,
    /// Production build with developer tooling enabled.
    DebugProduction,
}

impl RunProfile {
    /// Returns `true` when process-wide error routing is installed.
    pub fn routes_process_errors(self) -> bool {
        self == Self::Production
    }

    /// Returns `true` when developer extensions should be installed.
    pub fn installs_dev_extensions(self) -> bool {
        matches!(self, Self::Development | Self::DebugProduction)
    }
}

/// Fixed category tag naming the lifecycle step that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorContext {
    /// Boot determination.
    Boot,
    /// Ready handler.
    Ready,
    /// Window construction.
    CreateWindow,
    /// Content-loaded handler.
    ContentLoaded,
    /// Renderer-side window error.
    WindowError,
    /// Activate re-entry.
    Activate,
    /// Second launch attempt.
    SecondInstance,
    /// All-windows-closed policy.
    WindowAllClosed,
    /// Quit request.
    Quit,
    /// Update handle init.
    UpdateInit,
    /// Deferred update check.
    UpdateCheck,
    /// Settings read for update scheduling.
    UpdateSettings,
    /// Menu construction.
    Menu,
    /// Developer extension installation.
    InstallExtensions,
    /// Process-wide panic.
    Uncaught,
    /// Process-wide event bus error.
    EventBus,
}

impl ErrorContext {
    /// Returns the stable tag string used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Boot => "lifecycle/boot",
            Self::Ready => "lifecycle/ready",
            Self::CreateWindow => "lifecycle/create-window",
            Self::ContentLoaded => "window/content-loaded",
            Self::WindowError => "window/error",
            Self::Activate => "lifecycle/activate",
            Self::SecondInstance => "lifecycle/second-instance",
            Self::WindowAllClosed => "lifecycle/window-all-closed",
            Self::Quit => "lifecycle/quit",
            Self::UpdateInit => "update/init",
            Self::UpdateCheck => "update/check",
            Self::UpdateSettings => "update/settings",
            Self::Menu => "menu/build",
            Self::InstallExtensions => "lifecycle/install-extensions",
            Self::Uncaught => "process/uncaught",
            Self::EventBus => "process/event-bus",
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sink receiving every error the lifecycle decides to report.
///
/// Implementations must not fail or panic; reporting is the last stop.
pub trait ErrorReporter: Send + Sync {
    /// Records one error with the step that produced it.
    fn error(&self, error: &LifecycleError, context: ErrorContext);
}

/// Lifecycle error taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// Boot verifier failed; the process cannot continue.
    #[error("boot verification failed: {0}")]
    BootVerification(String),
    /// A handle expected to be live was missing or stale.
    #[error("consistency error: {0}")]
    Consistency(String),
    /// Non-essential collaborator failed.
    #[error("{component} failed: {message}")]
    Collaborator {
        /// Collaborator name.
        component: &'static str,
        /// Failure detail.
        message: String,
    },
    /// Platform call failed.
    #[error("platform failure: {0}")]
    Platform(String),
    /// Error raised on the process-wide event bus.
    #[error("event bus error: {0}")]
    EventBus(String),
    /// Panic caught by the process-wide hook.
    #[error("uncaught panic: {0}")]
    Uncaught(String),
}

impl LifecycleError {
    /// Wraps any displayable collaborator failure.
    pub fn collaborator(component: &'static str, error: impl fmt::Display) -> Self {
        Self::Collaborator {
            component,
            message: error.to_string(),
        }
    }

    /// Returns `true` for errors that leave lifecycle state undecidable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::BootVerification(_) | Self::Consistency(_))
    }
}
