#![warn(missing_docs)]
//! # mtpdesk-window
//!
//! ## Purpose
//! Owns creation, reveal, focus, and teardown of the single top-level window.
//!
//! ## Responsibilities
//! - Define the [`WindowHost`] seam to the native windowing toolkit.
//! - Track the live window through `Unborn -> Created -> Visible -> Closed`.
//! - Build the static degraded document shown when boot fails.
//!
//! ## Data flow
//! Lifecycle asks [`WindowController::open`] for a window -> host creates it
//! and returns a [`WindowId`] -> host later reports content-loaded and closed
//! signals, which the lifecycle forwards to the controller.
//!
//! ## Ownership and lifetimes
//! The controller holds the only record of the live window. After
//! [`WindowController::on_closed`] nothing refers to the old id; further
//! signals for it are no-ops or consistency errors, never host calls.
//!
//! ## Error model
//! Host failures surface as [`WindowError::Backend`]. Signals that reference a
//! window the controller does not hold are [`WindowError::NotLive`]; opening a
//! second window is [`WindowError::AlreadyOpen`]. Both are consistency errors.

use mtpdesk_core::{WindowContent, WindowId, WindowKind, WindowSpec};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

/// Subject line of the degraded-window support mail.
pub const DEGRADED_MAIL_SUBJECT: &str = "Unable to load profile files";

/// Native window operations the controller drives.
pub trait WindowHost: Send + Sync {
    /// Constructs a window with `spec` and starts loading `content`.
    fn create(&self, spec: &WindowSpec, content: &WindowContent) -> Result<WindowId, WindowError>;

    /// Makes the window visible.
    fn show(&self, id: WindowId) -> Result<(), WindowError>;

    /// Gives the window keyboard focus.
    fn focus(&self, id: WindowId) -> Result<(), WindowError>;

    /// Maximizes the window.
    fn maximize(&self, id: WindowId) -> Result<(), WindowError>;

    /// Minimizes the window.
    fn minimize(&self, id: WindowId) -> Result<(), WindowError>;

    /// Restores a minimized window.
    fn restore(&self, id: WindowId) -> Result<(), WindowError>;

    /// Reports whether the window is minimized.
    fn is_minimized(&self, id: WindowId) -> Result<bool, WindowError>;
}

/// Window lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPhase {
    /// No window has been created yet.
    Unborn,
    /// Window exists but content has not finished loading.
    Created,
    /// Content loaded and reveal applied.
    Visible,
    /// Last window was closed.
    Closed,
}

/// Record of the live window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagedWindow {
    /// Host-issued id.
    pub id: WindowId,
    /// Window flavour.
    pub kind: WindowKind,
    /// Current phase; always `Created` or `Visible` while live.
    pub phase: WindowPhase,
}

/// Single-window state machine.
#[derive(Debug, Clone)]
pub struct WindowController {
    title: String,
    live: Option<ManagedWindow>,
    last_phase: WindowPhase,
    created_total: usize,
}

impl WindowController {
    /// Creates a controller with no window.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            live: None,
            last_phase: WindowPhase::Unborn,
            created_total: 0,
        }
    }

    /// Returns the live window record.
    pub fn current(&self) -> Option<&ManagedWindow> {
        self.live.as_ref()
    }

    /// Returns the live window id.
    pub fn window_id(&self) -> Option<WindowId> {
        self.live.map(|window| window.id)
    }

    /// Returns the phase of the live window, or of the last one.
    pub fn phase(&self) -> WindowPhase {
        self.live.map(|window| window.phase).unwrap_or(self.last_phase)
    }

    /// Returns how many windows this controller has created.
    pub fn created_total(&self) -> usize {
        self.created_total
    }

    /// Runs `Unborn -> Created` for a window of `kind`.
    ///
    /// # Errors
    /// Returns [`WindowError::AlreadyOpen`] while a window is live and
    /// propagates host construction failures.
    pub fn open(
        &mut self,
        host: &dyn WindowHost,
        kind: WindowKind,
        content: &WindowContent,
    ) -> Result<WindowId, WindowError> {
        if let Some(window) = self.live {
            return Err(WindowError::AlreadyOpen(window.id));
        }

        let spec = WindowSpec::for_kind(kind, self.title.clone());
        let id = host.create(&spec, content)?;
        self.live = Some(ManagedWindow {
            id,
            kind,
            phase: WindowPhase::Created,
        });
        self.created_total += 1;
        info!(window_id = %id, ?kind, "window created");
        Ok(id)
    }

    /// Runs `Created -> Visible` when content finished loading.
    ///
    /// A repeated load for an already visible window re-applies the reveal.
    ///
    /// # Errors
    /// Returns [`WindowError::NotLive`] when `id` is not the live window, and
    /// propagates host failures.
    pub fn on_content_loaded(
        &mut self,
        host: &dyn WindowHost,
        id: WindowId,
        start_minimized: bool,
    ) -> Result<(), WindowError> {
        let window = match self.live.as_mut() {
            Some(window) if window.id == id => window,
            _ => return Err(WindowError::NotLive(id)),
        };

        if start_minimized {
            host.minimize(id)?;
        } else {
            if window.kind == WindowKind::Primary {
                host.maximize(id)?;
            }
            host.show(id)?;
            host.focus(id)?;
        }

        window.phase = WindowPhase::Visible;
        debug!(window_id = %id, start_minimized, "window revealed");
        Ok(())
    }

    /// Clears the live window on its closed signal.
    ///
    /// Returns `false` when `id` is not live (duplicate or stale signal).
    pub fn on_closed(&mut self, id: WindowId) -> bool {
        match self.live {
            Some(window) if window.id == id => {
                self.live = None;
                self.last_phase = WindowPhase::Closed;
                info!(window_id = %id, "window closed");
                true
            }
            _ => {
                debug!(window_id = %id, "ignoring closed signal for non-live window");
                false
            }
        }
    }

    /// Restores (when minimized) and focuses the live window.
    ///
    /// Returns `false` when there is no live window.
    ///
    /// # Errors
    /// Propagates host failures.
    pub fn focus_existing(&mut self, host: &dyn WindowHost) -> Result<bool, WindowError> {
        let Some(window) = self.live else {
            return Ok(false);
        };

        if host.is_minimized(window.id)? {
            host.restore(window.id)?;
        }
        host.focus(window.id)?;
        Ok(true)
    }
}

/// Builds the `mailto:` support link for the degraded window.
///
/// # Errors
/// Returns [`WindowError::Content`] when `email` does not form a valid URL.
pub fn support_mail_link(email: &str, app_name: &str, version: &str) -> Result<Url, WindowError> {
    let mut link = Url::parse(&format!("mailto:{email}"))
        .map_err(|error| WindowError::Content(format!("invalid support address: {error}")))?;
    link.set_query(Some(&format!(
        "Subject={DEGRADED_MAIL_SUBJECT}&Body={app_name} - {version}"
    )));
    Ok(link)
}

/// Builds the static HTML shown by the degraded window.
///
/// # Errors
/// Returns [`WindowError::Content`] when the support link cannot be built.
pub fn degraded_document(
    email: &str,
    app_name: &str,
    version: &str,
) -> Result<WindowContent, WindowError> {
    let link = support_mail_link(email, app_name, version)?;
    let href = escape_html(link.as_str());
    let label = escape_html(email);

    Ok(WindowContent::Document(format!(
        "<html lang=\"en-gb\">\n  <body>\n    <h3>{DEGRADED_MAIL_SUBJECT}. Please restart the app.</h3>\n    <p>Write to the developer if the problem persists.</p>\n    <a href=\"{href}\">{label}</a>\n  </body>\n</html>\n"
    )))
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Window layer errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    /// Native toolkit call failed.
    #[error("window host failure: {0}")]
    Backend(String),
    /// A window is already live.
    #[error("window {0} is already open")]
    AlreadyOpen(WindowId),
    /// Signal referenced a window that is not live.
    #[error("window {0} is not live")]
    NotLive(WindowId),
    /// Static content could not be built.
    #[error("invalid window content: {0}")]
    Content(String),
}

impl WindowError {
    /// Returns `true` for errors that indicate broken window bookkeeping.
    pub fn is_consistency(&self) -> bool {
        matches!(self, Self::AlreadyOpen(_) | Self::NotLive(_))
    }
}
