//! Headless collaborators for running the lifecycle without a native toolkit.
//!
//! The binary wires these in: windows are bookkeeping entries that load
//! instantly, update checks and menus only log, and quit raises a flag.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use mtpdesk_core::{WindowContent, WindowId, WindowSpec};
use mtpdesk_update::{UpdateError, UpdateHandle, UpdateProvider};
use mtpdesk_window::{WindowError, WindowHost};
use tracing::{debug, info, warn};

use crate::lifecycle::{
    AppControl, ControlError, DevExtensions, ExtensionError, MenuBuilder, MenuError, Signal,
};
use crate::runtime::SignalSender;

#[derive(Debug, Clone, Copy, Default)]
struct HeadlessWindow {
    visible: bool,
    minimized: bool,
}

/// Window host that keeps windows as in-memory records.
///
/// Every created window immediately reports [`Signal::ContentLoaded`].
#[derive(Debug)]
pub struct HeadlessHost {
    sender: SignalSender,
    next_id: AtomicU64,
    windows: Arc<Mutex<HashMap<WindowId, HeadlessWindow>>>,
}

impl HeadlessHost {
    /// Creates a host posting window signals into `sender`.
    pub fn new(sender: SignalSender) -> Self {
        Self {
            sender,
            next_id: AtomicU64::new(1),
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns how many windows are open.
    pub fn open_windows(&self) -> usize {
        self.windows.lock().map(|windows| windows.len()).unwrap_or(0)
    }

    /// Returns how many open windows are shown.
    pub fn visible_windows(&self) -> usize {
        self.windows
            .lock()
            .map(|windows| windows.values().filter(|window| window.visible).count())
            .unwrap_or(0)
    }

    /// Closes every open window after `linger`, as a user would.
    ///
    /// Posts one [`Signal::WindowClosed`] per window, then
    /// [`Signal::AllWindowsClosed`].
    pub fn close_after(&self, linger: Duration) {
        let windows = Arc::clone(&self.windows);
        let sender = self.sender.clone();
        let spawned = thread::Builder::new()
            .name("mtpdesk-headless-close".to_string())
            .spawn(move || {
                thread::sleep(linger);
                let closed: Vec<WindowId> = match windows.lock() {
                    Ok(mut windows) => windows.drain().map(|(id, _)| id).collect(),
                    Err(_) => return,
                };
                for id in closed {
                    let _ = sender.post(Signal::WindowClosed(id));
                }
                let _ = sender.post(Signal::AllWindowsClosed);
            });
        if let Err(error) = spawned {
            warn!(%error, "headless close thread could not start");
        }
    }

    fn with_window<T>(
        &self,
        id: WindowId,
        apply: impl FnOnce(&mut HeadlessWindow) -> T,
    ) -> Result<T, WindowError> {
        let mut windows = self
            .windows
            .lock()
            .map_err(|_| WindowError::Backend("headless window table poisoned".to_string()))?;
        let window = windows
            .get_mut(&id)
            .ok_or_else(|| WindowError::Backend(format!("{id} does not exist")))?;
        Ok(apply(window))
    }
}

impl WindowHost for HeadlessHost {
    fn create(&self, spec: &WindowSpec, content: &WindowContent) -> Result<WindowId, WindowError> {
        let id = WindowId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.windows
            .lock()
            .map_err(|_| WindowError::Backend("headless window table poisoned".to_string()))?
            .insert(
                id,
                HeadlessWindow {
                    visible: spec.show,
                    minimized: false,
                },
            );

        let source = match content {
            WindowContent::Url(url) => url.as_str(),
            WindowContent::Document(_) => "inline document",
        };
        info!(
            window_id = %id,
            kind = ?spec.kind,
            width = ?spec.width,
            height = ?spec.height,
            min_width = ?spec.min_width,
            min_height = ?spec.min_height,
            source,
            "headless window created"
        );
        let _ = self.sender.post(Signal::ContentLoaded(id));
        Ok(id)
    }

    fn show(&self, id: WindowId) -> Result<(), WindowError> {
        self.with_window(id, |window| window.visible = true)?;
        debug!(window_id = %id, "show");
        Ok(())
    }

    fn focus(&self, id: WindowId) -> Result<(), WindowError> {
        self.with_window(id, |_| ())?;
        debug!(window_id = %id, "focus");
        Ok(())
    }

    fn maximize(&self, id: WindowId) -> Result<(), WindowError> {
        self.with_window(id, |window| window.minimized = false)?;
        debug!(window_id = %id, "maximize");
        Ok(())
    }

    fn minimize(&self, id: WindowId) -> Result<(), WindowError> {
        self.with_window(id, |window| window.minimized = true)?;
        debug!(window_id = %id, "minimize");
        Ok(())
    }

    fn restore(&self, id: WindowId) -> Result<(), WindowError> {
        self.with_window(id, |window| {
            window.minimized = false;
            window.visible = true;
        })?;
        debug!(window_id = %id, "restore");
        Ok(())
    }

    fn is_minimized(&self, id: WindowId) -> Result<bool, WindowError> {
        self.with_window(id, |window| window.minimized)
    }
}

/// Update provider whose handles only log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOnlyUpdates;

impl UpdateProvider for LogOnlyUpdates {
    fn create_handle(&self, window: WindowId) -> Arc<dyn UpdateHandle> {
        Arc::new(LogOnlyUpdateHandle {
            window: Mutex::new(Some(window)),
        })
    }
}

#[derive(Debug)]
struct LogOnlyUpdateHandle {
    window: Mutex<Option<WindowId>>,
}

impl LogOnlyUpdateHandle {
    fn bound_window(&self) -> Option<WindowId> {
        self.window.lock().ok().and_then(|window| *window)
    }
}

impl UpdateHandle for LogOnlyUpdateHandle {
    fn init(&self) -> Result<(), UpdateError> {
        info!(window = ?self.bound_window(), "update handle initialized");
        Ok(())
    }

    fn check_for_updates(&self) -> Result<(), UpdateError> {
        match self.bound_window() {
            Some(window) => {
                info!(window_id = %window, "update check requested; no update feed configured");
                Ok(())
            }
            None => Err(UpdateError::Check("no window bound".to_string())),
        }
    }

    fn bind_window(&self, window: Option<WindowId>) {
        if let Ok(mut bound) = self.window.lock() {
            *bound = window;
        }
    }
}

/// Menu builder that logs the menu it would build.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessMenu;

impl MenuBuilder for HeadlessMenu {
    fn build_menu(&self, window: WindowId, _updates: Arc<dyn UpdateHandle>) -> Result<(), MenuError> {
        info!(window_id = %window, "application menu built");
        Ok(())
    }
}

/// Extension installer for builds without developer tooling.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDevExtensions;

impl DevExtensions for NoDevExtensions {
    fn install(&self, force_download: bool) -> Result<(), ExtensionError> {
        debug!(force_download, "developer extensions unavailable in headless shell");
        Ok(())
    }
}

/// Quit control that records the request.
#[derive(Debug, Default)]
pub struct QuitFlag {
    requested: AtomicBool,
}

impl QuitFlag {
    /// Creates an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once quit was requested.
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}

impl AppControl for QuitFlag {
    fn quit(&self) -> Result<(), ControlError> {
        self.requested.store(true, Ordering::Release);
        info!("quit requested");
        Ok(())
    }
}
