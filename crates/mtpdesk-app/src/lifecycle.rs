//! Process lifecycle state machine.
//!
//! [`Lifecycle::start`] runs the synchronous launch steps (instance lock, then
//! boot decision). Everything afterwards is driven by [`Signal`]s fed to
//! [`Lifecycle::dispatch`], one handler per [`LifecyclePhase`].
//!
//! Phase graph:
//! - `Starting -> Refused` when another instance holds the lock.
//! - `Starting -> Failed` when boot verification errors.
//! - `Starting -> AwaitingReady(branch) -> Running(branch)` otherwise.
//! - `Running(_) -> Terminated` once the close policy quits.
//!
//! `Refused`, `Failed`, and `Terminated` are terminal; dispatching into them
//! returns [`Flow::Exit`] without side effects.

use std::fmt;
use std::sync::Arc;

use mtpdesk_boot::{BootVerifier, determine_bootable};
use mtpdesk_core::{
    APP_NAME, AUTHOR_EMAIL, BootDecision, ENABLE_AUTO_UPDATE_CHECK_KEY, ErrorContext,
    ErrorReporter, LifecycleError, WindowContent, WindowId, WindowKind,
};
use mtpdesk_instance::InstanceLock;
use mtpdesk_update::{
    PendingCheck, ScheduleOutcome, SettingsStore, Timer, TimerToken, UpdateHandle,
    UpdateProvider, UpdateScheduler,
};
use mtpdesk_window::{WindowController, WindowError, WindowHost, WindowPhase, degraded_document};
use serde_json::Map;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::APP_VERSION;
use crate::config::LaunchConfig;

/// Platform or timer event delivered to the lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Platform finished initializing; windows may be created.
    Ready,
    /// Window content finished loading.
    ContentLoaded(WindowId),
    /// Window was closed by the user or platform.
    WindowClosed(WindowId),
    /// No windows remain.
    AllWindowsClosed,
    /// Application re-activated (dock click).
    Activate,
    /// Another launch attempt hit the instance lock.
    SecondInstance,
    /// A deferred callback fired.
    TimerFired(TimerToken),
    /// Renderer-side error raised inside a window.
    WindowError {
        /// Window that raised the error.
        window: WindowId,
        /// Error text.
        message: String,
    },
    /// Error published on the process-wide event bus.
    EventBusError(String),
}

/// Whether the event loop should keep running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep dispatching.
    Continue,
    /// Quit was requested; stop dispatching.
    Exit,
}

/// Boot branch chosen at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    /// Profile verified; full application.
    Primary,
    /// Profile unusable; static degraded window only.
    Degraded,
}

/// Lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// Before [`Lifecycle::start`].
    Starting,
    /// Another instance is running.
    Refused,
    /// Boot verification errored.
    Failed,
    /// Waiting for [`Signal::Ready`].
    AwaitingReady(Branch),
    /// Windows may exist.
    Running(Branch),
    /// Close policy quit the app.
    Terminated,
}

impl LifecyclePhase {
    /// Returns `true` for phases that never leave.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Refused | Self::Failed | Self::Terminated)
    }
}

/// Application-level platform control.
pub trait AppControl: Send + Sync {
    /// Asks the platform to quit the application.
    fn quit(&self) -> Result<(), ControlError>;
}

/// Application menu construction.
pub trait MenuBuilder: Send + Sync {
    /// Builds the menu for `window`; menu items may trigger `updates`.
    fn build_menu(&self, window: WindowId, updates: Arc<dyn UpdateHandle>) -> Result<(), MenuError>;
}

/// Developer tooling installed in development profiles.
pub trait DevExtensions: Send + Sync {
    /// Installs developer extensions, re-downloading when `force_download`.
    fn install(&self, force_download: bool) -> Result<(), ExtensionError>;
}

/// Everything the lifecycle talks to.
#[derive(Clone)]
pub struct Collaborators {
    /// Single-instance lock.
    pub instance_lock: Arc<dyn InstanceLock>,
    /// Boot profile verifier.
    pub boot_verifier: Arc<dyn BootVerifier>,
    /// Native window backend.
    pub window_host: Arc<dyn WindowHost>,
    /// Quit control.
    pub app_control: Arc<dyn AppControl>,
    /// Persisted settings.
    pub settings: Arc<dyn SettingsStore>,
    /// Update handle factory.
    pub updates: Arc<dyn UpdateProvider>,
    /// Menu builder.
    pub menu: Arc<dyn MenuBuilder>,
    /// Deferred callbacks.
    pub timer: Arc<dyn Timer>,
    /// Developer extensions.
    pub dev_extensions: Arc<dyn DevExtensions>,
    /// Error sink.
    pub reporter: Arc<dyn ErrorReporter>,
}

/// Mutable process state owned by one [`Lifecycle`].
pub struct ProcessContext {
    single_instance: bool,
    boot_decision: Option<BootDecision>,
    windows: WindowController,
    update_handle: Option<Arc<dyn UpdateHandle>>,
    scheduler: UpdateScheduler,
    phase: LifecyclePhase,
}

impl ProcessContext {
    fn new(config: &LaunchConfig) -> Self {
        Self {
            single_instance: false,
            boot_decision: None,
            windows: WindowController::new(APP_NAME),
            update_handle: None,
            scheduler: UpdateScheduler::new(config.update_check_delay),
            phase: LifecyclePhase::Starting,
        }
    }

    /// Returns `true` once this process holds the instance lock.
    pub fn single_instance(&self) -> bool {
        self.single_instance
    }

    /// Returns the boot decision, once made.
    pub fn boot_decision(&self) -> Option<&BootDecision> {
        self.boot_decision.as_ref()
    }

    /// Returns the live window id.
    pub fn window_id(&self) -> Option<WindowId> {
        self.windows.window_id()
    }

    /// Returns the window phase.
    pub fn window_phase(&self) -> WindowPhase {
        self.windows.phase()
    }

    /// Returns how many windows were created so far.
    pub fn windows_created(&self) -> usize {
        self.windows.created_total()
    }

    /// Returns `true` once the update handle exists.
    pub fn has_update_handle(&self) -> bool {
        self.update_handle.is_some()
    }

    /// Returns the pending update check.
    pub fn pending_update_check(&self) -> Option<PendingCheck> {
        self.scheduler.pending()
    }

    /// Returns the lifecycle phase.
    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }
}

impl fmt::Debug for ProcessContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessContext")
            .field("single_instance", &self.single_instance)
            .field("boot_decision", &self.boot_decision)
            .field("windows", &self.windows)
            .field("has_update_handle", &self.update_handle.is_some())
            .field("scheduler", &self.scheduler)
            .field("phase", &self.phase)
            .finish()
    }
}

/// Lifecycle controller.
pub struct Lifecycle {
    config: LaunchConfig,
    collaborators: Collaborators,
    context: ProcessContext,
}

impl Lifecycle {
    /// Creates a lifecycle in the `Starting` phase.
    pub fn new(config: LaunchConfig, collaborators: Collaborators) -> Self {
        let context = ProcessContext::new(&config);
        Self {
            config,
            collaborators,
            context,
        }
    }

    /// Returns the process context.
    pub fn context(&self) -> &ProcessContext {
        &self.context
    }

    /// Returns the lifecycle phase.
    pub fn phase(&self) -> LifecyclePhase {
        self.context.phase
    }

    /// Returns the launch configuration.
    pub fn config(&self) -> &LaunchConfig {
        &self.config
    }

    /// Consumes the lifecycle, returning its final context.
    pub fn into_context(self) -> ProcessContext {
        self.context
    }

    /// Runs the instance lock and boot decision.
    ///
    /// Calling it again after the first run only reports the current flow.
    pub fn start(&mut self) -> Flow {
        if self.context.phase != LifecyclePhase::Starting {
            debug!(phase = ?self.context.phase, "lifecycle already started");
            return self.flow();
        }

        info!(
            version = APP_VERSION,
            profile = ?self.config.profile,
            platform = ?self.config.platform,
            "starting lifecycle"
        );

        self.context.single_instance = self.collaborators.instance_lock.try_acquire();
        if !self.context.single_instance {
            info!("another instance is running; quitting");
            self.request_quit();
            return self.enter(LifecyclePhase::Refused);
        }

        let decision = determine_bootable(self.collaborators.boot_verifier.as_ref());
        self.context.boot_decision = Some(decision.clone());
        match decision {
            BootDecision::Bootable => {
                info!("profile verified");
                self.enter(LifecyclePhase::AwaitingReady(Branch::Primary))
            }
            BootDecision::NotBootable => {
                warn!("profile could not be verified; degraded window will be shown");
                self.enter(LifecyclePhase::AwaitingReady(Branch::Degraded))
            }
            BootDecision::VerificationFailed(reason) => {
                self.report(LifecycleError::BootVerification(reason), ErrorContext::Boot);
                self.request_quit();
                self.enter(LifecyclePhase::Failed)
            }
        }
    }

    /// Applies one signal and returns whether to keep running.
    pub fn dispatch(&mut self, signal: Signal) -> Flow {
        match signal {
            Signal::EventBusError(message) => {
                self.on_event_bus_error(message);
                return self.flow();
            }
            Signal::WindowError { window, message } => {
                self.report(
                    LifecycleError::collaborator("renderer", format!("{window}: {message}")),
                    ErrorContext::WindowError,
                );
                return self.flow();
            }
            _ => {}
        }

        match self.context.phase {
            LifecyclePhase::Starting => {
                warn!(?signal, "signal before start ignored");
                Flow::Continue
            }
            LifecyclePhase::Refused | LifecyclePhase::Failed | LifecyclePhase::Terminated => {
                debug!(?signal, phase = ?self.context.phase, "signal after exit ignored");
                Flow::Exit
            }
            LifecyclePhase::AwaitingReady(branch) => self.dispatch_awaiting_ready(branch, signal),
            LifecyclePhase::Running(Branch::Primary) => self.dispatch_primary(signal),
            LifecyclePhase::Running(Branch::Degraded) => self.dispatch_degraded(signal),
        }
    }

    fn dispatch_awaiting_ready(&mut self, branch: Branch, signal: Signal) -> Flow {
        match signal {
            Signal::Ready => {
                self.context.phase = LifecyclePhase::Running(branch);
                match branch {
                    Branch::Primary => self.ready_primary(),
                    Branch::Degraded => self.ready_degraded(),
                }
                self.flow()
            }
            other => {
                debug!(signal = ?other, "signal before ready ignored");
                Flow::Continue
            }
        }
    }

    fn dispatch_primary(&mut self, signal: Signal) -> Flow {
        match signal {
            Signal::Ready => debug!("duplicate ready ignored"),
            Signal::ContentLoaded(id) => self.content_loaded(id),
            Signal::WindowClosed(id) => self.window_closed(id),
            Signal::AllWindowsClosed => {
                self.all_windows_closed();
                if !self.config.platform.keeps_app_resident() {
                    self.request_quit();
                    return self.enter(LifecyclePhase::Terminated);
                }
                debug!(platform = ?self.config.platform, "staying resident with no windows");
            }
            Signal::Activate => self.activate(),
            Signal::SecondInstance => self.second_instance(),
            Signal::TimerFired(token) => self.timer_fired(token),
            Signal::WindowError { .. } | Signal::EventBusError(_) => {}
        }
        self.flow()
    }

    fn dispatch_degraded(&mut self, signal: Signal) -> Flow {
        match signal {
            Signal::ContentLoaded(id) => self.content_loaded(id),
            Signal::WindowClosed(id) => {
                self.context.windows.on_closed(id);
            }
            Signal::AllWindowsClosed => {
                self.all_windows_closed();
                self.request_quit();
                return self.enter(LifecyclePhase::Terminated);
            }
            other => debug!(signal = ?other, "signal ignored in degraded mode"),
        }
        self.flow()
    }

    fn ready_primary(&mut self) {
        let content = WindowContent::Url(self.config.entry_url.clone());
        let Some(window) = self.open_window(WindowKind::Primary, &content, ErrorContext::CreateWindow)
        else {
            return;
        };
        self.attach_update_handle(window);
    }

    fn ready_degraded(&mut self) {
        let content = match degraded_document(AUTHOR_EMAIL, APP_NAME, APP_VERSION) {
            Ok(content) => content,
            Err(error) => {
                self.report(window_failure(error), ErrorContext::Ready);
                return;
            }
        };
        self.open_window(WindowKind::Degraded, &content, ErrorContext::CreateWindow);
    }

    fn open_window(
        &mut self,
        kind: WindowKind,
        content: &WindowContent,
        context: ErrorContext,
    ) -> Option<WindowId> {
        if kind == WindowKind::Primary && self.config.profile.installs_dev_extensions() {
            self.install_dev_extensions();
        }

        match self
            .context
            .windows
            .open(self.collaborators.window_host.as_ref(), kind, content)
        {
            Ok(id) => Some(id),
            Err(error) => {
                self.report(window_failure(error), context);
                None
            }
        }
    }

    fn install_dev_extensions(&self) {
        let force_download = self.config.upgrade_extensions;
        match self.collaborators.dev_extensions.install(force_download) {
            Ok(()) => debug!(force_download, "developer extensions installed"),
            Err(error) => self.report(
                LifecycleError::collaborator("developer extensions", error),
                ErrorContext::InstallExtensions,
            ),
        }
    }

    /// Binds the update handle to `window`, creating it on first use.
    ///
    /// First use also builds the menu and schedules the deferred check.
    fn attach_update_handle(&mut self, window: WindowId) {
        if let Some(handle) = &self.context.update_handle {
            handle.bind_window(Some(window));
            debug!(window_id = %window, "update handle rebound");
            return;
        }

        let handle = self.collaborators.updates.create_handle(window);
        if let Err(error) = handle.init() {
            self.report(
                LifecycleError::collaborator("update handle", error),
                ErrorContext::UpdateInit,
            );
        }

        if let Err(error) = self
            .collaborators
            .menu
            .build_menu(window, Arc::clone(&handle))
        {
            self.report(LifecycleError::collaborator("menu", error), ErrorContext::Menu);
        }

        self.context.update_handle = Some(handle);
        self.schedule_update_check(window);
    }

    fn schedule_update_check(&mut self, window: WindowId) {
        let settings = match self
            .collaborators
            .settings
            .get_items(&[ENABLE_AUTO_UPDATE_CHECK_KEY])
        {
            Ok(settings) => settings,
            Err(error) => {
                self.report(
                    LifecycleError::collaborator("settings store", error),
                    ErrorContext::UpdateSettings,
                );
                Map::new()
            }
        };

        let outcome =
            self.context
                .scheduler
                .schedule(&settings, self.collaborators.timer.as_ref(), window);
        if outcome == ScheduleOutcome::Disabled {
            debug!(window_id = %window, "no update check scheduled");
        }
    }

    fn content_loaded(&mut self, id: WindowId) {
        if let Err(error) = self.context.windows.on_content_loaded(
            self.collaborators.window_host.as_ref(),
            id,
            self.config.start_minimized,
        ) {
            self.report(window_failure(error), ErrorContext::ContentLoaded);
        }
    }

    fn window_closed(&mut self, id: WindowId) {
        if !self.context.windows.on_closed(id) {
            return;
        }
        self.context
            .scheduler
            .cancel_for_window(id, self.collaborators.timer.as_ref());
        if let Some(handle) = &self.context.update_handle {
            handle.bind_window(None);
        }
    }

    /// Clears a window record the host no longer has.
    fn all_windows_closed(&mut self) {
        let Some(stale) = self.context.windows.window_id() else {
            return;
        };
        self.report(
            LifecycleError::Consistency(format!(
                "{stale} still recorded after all windows closed"
            )),
            ErrorContext::WindowAllClosed,
        );
        self.window_closed(stale);
    }

    fn activate(&mut self) {
        if let Some(window) = self.context.windows.window_id() {
            debug!(window_id = %window, "activate with live window ignored");
            return;
        }

        let content = WindowContent::Url(self.config.entry_url.clone());
        if let Some(window) = self.open_window(WindowKind::Primary, &content, ErrorContext::Activate)
        {
            self.attach_update_handle(window);
        }
    }

    fn second_instance(&mut self) {
        match self
            .context
            .windows
            .focus_existing(self.collaborators.window_host.as_ref())
        {
            Ok(true) => info!("second launch focused the existing window"),
            Ok(false) => debug!("second launch with no window ignored"),
            Err(error) => self.report(window_failure(error), ErrorContext::SecondInstance),
        }
    }

    fn timer_fired(&mut self, token: TimerToken) {
        let Some(window) = self.context.scheduler.on_timer_fired(token) else {
            debug!(token = token.0, "stale timer ignored");
            return;
        };

        if self.context.windows.window_id() != Some(window) {
            self.report(
                LifecycleError::Consistency(format!(
                    "update check fired for {window} which is no longer live"
                )),
                ErrorContext::UpdateCheck,
            );
            return;
        }

        let Some(handle) = &self.context.update_handle else {
            self.report(
                LifecycleError::Consistency("update check fired without a handle".to_string()),
                ErrorContext::UpdateCheck,
            );
            return;
        };

        info!(window_id = %window, "running automatic update check");
        if let Err(error) = handle.check_for_updates() {
            self.report(
                LifecycleError::collaborator("update handle", error),
                ErrorContext::UpdateCheck,
            );
        }
    }

    fn on_event_bus_error(&self, message: String) {
        if self.config.profile.routes_process_errors() {
            self.report(LifecycleError::EventBus(message), ErrorContext::EventBus);
        } else {
            debug!(%message, profile = ?self.config.profile, "event bus error not routed");
        }
    }

    fn request_quit(&self) {
        if let Err(error) = self.collaborators.app_control.quit() {
            self.report(LifecycleError::Platform(error.to_string()), ErrorContext::Quit);
        }
    }

    fn report(&self, error: LifecycleError, context: ErrorContext) {
        self.collaborators.reporter.error(&error, context);
    }

    fn enter(&mut self, phase: LifecyclePhase) -> Flow {
        debug!(from = ?self.context.phase, to = ?phase, "lifecycle phase change");
        self.context.phase = phase;
        self.flow()
    }

    fn flow(&self) -> Flow {
        if self.context.phase.is_terminal() {
            Flow::Exit
        } else {
            Flow::Continue
        }
    }
}

fn window_failure(error: WindowError) -> LifecycleError {
    if error.is_consistency() {
        LifecycleError::Consistency(error.to_string())
    } else {
        LifecycleError::collaborator("window host", error)
    }
}

/// Quit request failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    /// Platform refused or failed to quit.
    #[error("quit failed: {0}")]
    Quit(String),
}

/// Menu construction failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MenuError {
    /// Menu could not be built.
    #[error("menu build failed: {0}")]
    Build(String),
}

/// Developer extension failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtensionError {
    /// Extension install failed.
    #[error("extension install failed: {0}")]
    Install(String),
}
