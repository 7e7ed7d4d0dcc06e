//! Shared recording collaborators for lifecycle integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mtpdesk_app::{
    AppControl, Collaborators, ControlError, DevExtensions, ExtensionError, LaunchConfig,
    Lifecycle, LogConfig, MenuBuilder, MenuError,
};
use mtpdesk_boot::{BootError, BootVerifier};
use mtpdesk_core::{
    ErrorContext, ErrorReporter, LifecycleError, Platform, RunProfile, WindowContent, WindowId,
    WindowSpec,
};
use mtpdesk_instance::InstanceLock;
use mtpdesk_update::{
    SettingsError, SettingsStore, Timer, TimerToken, UpdateError, UpdateHandle, UpdateProvider,
};
use mtpdesk_window::{WindowError, WindowHost};
use serde_json::{Map, Value};

/// Launch config for a non-resident platform in the plain production profile.
pub fn test_config() -> LaunchConfig {
    LaunchConfig {
        profile: RunProfile::Production,
        platform: Platform::Linux,
        start_minimized: false,
        upgrade_extensions: false,
        update_check_delay: Duration::from_millis(5_000),
        profile_dir: PathBuf::from("unused-profile-dir"),
        entry_url: "app://mtpdesk/index.html".to_string(),
        log: LogConfig::default(),
        headless_linger: Duration::from_millis(10),
    }
}

#[derive(Debug)]
pub struct FakeLock {
    pub acquired: bool,
    pub attempts: Mutex<usize>,
}

impl InstanceLock for FakeLock {
    fn try_acquire(&self) -> bool {
        *self.attempts.lock().expect("attempts lock") += 1;
        self.acquired
    }
}

/// Verifier with scripted answers; `Err` strings become profile errors.
#[derive(Debug)]
pub struct ScriptedVerifier {
    pub quick: Result<bool, String>,
    pub init: Result<(), String>,
    pub verify: Result<bool, String>,
    pub calls: Mutex<Vec<&'static str>>,
}

impl ScriptedVerifier {
    pub fn new(quick: bool, verify: bool) -> Self {
        Self {
            quick: Ok(quick),
            init: Ok(()),
            verify: Ok(verify),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

impl BootVerifier for ScriptedVerifier {
    fn quick_verify(&self) -> Result<bool, BootError> {
        self.record("quick_verify");
        self.quick.clone().map_err(BootError::Profile)
    }

    fn init(&self) -> Result<(), BootError> {
        self.record("init");
        self.init.clone().map_err(BootError::Profile)
    }

    fn verify(&self) -> Result<bool, BootError> {
        self.record("verify");
        self.verify.clone().map_err(BootError::Profile)
    }
}

/// Host that records calls as `op:id` strings.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub calls: Mutex<Vec<String>>,
    pub created: Mutex<Vec<(WindowSpec, WindowContent)>>,
    pub minimized: Mutex<bool>,
    pub fail_create: Mutex<Option<String>>,
    next_id: Mutex<u64>,
}

impl RecordingHost {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn created(&self) -> Vec<(WindowSpec, WindowContent)> {
        self.created.lock().expect("created lock").clone()
    }

    pub fn set_minimized(&self, minimized: bool) {
        *self.minimized.lock().expect("minimized lock") = minimized;
    }

    pub fn fail_create(&self, message: &str) {
        *self.fail_create.lock().expect("fail lock") = Some(message.to_string());
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

impl WindowHost for RecordingHost {
    fn create(&self, spec: &WindowSpec, content: &WindowContent) -> Result<WindowId, WindowError> {
        if let Some(message) = self.fail_create.lock().expect("fail lock").clone() {
            self.record("create:failed".to_string());
            return Err(WindowError::Backend(message));
        }
        let mut next_id = self.next_id.lock().expect("id lock");
        *next_id += 1;
        self.created
            .lock()
            .expect("created lock")
            .push((spec.clone(), content.clone()));
        self.record(format!("create:{}", *next_id));
        Ok(WindowId(*next_id))
    }

    fn show(&self, id: WindowId) -> Result<(), WindowError> {
        self.record(format!("show:{}", id.0));
        Ok(())
    }

    fn focus(&self, id: WindowId) -> Result<(), WindowError> {
        self.record(format!("focus:{}", id.0));
        Ok(())
    }

    fn maximize(&self, id: WindowId) -> Result<(), WindowError> {
        self.record(format!("maximize:{}", id.0));
        Ok(())
    }

    fn minimize(&self, id: WindowId) -> Result<(), WindowError> {
        self.set_minimized(true);
        self.record(format!("minimize:{}", id.0));
        Ok(())
    }

    fn restore(&self, id: WindowId) -> Result<(), WindowError> {
        self.set_minimized(false);
        self.record(format!("restore:{}", id.0));
        Ok(())
    }

    fn is_minimized(&self, _id: WindowId) -> Result<bool, WindowError> {
        Ok(*self.minimized.lock().expect("minimized lock"))
    }
}

#[derive(Debug, Default)]
pub struct RecordingControl {
    pub quits: Mutex<usize>,
    pub fail: Mutex<Option<String>>,
}

impl RecordingControl {
    pub fn quits(&self) -> usize {
        *self.quits.lock().expect("quits lock")
    }
}

impl AppControl for RecordingControl {
    fn quit(&self) -> Result<(), ControlError> {
        *self.quits.lock().expect("quits lock") += 1;
        match self.fail.lock().expect("fail lock").clone() {
            Some(message) => Err(ControlError::Quit(message)),
            None => Ok(()),
        }
    }
}

/// Settings store returning a fixed map, or a read failure.
#[derive(Debug)]
pub struct FixedSettings {
    pub items: Result<Map<String, Value>, SettingsError>,
}

impl SettingsStore for FixedSettings {
    fn get_items(&self, keys: &[&str]) -> Result<Map<String, Value>, SettingsError> {
        let items = self.items.clone()?;
        Ok(items
            .into_iter()
            .filter(|(key, _)| keys.contains(&key.as_str()))
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct RecordingUpdateHandle {
    pub calls: Mutex<Vec<String>>,
    pub fail_init: Mutex<Option<String>>,
    pub fail_check: Mutex<Option<String>>,
}

impl RecordingUpdateHandle {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn checks(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.as_str() == "check")
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

impl UpdateHandle for RecordingUpdateHandle {
    fn init(&self) -> Result<(), UpdateError> {
        self.record("init".to_string());
        match self.fail_init.lock().expect("fail lock").clone() {
            Some(message) => Err(UpdateError::Init(message)),
            None => Ok(()),
        }
    }

    fn check_for_updates(&self) -> Result<(), UpdateError> {
        self.record("check".to_string());
        match self.fail_check.lock().expect("fail lock").clone() {
            Some(message) => Err(UpdateError::Check(message)),
            None => Ok(()),
        }
    }

    fn bind_window(&self, window: Option<WindowId>) {
        match window {
            Some(id) => self.record(format!("bind:{}", id.0)),
            None => self.record("unbind".to_string()),
        }
    }
}

/// Provider that always hands out the same recording handle.
#[derive(Debug, Default)]
pub struct RecordingUpdates {
    pub handle: Arc<RecordingUpdateHandle>,
    pub created_for: Mutex<Vec<WindowId>>,
}

impl RecordingUpdates {
    pub fn created_for(&self) -> Vec<WindowId> {
        self.created_for.lock().expect("created lock").clone()
    }
}

impl UpdateProvider for RecordingUpdates {
    fn create_handle(&self, window: WindowId) -> Arc<dyn UpdateHandle> {
        self.created_for.lock().expect("created lock").push(window);
        self.handle.clone()
    }
}

#[derive(Debug, Default)]
pub struct RecordingMenu {
    pub built_for: Mutex<Vec<WindowId>>,
    pub fail: Mutex<Option<String>>,
}

impl RecordingMenu {
    pub fn built_for(&self) -> Vec<WindowId> {
        self.built_for.lock().expect("menu lock").clone()
    }
}

impl MenuBuilder for RecordingMenu {
    fn build_menu(&self, window: WindowId, _updates: Arc<dyn UpdateHandle>) -> Result<(), MenuError> {
        self.built_for.lock().expect("menu lock").push(window);
        match self.fail.lock().expect("fail lock").clone() {
            Some(message) => Err(MenuError::Build(message)),
            None => Ok(()),
        }
    }
}

/// Timer that only fires when a test says so.
#[derive(Debug, Default)]
pub struct ManualTimer {
    pub scheduled: Mutex<Vec<(TimerToken, Duration)>>,
    pub cancelled: Mutex<Vec<TimerToken>>,
    next: Mutex<u64>,
}

impl ManualTimer {
    pub fn scheduled(&self) -> Vec<(TimerToken, Duration)> {
        self.scheduled.lock().expect("scheduled lock").clone()
    }

    pub fn cancelled(&self) -> Vec<TimerToken> {
        self.cancelled.lock().expect("cancelled lock").clone()
    }

    pub fn last_token(&self) -> Option<TimerToken> {
        self.scheduled().last().map(|(token, _)| *token)
    }
}

impl Timer for ManualTimer {
    fn schedule(&self, delay: Duration) -> TimerToken {
        let mut next = self.next.lock().expect("next lock");
        *next += 1;
        let token = TimerToken(*next);
        self.scheduled
            .lock()
            .expect("scheduled lock")
            .push((token, delay));
        token
    }

    fn cancel(&self, token: TimerToken) {
        self.cancelled.lock().expect("cancelled lock").push(token);
    }
}

#[derive(Debug, Default)]
pub struct RecordingExtensions {
    pub installs: Mutex<Vec<bool>>,
    pub fail: Mutex<Option<String>>,
}

impl RecordingExtensions {
    pub fn installs(&self) -> Vec<bool> {
        self.installs.lock().expect("installs lock").clone()
    }
}

impl DevExtensions for RecordingExtensions {
    fn install(&self, force_download: bool) -> Result<(), ExtensionError> {
        self.installs
            .lock()
            .expect("installs lock")
            .push(force_download);
        match self.fail.lock().expect("fail lock").clone() {
            Some(message) => Err(ExtensionError::Install(message)),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub reports: Mutex<Vec<(LifecycleError, ErrorContext)>>,
}

impl RecordingReporter {
    pub fn reports(&self) -> Vec<(LifecycleError, ErrorContext)> {
        self.reports.lock().expect("reports lock").clone()
    }

    pub fn contexts(&self) -> Vec<ErrorContext> {
        self.reports()
            .into_iter()
            .map(|(_, context)| context)
            .collect()
    }
}

impl ErrorReporter for RecordingReporter {
    fn error(&self, error: &LifecycleError, context: ErrorContext) {
        self.reports
            .lock()
            .expect("reports lock")
            .push((error.clone(), context));
    }
}

/// Every collaborator, kept concrete so tests can inspect them.
pub struct Harness {
    pub lock: Arc<FakeLock>,
    pub verifier: Arc<ScriptedVerifier>,
    pub host: Arc<RecordingHost>,
    pub control: Arc<RecordingControl>,
    pub settings: Arc<FixedSettings>,
    pub updates: Arc<RecordingUpdates>,
    pub menu: Arc<RecordingMenu>,
    pub timer: Arc<ManualTimer>,
    pub extensions: Arc<RecordingExtensions>,
    pub reporter: Arc<RecordingReporter>,
}

impl Harness {
    /// Lock acquired, profile already valid, no stored settings.
    pub fn bootable() -> Self {
        Self::with_verifier(ScriptedVerifier::new(true, true))
    }

    /// Lock acquired, profile cannot be verified.
    pub fn not_bootable() -> Self {
        Self::with_verifier(ScriptedVerifier::new(false, false))
    }

    pub fn with_verifier(verifier: ScriptedVerifier) -> Self {
        Self {
            lock: Arc::new(FakeLock {
                acquired: true,
                attempts: Mutex::new(0),
            }),
            verifier: Arc::new(verifier),
            host: Arc::new(RecordingHost::default()),
            control: Arc::new(RecordingControl::default()),
            settings: Arc::new(FixedSettings {
                items: Ok(Map::new()),
            }),
            updates: Arc::new(RecordingUpdates::default()),
            menu: Arc::new(RecordingMenu::default()),
            timer: Arc::new(ManualTimer::default()),
            extensions: Arc::new(RecordingExtensions::default()),
            reporter: Arc::new(RecordingReporter::default()),
        }
    }

    pub fn with_lock(mut self, acquired: bool) -> Self {
        self.lock = Arc::new(FakeLock {
            acquired,
            attempts: Mutex::new(0),
        });
        self
    }

    pub fn with_settings(mut self, items: Result<Map<String, Value>, SettingsError>) -> Self {
        self.settings = Arc::new(FixedSettings { items });
        self
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            instance_lock: self.lock.clone(),
            boot_verifier: self.verifier.clone(),
            window_host: self.host.clone(),
            app_control: self.control.clone(),
            settings: self.settings.clone(),
            updates: self.updates.clone(),
            menu: self.menu.clone(),
            timer: self.timer.clone(),
            dev_extensions: self.extensions.clone(),
            reporter: self.reporter.clone(),
        }
    }

    pub fn lifecycle(&self, config: LaunchConfig) -> Lifecycle {
        Lifecycle::new(config, self.collaborators())
    }

    /// Starts a lifecycle and delivers `Ready`.
    pub fn launch(&self, config: LaunchConfig) -> Lifecycle {
        let mut lifecycle = self.lifecycle(config);
        lifecycle.start();
        lifecycle.dispatch(mtpdesk_app::Signal::Ready);
        lifecycle
    }
}

/// Settings map with the auto-update flag set to `value`.
pub fn update_flag(value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(
        mtpdesk_core::ENABLE_AUTO_UPDATE_CHECK_KEY.to_string(),
        value,
    );
    map
}
