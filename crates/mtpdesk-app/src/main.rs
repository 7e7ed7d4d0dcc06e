#![warn(missing_docs)]
//! # mtpdesk binary
//!
//! Headless desktop entry point: runs the full lifecycle against in-memory
//! windows that close after `MTPDESK_HEADLESS_LINGER_MS`.

use std::process::ExitCode;
use std::sync::Arc;

use mtpdesk_app::headless::{HeadlessHost, HeadlessMenu, LogOnlyUpdates, NoDevExtensions, QuitFlag};
use mtpdesk_app::{
    Collaborators, LaunchConfig, Lifecycle, LifecyclePhase, Signal, ThreadTimer, TracingReporter,
    init_logging, install_panic_hook, run_event_loop, signal_queue,
};
use mtpdesk_boot::ProfileFiles;
use mtpdesk_instance::LockFileInstance;
use mtpdesk_update::JsonFileSettings;
use tracing::info;

/// CLI entry point.
fn main() -> ExitCode {
    let config = match LaunchConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("invalid mtpdesk configuration: {error}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(error) = init_logging(&config.log) {
        eprintln!("failed to initialize logging: {error}");
        return ExitCode::FAILURE;
    }

    let reporter = Arc::new(TracingReporter);
    if config.profile.routes_process_errors() {
        install_panic_hook(reporter.clone());
    }

    let (sender, signals) = signal_queue();
    let host = Arc::new(HeadlessHost::new(sender.clone()));
    let linger = config.headless_linger;
    let collaborators = Collaborators {
        instance_lock: Arc::new(LockFileInstance::in_dir(&config.profile_dir)),
        boot_verifier: Arc::new(ProfileFiles::default_profile(&config.profile_dir)),
        window_host: host.clone(),
        app_control: Arc::new(QuitFlag::new()),
        settings: Arc::new(JsonFileSettings::in_profile(&config.profile_dir)),
        updates: Arc::new(LogOnlyUpdates),
        menu: Arc::new(HeadlessMenu),
        timer: Arc::new(ThreadTimer::new(sender.clone())),
        dev_extensions: Arc::new(NoDevExtensions),
        reporter,
    };

    let mut lifecycle = Lifecycle::new(config, collaborators);
    lifecycle.start();
    sender.post(Signal::Ready);
    host.close_after(linger);
    let exit = run_event_loop(&mut lifecycle, &signals, Some(linger));

    let phase = lifecycle.phase();
    info!(?exit, ?phase, "event loop finished");
    match phase {
        LifecyclePhase::Failed => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    }
}
