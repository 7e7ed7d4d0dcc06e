//! Integration tests for environment-driven launch configuration.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use mtpdesk_app::config::{
    DEFAULT_ENTRY_URL, ENV_DEBUG_PROD, ENV_ENTRY_URL, ENV_LOG_FILE, ENV_LOG_LEVEL,
    ENV_PROFILE_DIR, ENV_RUN_PROFILE, ENV_START_MINIMIZED, ENV_UPDATE_CHECK_DELAY_MS,
    ENV_UPGRADE_EXTENSIONS,
};
use mtpdesk_app::{ConfigError, LaunchConfig};
use mtpdesk_core::{AUTO_UPDATE_CHECK_FIREUP_DELAY, RunProfile};

fn resolve(pairs: &[(&str, &str)]) -> Result<LaunchConfig, ConfigError> {
    let env: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
        .collect();
    LaunchConfig::from_lookup(|key| env.get(key).cloned())
}

#[test]
fn launch_config_defaults_to_production_with_standard_delay() {
    let config = resolve(&[]).expect("empty env should resolve");

    assert_eq!(config.profile, RunProfile::Production);
    assert_eq!(config.update_check_delay, AUTO_UPDATE_CHECK_FIREUP_DELAY);
    assert_eq!(config.entry_url, DEFAULT_ENTRY_URL);
    assert_eq!(config.log.level, "info");
    assert_eq!(config.log.file, None);
    assert!(!config.start_minimized);
    assert!(!config.upgrade_extensions);
    assert!(config.profile_dir.ends_with("mtpdesk"));
}

#[test]
fn launch_config_debug_prod_only_upgrades_production() {
    let production = resolve(&[(ENV_DEBUG_PROD, "true")]).expect("resolve");
    assert_eq!(production.profile, RunProfile::DebugProduction);

    let development =
        resolve(&[(ENV_RUN_PROFILE, "development"), (ENV_DEBUG_PROD, "true")]).expect("resolve");
    assert_eq!(development.profile, RunProfile::Development);

    let not_true = resolve(&[(ENV_DEBUG_PROD, "1")]).expect("resolve");
    assert_eq!(not_true.profile, RunProfile::Production);
}

#[test]
fn launch_config_flags_treat_false_words_as_off() {
    for (raw, expected) in [("1", true), ("yes", true), ("false", false), ("0", false), ("", false)] {
        let config = resolve(&[(ENV_START_MINIMIZED, raw), (ENV_UPGRADE_EXTENSIONS, raw)])
            .expect("resolve");
        assert_eq!(config.start_minimized, expected, "START_MINIMIZED={raw:?}");
        assert_eq!(config.upgrade_extensions, expected, "UPGRADE_EXTENSIONS={raw:?}");
    }
}

#[test]
fn launch_config_overrides_paths_delay_and_logging() {
    let config = resolve(&[
        (ENV_UPDATE_CHECK_DELAY_MS, " 250 "),
        (ENV_PROFILE_DIR, "/tmp/mtpdesk-profile"),
        (ENV_ENTRY_URL, "http://localhost:1212/dist/index.html"),
        (ENV_LOG_LEVEL, "debug"),
        (ENV_LOG_FILE, "/tmp/mtpdesk.log"),
    ])
    .expect("resolve");

    assert_eq!(config.update_check_delay, Duration::from_millis(250));
    assert_eq!(config.profile_dir, PathBuf::from("/tmp/mtpdesk-profile"));
    assert_eq!(config.entry_url, "http://localhost:1212/dist/index.html");
    assert_eq!(config.log.level, "debug");
    assert_eq!(config.log.file, Some(PathBuf::from("/tmp/mtpdesk.log")));
}

#[test]
fn launch_config_rejects_bad_values() {
    assert!(matches!(
        resolve(&[(ENV_UPDATE_CHECK_DELAY_MS, "soon")]),
        Err(ConfigError::InvalidNumber { key, .. }) if key == ENV_UPDATE_CHECK_DELAY_MS
    ));
    assert!(matches!(
        resolve(&[(ENV_UPDATE_CHECK_DELAY_MS, "-5")]),
        Err(ConfigError::InvalidNumber { .. })
    ));
    assert_eq!(
        resolve(&[(ENV_RUN_PROFILE, "staging")]),
        Err(ConfigError::InvalidProfile("staging".to_string()))
    );
    assert!(matches!(
        resolve(&[(ENV_ENTRY_URL, "not a url")]),
        Err(ConfigError::InvalidUrl { .. })
    ));
}
