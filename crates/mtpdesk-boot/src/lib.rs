#![warn(missing_docs)]
//! # mtpdesk-boot
//!
//! ## Purpose
//! Decides, once at process start, whether the environment is usable.
//!
//! ## Responsibilities
//! - Define the [`BootVerifier`] seam used by the lifecycle.
//! - Run the quick-check, then init-and-verify sequence in
//!   [`determine_bootable`].
//! - Provide [`ProfileFiles`], the file-backed verifier used by the desktop
//!   binary.
//!
//! ## Data flow
//! Lifecycle start -> [`determine_bootable`] -> verifier calls ->
//! [`BootDecision`] stored in the process context.
//!
//! ## Error model
//! Verifier failures never escape as `Err`. They are folded into
//! [`BootDecision::VerificationFailed`] so the caller has one channel to
//! branch on. A clean `false` from verification is `NotBootable`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use mtpdesk_core::BootDecision;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Checks and prepares the on-disk boot profile.
pub trait BootVerifier: Send + Sync {
    /// Fast read-only check of an existing installation.
    fn quick_verify(&self) -> Result<bool, BootError>;

    /// Creates missing profile state. Must be idempotent.
    fn init(&self) -> Result<(), BootError>;

    /// Full check after [`BootVerifier::init`].
    fn verify(&self) -> Result<bool, BootError>;
}

/// Runs boot verification and returns the permanent boot decision.
///
/// A ready existing installation short-circuits; `init` and `verify` are only
/// called for a fresh or damaged profile.
pub fn determine_bootable(verifier: &dyn BootVerifier) -> BootDecision {
    match run_verifier(verifier) {
        Ok(true) => {
            info!("boot profile verified");
            BootDecision::Bootable
        }
        Ok(false) => {
            warn!("boot profile is not usable");
            BootDecision::NotBootable
        }
        Err(error) => BootDecision::VerificationFailed(error.to_string()),
    }
}

fn run_verifier(verifier: &dyn BootVerifier) -> Result<bool, BootError> {
    if verifier.quick_verify()? {
        debug!("existing boot profile passed quick verification");
        return Ok(true);
    }

    debug!("quick verification failed; initializing boot profile");
    verifier.init()?;
    verifier.verify()
}

/// One required profile file and the JSON written when it is missing.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileFile {
    /// File name relative to the profile directory.
    pub name: String,
    /// Contents written by [`BootVerifier::init`] for a fresh profile.
    pub default_contents: Value,
}

impl ProfileFile {
    /// Creates a profile file entry.
    pub fn new(name: impl Into<String>, default_contents: Value) -> Self {
        Self {
            name: name.into(),
            default_contents,
        }
    }
}

/// File-backed verifier: a directory of JSON files that must all parse.
#[derive(Debug, Clone)]
pub struct ProfileFiles {
    dir: PathBuf,
    files: Vec<ProfileFile>,
}

impl ProfileFiles {
    /// Creates a verifier over an explicit file list.
    pub fn new(dir: impl Into<PathBuf>, files: Vec<ProfileFile>) -> Self {
        Self {
            dir: dir.into(),
            files,
        }
    }

    /// Creates the default desktop profile (`settings.json`, `app-state.json`).
    pub fn default_profile(dir: impl Into<PathBuf>) -> Self {
        Self::new(
            dir,
            vec![
                ProfileFile::new("settings.json", json!({})),
                ProfileFile::new("app-state.json", json!({ "version": 1 })),
            ],
        )
    }

    /// Returns the profile directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the absolute path of one profile file.
    pub fn path_of(&self, file: &ProfileFile) -> PathBuf {
        self.dir.join(&file.name)
    }

    fn all_files_valid(&self) -> Result<bool, BootError> {
        for file in &self.files {
            let path = self.path_of(file);
            let raw = match fs::read(&path) {
                Ok(raw) => raw,
                Err(error) if error.kind() == io::ErrorKind::NotFound => {
                    debug!(path = %path.display(), "profile file missing");
                    return Ok(false);
                }
                Err(source) => return Err(BootError::Io { path, source }),
            };

            if serde_json::from_slice::<Value>(&raw).is_err() {
                warn!(path = %path.display(), "profile file is not valid JSON");
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl BootVerifier for ProfileFiles {
    fn quick_verify(&self) -> Result<bool, BootError> {
        if !self.dir.is_dir() {
            return Ok(false);
        }
        self.all_files_valid()
    }

    fn init(&self) -> Result<(), BootError> {
        fs::create_dir_all(&self.dir).map_err(|source| BootError::Io {
            path: self.dir.clone(),
            source,
        })?;

        for file in &self.files {
            let path = self.path_of(file);
            if path.exists() {
                continue;
            }
            let contents = serde_json::to_vec_pretty(&file.default_contents)?;
            fs::write(&path, contents).map_err(|source| BootError::Io {
                path: path.clone(),
                source,
            })?;
            info!(path = %path.display(), "created profile file");
        }
        Ok(())
    }

    fn verify(&self) -> Result<bool, BootError> {
        if !self.dir.is_dir() {
            return Err(BootError::Profile(format!(
                "profile directory {} does not exist after init",
                self.dir.display()
            )));
        }
        self.all_files_valid()
    }
}

/// Boot verifier errors.
#[derive(Debug, Error)]
pub enum BootError {
    /// Filesystem failure on a profile path.
    #[error("profile io failure at {path}: {source}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
    /// Default contents could not be encoded.
    #[error("profile codec failure: {0}")]
    Codec(#[from] serde_json::Error),
    /// Profile state is inconsistent.
    #[error("profile invalid: {0}")]
    Profile(String),
}
