// ABOUTME: Error taxonomy for the provisioning and supervision steps.
// ABOUTME: One thiserror enum per failure kind; lifecycle hooks wrap them all.

use crate::host::{CommandError, PackageError};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tmate_ssh::{IncompleteInitError, KeyError};

/// Installing packages or preparing the container runtime failed.
#[derive(Error, Debug)]
pub enum DependencySetupError {
    #[error("failed to update package index: {0}")]
    Update(#[source] PackageError),

    #[error("failed to install {package}: {source}")]
    Install {
        package: String,
        #[source]
        source: PackageError,
    },

    #[error("failed to write container runtime proxy config {path}: {source}")]
    ProxyConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render container runtime proxy config: {0}")]
    RenderProxyConfig(#[source] serde_json::Error),

    #[error("failed to grant {user} access to group {group}: {source}")]
    RuntimeGroup {
        user: String,
        group: String,
        #[source]
        source: CommandError,
    },
}

/// Writing or running the key creation script failed.
#[derive(Error, Debug)]
pub enum KeyInstallError {
    #[error("failed to write key script {path}: {source}")]
    WriteScript {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to set ownership of {path}: {source}")]
    Ownership {
        path: PathBuf,
        #[source]
        source: CommandError,
    },

    #[error("failed to generate keys: {0}")]
    Generate(#[source] CommandError),
}

/// The daemon could not be started or its state could not be determined.
#[derive(Error, Debug)]
pub enum DaemonError {
    #[error("failed to write unit file {path}: {source}")]
    WriteUnit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start: {0}")]
    Reload(#[source] CommandError),

    #[error("failed to enable {unit}: {source}")]
    Enable {
        unit: String,
        #[source]
        source: CommandError,
    },

    #[error("failed to start {unit}: {source}")]
    Start {
        unit: String,
        #[source]
        source: CommandError,
    },

    #[error("timed out waiting for service to start after {timeout:?}")]
    TimedOut { timeout: Duration },

    #[error("failed to check status of {unit}: {}", describe_exit(*.code))]
    StatusCheck { unit: String, code: Option<i32> },

    #[error("failed to check status of {unit}: {source}")]
    StatusCommand {
        unit: String,
        #[source]
        source: CommandError,
    },
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Container cleanup failed. Never escapes reconciliation.
#[derive(Error, Debug)]
#[error("failed to remove stopped containers: {0}")]
pub struct DockerError(#[source] pub CommandError);

/// Fingerprints cannot be produced right now.
///
/// Hides whether keys are missing or present but unusable.
#[derive(Error, Debug)]
pub enum FingerprintError {
    #[error("failed to generate fingerprints: {0}")]
    NotInitialized(#[source] IncompleteInitError),

    #[error("failed to generate fingerprints: {0}")]
    Key(#[source] KeyError),
}

impl From<IncompleteInitError> for FingerprintError {
    fn from(err: IncompleteInitError) -> Self {
        FingerprintError::NotInitialized(err)
    }
}

impl From<KeyError> for FingerprintError {
    fn from(err: KeyError) -> Self {
        FingerprintError::Key(err)
    }
}

/// Reading or writing the unit model's state failed.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("unit state I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid unit state in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid relation id '{id}'")]
    InvalidRelationId { id: String },
}

/// Any failure of a lifecycle hook.
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error(transparent)]
    Dependencies(#[from] DependencySetupError),

    #[error(transparent)]
    Keys(#[from] KeyInstallError),

    #[error(transparent)]
    Daemon(#[from] DaemonError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Model(#[from] ModelError),
}
