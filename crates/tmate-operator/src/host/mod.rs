// ABOUTME: Capability traits for the host primitives the operator drives.
// ABOUTME: Package manager, accounts, service supervisor, container runtime, filesystem, scripts.

mod command;
mod system;

pub use system::{Apt, DockerCli, LocalFs, ShellScripts, Systemctl, UserAccounts};

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Captured result of an external command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// An external command could not be run or exited unsuccessfully.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {code:?}: {stderr}")]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
}

/// Package manager failure, split so callers can tell a missing package apart.
#[derive(Error, Debug)]
pub enum PackageError {
    #[error("package {package} not found")]
    NotFound { package: String },

    #[error("package error for {package}: {source}")]
    Package {
        package: String,
        #[source]
        source: CommandError,
    },

    #[error("failed to update package index: {0}")]
    Update(#[source] CommandError),
}

#[async_trait]
pub trait PackageManager: Send + Sync {
    /// Refresh the package index.
    async fn update(&self) -> Result<(), PackageError>;

    /// Ensure `package` is installed. Already installed packages succeed silently.
    async fn install(&self, package: &str) -> Result<(), PackageError>;
}

#[async_trait]
pub trait Accounts: Send + Sync {
    /// Create a system group unless it already exists.
    async fn ensure_group(&self, group: &str) -> Result<(), CommandError>;

    async fn add_user_to_group(&self, user: &str, group: &str) -> Result<(), CommandError>;
}

/// Service supervision primitive (systemd on real hosts).
#[async_trait]
pub trait ServiceSupervisor: Send + Sync {
    async fn daemon_reload(&self) -> Result<(), CommandError>;

    async fn enable(&self, unit: &str) -> Result<(), CommandError>;

    /// Start the unit, restarting it if it is already running.
    async fn restart(&self, unit: &str) -> Result<(), CommandError>;

    /// Raw status query. A non-zero exit is returned as output, not as an
    /// error, so the caller can interpret the exit code.
    async fn status(&self, unit: &str) -> Result<CommandOutput, CommandError>;
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Remove every stopped container.
    async fn prune_stopped_containers(&self) -> Result<(), CommandError>;
}

#[async_trait]
pub trait HostFs: Send + Sync {
    async fn create_dir_all(&self, path: &Path) -> std::io::Result<()>;

    /// Write `contents` to `path` and set its permission bits to `mode`.
    async fn write_file(&self, path: &Path, contents: &str, mode: u32) -> std::io::Result<()>;

    async fn chown(&self, path: &Path, user: &str, group: &str) -> Result<(), CommandError>;
}

#[async_trait]
pub trait ScriptRunner: Send + Sync {
    /// Execute an executable script, failing on a non-zero exit.
    async fn run(&self, script: &Path) -> Result<CommandOutput, CommandError>;
}

/// The set of host capabilities handed to the operator.
#[derive(Clone)]
pub struct Host {
    pub packages: Arc<dyn PackageManager>,
    pub accounts: Arc<dyn Accounts>,
    pub supervisor: Arc<dyn ServiceSupervisor>,
    pub runtime: Arc<dyn ContainerRuntime>,
    pub fs: Arc<dyn HostFs>,
    pub scripts: Arc<dyn ScriptRunner>,
}

impl Host {
    /// Capabilities backed by apt, systemd, docker, and the local filesystem.
    pub fn system() -> Self {
        Self {
            packages: Arc::new(Apt),
            accounts: Arc::new(UserAccounts),
            supervisor: Arc::new(Systemctl),
            runtime: Arc::new(DockerCli),
            fs: Arc::new(LocalFs),
            scripts: Arc::new(ShellScripts),
        }
    }
}
