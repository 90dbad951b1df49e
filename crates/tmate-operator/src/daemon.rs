// ABOUTME: Daemon controller: writes the systemd unit, starts it, and waits for it to run.
// ABOUTME: Also reports daemon status and prunes stopped containers.

use crate::error::{DaemonError, DockerError};
use crate::host::{ContainerRuntime, HostFs, ServiceSupervisor};
use crate::settings::Settings;
use crate::state::BindAddress;
use crate::templates::{render_unit, UnitParams};
use crate::wait::{wait_until, WaitError};
use async_trait::async_trait;
use std::sync::Arc;

/// `systemctl status` exit code for a unit that is loaded but not active.
pub const UNIT_INACTIVE_EXIT_CODE: i32 = 3;

const UNIT_FILE_MODE: u32 = 0o644;

/// Point-in-time daemon state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonStatus {
    pub running: bool,
    pub status_text: String,
}

/// Operations the health reconciler needs from the daemon.
#[async_trait]
pub trait Daemon: Send + Sync {
    /// Write the unit, (re)start it, and wait until it reports running.
    async fn start(&self, address: &BindAddress) -> Result<(), DaemonError>;

    async fn status(&self) -> Result<DaemonStatus, DaemonError>;

    async fn remove_stopped_containers(&self) -> Result<(), DockerError>;
}

/// Drives the tmate-ssh-server unit through the host's service supervisor.
pub struct DaemonController {
    settings: Settings,
    supervisor: Arc<dyn ServiceSupervisor>,
    runtime: Arc<dyn ContainerRuntime>,
    fs: Arc<dyn HostFs>,
}

impl DaemonController {
    pub fn new(
        settings: Settings,
        supervisor: Arc<dyn ServiceSupervisor>,
        runtime: Arc<dyn ContainerRuntime>,
        fs: Arc<dyn HostFs>,
    ) -> Self {
        Self {
            settings,
            supervisor,
            runtime,
            fs,
        }
    }

    fn unit(&self) -> &str {
        &self.settings.service_name
    }

    async fn write_unit(&self, address: &BindAddress) -> Result<(), DaemonError> {
        let address = address.to_string();
        let keys_dir = self.settings.keys_dir();
        let contents = render_unit(&UnitParams {
            service_name: &self.settings.service_name,
            image: &self.settings.image,
            work_dir: &self.settings.work_dir,
            keys_dir: &keys_dir,
            port: self.settings.port,
            address: &address,
        });

        let path = &self.settings.unit_path;
        self.fs
            .write_file(path, &contents, UNIT_FILE_MODE)
            .await
            .map_err(|e| DaemonError::WriteUnit {
                path: path.clone(),
                source: e,
            })?;
        tracing::debug!(path = %path.display(), "Wrote unit file");
        Ok(())
    }
}

#[async_trait]
impl Daemon for DaemonController {
    async fn start(&self, address: &BindAddress) -> Result<(), DaemonError> {
        let unit = self.unit();

        self.write_unit(address).await?;

        self.supervisor
            .daemon_reload()
            .await
            .map_err(DaemonError::Reload)?;

        self.supervisor
            .enable(unit)
            .await
            .map_err(|e| DaemonError::Enable {
                unit: unit.to_string(),
                source: e,
            })?;

        self.supervisor
            .restart(unit)
            .await
            .map_err(|e| DaemonError::Start {
                unit: unit.to_string(),
                source: e,
            })?;
        tracing::info!(unit, %address, "Started daemon, waiting for it to run");

        let this = self;
        let timeout = self.settings.startup_timeout();
        wait_until(
            move || async move { this.status().await.map(|status| status.running) },
            timeout,
            self.settings.check_interval(),
        )
        .await
        .map_err(|e| match e {
            WaitError::TimedOut { timeout } => DaemonError::TimedOut { timeout },
            WaitError::Check(e) => e,
        })?;

        tracing::info!(unit, "Daemon is running");
        Ok(())
    }

    async fn status(&self) -> Result<DaemonStatus, DaemonError> {
        let unit = self.unit();
        let output = self
            .supervisor
            .status(unit)
            .await
            .map_err(|e| DaemonError::StatusCommand {
                unit: unit.to_string(),
                source: e,
            })?;

        match output.code {
            Some(0) => Ok(DaemonStatus {
                running: true,
                status_text: output.stdout,
            }),
            Some(UNIT_INACTIVE_EXIT_CODE) => Ok(DaemonStatus {
                running: false,
                status_text: output.stdout,
            }),
            code => {
                tracing::error!(unit, ?code, stderr = %output.stderr.trim(), "Status check failed");
                Err(DaemonError::StatusCheck {
                    unit: unit.to_string(),
                    code,
                })
            }
        }
    }

    async fn remove_stopped_containers(&self) -> Result<(), DockerError> {
        self.runtime
            .prune_stopped_containers()
            .await
            .map_err(DockerError)
    }
}
