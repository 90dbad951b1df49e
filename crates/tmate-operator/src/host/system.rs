// ABOUTME: Host capabilities backed by apt, systemd, docker, and the local filesystem.
// ABOUTME: Thin command wrappers; policy lives in the installer and daemon controller.

use super::command::{checked, run, run_checked, run_with_env};
use super::{
    Accounts, CommandError, CommandOutput, ContainerRuntime, HostFs, PackageError,
    PackageManager, ScriptRunner, ServiceSupervisor,
};
use async_trait::async_trait;
use std::path::Path;

const APT_GET: &str = "apt-get";
const APT_ENV: &[(&str, &str)] = &[("DEBIAN_FRONTEND", "noninteractive")];

/// apt exits 100 for most errors; the message tells "not found" apart.
const APT_NOT_FOUND_MARKERS: &[&str] = &["Unable to locate package", "has no installation candidate"];

pub struct Apt;

impl Apt {
    async fn is_installed(package: &str) -> bool {
        match run("dpkg-query", &["-W", "-f=${Status}", package]).await {
            Ok(output) => output.success() && output.stdout.contains("install ok installed"),
            Err(_) => false,
        }
    }
}

#[async_trait]
impl PackageManager for Apt {
    async fn update(&self) -> Result<(), PackageError> {
        let output = run_with_env(APT_GET, &["update", "-q"], APT_ENV)
            .await
            .map_err(PackageError::Update)?;
        checked(APT_GET, output).map_err(PackageError::Update)?;
        Ok(())
    }

    async fn install(&self, package: &str) -> Result<(), PackageError> {
        if Self::is_installed(package).await {
            tracing::debug!(package, "Package already installed");
            return Ok(());
        }

        let output = run_with_env(
            APT_GET,
            &["install", "-y", "-q", "--option=Dpkg::Options::=--force-confold", package],
            APT_ENV,
        )
        .await
        .map_err(|e| PackageError::Package {
            package: package.to_string(),
            source: e,
        })?;

        if !output.success()
            && APT_NOT_FOUND_MARKERS
                .iter()
                .any(|marker| output.stderr.contains(marker))
        {
            return Err(PackageError::NotFound {
                package: package.to_string(),
            });
        }

        checked(APT_GET, output).map_err(|e| PackageError::Package {
            package: package.to_string(),
            source: e,
        })?;
        tracing::info!(package, "Installed package");
        Ok(())
    }
}

pub struct UserAccounts;

#[async_trait]
impl Accounts for UserAccounts {
    async fn ensure_group(&self, group: &str) -> Result<(), CommandError> {
        if run("getent", &["group", group]).await?.success() {
            return Ok(());
        }
        run_checked("groupadd", &["--system", group]).await?;
        tracing::info!(group, "Created group");
        Ok(())
    }

    async fn add_user_to_group(&self, user: &str, group: &str) -> Result<(), CommandError> {
        run_checked("usermod", &["--append", "--groups", group, user]).await?;
        Ok(())
    }
}

pub struct Systemctl;

#[async_trait]
impl ServiceSupervisor for Systemctl {
    async fn daemon_reload(&self) -> Result<(), CommandError> {
        run_checked("systemctl", &["daemon-reload"]).await?;
        Ok(())
    }

    async fn enable(&self, unit: &str) -> Result<(), CommandError> {
        run_checked("systemctl", &["enable", unit]).await?;
        Ok(())
    }

    async fn restart(&self, unit: &str) -> Result<(), CommandError> {
        run_checked("systemctl", &["restart", unit]).await?;
        Ok(())
    }

    async fn status(&self, unit: &str) -> Result<CommandOutput, CommandError> {
        run("systemctl", &["status", "--no-pager", unit]).await
    }
}

pub struct DockerCli;

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn prune_stopped_containers(&self) -> Result<(), CommandError> {
        let output = run_checked("docker", &["container", "prune", "--force"]).await?;
        tracing::debug!(output = %output.stdout.trim(), "Pruned stopped containers");
        Ok(())
    }
}

pub struct LocalFs;

#[async_trait]
impl HostFs for LocalFs {
    async fn create_dir_all(&self, path: &Path) -> std::io::Result<()> {
        tokio::fs::create_dir_all(path).await
    }

    async fn write_file(&self, path: &Path, contents: &str, mode: u32) -> std::io::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        tokio::fs::write(path, contents).await?;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await
    }

    async fn chown(&self, path: &Path, user: &str, group: &str) -> Result<(), CommandError> {
        let owner = format!("{user}:{group}");
        let target = path.to_string_lossy().into_owned();
        run_checked("chown", &[owner.as_str(), target.as_str()]).await?;
        Ok(())
    }
}

pub struct ShellScripts;

#[async_trait]
impl ScriptRunner for ShellScripts {
    async fn run(&self, script: &Path) -> Result<CommandOutput, CommandError> {
        let program = script.to_string_lossy().into_owned();
        run_checked(&program, &[] as &[&str]).await
    }
}
