// ABOUTME: Operator settings for paths, accounts, packages, and timing.
// ABOUTME: Loaded from TOML; every field has a default so a missing file means stock layout.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tmate_ssh::KeyMaterial;

/// Port tmate-ssh-server listens on.
pub const PORT: u16 = 10022;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// systemd unit name (without `.service`), also used as the container name
    pub service_name: String,

    /// TCP port the relay listens on and clients connect to
    pub port: u16,

    /// Directory holding the key creation script and keys
    pub work_dir: PathBuf,

    /// Host keys directory. Defaults to `<work_dir>/keys`
    pub keys_dir: Option<PathBuf>,

    /// Key creation script path. Defaults to `<work_dir>/create_keys.sh`
    pub create_keys_script: Option<PathBuf>,

    /// Where the systemd unit is written
    pub unit_path: PathBuf,

    /// Container runtime daemon config that carries proxy settings
    pub docker_daemon_config: PathBuf,

    /// Account owning the work directory and running the container
    pub user: String,
    pub group: String,

    /// Group granting unprivileged access to the container runtime
    pub runtime_group: String,

    /// Packages installed on every install hook
    pub packages: Vec<String>,

    /// Container image run by the unit
    pub image: String,

    /// Upper bound on waiting for the unit to report active
    pub startup_timeout_secs: u64,

    /// Interval between status checks while waiting
    pub check_interval_secs: u64,

    /// Directory for hook state (unit status, opened ports, consumer data)
    pub state_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_name: "tmate-ssh-server".to_string(),
            port: PORT,
            work_dir: PathBuf::from("/srv/tmate-ssh-server"),
            keys_dir: None,
            create_keys_script: None,
            unit_path: PathBuf::from("/etc/systemd/system/tmate-ssh-server.service"),
            docker_daemon_config: PathBuf::from("/etc/docker/daemon.json"),
            user: "_daemon_".to_string(),
            group: "_daemon_".to_string(),
            runtime_group: "docker".to_string(),
            packages: vec!["openssh-client".to_string(), "docker.io".to_string()],
            image: "ghcr.io/canonical/tmate-ssh-server:latest".to_string(),
            startup_timeout_secs: 600,
            check_interval_secs: 10,
            state_dir: PathBuf::from("/var/lib/tmate-operator"),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings from {}", path.display()))?;
        Ok(settings)
    }

    /// Load settings from `path`, or defaults if the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "No settings file, using defaults");
            Ok(Self::default())
        }
    }

    /// Default settings file path (~/.config/tmate-operator/config.toml, or /etc when unset)
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("/etc"))
            .join("tmate-operator")
            .join("config.toml")
    }

    pub fn keys_dir(&self) -> PathBuf {
        self.keys_dir
            .clone()
            .unwrap_or_else(|| self.work_dir.join("keys"))
    }

    pub fn create_keys_script(&self) -> PathBuf {
        self.create_keys_script
            .clone()
            .unwrap_or_else(|| self.work_dir.join("create_keys.sh"))
    }

    pub fn key_material(&self) -> KeyMaterial {
        KeyMaterial::new(self.keys_dir())
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }
}
