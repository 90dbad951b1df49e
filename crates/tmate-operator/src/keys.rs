// ABOUTME: Key provisioner: renders the key creation script and runs it as the service user's file.
// ABOUTME: Also exposes fingerprint lookup mapped onto the operator's error type.

use crate::error::{FingerprintError, KeyInstallError};
use crate::host::{HostFs, ScriptRunner};
use crate::settings::Settings;
use crate::state::BindAddress;
use crate::templates::{render_key_script, KeyScriptParams};
use std::sync::Arc;
use tmate_ssh::{get_fingerprints, Fingerprints, Readiness};

const SCRIPT_MODE: u32 = 0o755;

pub struct KeyProvisioner {
    settings: Settings,
    fs: Arc<dyn HostFs>,
    scripts: Arc<dyn ScriptRunner>,
}

impl KeyProvisioner {
    pub fn new(settings: Settings, fs: Arc<dyn HostFs>, scripts: Arc<dyn ScriptRunner>) -> Self {
        Self {
            settings,
            fs,
            scripts,
        }
    }

    /// Generate the host keys for `address`.
    ///
    /// Existing keys are kept; the script only creates missing ones.
    pub async fn install_keys(&self, address: &BindAddress) -> Result<(), KeyInstallError> {
        let script = self.settings.create_keys_script();
        let keys_dir = self.settings.keys_dir();
        let host = address.to_string();
        let contents = render_key_script(&KeyScriptParams {
            keys_dir: &keys_dir,
            host: &host,
            port: self.settings.port,
        });

        let write_error = |e| KeyInstallError::WriteScript {
            path: script.clone(),
            source: e,
        };
        if let Some(parent) = script.parent() {
            self.fs.create_dir_all(parent).await.map_err(write_error)?;
        }
        self.fs
            .write_file(&script, &contents, SCRIPT_MODE)
            .await
            .map_err(write_error)?;

        self.fs
            .chown(&script, &self.settings.user, &self.settings.group)
            .await
            .map_err(|e| KeyInstallError::Ownership {
                path: script.clone(),
                source: e,
            })?;

        let output = self
            .scripts
            .run(&script)
            .await
            .map_err(KeyInstallError::Generate)?;
        tracing::debug!(output = %output.stdout.trim(), "Key script output");
        tracing::info!(keys_dir = %keys_dir.display(), "Host keys generated");
        Ok(())
    }
}

/// Fingerprints of the configured host keys, with missing keys reported as
/// `NotReady`.
pub fn fingerprints(settings: &Settings) -> Result<Readiness<Fingerprints>, tmate_ssh::KeyError> {
    get_fingerprints(&settings.key_material())
}

/// Fingerprints for boundary callers that cannot act on "not ready" separately.
pub fn require_fingerprints(settings: &Settings) -> Result<Fingerprints, FingerprintError> {
    match fingerprints(settings)? {
        Readiness::Ready(fingerprints) => Ok(fingerprints),
        Readiness::NotReady(missing) => Err(missing.into()),
    }
}
