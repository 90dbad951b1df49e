// ABOUTME: Lifecycle hooks: install, update-status, consumer-joined, get-server-config.
// ABOUTME: Each hook runs to completion, defers when inputs are not ready, or fails.

use crate::action::{self, ActionFailure, ADDRESS_NOT_READY};
use crate::daemon::{Daemon, DaemonController};
use crate::error::LifecycleError;
use crate::host::Host;
use crate::installer::DependencyInstaller;
use crate::keys::{fingerprints, KeyProvisioner};
use crate::model::{UnitModel, UnitStatus};
use crate::publish::{publish, ConnectionProfile};
use crate::reconcile::{reconcile, ReconcileOutcome};
use crate::settings::Settings;
use crate::state::{BindAddress, ProvisioningState};
use std::collections::BTreeMap;
use std::sync::Arc;
use tmate_ssh::Readiness;

/// How a hook ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    Completed,
    /// Not ready yet; the hook should be retried later.
    Deferred(String),
}

/// Runs lifecycle hooks against a host and a unit model.
pub struct Operator {
    settings: Settings,
    installer: DependencyInstaller,
    keys: KeyProvisioner,
    daemon: Arc<dyn Daemon>,
    model: Arc<dyn UnitModel>,
}

impl Operator {
    pub fn new(settings: Settings, host: Host, model: Arc<dyn UnitModel>) -> Self {
        let installer = DependencyInstaller::new(
            settings.clone(),
            host.packages.clone(),
            host.accounts.clone(),
            host.fs.clone(),
        );
        let keys = KeyProvisioner::new(settings.clone(), host.fs.clone(), host.scripts.clone());
        let daemon = Arc::new(DaemonController::new(
            settings.clone(),
            host.supervisor.clone(),
            host.runtime.clone(),
            host.fs.clone(),
        ));
        Self::with_daemon(settings, installer, keys, daemon, model)
    }

    pub fn with_daemon(
        settings: Settings,
        installer: DependencyInstaller,
        keys: KeyProvisioner,
        daemon: Arc<dyn Daemon>,
        model: Arc<dyn UnitModel>,
    ) -> Self {
        Self {
            settings,
            installer,
            keys,
            daemon,
            model,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Provision the host and start the daemon.
    ///
    /// The address is checked once on entry; without it no step runs.
    pub async fn install(&self, state: &ProvisioningState) -> Result<HookOutcome, LifecycleError> {
        let Some(address) = &state.bound_address else {
            tracing::warn!("Bind address not ready, deferring install");
            return Ok(HookOutcome::Deferred(ADDRESS_NOT_READY.to_string()));
        };

        self.maintenance("Installing packages.").await?;
        self.installer
            .install_dependencies(state.proxy_config.as_ref())
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to install dependencies"))?;

        self.maintenance("Generating keys.").await?;
        self.keys
            .install_keys(address)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to generate keys"))?;

        self.maintenance("Starting tmate-ssh-server daemon.").await?;
        self.daemon
            .start(address)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to start daemon"))?;

        self.model.open_port(self.settings.port).await?;
        self.publish_if_ready(address).await;

        self.model.set_status(UnitStatus::Active).await?;
        tracing::info!(%address, port = self.settings.port, "Install complete");
        Ok(HookOutcome::Completed)
    }

    /// Periodic health check: repair a stopped daemon and refresh consumers.
    pub async fn update_status(
        &self,
        state: &ProvisioningState,
    ) -> Result<HookOutcome, LifecycleError> {
        let outcome = reconcile(self.daemon.as_ref(), state.bound_address.as_ref())
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Reconciliation failed"))?;

        let Some(address) = &state.bound_address else {
            self.model
                .set_status(UnitStatus::Waiting(ADDRESS_NOT_READY.to_string()))
                .await?;
            return Ok(HookOutcome::Completed);
        };

        if outcome == ReconcileOutcome::Restarted {
            tracing::info!("Daemon recovered");
        }
        self.publish_if_ready(address).await;
        self.model.set_status(UnitStatus::Active).await?;
        Ok(HookOutcome::Completed)
    }

    /// A consumer joined: hand it the connection details, or defer until keys exist.
    pub async fn consumer_joined(
        &self,
        state: &ProvisioningState,
    ) -> Result<HookOutcome, LifecycleError> {
        let Some(address) = &state.bound_address else {
            tracing::warn!("Bind address not ready, deferring consumer");
            return Ok(HookOutcome::Deferred(ADDRESS_NOT_READY.to_string()));
        };

        match fingerprints(&self.settings)
            .inspect_err(|e| tracing::error!(error = %e, "Error generating fingerprints"))?
        {
            Readiness::Ready(fingerprints) => {
                let profile = ConnectionProfile::new(address, self.settings.port, &fingerprints);
                publish(self.model.as_ref(), &profile).await;
                Ok(HookOutcome::Completed)
            }
            Readiness::NotReady(missing) => {
                tracing::warn!(reason = %missing, "tmate keys not yet fully initialized, deferring");
                Ok(HookOutcome::Deferred(missing.to_string()))
            }
        }
    }

    pub fn get_server_config(
        &self,
        state: &ProvisioningState,
    ) -> Result<BTreeMap<String, String>, ActionFailure> {
        action::get_server_config(state, &self.settings)
    }

    async fn maintenance(&self, message: &str) -> Result<(), LifecycleError> {
        tracing::info!("{message}");
        self.model.set_status(UnitStatus::maintenance(message)).await?;
        Ok(())
    }

    /// Publishing after install or a health check never fails the hook.
    async fn publish_if_ready(&self, address: &BindAddress) {
        match fingerprints(&self.settings) {
            Ok(Readiness::Ready(fingerprints)) => {
                let profile = ConnectionProfile::new(address, self.settings.port, &fingerprints);
                publish(self.model.as_ref(), &profile).await;
            }
            Ok(Readiness::NotReady(missing)) => {
                tracing::warn!(reason = %missing, "Keys not ready, publishing on a later trigger");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to read fingerprints, not publishing");
            }
        }
    }
}
