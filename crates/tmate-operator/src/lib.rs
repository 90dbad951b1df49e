// ABOUTME: Lifecycle operator for a containerized tmate-ssh-server relay.
// ABOUTME: Installs dependencies, provisions keys, supervises the daemon, and publishes connection details.

pub mod action;
pub mod daemon;
pub mod error;
pub mod host;
pub mod installer;
pub mod keys;
pub mod lifecycle;
pub mod model;
pub mod publish;
pub mod reconcile;
pub mod settings;
pub mod state;
pub mod templates;
pub mod wait;

#[cfg(test)]
mod testing;

pub use action::{generate_connection_config, get_server_config, ActionFailure};
pub use daemon::{Daemon, DaemonController, DaemonStatus};
pub use error::{
    DaemonError, DependencySetupError, DockerError, FingerprintError, KeyInstallError,
    LifecycleError, ModelError,
};
pub use host::Host;
pub use installer::DependencyInstaller;
pub use keys::KeyProvisioner;
pub use lifecycle::{HookOutcome, Operator};
pub use model::{LocalUnitModel, RelationData, UnitModel, UnitStatus};
pub use publish::{publish, ConnectionProfile};
pub use reconcile::{reconcile, ReconcileOutcome};
pub use settings::Settings;
pub use state::{BindAddress, InvalidStateError, ProvisioningState, ProxyConfig, ProxyInputs};
