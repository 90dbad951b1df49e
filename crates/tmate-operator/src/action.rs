// ABOUTME: The get-server-config action: returns the client configuration block on demand.
// ABOUTME: Failures become a short operator-facing message; details go to the log.

use crate::error::FingerprintError;
use crate::keys::require_fingerprints;
use crate::settings::Settings;
use crate::state::{BindAddress, ProvisioningState};
use crate::templates::{render_client_config, ClientConfigParams};
use std::collections::BTreeMap;
use thiserror::Error;

/// Result key holding the configuration text.
pub const TMATE_CONFIG_KEY: &str = "tmate-config";

pub const ADDRESS_NOT_READY: &str = "Host address not ready yet.";
pub const CONFIG_GENERATION_FAILED: &str = "Failed to generate .tmate.conf. See debug-log output.";

/// An action that could not produce a result, with the message shown to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ActionFailure(pub String);

/// Client configuration for `host` from the configured keys.
pub fn generate_connection_config(
    host: &BindAddress,
    settings: &Settings,
) -> Result<String, FingerprintError> {
    let fingerprints = require_fingerprints(settings)?;
    let host = host.to_string();
    Ok(render_client_config(&ClientConfigParams {
        host: &host,
        port: settings.port,
        rsa_fingerprint: &fingerprints.rsa,
        ed25519_fingerprint: &fingerprints.ed25519,
    }))
}

/// Handle the get-server-config action.
pub fn get_server_config(
    state: &ProvisioningState,
    settings: &Settings,
) -> Result<BTreeMap<String, String>, ActionFailure> {
    let Some(host) = &state.bound_address else {
        return Err(ActionFailure(ADDRESS_NOT_READY.to_string()));
    };

    let config = generate_connection_config(host, settings).map_err(|e| {
        tracing::error!(error = %e, "Failed to generate client config");
        ActionFailure(CONFIG_GENERATION_FAILED.to_string())
    })?;

    Ok(BTreeMap::from([(TMATE_CONFIG_KEY.to_string(), config)]))
}
