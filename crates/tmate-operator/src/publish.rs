// ABOUTME: Publishes the connection profile (host, port, fingerprints) to every consumer.
// ABOUTME: Never fails: with no consumers or an unwritable bag it logs and moves on.

use crate::model::{RelationData, UnitModel};
use crate::state::BindAddress;
use tmate_ssh::Fingerprints;

/// What a client needs to reach and trust the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionProfile {
    pub host: String,
    pub port: u16,
    pub rsa_fingerprint: String,
    pub ed25519_fingerprint: String,
}

impl ConnectionProfile {
    pub fn new(host: &BindAddress, port: u16, fingerprints: &Fingerprints) -> Self {
        Self {
            host: host.to_string(),
            port,
            rsa_fingerprint: fingerprints.rsa.clone(),
            ed25519_fingerprint: fingerprints.ed25519.clone(),
        }
    }

    /// Consumer wire form. Keys use underscores; all values are strings.
    pub fn to_relation_data(&self) -> RelationData {
        RelationData::from([
            ("host".to_string(), self.host.clone()),
            ("port".to_string(), self.port.to_string()),
            ("rsa_fingerprint".to_string(), self.rsa_fingerprint.clone()),
            (
                "ed25519_fingerprint".to_string(),
                self.ed25519_fingerprint.clone(),
            ),
        ])
    }
}

/// Write `profile` into every consumer's data bag.
///
/// Nothing is queued when there are no consumers; the next trigger that finds
/// one publishes again. Returns how many consumers were updated.
pub async fn publish(model: &dyn UnitModel, profile: &ConnectionProfile) -> usize {
    let relations = match model.relations().await {
        Ok(relations) => relations,
        Err(e) => {
            tracing::error!(error = %e, "Failed to list consumers, not publishing");
            return 0;
        }
    };
    if relations.is_empty() {
        tracing::warn!("No consumers to publish connection details to");
        return 0;
    }

    let data = profile.to_relation_data();
    let mut published = 0;
    for id in &relations {
        match model.update_relation(id, &data).await {
            Ok(()) => published += 1,
            Err(e) => tracing::error!(relation = %id, error = %e, "Failed to publish to consumer"),
        }
    }
    tracing::info!(published, host = %profile.host, "Published connection details");
    published
}
