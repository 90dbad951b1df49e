// ABOUTME: SSH public key fingerprint computation.
// ABOUTME: Produces OpenSSH-style "SHA256:<base64>" fingerprints for the host key pair.

use crate::error::{KeyError, Result};
use crate::key::{parse_public_key, KeyMaterial, Readiness};
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Fingerprints of the tmate-ssh-server host keys, as clients pin them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprints {
    pub rsa: String,
    pub ed25519: String,
}

/// Compute the SHA256 fingerprint of a base64 encoded public key blob.
///
/// This matches `ssh-keygen -l -E sha256`: the blob is decoded, hashed with
/// SHA256, and re-encoded as base64 without `=` padding.
///
/// # Returns
/// A string of the form `SHA256:<43 base64 characters>`.
pub fn compute_fingerprint(blob: &str) -> std::result::Result<String, base64::DecodeError> {
    let decoded = STANDARD.decode(blob.trim())?;
    let digest = Sha256::digest(&decoded);
    Ok(format!("SHA256:{}", STANDARD_NO_PAD.encode(digest)))
}

/// Read an OpenSSH public key file and fingerprint its key blob.
pub fn fingerprint_file(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path).map_err(|e| KeyError::ReadKey {
        path: path.to_path_buf(),
        source: e,
    })?;
    let line = parse_public_key(path, &content)?;
    compute_fingerprint(line.blob).map_err(|e| KeyError::DecodeKey {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Fingerprint both host keys.
///
/// Missing key material is `NotReady`, not an error: key generation may not
/// have run yet. Key files that exist but cannot be read or decoded are errors.
pub fn get_fingerprints(material: &KeyMaterial) -> Result<Readiness<Fingerprints>> {
    if let Err(missing) = material.check_initialized() {
        return Ok(Readiness::NotReady(missing));
    }

    let rsa = fingerprint_file(&material.rsa_public_key_path())?;
    let ed25519 = fingerprint_file(&material.ed25519_public_key_path())?;

    Ok(Readiness::Ready(Fingerprints { rsa, ed25519 }))
}
