// ABOUTME: Host key material layout and OpenSSH public key line parsing.
// ABOUTME: Knows where the RSA and Ed25519 public keys live and when they count as initialized.

use crate::error::{IncompleteInitError, KeyError, Result};
use ssh_key::Algorithm;
use std::path::{Path, PathBuf};

/// File name of the RSA host public key inside the keys directory.
pub const RSA_PUBLIC_KEY_FILE: &str = "ssh_host_rsa_key.pub";

/// File name of the Ed25519 host public key inside the keys directory.
pub const ED25519_PUBLIC_KEY_FILE: &str = "ssh_host_ed25519_key.pub";

/// Outcome of a lookup that may legitimately find nothing yet.
///
/// Failures stay on the `Err` side of the surrounding `Result`, so a caller
/// sees three cases: ready, not ready (defer), or failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness<T> {
    Ready(T),
    NotReady(IncompleteInitError),
}

impl<T> Readiness<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready(_))
    }

    pub fn ready(self) -> Option<T> {
        match self {
            Readiness::Ready(value) => Some(value),
            Readiness::NotReady(_) => None,
        }
    }
}

/// The pair of host keys generated for tmate-ssh-server.
///
/// The keys themselves are written by the key creation script; this type only
/// knows the layout and is read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    keys_dir: PathBuf,
}

impl KeyMaterial {
    pub fn new(keys_dir: impl Into<PathBuf>) -> Self {
        Self {
            keys_dir: keys_dir.into(),
        }
    }

    pub fn keys_dir(&self) -> &Path {
        &self.keys_dir
    }

    pub fn rsa_public_key_path(&self) -> PathBuf {
        self.keys_dir.join(RSA_PUBLIC_KEY_FILE)
    }

    pub fn ed25519_public_key_path(&self) -> PathBuf {
        self.keys_dir.join(ED25519_PUBLIC_KEY_FILE)
    }

    /// First piece of key material that is absent, checked in order:
    /// keys directory, RSA public key, Ed25519 public key.
    ///
    /// Empty public key files count as absent.
    pub fn check_initialized(&self) -> std::result::Result<(), IncompleteInitError> {
        if !self.keys_dir.is_dir() {
            return Err(IncompleteInitError {
                path: self.keys_dir.clone(),
            });
        }
        for path in [self.rsa_public_key_path(), self.ed25519_public_key_path()] {
            let non_empty = std::fs::metadata(&path)
                .map(|meta| meta.is_file() && meta.len() > 0)
                .unwrap_or(false);
            if !non_empty {
                return Err(IncompleteInitError { path });
            }
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.check_initialized().is_ok()
    }
}

/// A parsed `<algorithm> <base64-blob> [comment]` public key line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyLine<'a> {
    pub algorithm: Algorithm,
    pub blob: &'a str,
    pub comment: Option<&'a str>,
}

/// Split an OpenSSH public key file into its whitespace-delimited tokens.
///
/// `path` is only used for error context.
pub fn parse_public_key<'a>(path: &Path, content: &'a str) -> Result<PublicKeyLine<'a>> {
    let mut tokens = content.split_whitespace();

    let algorithm = tokens.next().ok_or_else(|| KeyError::MalformedKey {
        path: path.to_path_buf(),
        reason: "file is empty".to_string(),
    })?;
    let blob = tokens.next().ok_or_else(|| KeyError::MalformedKey {
        path: path.to_path_buf(),
        reason: "missing key blob".to_string(),
    })?;
    let comment = tokens.next();

    let algorithm = Algorithm::new(algorithm).map_err(|e| KeyError::UnknownAlgorithm {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(PublicKeyLine {
        algorithm,
        blob,
        comment,
    })
}
