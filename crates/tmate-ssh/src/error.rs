// ABOUTME: Error types for host key operations using thiserror.
// ABOUTME: Separates "keys not generated yet" from keys that exist but cannot be used.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or fingerprinting host keys.
#[derive(Error, Debug)]
pub enum KeyError {
    /// Failed to read a public key file from disk.
    #[error("failed to read public key from {path}: {source}")]
    ReadKey {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The public key file does not have the `<algorithm> <base64-blob> [comment]` shape.
    #[error("malformed public key in {path}: {reason}")]
    MalformedKey { path: PathBuf, reason: String },

    /// The first token of the public key file is not a known SSH algorithm.
    #[error("unknown key algorithm in {path}: {source}")]
    UnknownAlgorithm {
        path: PathBuf,
        #[source]
        source: ssh_key::Error,
    },

    /// The key blob is not valid base64.
    #[error("failed to decode public key blob in {path}: {source}")]
    DecodeKey {
        path: PathBuf,
        #[source]
        source: base64::DecodeError,
    },
}

/// Key material has not been generated yet.
///
/// This is the expected state between a deferred install and the next
/// attempt, so callers treat it as "not ready" rather than as a failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("tmate keys not yet initialized: {path} is missing or empty")]
pub struct IncompleteInitError {
    pub path: PathBuf,
}

/// Result type alias using KeyError.
pub type Result<T> = std::result::Result<T, KeyError>;
