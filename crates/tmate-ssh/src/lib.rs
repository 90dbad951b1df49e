// ABOUTME: Host key material and fingerprint derivation for tmate-ssh-server.
// ABOUTME: Re-exports key layout, fingerprint engine, and error types.

pub mod error;
pub mod fingerprint;
pub mod key;

pub use error::{IncompleteInitError, KeyError, Result};
pub use fingerprint::{compute_fingerprint, fingerprint_file, get_fingerprints, Fingerprints};
pub use key::{
    parse_public_key, KeyMaterial, PublicKeyLine, Readiness, ED25519_PUBLIC_KEY_FILE,
    RSA_PUBLIC_KEY_FILE,
};
