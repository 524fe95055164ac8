//! Webhook payload signature helpers
//!
//! The payment provider boundary authenticates callback deliveries with a
//! shared-secret signature: hex SHA-256 over the raw payload bytes
//! followed by the secret. Verification happens before any event data is
//! trusted; the handlers behind it receive only verified events.

use sha2::{Digest, Sha256};

/// Signature verification failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureMismatch;

impl std::fmt::Display for SignatureMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "payload signature does not match")
    }
}

impl std::error::Error for SignatureMismatch {}

/// Calculate the signature for a payload
///
/// Returns 64 lowercase hex characters.
pub fn sign(payload: &[u8], secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload);
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Validate a provided signature against the payload and secret
pub fn verify(provided: &str, payload: &[u8], secret: &str) -> Result<(), SignatureMismatch> {
    let calculated = sign(payload, secret);

    if provided != calculated {
        return Err(SignatureMismatch);
    }

    Ok(())
}
