//! Content digest of request and response bodies (SHA-256, lowercase hex).

use sha2::{Digest, Sha256};

use crate::error::OtsError;

/// Digest sent as `x-ots-contentdigest` and checked on responses.
pub fn content_digest(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

/// Compare a declared digest against the body actually received.
pub fn verify(declared: &str, body: &[u8]) -> Result<(), OtsError> {
    let computed = content_digest(body);
    if computed.eq_ignore_ascii_case(declared.trim()) {
        Ok(())
    } else {
        Err(OtsError::protocol(format!(
            "content digest mismatch: declared {}, computed {}",
            declared, computed
        )))
    }
}
