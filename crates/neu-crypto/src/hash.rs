//! SHA-256 hashing

use neu_primitives::TxId;
use sha2::{Digest, Sha256};

/// Compute SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Digest of a serialized user request, used as its transaction id
pub fn request_digest(payload: &[u8]) -> TxId {
    TxId::from_bytes(sha256(payload))
}
