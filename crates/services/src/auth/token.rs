//! Single-use tokens (invites, email verification). The plaintext goes out
//! by email exactly once; only its SHA-256 digest is ever persisted.

use sha2::{Digest, Sha256};

/// 32 random bytes, hex encoded.
pub fn generate() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

pub fn hash(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Returns the plaintext to send and the digest to store.
pub fn issue() -> (String, String) {
    let plain = generate();
    let digest = hash(&plain);
    (plain, digest)
}
