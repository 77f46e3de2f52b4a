//! # Hashing Utilities
//!
//! RISE addresses are SHA-256 digests of the compressed public key, cut down
//! to 64 bits. SHA-256 is the only digest the address pipeline touches.
//!
//! SHA-512 is used too, but only inside Ed25519 signing and SLIP-0010 HMAC,
//! where the respective crates own it.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of the input data into a fixed-size array.
///
/// # Example
///
/// ```
/// use rise_protocol::crypto::sha256;
///
/// let digest = sha256(b"RISE");
/// assert_eq!(digest.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// SHA-256 as lowercase hex. Handy for logs and test fixtures.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}
