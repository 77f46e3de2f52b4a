//! # Digital Signatures
//!
//! The signer is the last step of a command: it runs only after the
//! operator confirmed the summary and the key deriver produced a key.
//!
//! Ed25519 (RFC 8032) is deterministic, so there is no nonce to supply and
//! no context string. The same key and message always give the same 64
//! bytes, which is what lets the host re-check a signature it received.
//!
//! Transactions and free-form messages are signed the same way: over the
//! exact bytes the caller sent, no pre-hashing at this layer.

use tracing::trace;

use super::keys::{PrivateKey, PublicKey, Signature};

/// Sign `message` with `private_key`.
///
/// # Example
///
/// ```
/// use rise_protocol::crypto::{sign, verify, PrivateKey};
///
/// let key = PrivateKey::from_bytes(&[42u8; 32]);
/// let signature = sign(&key, b"hello RISE");
/// assert!(verify(&key.public_key().unwrap(), b"hello RISE", &signature));
/// ```
pub fn sign(private_key: &PrivateKey, message: &[u8]) -> Signature {
    trace!(message_len = message.len(), "signing");
    private_key.sign(message)
}

/// Verify a signature. A wrong key and a bad signature look the same: `false`.
pub fn verify(public_key: &PublicKey, message: &[u8], signature: &Signature) -> bool {
    public_key.verify(message, signature)
}
