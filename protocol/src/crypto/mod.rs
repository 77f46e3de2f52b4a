//! # Cryptographic Building Blocks
//!
//! Everything here wraps audited implementations; nothing is hand-rolled
//! except the byte shuffling the firmware format demands.
//!
//! - **hash**: SHA-256 for address derivation.
//! - **curve**: the secure element's raw point layout and the 32-byte
//!   compressed encoding addresses are hashed from.
//! - **keys**: private/public key and signature types. Private keys wipe
//!   themselves on drop.
//! - **derivation**: hierarchical path handling and SLIP-0010 Ed25519.
//! - **signatures**: deterministic Ed25519 signing.

pub mod curve;
pub mod derivation;
pub mod hash;
pub mod keys;
pub mod signatures;

pub use curve::{encode_public_key, RawPublicKey};
pub use derivation::{
    DerivationError, DerivedKey, HierarchicalPath, KeyDeriver, NodeDeriver, SecretScratch,
    Slip10Deriver,
};
pub use hash::{sha256, sha256_hex};
pub use keys::{KeyError, KeyPair, PrivateKey, PublicKey, Signature};
pub use signatures::{sign, verify};
