//! # Key Material
//!
//! Ed25519 key types for the signing core.
//!
//! A [`PrivateKey`] only ever exists for the duration of one device command:
//! the key deriver creates it, the signer consumes it, and dropping it wipes
//! the secret scalar (ed25519-dalek zeroizes `SigningKey` on drop). It is
//! not `Clone` and its `Debug` output never contains key bytes.
//!
//! [`PublicKey`] carries both the compressed 32-byte form and the raw
//! uncompressed point the firmware works with; the address pipeline starts
//! from the raw point.

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use zeroize::Zeroizing;

use super::curve::RawPublicKey;
use crate::config::{PRIVATE_KEY_LENGTH, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};

/// Errors that can occur during key operations.
///
/// These say nothing about *why* key bytes were rejected; key material
/// does not belong in error messages.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid public key bytes: not a valid Ed25519 point")]
    InvalidPublicKey,

    #[error("invalid signature bytes: expected 64 bytes")]
    InvalidSignature,
}

/// An Ed25519 private key, scrubbed on drop.
pub struct PrivateKey {
    signing_key: SigningKey,
}

/// The public half of a derived key pair.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    compressed: [u8; PUBLIC_KEY_LENGTH],
    raw: RawPublicKey,
}

/// A detached Ed25519 signature. Always 64 bytes.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    bytes: [u8; SIGNATURE_LENGTH],
}

/// A private key and the public key generated from it.
#[derive(Debug)]
pub struct KeyPair {
    pub private_key: PrivateKey,
    pub public_key: PublicKey,
}

// ---------------------------------------------------------------------------
// PrivateKey
// ---------------------------------------------------------------------------

impl PrivateKey {
    /// Initialize a private key from 32 bytes of secret material.
    ///
    /// The caller keeps ownership of `secret` and stays responsible for
    /// wiping it.
    pub fn from_bytes(secret: &[u8; PRIVATE_KEY_LENGTH]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(secret),
        }
    }

    /// Deterministic key-pair generation: the public key of this scalar.
    pub fn public_key(&self) -> Result<PublicKey, KeyError> {
        PublicKey::from_verifying_key(&self.signing_key.verifying_key())
    }

    /// RFC 8032 signature over `message`. No external nonce or context.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature {
            bytes: self.signing_key.sign(message).to_bytes(),
        }
    }

    /// Copy of the secret bytes in self-wiping storage. Test and export use only.
    pub fn to_zeroizing_bytes(&self) -> Zeroizing<[u8; PRIVATE_KEY_LENGTH]> {
        Zeroizing::new(self.signing_key.to_bytes())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

// ---------------------------------------------------------------------------
// PublicKey
// ---------------------------------------------------------------------------

impl PublicKey {
    pub fn from_verifying_key(key: &VerifyingKey) -> Result<Self, KeyError> {
        Ok(Self {
            compressed: key.to_bytes(),
            raw: RawPublicKey::from_verifying_key(key)?,
        })
    }

    /// Parse a compressed key, rejecting bytes that are not a curve point.
    pub fn from_bytes(bytes: &[u8; PUBLIC_KEY_LENGTH]) -> Result<Self, KeyError> {
        let key = VerifyingKey::from_bytes(bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Self::from_verifying_key(&key)
    }

    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let mut bytes = [0u8; PUBLIC_KEY_LENGTH];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Self::from_bytes(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LENGTH] {
        &self.compressed
    }

    /// The uncompressed point as the secure element reports it.
    pub fn raw(&self) -> &RawPublicKey {
        &self.raw
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.compressed)
    }

    /// Check `signature` over `message`.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let Ok(key) = VerifyingKey::from_bytes(&self.compressed) else {
            return false;
        };
        key.verify(message, &DalekSignature::from_bytes(&signature.bytes))
            .is_ok()
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl Serialize for PublicKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        PublicKey::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

impl Signature {
    pub fn from_bytes(bytes: [u8; SIGNATURE_LENGTH]) -> Self {
        Self { bytes }
    }

    pub fn from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; SIGNATURE_LENGTH] =
            slice.try_into().map_err(|_| KeyError::InvalidSignature)?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LENGTH] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let mut bytes = [0u8; SIGNATURE_LENGTH];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| KeyError::InvalidSignature)?;
        Ok(Self { bytes })
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex_str = self.to_hex();
        write!(f, "Signature({}...{})", &hex_str[..8], &hex_str[120..])
    }
}

impl Serialize for Signature {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}
