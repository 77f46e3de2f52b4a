//! # Hierarchical Key Derivation
//!
//! Turns a caller-supplied path buffer into an Ed25519 key pair.
//!
//! ```text
//! path buffer = length (1) | component_0 (4, BE) | ... | component_{length-1} (4, BE)
//! ```
//!
//! The flow is: validate the length byte (1..=10), read the components, ask
//! the trusted [`NodeDeriver`] for 32 bytes of secret material under the
//! `"ed25519 seed"` label, initialize the private key from it, generate the
//! public key. The scratch buffer holding the raw node output is wiped on
//! every exit from [`KeyDeriver::derive_with_scratch`], including early
//! returns on error.
//!
//! [`Slip10Deriver`] is the software stand-in for the secure element's
//! derivation routine: SLIP-0010 for Ed25519, hardened children only.

use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, Mac};
use sha2::Sha512;
use thiserror::Error;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::keys::{KeyError, KeyPair, PrivateKey};
use crate::config::{HARDENED_OFFSET, MAX_PATH_LENGTH, MIN_PATH_LENGTH, PRIVATE_KEY_LENGTH, SEED_KEY};
use crate::error::StatusWord;

type HmacSha512 = Hmac<Sha512>;

/// Errors raised while validating a path or deriving a key pair.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DerivationError {
    /// Length byte outside `1..=10`. Never clamped.
    #[error("invalid path length {0}: expected 1 to 10 components")]
    InvalidPathLength(u8),

    #[error("path buffer truncated: need {needed} bytes, got {available}")]
    TruncatedPath { needed: usize, available: usize },

    /// A textual path component that is not a 31-bit index.
    #[error("invalid path component '{0}'")]
    InvalidComponent(String),

    /// SLIP-0010 Ed25519 has no public (non-hardened) derivation.
    #[error("path component {0:#010x} is not hardened")]
    NonHardenedComponent(u32),

    /// The derivation primitive itself failed.
    #[error("derivation primitive failed: {0}")]
    Primitive(String),

    #[error(transparent)]
    Key(#[from] KeyError),
}

impl DerivationError {
    pub fn status_word(&self) -> StatusWord {
        match self {
            DerivationError::InvalidPathLength(len) => StatusWord::invalid_path_length(*len),
            DerivationError::TruncatedPath { .. } => StatusWord::WRONG_LENGTH,
            DerivationError::InvalidComponent(_) => StatusWord::WRONG_PARAMETERS,
            DerivationError::NonHardenedComponent(_)
            | DerivationError::Primitive(_)
            | DerivationError::Key(_) => StatusWord::INTERNAL_ERROR,
        }
    }
}

// ---------------------------------------------------------------------------
// HierarchicalPath
// ---------------------------------------------------------------------------

/// An ordered list of 1 to 10 path components.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HierarchicalPath {
    components: [u32; MAX_PATH_LENGTH],
    len: u8,
}

impl HierarchicalPath {
    pub fn new(components: &[u32]) -> Result<Self, DerivationError> {
        let len = components.len();
        if !(MIN_PATH_LENGTH..=MAX_PATH_LENGTH).contains(&len) {
            return Err(DerivationError::InvalidPathLength(
                u8::try_from(len).unwrap_or(u8::MAX),
            ));
        }
        let mut path = Self {
            components: [0; MAX_PATH_LENGTH],
            len: len as u8,
        };
        path.components[..len].copy_from_slice(components);
        Ok(path)
    }

    /// Read a path from the front of `buffer`.
    ///
    /// Returns the path and the number of bytes it occupied, so the caller
    /// can find whatever payload follows it.
    pub fn read(buffer: &[u8]) -> Result<(Self, usize), DerivationError> {
        let (&length, rest) = buffer.split_first().ok_or(DerivationError::TruncatedPath {
            needed: 1,
            available: 0,
        })?;

        let len = usize::from(length);
        if !(MIN_PATH_LENGTH..=MAX_PATH_LENGTH).contains(&len) {
            return Err(DerivationError::InvalidPathLength(length));
        }

        let consumed = 1 + 4 * len;
        if buffer.len() < consumed {
            return Err(DerivationError::TruncatedPath {
                needed: consumed,
                available: buffer.len(),
            });
        }

        let mut components = [0u32; MAX_PATH_LENGTH];
        for (slot, chunk) in components.iter_mut().zip(rest.chunks_exact(4)).take(len) {
            *slot = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }

        Ok((
            Self {
                components,
                len: length,
            },
            consumed,
        ))
    }

    /// Wire form: the inverse of [`read`](Self::read).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + 4 * self.len());
        out.push(self.len);
        for component in self.as_slice() {
            out.extend_from_slice(&component.to_be_bytes());
        }
        out
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.components[..self.len()]
    }

    pub fn len(&self) -> usize {
        usize::from(self.len)
    }

    /// Always false: [`read`](Self::read) and the text parser reject a
    /// zero-length path. Present to satisfy clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl FromStr for HierarchicalPath {
    type Err = DerivationError;

    /// Parses `44'/1120'/0'`, with an optional `m/` prefix. A trailing `'`,
    /// `h` or `H` marks a hardened component.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let body = s.strip_prefix("m/").unwrap_or(s);

        let mut components = Vec::new();
        for segment in body.split('/') {
            let (digits, hardened) = match segment.strip_suffix(&['\'', 'h', 'H'][..]) {
                Some(digits) => (digits, true),
                None => (segment, false),
            };
            let index: u32 = digits
                .parse()
                .map_err(|_| DerivationError::InvalidComponent(segment.to_string()))?;
            if index >= HARDENED_OFFSET {
                return Err(DerivationError::InvalidComponent(segment.to_string()));
            }
            components.push(if hardened { index | HARDENED_OFFSET } else { index });
        }

        Self::new(&components)
    }
}

impl fmt::Display for HierarchicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.as_slice().iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            if component & HARDENED_OFFSET != 0 {
                write!(f, "{}'", component & !HARDENED_OFFSET)?;
            } else {
                write!(f, "{}", component)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for HierarchicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HierarchicalPath({})", self)
    }
}

// ---------------------------------------------------------------------------
// Trusted derivation primitive
// ---------------------------------------------------------------------------

/// The secure element's hierarchical node derivation.
///
/// Implementations write 32 bytes of private key material for `path` into
/// `out`. They may leave partial output behind on failure; the caller wipes
/// `out` regardless.
pub trait NodeDeriver {
    fn derive_node(
        &self,
        path: &HierarchicalPath,
        seed_key: &[u8],
        out: &mut [u8; PRIVATE_KEY_LENGTH],
    ) -> Result<(), DerivationError>;
}

/// SLIP-0010 Ed25519 derivation over a master seed.
#[derive(ZeroizeOnDrop)]
pub struct Slip10Deriver {
    master_seed: Vec<u8>,
}

impl Slip10Deriver {
    /// `seed` is usually the 64-byte BIP-39 seed of the device.
    pub fn new(seed: &[u8]) -> Self {
        Self {
            master_seed: seed.to_vec(),
        }
    }

    pub fn from_hex(seed_hex: &str) -> Result<Self, DerivationError> {
        let seed = Zeroizing::new(
            hex::decode(seed_hex.trim())
                .map_err(|e| DerivationError::Primitive(format!("seed is not hex: {}", e)))?,
        );
        if seed.is_empty() {
            return Err(DerivationError::Primitive("empty seed".to_string()));
        }
        Ok(Self::new(&seed))
    }

    /// I = HMAC-SHA512(key, data...). IL is the key, IR the chain code.
    fn hmac_split(key: &[u8], data: &[&[u8]]) -> Result<Zeroizing<[u8; 64]>, DerivationError> {
        let mut mac = HmacSha512::new_from_slice(key)
            .map_err(|e| DerivationError::Primitive(format!("HMAC init failed: {}", e)))?;
        for part in data {
            mac.update(part);
        }
        let mut out = Zeroizing::new([0u8; 64]);
        out.copy_from_slice(&mac.finalize().into_bytes());
        Ok(out)
    }
}

impl NodeDeriver for Slip10Deriver {
    fn derive_node(
        &self,
        path: &HierarchicalPath,
        seed_key: &[u8],
        out: &mut [u8; PRIVATE_KEY_LENGTH],
    ) -> Result<(), DerivationError> {
        let mut node = Self::hmac_split(seed_key, &[&self.master_seed])?;

        for &index in path.as_slice() {
            if index & HARDENED_OFFSET == 0 {
                return Err(DerivationError::NonHardenedComponent(index));
            }
            // Data = 0x00 || parent_key || ser32(index)
            let index_bytes = index.to_be_bytes();
            let (key, chain_code) = node.split_at(32);
            let child = Self::hmac_split(chain_code, &[&[0x00u8], key, &index_bytes])?;
            node = child;
        }

        out.copy_from_slice(&node[..PRIVATE_KEY_LENGTH]);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// KeyDeriver
// ---------------------------------------------------------------------------

/// Buffer the node derivation writes raw secret material into.
///
/// Wiped by [`KeyDeriver::derive_with_scratch`] before it returns and again
/// on drop.
#[derive(Default, Zeroize, ZeroizeOnDrop)]
pub struct SecretScratch {
    bytes: [u8; PRIVATE_KEY_LENGTH],
}

impl SecretScratch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_zeroed(&self) -> bool {
        self.bytes.iter().all(|&b| b == 0)
    }
}

/// Wipes the scratch buffer when the derivation scope ends, whichever way
/// it ends.
struct ScrubOnExit<'a>(&'a mut SecretScratch);

impl Drop for ScrubOnExit<'_> {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Outcome of a successful derivation.
#[derive(Debug)]
pub struct DerivedKey {
    pub key_pair: KeyPair,
    pub path: HierarchicalPath,
    /// Bytes of the input buffer taken by the path.
    pub consumed: usize,
}

/// Validates paths and drives a [`NodeDeriver`].
pub struct KeyDeriver<D> {
    node_deriver: D,
}

impl<D: NodeDeriver> KeyDeriver<D> {
    pub fn new(node_deriver: D) -> Self {
        Self { node_deriver }
    }

    pub fn node_deriver(&self) -> &D {
        &self.node_deriver
    }

    /// Derive the key pair for the path at the front of `path_buffer`.
    pub fn derive(&self, path_buffer: &[u8]) -> Result<DerivedKey, DerivationError> {
        let mut scratch = SecretScratch::new();
        self.derive_with_scratch(path_buffer, &mut scratch)
    }

    /// Same as [`derive`](Self::derive) with a caller-owned scratch buffer.
    /// `scratch` is all-zero when this returns, on success and on failure.
    pub fn derive_with_scratch(
        &self,
        path_buffer: &[u8],
        scratch: &mut SecretScratch,
    ) -> Result<DerivedKey, DerivationError> {
        let mut guard = ScrubOnExit(scratch);
        let (path, consumed) = HierarchicalPath::read(path_buffer)?;

        self.node_deriver
            .derive_node(&path, SEED_KEY, &mut guard.0.bytes)?;

        let private_key = PrivateKey::from_bytes(&guard.0.bytes);
        let public_key = private_key.public_key()?;

        debug!(path = %path, public_key = %public_key, consumed, "derived key pair");

        Ok(DerivedKey {
            key_pair: KeyPair {
                private_key,
                public_key,
            },
            path,
            consumed,
        })
    }

    /// Derive from an already validated path.
    pub fn derive_path(&self, path: &HierarchicalPath) -> Result<KeyPair, DerivationError> {
        let buffer = path.to_bytes();
        self.derive(&buffer).map(|derived| derived.key_pair)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    const SLIP10_SEED: &str = "000102030405060708090a0b0c0d0e0f";

    fn deriver() -> KeyDeriver<Slip10Deriver> {
        KeyDeriver::new(Slip10Deriver::from_hex(SLIP10_SEED).unwrap())
    }

    fn path_buffer(len: u8) -> Vec<u8> {
        let mut buf = vec![len];
        for i in 0..u32::from(len) {
            buf.extend_from_slice(&(HARDENED_OFFSET | i).to_be_bytes());
        }
        buf
    }

    /// Writes junk into the output, then fails.
    struct FailingDeriver {
        calls: Cell<u32>,
    }

    impl NodeDeriver for FailingDeriver {
        fn derive_node(
            &self,
            _path: &HierarchicalPath,
            _seed_key: &[u8],
            out: &mut [u8; PRIVATE_KEY_LENGTH],
        ) -> Result<(), DerivationError> {
            self.calls.set(self.calls.get() + 1);
            out.fill(0xAA);
            Err(DerivationError::Primitive("secure element busy".to_string()))
        }
    }

    #[test]
    fn slip10_vector_1_chain_m_0h() {
        // SLIP-0010 test vector 1 for ed25519, chain m/0H.
        let kp = deriver().derive(&path_buffer(1)).unwrap().key_pair;
        assert_eq!(
            hex::encode(*kp.private_key.to_zeroizing_bytes()),
            "68e0fe46dfb67e368c75379acec591dad19df3cde26e63b93a8e704f1dade7a3"
        );
        assert_eq!(
            kp.public_key.to_hex(),
            "8c8a13df77a28f3445213a0f432fde644acaa215fc72dcdf300d5efaa85d350c"
        );
    }

    #[test]
    fn slip10_vector_1_chain_m_0h_1h() {
        let path: HierarchicalPath = "m/0'/1'".parse().unwrap();
        let kp = deriver().derive_path(&path).unwrap();
        assert_eq!(
            hex::encode(*kp.private_key.to_zeroizing_bytes()),
            "b1d0bad404bf35da785a64ca1ac54b2617211d2777696fbffaf208f746ae84f2"
        );
    }

    #[test]
    fn rejects_length_zero_and_eleven_with_distinct_codes() {
        let d = deriver();

        let err = d.derive(&[0u8]).unwrap_err();
        assert_eq!(err, DerivationError::InvalidPathLength(0));
        assert_eq!(err.status_word(), StatusWord(0x6A80));

        let err = d.derive(&path_buffer(11)).unwrap_err();
        assert_eq!(err, DerivationError::InvalidPathLength(11));
        assert_eq!(err.status_word(), StatusWord(0x6A8B));
    }

    #[test]
    fn accepts_length_one_and_ten() {
        let d = deriver();
        let one = d.derive(&path_buffer(1)).unwrap();
        assert_eq!(one.consumed, 5);
        assert_eq!(one.path.len(), 1);

        let ten = d.derive(&path_buffer(10)).unwrap();
        assert_eq!(ten.consumed, 41);
        assert_eq!(ten.path.len(), 10);
    }

    #[test]
    fn constructed_paths_are_never_empty() {
        assert!(HierarchicalPath::new(&[]).is_err());
        assert!("m".parse::<HierarchicalPath>().is_err());

        let one = HierarchicalPath::new(&[HARDENED_OFFSET]).unwrap();
        assert_eq!(one.len(), 1);
        assert!(!one.is_empty());
    }

    #[test]
    fn consumed_excludes_trailing_payload() {
        let mut buf = path_buffer(3);
        buf.extend_from_slice(b"payload after the path");
        let derived = deriver().derive(&buf).unwrap();
        assert_eq!(&buf[derived.consumed..], b"payload after the path");
    }

    #[test]
    fn truncated_path_buffer_is_rejected() {
        let mut buf = path_buffer(3);
        buf.truncate(10);
        assert_eq!(
            deriver().derive(&buf).unwrap_err(),
            DerivationError::TruncatedPath {
                needed: 13,
                available: 10
            }
        );
        assert!(matches!(
            deriver().derive(&[]).unwrap_err(),
            DerivationError::TruncatedPath { .. }
        ));
    }

    #[test]
    fn scratch_is_zero_after_success() {
        let mut scratch = SecretScratch::new();
        deriver()
            .derive_with_scratch(&path_buffer(3), &mut scratch)
            .unwrap();
        assert!(scratch.is_zeroed());
    }

    #[test]
    fn scratch_is_zero_after_validation_failure() {
        let mut scratch = SecretScratch::new();
        scratch.bytes.fill(0x55);
        assert!(deriver()
            .derive_with_scratch(&[11u8], &mut scratch)
            .is_err());
        assert!(scratch.is_zeroed());
    }

    #[test]
    fn scratch_is_zero_after_primitive_failure() {
        let d = KeyDeriver::new(FailingDeriver {
            calls: Cell::new(0),
        });
        let mut scratch = SecretScratch::new();
        let err = d
            .derive_with_scratch(&path_buffer(2), &mut scratch)
            .unwrap_err();
        assert_eq!(d.node_deriver.calls.get(), 1);
        assert_eq!(err.status_word(), StatusWord::INTERNAL_ERROR);
        assert!(scratch.is_zeroed());
    }

    #[test]
    fn invalid_length_never_reaches_the_primitive() {
        let d = KeyDeriver::new(FailingDeriver {
            calls: Cell::new(0),
        });
        assert!(d.derive(&[0u8]).is_err());
        assert_eq!(d.node_deriver.calls.get(), 0);
    }

    #[test]
    fn non_hardened_component_fails() {
        let path: HierarchicalPath = "44'/1120'/0".parse().unwrap();
        let err = deriver().derive_path(&path).unwrap_err();
        assert_eq!(err, DerivationError::NonHardenedComponent(0));
    }

    #[test]
    fn derivation_is_deterministic_and_path_sensitive() {
        let d = deriver();
        let a = d.derive_path(&"44'/1120'/0'".parse().unwrap()).unwrap();
        let b = d.derive_path(&"44'/1120'/0'".parse().unwrap()).unwrap();
        let c = d.derive_path(&"44'/1120'/1'".parse().unwrap()).unwrap();
        assert_eq!(a.public_key, b.public_key);
        assert_ne!(a.public_key, c.public_key);
    }

    #[test]
    fn path_text_roundtrip() {
        let path: HierarchicalPath = "m/44'/1120'/0'".parse().unwrap();
        assert_eq!(path.as_slice(), &[0x8000_002C, 0x8000_0460, 0x8000_0000]);
        assert_eq!(path.to_string(), "44'/1120'/0'");

        let h: HierarchicalPath = "44h/1120H/0".parse().unwrap();
        assert_eq!(h.as_slice(), &[0x8000_002C, 0x8000_0460, 0]);
    }

    #[test]
    fn path_wire_roundtrip() {
        let path: HierarchicalPath = "44'/1120'/0'/0'/7'".parse().unwrap();
        let bytes = path.to_bytes();
        assert_eq!(bytes[0], 5);
        assert_eq!(HierarchicalPath::read(&bytes).unwrap(), (path, 21));
    }

    #[test]
    fn path_text_rejects_garbage() {
        assert!(matches!(
            "44'/abc'".parse::<HierarchicalPath>(),
            Err(DerivationError::InvalidComponent(_))
        ));
        assert!(matches!(
            "2147483648".parse::<HierarchicalPath>(),
            Err(DerivationError::InvalidComponent(_))
        ));
        assert_eq!(
            "0/1/2/3/4/5/6/7/8/9/10".parse::<HierarchicalPath>(),
            Err(DerivationError::InvalidPathLength(11))
        );
    }
}
