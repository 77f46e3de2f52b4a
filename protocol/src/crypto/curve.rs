//! # Raw Curve Points & Public Key Encoding
//!
//! The secure element hands public keys back as an uncompressed point:
//!
//! ```text
//! W = 0x04 | X (32 bytes, big-endian) | Y (32 bytes, big-endian)
//! ```
//!
//! Addresses, on the other hand, are computed over the 32-byte compressed
//! Ed25519 form (RFC 8032 section 5.1.2): Y little-endian with the parity of
//! X folded into the top bit of the last byte. [`encode_public_key`] is the
//! bridge between the two and works byte-for-byte on `W`, so it gives the
//! same answer the firmware does.
//!
//! `ed25519-dalek` only exposes compressed points. [`RawPublicKey::from_compressed`]
//! recovers X from Y with plain modular arithmetic so the raw layout can be
//! rebuilt off-device.

use ed25519_dalek::VerifyingKey;
use num_bigint::BigUint;

use super::keys::KeyError;
use crate::config::{PUBLIC_KEY_LENGTH, RAW_POINT_MARKER, RAW_PUBLIC_KEY_LENGTH};

/// Index of the last byte of X inside `W`. Its low bit is the parity of X.
const X_LAST_BYTE: usize = 32;

/// An uncompressed Edwards point in the layout the secure element uses.
#[derive(Clone, PartialEq, Eq)]
pub struct RawPublicKey {
    w: [u8; RAW_PUBLIC_KEY_LENGTH],
}

impl RawPublicKey {
    /// Assemble `W` from big-endian affine coordinates.
    pub fn from_coordinates(x: &[u8; 32], y: &[u8; 32]) -> Self {
        let mut w = [0u8; RAW_PUBLIC_KEY_LENGTH];
        w[0] = RAW_POINT_MARKER;
        w[1..33].copy_from_slice(x);
        w[33..65].copy_from_slice(y);
        Self { w }
    }

    /// Decompress a 32-byte Ed25519 public key into the raw layout.
    ///
    /// Follows the decoding steps of RFC 8032 section 5.1.3: recover
    /// `x^2 = (y^2 - 1) / (d y^2 + 1)`, take the square root with the
    /// `p = 5 (mod 8)` shortcut, then pick the root whose parity matches
    /// the sign bit.
    pub fn from_compressed(compressed: &[u8; PUBLIC_KEY_LENGTH]) -> Result<Self, KeyError> {
        let p = field_prime();
        let one = BigUint::from(1u8);
        let two = BigUint::from(2u8);

        let mut y_le = *compressed;
        let sign = y_le[31] >> 7;
        y_le[31] &= 0x7f;
        let y = BigUint::from_bytes_le(&y_le);
        if y >= p {
            return Err(KeyError::InvalidPublicKey);
        }

        let y2 = &y * &y % &p;
        let u = (&y2 + &p - &one) % &p;
        let v = (&edwards_d(&p) * &y2 + &one) % &p;
        let x2 = &u * &invert(&v, &p) % &p;

        let exponent = (&p + BigUint::from(3u8)) >> 3usize;
        let mut x = x2.modpow(&exponent, &p);
        if &x * &x % &p != x2 {
            let sqrt_minus_one = two.modpow(&((&p - &one) >> 2usize), &p);
            x = x * sqrt_minus_one % &p;
        }
        if &x * &x % &p != x2 {
            return Err(KeyError::InvalidPublicKey);
        }

        let zero = BigUint::from(0u8);
        if x == zero && sign == 1 {
            return Err(KeyError::InvalidPublicKey);
        }
        if &x % &two != BigUint::from(sign) {
            x = &p - &x;
        }

        Ok(Self::from_coordinates(&to_be_32(&x), &to_be_32(&y)))
    }

    /// Raw view of a dalek verifying key.
    pub fn from_verifying_key(key: &VerifyingKey) -> Result<Self, KeyError> {
        Self::from_compressed(key.as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; RAW_PUBLIC_KEY_LENGTH] {
        &self.w
    }

    /// Big-endian X coordinate.
    pub fn x(&self) -> &[u8] {
        &self.w[1..33]
    }

    /// Compressed form, see [`encode_public_key`].
    pub fn encoded(&self) -> [u8; PUBLIC_KEY_LENGTH] {
        let mut out = [0u8; PUBLIC_KEY_LENGTH];
        encode_public_key(self, &mut out);
        out
    }
}

impl std::fmt::Debug for RawPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RawPublicKey({})", hex::encode(self.w))
    }
}

/// Write the canonical 32-byte compressed form of `raw` into `encoded`.
///
/// Byte `i` of the output is byte `64 - i` of `W`, which reverses Y into
/// little-endian order. If X is odd, the top bit of the last byte is set.
/// `encoded` is fully overwritten.
pub fn encode_public_key(raw: &RawPublicKey, encoded: &mut [u8; PUBLIC_KEY_LENGTH]) {
    for (i, byte) in encoded.iter_mut().enumerate() {
        *byte = raw.w[64 - i];
    }
    if raw.w[X_LAST_BYTE] & 1 != 0 {
        encoded[31] |= 0x80;
    }
}

fn field_prime() -> BigUint {
    (BigUint::from(1u8) << 255usize) - BigUint::from(19u8)
}

/// Fermat inversion, `a^(p-2) mod p`.
fn invert(a: &BigUint, p: &BigUint) -> BigUint {
    a.modpow(&(p - BigUint::from(2u8)), p)
}

/// Edwards curve constant `d = -121665 / 121666 (mod p)`.
fn edwards_d(p: &BigUint) -> BigUint {
    let minus_num = p - BigUint::from(121_665u32);
    minus_num * invert(&BigUint::from(121_666u32), p) % p
}

fn to_be_32(value: &BigUint) -> [u8; 32] {
    let bytes = value.to_bytes_be();
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(&bytes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;
    use rand::RngCore;

    const BASEPOINT: &str = "5866666666666666666666666666666666666666666666666666666666666666";
    const BASEPOINT_X: &[u8] =
        b"15112221349535400772501151409588531511454012693041857206046113283949847762202";

    fn decode32(s: &str) -> [u8; 32] {
        let mut out = [0u8; 32];
        hex::decode_to_slice(s, &mut out).unwrap();
        out
    }

    #[test]
    fn basepoint_decompresses_to_known_x() {
        let raw = RawPublicKey::from_compressed(&decode32(BASEPOINT)).unwrap();
        let x = BigUint::from_bytes_be(raw.x());
        assert_eq!(x, BigUint::parse_bytes(BASEPOINT_X, 10).unwrap());
        assert_eq!(raw.as_bytes()[0], RAW_POINT_MARKER);
    }

    #[test]
    fn encoder_inverts_decompression_for_derived_keys() {
        for seed in 0u8..16 {
            let key = SigningKey::from_bytes(&[seed; 32]).verifying_key();
            let raw = RawPublicKey::from_verifying_key(&key).unwrap();
            assert_eq!(raw.encoded(), key.to_bytes(), "seed byte {seed}");
        }
    }

    #[test]
    fn encoder_inverts_decompression_for_random_keys() {
        let mut rng = rand::thread_rng();
        for _ in 0..32 {
            let mut seed = [0u8; 32];
            rng.fill_bytes(&mut seed);
            let key = SigningKey::from_bytes(&seed).verifying_key();
            let raw = RawPublicKey::from_verifying_key(&key).unwrap();
            assert_eq!(raw.encoded(), key.to_bytes());
        }
    }

    #[test]
    fn encoder_folds_x_parity_into_top_bit() {
        let y: [u8; 32] = core::array::from_fn(|i| i as u8);
        let mut x = [0u8; 32];

        let even = RawPublicKey::from_coordinates(&x, &y).encoded();
        x[31] = 1;
        let odd = RawPublicKey::from_coordinates(&x, &y).encoded();

        // Y is reversed: encoded[0] is the least significant byte of Y.
        assert_eq!(even[0], 31);
        assert_eq!(even[31], 0);
        assert_eq!(odd[31], 0x80);
        assert_eq!(even[..31], odd[..31]);
    }

    #[test]
    fn encoder_overwrites_output() {
        let raw = RawPublicKey::from_coordinates(&[0u8; 32], &[0u8; 32]);
        let mut out = [0xFFu8; 32];
        encode_public_key(&raw, &mut out);
        assert_eq!(out, [0u8; 32]);
    }

    #[test]
    fn rejects_y_outside_field() {
        // y = 2^255 - 1 (top bit cleared) is >= p.
        let mut bytes = [0xFFu8; 32];
        bytes[31] = 0x7F;
        assert!(RawPublicKey::from_compressed(&bytes).is_err());
    }
}
