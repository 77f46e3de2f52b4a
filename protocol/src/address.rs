//! # RISE Addresses
//!
//! An address is a plain `u64`. It is shown to humans as its decimal digits
//! followed by the `R` suffix, e.g. `5108946421052930425R`.
//!
//! ```text
//! public key (raw point)
//!     -> compressed 32 bytes         (crypto::curve::encode_public_key)
//!     -> SHA-256 digest              (crypto::hash::sha256)
//!     -> first 8 digest bytes, read least-significant first
//!     -> u64
//! ```
//!
//! Inside a transaction the recipient is the same `u64`, stored as 8 bytes
//! most-significant first. [`decode_address_value`] covers both cases with
//! its `reverse` flag.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{
    ADDRESS_FIELD_LENGTH, ADDRESS_STRING_BUFFER_LENGTH, ADDRESS_SUFFIX, ADDRESS_SUFFIX_LENGTH,
    MAX_ADDRESS_DIGITS, PUBLIC_KEY_LENGTH,
};
use crate::crypto::curve::{encode_public_key, RawPublicKey};
use crate::crypto::hash::sha256;
use crate::crypto::keys::PublicKey;

/// Errors parsing the textual form of an address.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address must end with the 'R' suffix")]
    MissingSuffix,

    #[error("address digits are not a canonical 64-bit decimal: '{0}'")]
    InvalidDigits(String),
}

/// Fold an 8-byte window into an address value.
///
/// With `reverse` unset the bytes are taken in order, first byte most
/// significant: the layout of a transaction's recipient field. With
/// `reverse` set they are taken from byte 7 down to byte 0, which is how
/// the head of a SHA-256 digest becomes an address.
pub fn decode_address_value(source: &[u8; ADDRESS_FIELD_LENGTH], reverse: bool) -> u64 {
    if reverse {
        u64::from_le_bytes(*source)
    } else {
        u64::from_be_bytes(*source)
    }
}

/// Render `value` as decimal digits, the suffix, then a NUL terminator.
///
/// Returns the length written, terminator excluded. Zero renders as `0R`.
pub fn encode_address_string(value: u64, output: &mut [u8; ADDRESS_STRING_BUFFER_LENGTH]) -> usize {
    let mut reversed = [0u8; MAX_ADDRESS_DIGITS];
    let mut count = 0;
    let mut rest = value;
    loop {
        reversed[count] = b'0' + (rest % 10) as u8;
        count += 1;
        rest /= 10;
        if rest == 0 {
            break;
        }
    }

    for (slot, digit) in output.iter_mut().zip(reversed[..count].iter().rev()) {
        *slot = *digit;
    }

    let end = count + ADDRESS_SUFFIX_LENGTH;
    output[count..end].copy_from_slice(ADDRESS_SUFFIX.as_bytes());
    output[end] = 0;
    end
}

/// Address of the account controlled by `public_key`.
///
/// Pure and deterministic: no salt, no randomness.
pub fn derive_address(public_key: &RawPublicKey) -> Address {
    let mut encoded = [0u8; PUBLIC_KEY_LENGTH];
    encode_public_key(public_key, &mut encoded);

    let digest = sha256(&encoded);
    let mut head = [0u8; ADDRESS_FIELD_LENGTH];
    head.copy_from_slice(&digest[..ADDRESS_FIELD_LENGTH]);

    Address(decode_address_value(&head, true))
}

/// A RISE account address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub u64);

impl Address {
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        derive_address(public_key.raw())
    }

    /// Decode a recipient field as stored in a transaction.
    pub fn from_field(field: &[u8; ADDRESS_FIELD_LENGTH]) -> Self {
        Address(decode_address_value(field, false))
    }

    pub fn value(self) -> u64 {
        self.0
    }

    /// The NUL-terminated display buffer and its length.
    pub fn to_buffer(self) -> ([u8; ADDRESS_STRING_BUFFER_LENGTH], usize) {
        let mut buffer = [0u8; ADDRESS_STRING_BUFFER_LENGTH];
        let len = encode_address_string(self.0, &mut buffer);
        (buffer, len)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (buffer, len) = self.to_buffer();
        let text = std::str::from_utf8(&buffer[..len]).map_err(|_| fmt::Error)?;
        f.write_str(text)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    /// Accepts exactly what `Display` produces.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_suffix(ADDRESS_SUFFIX).ok_or(AddressError::MissingSuffix)?;
        let canonical = !digits.is_empty()
            && digits.bytes().all(|b| b.is_ascii_digit())
            && (digits == "0" || !digits.starts_with('0'));
        if !canonical {
            return Err(AddressError::InvalidDigits(digits.to_string()));
        }
        digits
            .parse::<u64>()
            .map(Address)
            .map_err(|_| AddressError::InvalidDigits(digits.to_string()))
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
