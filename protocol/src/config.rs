//! # Protocol Configuration & Constants
//!
//! Every magic number the signing core depends on lives here. The values are
//! fixed by the RISE wire format and by the firmware that came before us, so
//! changing one of them is not a tuning decision: it breaks addresses,
//! signatures, or both.

// ---------------------------------------------------------------------------
// Addresses
// ---------------------------------------------------------------------------

/// Literal appended to the decimal form of every address: `1234567890R`.
pub const ADDRESS_SUFFIX: &str = "R";

/// Byte length of [`ADDRESS_SUFFIX`].
pub const ADDRESS_SUFFIX_LENGTH: usize = ADDRESS_SUFFIX.len();

/// Decimal digits in `u64::MAX` (18446744073709551615).
pub const MAX_ADDRESS_DIGITS: usize = 20;

/// Size of the buffer an address string is rendered into: every digit of the
/// largest value, the suffix, and a NUL terminator.
pub const ADDRESS_STRING_BUFFER_LENGTH: usize = MAX_ADDRESS_DIGITS + ADDRESS_SUFFIX_LENGTH + 1;

/// Width of an address field, both in transactions and in digests.
pub const ADDRESS_FIELD_LENGTH: usize = 8;

// ---------------------------------------------------------------------------
// Keys & derivation
// ---------------------------------------------------------------------------

/// Longest hierarchical path the device accepts.
pub const MAX_PATH_LENGTH: usize = 10;

/// Shortest hierarchical path the device accepts.
pub const MIN_PATH_LENGTH: usize = 1;

/// SLIP-0010 domain separation label for the Ed25519 curve.
pub const SEED_KEY: &[u8] = b"ed25519 seed";

/// Hardened bit of a path component.
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// Ed25519 secret scalar seed length.
pub const PRIVATE_KEY_LENGTH: usize = 32;

/// Compressed Ed25519 public key length.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Raw point layout: marker byte plus two 32-byte big-endian coordinates.
pub const RAW_PUBLIC_KEY_LENGTH: usize = 65;

/// Marker byte of an uncompressed point.
pub const RAW_POINT_MARKER: u8 = 0x04;

/// Ed25519 signatures are always 64 bytes.
pub const SIGNATURE_LENGTH: usize = 64;

// ---------------------------------------------------------------------------
// Transaction layout
// ---------------------------------------------------------------------------

pub const TX_TYPE_LENGTH: usize = 1;
pub const TX_TIMESTAMP_LENGTH: usize = 4;
pub const TX_SENDER_KEY_LENGTH: usize = 32;
pub const TX_REQUESTER_KEY_LENGTH: usize = 32;
pub const TX_AMOUNT_LENGTH: usize = 8;

/// Length of the type-dependent description carried by a decoded transaction.
pub const SHORT_DESCRIPTION_LENGTH: usize = 22;

/// Longest delegate name copied out of a REGISTERDELEGATE trailer.
pub const MAX_DELEGATE_NAME_LENGTH: usize = 21;

/// Bytes of the embedded key shown on each side of a second-signature fingerprint.
pub const FINGERPRINT_EDGE_BYTES: usize = 3;

/// Type tags.
pub const TXTYPE_SEND: u8 = 0;
pub const TXTYPE_CREATESIGNATURE: u8 = 1;
pub const TXTYPE_REGISTERDELEGATE: u8 = 2;
pub const TXTYPE_VOTE: u8 = 3;
pub const TXTYPE_CREATEMULTISIG: u8 = 4;

/// Smallest-unit decimals of the native asset.
pub const AMOUNT_DECIMALS: u32 = 8;

/// Ticker shown next to amounts on the confirmation screen.
pub const TICKER: &str = "RISE";

// ---------------------------------------------------------------------------
// Status words
// ---------------------------------------------------------------------------

/// Command completed.
pub const SW_OK: u16 = 0x9000;

/// Base of the invalid-path-length status; the offending length is added.
pub const SW_INVALID_PATH_LENGTH_BASE: u16 = 0x6A80;

/// Buffer shorter than the structure it claims to hold.
pub const SW_WRONG_LENGTH: u16 = 0x6700;

/// The operator declined on the device.
pub const SW_USER_REJECTED: u16 = 0x6985;

/// A trusted primitive failed; the command is aborted.
pub const SW_INTERNAL_ERROR: u16 = 0x6F00;

/// Malformed parameters, e.g. a path component that is not a number.
pub const SW_WRONG_PARAMETERS: u16 = 0x6B00;

/// Unknown instruction.
pub const SW_UNKNOWN_COMMAND: u16 = 0x6D00;

/// Offset of the recipient field from the start of a transaction.
pub const fn recipient_offset(has_requester: bool) -> usize {
    TX_TYPE_LENGTH
        + TX_TIMESTAMP_LENGTH
        + TX_SENDER_KEY_LENGTH
        + if has_requester {
            TX_REQUESTER_KEY_LENGTH
        } else {
            0
        }
}

/// Offset of the type-specific trailer: right after the amount.
pub const fn trailer_offset(has_requester: bool) -> usize {
    recipient_offset(has_requester) + ADDRESS_FIELD_LENGTH + TX_AMOUNT_LENGTH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_buffer_fits_largest_value() {
        let rendered = format!("{}{}", u64::MAX, ADDRESS_SUFFIX);
        assert_eq!(rendered.len() + 1, ADDRESS_STRING_BUFFER_LENGTH);
    }

    #[test]
    fn header_offsets() {
        assert_eq!(recipient_offset(false), 37);
        assert_eq!(recipient_offset(true), 69);
        assert_eq!(trailer_offset(false), 53);
        assert_eq!(trailer_offset(true), 85);
    }

    #[test]
    fn status_word_room_for_every_length_byte() {
        assert_eq!(SW_INVALID_PATH_LENGTH_BASE.checked_add(0xFF), Some(0x6B7F));
    }
}
