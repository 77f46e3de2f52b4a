//! # Transaction Parser
//!
//! Turns the raw bytes the host sends into a [`Transaction`] the device can
//! display. The parser never trusts a length it did not check: every read
//! is bounds-checked against the buffer and a short buffer is an error, not
//! a read past the end.
//!
//! ## Layout
//!
//! ```text
//! offset  size  field
//! 0       1     type tag
//! 1       4     timestamp              (skipped)
//! 5       32    sender public key      (skipped)
//! 37      32    requester public key   (only when has_requester)
//! 37|69   8     recipient, most significant byte first
//! 45|77   8     amount, least significant byte first
//! 53|85   ..    type-specific trailer
//! ```

use thiserror::Error;
use tracing::debug;

use crate::address::Address;
use crate::config::{
    recipient_offset, trailer_offset, ADDRESS_FIELD_LENGTH, FINGERPRINT_EDGE_BYTES,
    MAX_DELEGATE_NAME_LENGTH, PUBLIC_KEY_LENGTH, SHORT_DESCRIPTION_LENGTH, TX_AMOUNT_LENGTH,
};

use super::types::{Transaction, TransactionType};

/// Errors from decoding a raw transaction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("transaction truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("declared length {length} exceeds the {buffer}-byte buffer")]
    LengthExceedsBuffer { length: usize, buffer: usize },
}

/// Decode every byte of `tx`.
pub fn parse(tx: &[u8], has_requester: bool) -> Result<Transaction, ParseError> {
    parse_with_length(tx, tx.len(), has_requester)
}

/// Decode the first `length` bytes of `buffer`.
///
/// The host states the length separately from the buffer it fills, so the
/// two are checked against each other before anything is read.
pub fn parse_with_length(
    buffer: &[u8],
    length: usize,
    has_requester: bool,
) -> Result<Transaction, ParseError> {
    if length > buffer.len() {
        return Err(ParseError::LengthExceedsBuffer {
            length,
            buffer: buffer.len(),
        });
    }
    let tx = &buffer[..length];

    let header_end = trailer_offset(has_requester);
    if tx.len() < header_end {
        debug!(length, needed = header_end, "transaction shorter than its header");
        return Err(ParseError::Truncated {
            needed: header_end,
            available: tx.len(),
        });
    }

    let tx_type = TransactionType::from(tx[0]);

    let recipient_at = recipient_offset(has_requester);
    let mut recipient_field = [0u8; ADDRESS_FIELD_LENGTH];
    recipient_field.copy_from_slice(&tx[recipient_at..recipient_at + ADDRESS_FIELD_LENGTH]);
    let recipient = Address::from_field(&recipient_field);

    let amount_at = recipient_at + ADDRESS_FIELD_LENGTH;
    let mut amount_field = [0u8; TX_AMOUNT_LENGTH];
    amount_field.copy_from_slice(&tx[amount_at..amount_at + TX_AMOUNT_LENGTH]);
    let amount = u64::from_le_bytes(amount_field);

    let mut short_desc = [0u8; SHORT_DESCRIPTION_LENGTH];
    TrailerDecoder::for_type(tx_type).decode(&tx[header_end..], header_end, &mut short_desc)?;

    let parsed = Transaction {
        tx_type,
        recipient,
        amount,
        short_desc,
    };
    debug!(
        tx_type = %parsed.tx_type,
        recipient = %parsed.recipient,
        amount = parsed.amount,
        "decoded transaction"
    );
    Ok(parsed)
}

// ---------------------------------------------------------------------------
// Trailer decoders
// ---------------------------------------------------------------------------

/// One decoder per known trailer shape. An unknown tag maps to `Empty` and
/// never reaches a byte-level decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrailerDecoder {
    Fingerprint,
    DelegateName,
    VoteTally,
    MultisigParams,
    Empty,
}

impl TrailerDecoder {
    fn for_type(tx_type: TransactionType) -> Self {
        match tx_type {
            TransactionType::CreateSignature => Self::Fingerprint,
            TransactionType::RegisterDelegate => Self::DelegateName,
            TransactionType::Vote => Self::VoteTally,
            TransactionType::CreateMultisig => Self::MultisigParams,
            TransactionType::Send | TransactionType::Other(_) => Self::Empty,
        }
    }

    /// `offset` is where the trailer starts in the transaction, for errors.
    fn decode(
        self,
        trailer: &[u8],
        offset: usize,
        out: &mut [u8; SHORT_DESCRIPTION_LENGTH],
    ) -> Result<(), ParseError> {
        let require = |needed: usize| {
            if trailer.len() < needed {
                Err(ParseError::Truncated {
                    needed: offset + needed,
                    available: offset + trailer.len(),
                })
            } else {
                Ok(())
            }
        };

        match self {
            Self::Fingerprint => {
                require(PUBLIC_KEY_LENGTH)?;
                write_fingerprint(&trailer[..PUBLIC_KEY_LENGTH], out);
            }
            Self::DelegateName => write_delegate_name(trailer, out),
            Self::VoteTally => write_vote_tally(trailer, out),
            Self::MultisigParams => {
                require(2)?;
                out[0] = trailer[0];
                out[1] = trailer[1];
            }
            Self::Empty => {}
        }
        Ok(())
    }
}

/// `aabbcc..ddeeff`: hex of the first and last three key bytes.
fn write_fingerprint(key: &[u8], out: &mut [u8; SHORT_DESCRIPTION_LENGTH]) {
    let hex_len = FINGERPRINT_EDGE_BYTES * 2;
    let head = hex::encode(&key[..FINGERPRINT_EDGE_BYTES]);
    let tail = hex::encode(&key[key.len() - FINGERPRINT_EDGE_BYTES..]);

    out[..hex_len].copy_from_slice(head.as_bytes());
    out[hex_len..hex_len + 2].copy_from_slice(b"..");
    out[hex_len + 2..hex_len * 2 + 2].copy_from_slice(tail.as_bytes());
}

fn is_delegate_name_byte(b: u8) -> bool {
    b.is_ascii_lowercase() || b.is_ascii_digit() || b"!@$&_.".contains(&b)
}

/// Copy up to 21 bytes; the first byte outside the name alphabet and
/// everything after it become zero.
fn write_delegate_name(trailer: &[u8], out: &mut [u8; SHORT_DESCRIPTION_LENGTH]) {
    let n = trailer.len().min(MAX_DELEGATE_NAME_LENGTH);
    out[..n].copy_from_slice(&trailer[..n]);

    if let Some(bad) = out[..n].iter().position(|&b| !is_delegate_name_byte(b)) {
        out[bad..].fill(0);
    }
}

/// Count `+` into byte 0 and `-` into byte 1, modulo 256.
fn write_vote_tally(trailer: &[u8], out: &mut [u8; SHORT_DESCRIPTION_LENGTH]) {
    let (added, removed) = trailer.iter().fold((0u8, 0u8), |(add, rem), &b| match b {
        b'+' => (add.wrapping_add(1), rem),
        b'-' => (add, rem.wrapping_add(1)),
        _ => (add, rem),
    });
    out[0] = added;
    out[1] = removed;
}
