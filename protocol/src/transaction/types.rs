//! Core type definitions for decoded RISE transactions.
//!
//! A [`Transaction`] here is not the full on-chain object. It is the small,
//! fixed-size record the device needs to show the operator what they are
//! about to sign: the type, the recipient, the amount, and a 22-byte
//! description whose meaning depends on the type.

use serde::{Serialize, Serializer};
use std::fmt;

use crate::address::Address;
use crate::config::{
    SHORT_DESCRIPTION_LENGTH, TXTYPE_CREATEMULTISIG, TXTYPE_CREATESIGNATURE,
    TXTYPE_REGISTERDELEGATE, TXTYPE_SEND, TXTYPE_VOTE,
};

// ---------------------------------------------------------------------------
// TransactionType
// ---------------------------------------------------------------------------

/// Discriminant of a transaction, taken from its first byte.
///
/// Unknown tags are not an error: they decode with an empty description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Plain value transfer.
    Send,
    /// Registers a second signature public key.
    CreateSignature,
    /// Registers the sender as a delegate under a name.
    RegisterDelegate,
    /// Adds and removes votes for delegates.
    Vote,
    /// Turns the account into a multisignature account.
    CreateMultisig,
    /// Any tag this device has no decoder for.
    Other(u8),
}

impl TransactionType {
    pub fn tag(self) -> u8 {
        match self {
            Self::Send => TXTYPE_SEND,
            Self::CreateSignature => TXTYPE_CREATESIGNATURE,
            Self::RegisterDelegate => TXTYPE_REGISTERDELEGATE,
            Self::Vote => TXTYPE_VOTE,
            Self::CreateMultisig => TXTYPE_CREATEMULTISIG,
            Self::Other(tag) => tag,
        }
    }
}

impl From<u8> for TransactionType {
    fn from(tag: u8) -> Self {
        match tag {
            TXTYPE_SEND => Self::Send,
            TXTYPE_CREATESIGNATURE => Self::CreateSignature,
            TXTYPE_REGISTERDELEGATE => Self::RegisterDelegate,
            TXTYPE_VOTE => Self::Vote,
            TXTYPE_CREATEMULTISIG => Self::CreateMultisig,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Send => write!(f, "Send"),
            Self::CreateSignature => write!(f, "Second signature"),
            Self::RegisterDelegate => write!(f, "Register delegate"),
            Self::Vote => write!(f, "Vote"),
            Self::CreateMultisig => write!(f, "Create multisig"),
            Self::Other(tag) => write!(f, "Type {}", tag),
        }
    }
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// The decoded, display-safe view of a raw transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub tx_type: TransactionType,
    pub recipient: Address,
    /// Smallest indivisible unit, 10^-8 RISE.
    pub amount: u64,
    /// Type-dependent; see [`Transaction::details`].
    #[serde(serialize_with = "serialize_hex")]
    pub short_desc: [u8; SHORT_DESCRIPTION_LENGTH],
}

/// The description interpreted according to the transaction type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransactionDetails {
    /// Send and unknown types carry nothing beyond recipient and amount.
    None,
    /// First and last three bytes of the new second-signature key.
    SecondSignature { fingerprint: String },
    Delegate { name: String },
    Votes { added: u8, removed: u8 },
    Multisig { min_signatures: u8, lifetime: u8 },
}

impl Transaction {
    pub fn details(&self) -> TransactionDetails {
        match self.tx_type {
            TransactionType::CreateSignature => TransactionDetails::SecondSignature {
                fingerprint: self.description_text(),
            },
            TransactionType::RegisterDelegate => TransactionDetails::Delegate {
                name: self.description_text(),
            },
            TransactionType::Vote => TransactionDetails::Votes {
                added: self.short_desc[0],
                removed: self.short_desc[1],
            },
            TransactionType::CreateMultisig => TransactionDetails::Multisig {
                min_signatures: self.short_desc[0],
                lifetime: self.short_desc[1],
            },
            TransactionType::Send | TransactionType::Other(_) => TransactionDetails::None,
        }
    }

    /// The description up to its first NUL, as text.
    pub fn description_text(&self) -> String {
        let end = self
            .short_desc
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(SHORT_DESCRIPTION_LENGTH);
        String::from_utf8_lossy(&self.short_desc[..end]).into_owned()
    }
}

fn serialize_hex<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(tx_type: TransactionType, desc: &[u8]) -> Transaction {
        let mut short_desc = [0u8; SHORT_DESCRIPTION_LENGTH];
        short_desc[..desc.len()].copy_from_slice(desc);
        Transaction {
            tx_type,
            recipient: Address(0),
            amount: 0,
            short_desc,
        }
    }

    #[test]
    fn tag_roundtrip() {
        for tag in 0u8..=255 {
            assert_eq!(TransactionType::from(tag).tag(), tag);
        }
        assert_eq!(TransactionType::from(3), TransactionType::Vote);
        assert_eq!(TransactionType::from(9), TransactionType::Other(9));
    }

    #[test]
    fn display_labels() {
        assert_eq!(TransactionType::Send.to_string(), "Send");
        assert_eq!(TransactionType::Other(7).to_string(), "Type 7");
    }

    #[test]
    fn details_per_type() {
        assert_eq!(
            tx(TransactionType::Vote, &[3, 1]).details(),
            TransactionDetails::Votes {
                added: 3,
                removed: 1
            }
        );
        assert_eq!(
            tx(TransactionType::RegisterDelegate, b"genesis_1").details(),
            TransactionDetails::Delegate {
                name: "genesis_1".to_string()
            }
        );
        assert_eq!(
            tx(TransactionType::CreateMultisig, &[2, 24]).details(),
            TransactionDetails::Multisig {
                min_signatures: 2,
                lifetime: 24
            }
        );
        assert_eq!(
            tx(TransactionType::Other(200), &[1, 2, 3]).details(),
            TransactionDetails::None
        );
    }

    #[test]
    fn description_text_stops_at_terminator() {
        let t = tx(TransactionType::RegisterDelegate, b"abc\0def");
        assert_eq!(t.description_text(), "abc");
    }

    #[test]
    fn serializes_description_as_hex() {
        let json = serde_json::to_value(tx(TransactionType::Vote, &[3, 1])).unwrap();
        assert_eq!(json["tx_type"], "vote");
        assert_eq!(json["recipient"], "0R");
        assert_eq!(
            json["short_desc"],
            "03010000000000000000000000000000000000000000"
        );
    }
}
