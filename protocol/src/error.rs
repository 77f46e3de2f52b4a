//! Crate-level error and status word surface.
//!
//! The device talks to its host through two-byte status words and nothing
//! else. Every module keeps its own `thiserror` enum; [`LedgerError`] gathers
//! them so the command layer can turn any failure into exactly one
//! [`StatusWord`] without inspecting strings.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{
    SW_INTERNAL_ERROR, SW_INVALID_PATH_LENGTH_BASE, SW_OK, SW_UNKNOWN_COMMAND, SW_USER_REJECTED,
    SW_WRONG_LENGTH, SW_WRONG_PARAMETERS,
};
use crate::crypto::derivation::DerivationError;
use crate::crypto::keys::KeyError;
use crate::transaction::ParseError;

/// A two-byte command status as returned to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusWord(pub u16);

impl StatusWord {
    pub const OK: StatusWord = StatusWord(SW_OK);
    pub const WRONG_LENGTH: StatusWord = StatusWord(SW_WRONG_LENGTH);
    pub const USER_REJECTED: StatusWord = StatusWord(SW_USER_REJECTED);
    pub const INTERNAL_ERROR: StatusWord = StatusWord(SW_INTERNAL_ERROR);
    pub const UNKNOWN_COMMAND: StatusWord = StatusWord(SW_UNKNOWN_COMMAND);
    pub const WRONG_PARAMETERS: StatusWord = StatusWord(SW_WRONG_PARAMETERS);

    /// Status for a path length outside the accepted range. The length is
    /// folded into the code so the host can tell `0x6A80` (empty) from
    /// `0x6A8B` (eleven components).
    pub fn invalid_path_length(length: u8) -> Self {
        StatusWord(SW_INVALID_PATH_LENGTH_BASE.wrapping_add(u16::from(length)))
    }

    pub fn is_ok(self) -> bool {
        self.0 == SW_OK
    }

    pub fn to_be_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

/// Any failure that aborts a device command.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("transaction rejected: {0}")]
    Parse(#[from] ParseError),

    #[error("key derivation aborted: {0}")]
    Derivation(#[from] DerivationError),

    #[error("key error: {0}")]
    Key(#[from] KeyError),

    /// The operator declined the confirmation screen.
    #[error("rejected by user")]
    Rejected,

    #[error("unknown command 0x{0:02x}")]
    UnknownCommand(u8),
}

impl LedgerError {
    /// The status word the host receives for this failure.
    pub fn status_word(&self) -> StatusWord {
        match self {
            LedgerError::Parse(_) => StatusWord::WRONG_LENGTH,
            LedgerError::Derivation(e) => e.status_word(),
            LedgerError::Key(_) => StatusWord::INTERNAL_ERROR,
            LedgerError::Rejected => StatusWord::USER_REJECTED,
            LedgerError::UnknownCommand(_) => StatusWord::UNKNOWN_COMMAND,
        }
    }
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_lengths_are_distinguishable() {
        assert_eq!(StatusWord::invalid_path_length(0), StatusWord(0x6A80));
        assert_eq!(StatusWord::invalid_path_length(11), StatusWord(0x6A8B));
        assert_ne!(
            StatusWord::invalid_path_length(0),
            StatusWord::invalid_path_length(11)
        );
    }

    #[test]
    fn status_word_display() {
        assert_eq!(StatusWord::OK.to_string(), "0x9000");
        assert_eq!(StatusWord::invalid_path_length(12).to_string(), "0x6A8C");
    }

    #[test]
    fn errors_map_to_status_words() {
        let err = LedgerError::from(DerivationError::InvalidPathLength(0));
        assert_eq!(err.status_word(), StatusWord(0x6A80));

        let err = LedgerError::from(ParseError::Truncated {
            needed: 53,
            available: 10,
        });
        assert_eq!(err.status_word(), StatusWord::WRONG_LENGTH);

        assert_eq!(LedgerError::Rejected.status_word(), StatusWord(0x6985));
        assert!(!LedgerError::Rejected.status_word().is_ok());
    }
}
