// Copyright (c) 2026 RISE Ledger Team. MIT License.
// See LICENSE for details.

//! # RISE Protocol: Signing Core
//!
//! The part of a RISE hardware wallet that sits between the host's bytes
//! and the secure element: it decodes what the host wants signed, shows the
//! operator a summary they can trust, derives the key for the requested
//! path, and signs.
//!
//! ## Architecture
//!
//! - **address**: RISE addresses: `u64` values shown as decimal plus `R`.
//! - **crypto**: point encoding, SHA-256, SLIP-0010 key derivation and
//!   Ed25519 signing. Secret buffers are wiped on every exit.
//! - **transaction**: bounds-checked transaction decoding and the
//!   confirmation summary.
//! - **error**: per-module errors folded into a two-byte status word.
//! - **config**: every protocol constant in one place.
//!
//! ## Command flow
//!
//! ```text
//! host payload: path | transaction
//!   1. HierarchicalPath::read     -> bytes consumed
//!   2. transaction::parse          -> Transaction
//!   3. ConfirmationSummary         -> operator approves or rejects
//!   4. KeyDeriver::derive          -> KeyPair (scratch wiped)
//!   5. crypto::sign                -> 64-byte Ed25519 signature
//! ```
//!
//! Nothing is signed that was not displayed first, and no key is derived
//! for a command the operator rejected.

pub mod address;
pub mod config;
pub mod crypto;
pub mod error;
pub mod transaction;

pub use address::{derive_address, Address};
pub use crypto::{
    DerivationError, HierarchicalPath, KeyDeriver, KeyPair, PrivateKey, PublicKey, Signature,
    Slip10Deriver,
};
pub use error::{LedgerError, LedgerResult, StatusWord};
pub use transaction::{parse, ConfirmationSummary, Transaction, TransactionType};

/// Crate version, reported by the device's version command.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
