//! # Transaction Module
//!
//! Decoding of the raw transactions a host asks the device to sign, and the
//! confirmation summary built from them.
//!
//! ## Architecture
//!
//! ```text
//! types.rs: TransactionType, the decoded Transaction, per-type details
//! parser.rs: bounds-checked decoding of the wire layout
//! summary.rs: the labelled screens shown before signing
//! ```
//!
//! ## Design Decisions
//!
//! - The parser only extracts what is displayed. Timestamp and sender key
//!   are skipped; the signature still covers them.
//! - Every type-specific trailer has its own decoder. Unknown tags decode
//!   with an empty description rather than failing.
//! - Amounts stay `u64` in the smallest unit. No floating point.

pub mod parser;
pub mod summary;
pub mod types;

pub use parser::{parse, parse_with_length, ParseError};
pub use summary::{format_amount, ConfirmationSummary};
pub use types::{Transaction, TransactionDetails, TransactionType};
