//! What the operator sees before approving a signature.
//!
//! The summary is built from the parsed transaction only; nothing on screen
//! comes straight from the host's buffer.

use serde::Serialize;

use crate::config::{AMOUNT_DECIMALS, TICKER};

use super::types::{Transaction, TransactionDetails, TransactionType};

/// `150_000_000` becomes `"1.50000000 RISE"`.
pub fn format_amount(value: u64) -> String {
    let divisor = 10u64.pow(AMOUNT_DECIMALS);
    format!(
        "{}.{:0>width$} {}",
        value / divisor,
        value % divisor,
        TICKER,
        width = AMOUNT_DECIMALS as usize
    )
}

/// Labelled screens for one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmationSummary {
    pub operation: String,
    /// Always present for a send or an unrecognised tag; for the other
    /// known types only when the decoded field is non-zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    pub amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<(String, String)>,
}

impl ConfirmationSummary {
    pub fn from_transaction(tx: &Transaction) -> Self {
        let recipient = match tx.tx_type {
            TransactionType::Send | TransactionType::Other(_) => Some(tx.recipient.to_string()),
            _ if tx.recipient.0 != 0 => Some(tx.recipient.to_string()),
            _ => None,
        };

        let detail = match tx.details() {
            TransactionDetails::None => None,
            TransactionDetails::SecondSignature { fingerprint } => {
                Some(("Public key".to_string(), fingerprint))
            }
            TransactionDetails::Delegate { name } => Some(("Delegate".to_string(), name)),
            TransactionDetails::Votes { added, removed } => {
                Some(("Votes".to_string(), format!("+{} / -{}", added, removed)))
            }
            TransactionDetails::Multisig {
                min_signatures,
                lifetime,
            } => Some((
                "Multisig".to_string(),
                format!("min {} signatures, lifetime {}h", min_signatures, lifetime),
            )),
        };

        Self {
            operation: tx.tx_type.to_string(),
            recipient,
            amount: format_amount(tx.amount),
            detail,
        }
    }

    /// Screens in display order.
    pub fn lines(&self) -> Vec<(String, String)> {
        let mut lines = vec![("Operation".to_string(), self.operation.clone())];
        if let Some(recipient) = &self.recipient {
            lines.push(("Recipient".to_string(), recipient.clone()));
        }
        lines.push(("Amount".to_string(), self.amount.clone()));
        if let Some(detail) = &self.detail {
            lines.push(detail.clone());
        }
        lines
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl From<&Transaction> for ConfirmationSummary {
    fn from(tx: &Transaction) -> Self {
        Self::from_transaction(tx)
    }
}
