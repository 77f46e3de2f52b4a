//! # Device Commands
//!
//! The command layer that sits where the secure element's APDU dispatcher
//! would. A request is an instruction byte, a parameter byte and a payload
//! that always starts with a path buffer.
//!
//! Signing commands follow one order and never skip a step:
//!
//! 1. read the path (so its length is validated before anything else)
//! 2. decode what is to be signed and build the screens
//! 3. ask the operator
//! 4. derive the key and sign
//!
//! A rejection at step 3 returns `0x6985` without touching key material.

use serde::{Serialize, Serializer};
use tracing::{info, warn};

use rise_protocol::address::Address;
use rise_protocol::crypto::{sign, HierarchicalPath, KeyDeriver, NodeDeriver, PublicKey, Signature};
use rise_protocol::error::{LedgerError, LedgerResult, StatusWord};
use rise_protocol::transaction::{parse, ConfirmationSummary};

pub const INS_GET_PUBLIC_KEY: u8 = 0x04;
pub const INS_SIGN_TRANSACTION: u8 = 0x05;
pub const INS_SIGN_MESSAGE: u8 = 0x06;
pub const INS_VERSION: u8 = 0x09;

/// P1 bit for sign-transaction: a requester key follows the sender key.
pub const P1_HAS_REQUESTER: u8 = 0x01;

/// A decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    GetPublicKey,
    SignTransaction { has_requester: bool },
    SignMessage,
    Version,
}

impl Command {
    pub fn decode(ins: u8, p1: u8) -> LedgerResult<Self> {
        match ins {
            INS_GET_PUBLIC_KEY => Ok(Command::GetPublicKey),
            INS_SIGN_TRANSACTION => Ok(Command::SignTransaction {
                has_requester: p1 & P1_HAS_REQUESTER != 0,
            }),
            INS_SIGN_MESSAGE => Ok(Command::SignMessage),
            INS_VERSION => Ok(Command::Version),
            other => Err(LedgerError::UnknownCommand(other)),
        }
    }
}

/// The operator in front of the device.
pub trait Confirmer {
    /// Show `screens` and return whether the operator approved.
    fn confirm(&mut self, screens: &[(String, String)]) -> bool;
}

/// Answers every prompt the same way. `--yes` on the command line.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl Confirmer for AutoConfirm {
    fn confirm(&mut self, _screens: &[(String, String)]) -> bool {
        self.0
    }
}

/// What goes back to the host.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    #[serde(serialize_with = "serialize_status")]
    pub status: StatusWord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<PublicKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<Signature>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ConfirmationSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    fn ok() -> Self {
        Self {
            status: StatusWord::OK,
            public_key: None,
            address: None,
            signature: None,
            summary: None,
            version: None,
            error: None,
        }
    }

    fn failure(err: &LedgerError) -> Self {
        Self {
            status: err.status_word(),
            error: Some(err.to_string()),
            ..Self::ok()
        }
    }

    /// Raw reply: public key, then signature, then the status word.
    pub fn to_apdu(&self) -> Vec<u8> {
        let mut out = Vec::new();
        if let Some(public_key) = &self.public_key {
            out.extend_from_slice(public_key.as_bytes());
        }
        if let Some(signature) = &self.signature {
            out.extend_from_slice(signature.as_bytes());
        }
        out.extend_from_slice(&self.status.to_be_bytes());
        out
    }
}

fn serialize_status<S: Serializer>(status: &StatusWord, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(status)
}

/// Runs commands against one derivation backend.
pub struct Device<D> {
    deriver: KeyDeriver<D>,
}

impl<D: NodeDeriver> Device<D> {
    pub fn new(node_deriver: D) -> Self {
        Self {
            deriver: KeyDeriver::new(node_deriver),
        }
    }

    /// Execute one request. Never fails: errors become a status word.
    pub fn handle(
        &self,
        ins: u8,
        p1: u8,
        payload: &[u8],
        confirmer: &mut dyn Confirmer,
    ) -> Response {
        match self.dispatch(ins, p1, payload, confirmer) {
            Ok(response) => response,
            Err(err) => {
                let response = Response::failure(&err);
                warn!(ins, status = %response.status, error = %err, "command failed");
                response
            }
        }
    }

    fn dispatch(
        &self,
        ins: u8,
        p1: u8,
        payload: &[u8],
        confirmer: &mut dyn Confirmer,
    ) -> LedgerResult<Response> {
        match Command::decode(ins, p1)? {
            Command::GetPublicKey => self.get_public_key(payload),
            Command::SignTransaction { has_requester } => {
                self.sign_transaction(payload, has_requester, confirmer)
            }
            Command::SignMessage => self.sign_message(payload, confirmer),
            Command::Version => Ok(Response {
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
                ..Response::ok()
            }),
        }
    }

    fn get_public_key(&self, payload: &[u8]) -> LedgerResult<Response> {
        let derived = self.deriver.derive(payload)?;
        let public_key = derived.key_pair.public_key;
        let address = Address::from_public_key(&public_key);
        info!(path = %derived.path, %address, "public key exported");

        Ok(Response {
            public_key: Some(public_key),
            address: Some(address),
            ..Response::ok()
        })
    }

    fn sign_transaction(
        &self,
        payload: &[u8],
        has_requester: bool,
        confirmer: &mut dyn Confirmer,
    ) -> LedgerResult<Response> {
        let (path, consumed) = HierarchicalPath::read(payload)?;
        let tx_bytes = &payload[consumed..];

        let tx = parse(tx_bytes, has_requester)?;
        let summary = ConfirmationSummary::from_transaction(&tx);
        if !confirmer.confirm(&summary.lines()) {
            info!(%path, "transaction rejected by operator");
            return Err(LedgerError::Rejected);
        }

        let derived = self.deriver.derive(payload)?;
        let signature = sign(&derived.key_pair.private_key, tx_bytes);
        info!(%path, tx_type = %tx.tx_type, "transaction signed");

        Ok(Response {
            public_key: Some(derived.key_pair.public_key),
            signature: Some(signature),
            summary: Some(summary),
            ..Response::ok()
        })
    }

    fn sign_message(
        &self,
        payload: &[u8],
        confirmer: &mut dyn Confirmer,
    ) -> LedgerResult<Response> {
        let (path, consumed) = HierarchicalPath::read(payload)?;
        let message = &payload[consumed..];

        let shown = match std::str::from_utf8(message) {
            Ok(text) => text.to_string(),
            Err(_) => hex::encode(message),
        };
        let screens = vec![("Sign message".to_string(), shown)];
        if !confirmer.confirm(&screens) {
            info!(%path, "message rejected by operator");
            return Err(LedgerError::Rejected);
        }

        let derived = self.deriver.derive(payload)?;
        let signature = sign(&derived.key_pair.private_key, message);
        info!(%path, message_len = message.len(), "message signed");

        Ok(Response {
            public_key: Some(derived.key_pair.public_key),
            signature: Some(signature),
            ..Response::ok()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rise_protocol::crypto::{verify, DerivationError, Slip10Deriver};
    use std::cell::Cell;

    const PATH: &str = "44'/1120'/0'";

    /// Counts how often the key derivation primitive runs.
    struct CountingDeriver {
        inner: Slip10Deriver,
        calls: Cell<usize>,
    }

    impl NodeDeriver for CountingDeriver {
        fn derive_node(
            &self,
            path: &HierarchicalPath,
            seed_key: &[u8],
            out: &mut [u8; 32],
        ) -> Result<(), DerivationError> {
            self.calls.set(self.calls.get() + 1);
            self.inner.derive_node(path, seed_key, out)
        }
    }

    fn device() -> Device<CountingDeriver> {
        Device::new(CountingDeriver {
            inner: Slip10Deriver::new(&[0x17; 64]),
            calls: Cell::new(0),
        })
    }

    fn calls(device: &Device<CountingDeriver>) -> usize {
        device.deriver.node_deriver().calls.get()
    }

    fn path_bytes() -> Vec<u8> {
        PATH.parse::<HierarchicalPath>().unwrap().to_bytes()
    }

    fn send_payload() -> Vec<u8> {
        let mut payload = path_bytes();
        payload.push(0);
        payload.extend_from_slice(&[0; 4]);
        payload.extend_from_slice(&[0x01; 32]);
        payload.extend_from_slice(&42u64.to_be_bytes());
        payload.extend_from_slice(&100_000_000u64.to_le_bytes());
        payload
    }

    /// Records the screens it was shown.
    struct Recorder {
        approve: bool,
        seen: Vec<(String, String)>,
    }

    impl Confirmer for Recorder {
        fn confirm(&mut self, screens: &[(String, String)]) -> bool {
            self.seen = screens.to_vec();
            self.approve
        }
    }

    #[test]
    fn get_public_key_returns_address() {
        let device = device();
        let response = device.handle(INS_GET_PUBLIC_KEY, 0, &path_bytes(), &mut AutoConfirm(false));
        assert!(response.status.is_ok());
        let public_key = response.public_key.unwrap();
        assert_eq!(response.address, Some(Address::from_public_key(&public_key)));
    }

    #[test]
    fn sign_transaction_after_approval() {
        let device = device();
        let payload = send_payload();
        let mut recorder = Recorder {
            approve: true,
            seen: Vec::new(),
        };
        let response = device.handle(INS_SIGN_TRANSACTION, 0, &payload, &mut recorder);

        assert_eq!(response.status, StatusWord::OK);
        assert_eq!(recorder.seen[1], ("Recipient".to_string(), "42R".to_string()));
        assert_eq!(recorder.seen[2], ("Amount".to_string(), "1.00000000 RISE".to_string()));

        let tx_bytes = &payload[path_bytes().len()..];
        assert!(verify(
            response.public_key.as_ref().unwrap(),
            tx_bytes,
            response.signature.as_ref().unwrap()
        ));
    }

    #[test]
    fn rejection_never_derives() {
        let device = device();
        let mut recorder = Recorder {
            approve: false,
            seen: Vec::new(),
        };
        let response = device.handle(INS_SIGN_TRANSACTION, 0, &send_payload(), &mut recorder);
        assert_eq!(response.status, StatusWord(0x6985));
        assert!(response.signature.is_none());
        assert!(!recorder.seen.is_empty());
        assert_eq!(calls(&device), 0);
    }

    #[test]
    fn malformed_transaction_is_never_shown() {
        let device = device();
        let mut payload = send_payload();
        payload.truncate(payload.len() - 1);
        let mut recorder = Recorder {
            approve: true,
            seen: Vec::new(),
        };
        let response = device.handle(INS_SIGN_TRANSACTION, 0, &payload, &mut recorder);
        assert_eq!(response.status, StatusWord::WRONG_LENGTH);
        assert!(recorder.seen.is_empty());
        assert_eq!(calls(&device), 0);
    }

    #[test]
    fn requester_flag_from_p1() {
        assert_eq!(
            Command::decode(INS_SIGN_TRANSACTION, P1_HAS_REQUESTER).unwrap(),
            Command::SignTransaction {
                has_requester: true
            }
        );
        // Without the requester bytes the send payload is too short.
        let device = device();
        let response = device.handle(
            INS_SIGN_TRANSACTION,
            P1_HAS_REQUESTER,
            &send_payload(),
            &mut AutoConfirm(true),
        );
        assert_eq!(response.status, StatusWord::WRONG_LENGTH);
    }

    #[test]
    fn invalid_path_length_status() {
        let device = device();
        let mut payload = vec![11u8];
        payload.extend_from_slice(&[0x80; 44]);
        let response = device.handle(INS_GET_PUBLIC_KEY, 0, &payload, &mut AutoConfirm(true));
        assert_eq!(response.status, StatusWord(0x6A8B));
        assert!(response.error.is_some());
    }

    #[test]
    fn sign_message_shows_text() {
        let device = device();
        let mut payload = path_bytes();
        payload.extend_from_slice(b"hello RISE");
        let mut recorder = Recorder {
            approve: true,
            seen: Vec::new(),
        };
        let response = device.handle(INS_SIGN_MESSAGE, 0, &payload, &mut recorder);
        assert!(response.status.is_ok());
        assert_eq!(recorder.seen[0].1, "hello RISE");
        assert!(verify(
            response.public_key.as_ref().unwrap(),
            b"hello RISE",
            response.signature.as_ref().unwrap()
        ));
    }

    #[test]
    fn unknown_instruction() {
        let response = device().handle(0x42, 0, &[], &mut AutoConfirm(true));
        assert_eq!(response.status, StatusWord(0x6D00));
        assert_eq!(response.to_apdu(), vec![0x6D, 0x00]);
    }

    #[test]
    fn version_and_json_shape() {
        let response = device().handle(INS_VERSION, 0, &[], &mut AutoConfirm(true));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "0x9000");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
        assert!(json.get("signature").is_none());
    }

    #[test]
    fn apdu_layout() {
        let device = device();
        let response = device.handle(INS_SIGN_TRANSACTION, 0, &send_payload(), &mut AutoConfirm(true));
        let apdu = response.to_apdu();
        assert_eq!(apdu.len(), 32 + 64 + 2);
        assert_eq!(&apdu[96..], &[0x90, 0x00]);
    }
}
