//! Walkthrough of one signing command on the RISE signing core.
//!
//! Derives an account, shows its address, decodes a send transaction into
//! the screens the operator would approve, signs it and checks the
//! signature, timing each step.
//!
//! Run with:
//!   cargo run --example sign_flow --release

use std::time::Instant;

use rise_protocol::address::Address;
use rise_protocol::crypto::{sign, verify, HierarchicalPath, KeyDeriver, Slip10Deriver};
use rise_protocol::transaction::{parse, ConfirmationSummary};

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

fn step(title: &str) {
    println!();
    println!("{BOLD}  {title}{RESET}");
}

fn field(label: &str, value: impl std::fmt::Display) {
    println!("    {label:<12} {YELLOW}{value}{RESET}");
}

fn timing(started: Instant) {
    let ms = started.elapsed().as_secs_f64() * 1000.0;
    println!("{DIM}    [{ms:.2} ms]{RESET}");
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let deriver = KeyDeriver::new(Slip10Deriver::new(&[0x42; 64]));
    let path: HierarchicalPath = "44'/1120'/0'".parse()?;

    step("1. Account");
    let started = Instant::now();
    let account = deriver.derive_path(&path)?;
    field("path", path);
    field("public key", &account.public_key);
    field("address", Address::from_public_key(&account.public_key));
    timing(started);

    // type | timestamp | sender | recipient (BE) | amount (LE)
    let mut tx = vec![0u8];
    tx.extend_from_slice(&36_000_000u32.to_le_bytes());
    tx.extend_from_slice(account.public_key.as_bytes());
    tx.extend_from_slice(&5_108_946_421_052_930_425u64.to_be_bytes());
    tx.extend_from_slice(&1_250_000_000u64.to_le_bytes());

    let mut payload = path.to_bytes();
    payload.extend_from_slice(&tx);

    step("2. Confirmation screens");
    let started = Instant::now();
    let (_, consumed) = HierarchicalPath::read(&payload)?;
    let decoded = parse(&payload[consumed..], false)?;
    for (label, value) in ConfirmationSummary::from_transaction(&decoded).lines() {
        field(&label, value);
    }
    timing(started);

    step("3. Derive and sign");
    let started = Instant::now();
    let derived = deriver.derive(&payload)?;
    let signature = sign(&derived.key_pair.private_key, &payload[consumed..]);
    field("signature", signature);
    timing(started);

    step("4. Verify");
    let ok = verify(&derived.key_pair.public_key, &tx, &signature);
    println!("{GREEN}    [{}] signature verifies{RESET}", if ok { "OK" } else { "FAIL" });

    Ok(())
}
