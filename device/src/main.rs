// Copyright (c) 2026 RISE Ledger Team. MIT License.
// See LICENSE for details.

//! # RISE Device
//!
//! Entry point for the `rise-device` binary. Parses CLI arguments,
//! initializes logging, builds the device from the master seed and runs one
//! command against it.
//!
//! The binary supports six subcommands:
//!
//! - `pubkey`: public key and address for a path
//! - `parse-tx`: decode a transaction and show its summary, no seed needed
//! - `sign-tx`: confirm and sign a transaction
//! - `sign-msg`: confirm and sign a message
//! - `apdu`: raw instruction with a hex payload
//! - `version`: print build version information

mod cli;
mod commands;
mod logging;

use std::io::{BufRead, Write};

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;

use rise_protocol::crypto::{HierarchicalPath, Slip10Deriver};
use rise_protocol::transaction::{parse, ConfirmationSummary};

use cli::{Commands, RiseDeviceCli};
use commands::{
    AutoConfirm, Confirmer, Device, Response, INS_GET_PUBLIC_KEY, INS_SIGN_MESSAGE,
    INS_SIGN_TRANSACTION, INS_VERSION, P1_HAS_REQUESTER,
};
use logging::LogFormat;

fn main() -> Result<()> {
    let cli = RiseDeviceCli::parse();

    logging::init_logging(
        "rise_device=info,rise_protocol=info",
        LogFormat::from_str_lossy(&cli.log_format),
    );

    match cli.command {
        Commands::ParseTx(args) => parse_tx(&args),
        Commands::Version => {
            print_version();
            Ok(())
        }
        Commands::Pubkey(args) => {
            let device = open_device(cli.seed.as_deref())?;
            let payload = path_payload(&args.path)?;
            let response = device.handle(INS_GET_PUBLIC_KEY, 0, &payload, &mut AutoConfirm(true));
            emit(&response)
        }
        Commands::SignTx(args) => {
            let device = open_device(cli.seed.as_deref())?;
            let mut payload = path_payload(&args.path.path)?;
            payload.extend(decode_hex(&args.tx.tx, "transaction")?);
            let p1 = if args.tx.has_requester {
                P1_HAS_REQUESTER
            } else {
                0
            };
            let mut confirmer = confirmer(args.confirm.yes);
            let response = device.handle(INS_SIGN_TRANSACTION, p1, &payload, confirmer.as_mut());
            emit(&response)
        }
        Commands::SignMsg(args) => {
            let device = open_device(cli.seed.as_deref())?;
            let mut payload = path_payload(&args.path.path)?;
            if args.hex {
                payload.extend(decode_hex(&args.message, "message")?);
            } else {
                payload.extend_from_slice(args.message.as_bytes());
            }
            let mut confirmer = confirmer(args.confirm.yes);
            let response = device.handle(INS_SIGN_MESSAGE, 0, &payload, confirmer.as_mut());
            emit(&response)
        }
        Commands::Apdu(args) => {
            // Version needs no key material; everything else does.
            let device = if args.ins == INS_VERSION {
                Device::new(Slip10Deriver::new(&[0u8; 64]))
            } else {
                open_device(cli.seed.as_deref())?
            };
            let payload = decode_hex(&args.data, "payload")?;
            let mut confirmer = confirmer(args.confirm.yes);
            let response = device.handle(args.ins, args.p1, &payload, confirmer.as_mut());
            println!("{}", hex::encode(response.to_apdu()));
            emit(&response)
        }
    }
}

fn open_device(seed: Option<&str>) -> Result<Device<Slip10Deriver>> {
    let seed = seed.ok_or_else(|| anyhow!("no seed: pass --seed or set RISE_DEVICE_SEED"))?;
    let deriver = Slip10Deriver::from_hex(seed).context("failed to load master seed")?;
    Ok(Device::new(deriver))
}

fn path_payload(path: &str) -> Result<Vec<u8>> {
    let path: HierarchicalPath = path
        .parse()
        .with_context(|| format!("invalid derivation path '{}'", path))?;
    Ok(path.to_bytes())
}

fn decode_hex(input: &str, what: &str) -> Result<Vec<u8>> {
    let trimmed = input.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(digits).with_context(|| format!("{} is not valid hex", what))
}

fn confirmer(auto: bool) -> Box<dyn Confirmer> {
    if auto {
        Box::new(AutoConfirm(true))
    } else {
        Box::new(PromptConfirm)
    }
}

/// Asks on the terminal. Screens go to stderr, the answer comes from stdin.
struct PromptConfirm;

impl Confirmer for PromptConfirm {
    fn confirm(&mut self, screens: &[(String, String)]) -> bool {
        let mut stderr = std::io::stderr().lock();
        for (label, value) in screens {
            let _ = writeln!(stderr, "  {:<12} {}", label, value);
        }
        let _ = write!(stderr, "Approve? [y/N] ");
        let _ = stderr.flush();

        let mut answer = String::new();
        match std::io::stdin().lock().read_line(&mut answer) {
            Ok(_) => matches!(answer.trim(), "y" | "Y" | "yes"),
            Err(e) => {
                tracing::warn!(error = %e, "could not read confirmation, rejecting");
                false
            }
        }
    }
}

/// Print the response as JSON; a non-OK status becomes the exit error.
fn emit(response: &Response) -> Result<()> {
    let json = serde_json::to_string_pretty(response).context("failed to encode response")?;
    println!("{}", json);
    if !response.status.is_ok() {
        bail!("device returned status {}", response.status);
    }
    Ok(())
}

fn parse_tx(args: &cli::ParseTxArgs) -> Result<()> {
    let bytes = decode_hex(&args.tx, "transaction")?;
    let tx = parse(&bytes, args.has_requester).context("transaction rejected")?;
    let summary = ConfirmationSummary::from_transaction(&tx);

    let output = serde_json::json!({
        "transaction": tx,
        "details": tx.details(),
        "summary": summary,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("failed to encode summary")?
    );
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("rise-device   {}", env!("CARGO_PKG_VERSION"));
    println!("rise-protocol {}", rise_protocol::VERSION);
}
