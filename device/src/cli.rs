//! # CLI Interface
//!
//! Defines the command-line argument structure for `rise-device` using
//! `clap` derive. Each subcommand maps onto one device instruction, plus
//! `parse-tx` for inspecting a transaction without signing it and `apdu`
//! for sending a raw request.

use clap::{Args, Parser, Subcommand};

/// Default account path: `44'/1120'/0'`.
pub const DEFAULT_PATH: &str = "44'/1120'/0'";

/// RISE hardware wallet signing core, simulated.
///
/// Reads the master seed from the environment, runs one device command,
/// and prints the device's response as JSON on stdout. Logs go to stderr.
#[derive(Parser, Debug)]
#[command(
    name = "rise-device",
    about = "RISE hardware wallet signing core",
    version,
    propagate_version = true
)]
pub struct RiseDeviceCli {
    /// Hex-encoded master seed (typically the 64-byte BIP-39 seed).
    ///
    /// **Never pass this flag on a shared machine**; prefer the environment.
    #[arg(long, env = "RISE_DEVICE_SEED", hide_env_values = true, global = true)]
    pub seed: Option<String>,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "RISE_LOG_FORMAT", default_value = "pretty", global = true)]
    pub log_format: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the device binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Derive and print the public key and address for a path.
    Pubkey(PathArgs),
    /// Decode a transaction and print its confirmation summary.
    ParseTx(ParseTxArgs),
    /// Confirm and sign a transaction.
    SignTx(SignTxArgs),
    /// Confirm and sign a free-form message.
    SignMsg(SignMsgArgs),
    /// Send a raw instruction with a hex payload.
    Apdu(ApduArgs),
    /// Print version information and exit.
    Version,
}

#[derive(Args, Debug)]
pub struct PathArgs {
    /// Derivation path, e.g. `44'/1120'/0'`. Hardened components only.
    #[arg(long, short = 'p', default_value = DEFAULT_PATH)]
    pub path: String,
}

#[derive(Args, Debug)]
pub struct ConfirmArgs {
    /// Approve every confirmation screen without prompting.
    #[arg(long, short = 'y', env = "RISE_AUTO_CONFIRM")]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct ParseTxArgs {
    /// Hex-encoded raw transaction.
    #[arg(long)]
    pub tx: String,

    /// The transaction carries a requester public key after the sender.
    #[arg(long)]
    pub has_requester: bool,
}

#[derive(Args, Debug)]
pub struct SignTxArgs {
    #[command(flatten)]
    pub path: PathArgs,

    #[command(flatten)]
    pub tx: ParseTxArgs,

    #[command(flatten)]
    pub confirm: ConfirmArgs,
}

#[derive(Args, Debug)]
pub struct SignMsgArgs {
    #[command(flatten)]
    pub path: PathArgs,

    /// Message to sign. Signed as its UTF-8 bytes unless `--hex` is set.
    pub message: String,

    /// Treat the message as hex-encoded bytes.
    #[arg(long)]
    pub hex: bool,

    #[command(flatten)]
    pub confirm: ConfirmArgs,
}

#[derive(Args, Debug)]
pub struct ApduArgs {
    /// Instruction byte, decimal or `0x`-prefixed hex.
    #[arg(long, value_parser = parse_byte)]
    pub ins: u8,

    /// Parameter byte, decimal or `0x`-prefixed hex.
    #[arg(long, value_parser = parse_byte, default_value = "0")]
    pub p1: u8,

    /// Hex-encoded payload (path buffer followed by data).
    #[arg(long, default_value = "")]
    pub data: String,

    #[command(flatten)]
    pub confirm: ConfirmArgs,
}

fn parse_byte(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    };
    parsed.map_err(|e| format!("invalid byte '{}': {}", s, e))
}
