// Fri Oct 16 2026 - Alex

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "memory-inspector")]
#[command(author = "Alex")]
#[command(version = "1.0.0")]
#[command(about = "Classifies addresses and disassembles functions of a running process", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub target: TargetArgs,

    #[arg(short, long, global = true, default_value = "info")]
    pub log_level: String,

    #[arg(long, global = true)]
    pub no_color: bool,

    /// JSON config file; defaults apply when absent.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Name database (JSON).
    #[arg(long, global = true)]
    pub dataset: Option<PathBuf>,

    /// Type schemas (JSON array).
    #[arg(long, global = true)]
    pub schemas: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
pub struct TargetArgs {
    #[arg(short, long, global = true)]
    pub pid: Option<i32>,

    #[arg(long, global = true)]
    pub process: Option<String>,

    /// Raw memory dump to inspect instead of a live process.
    #[arg(long, global = true)]
    pub dump: Option<PathBuf>,

    #[arg(long, global = true, default_value = "0x140000000")]
    pub dump_base: String,

    /// Page permissions of the dump, as in /proc/<pid>/maps.
    #[arg(long, global = true, default_value = "rw-")]
    pub dump_perms: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Class and displacement of an address.
    Classify(AddressArgs),
    /// Name of an address.
    Identify(IdentifyArgs),
    /// Decode the function at an address.
    Disasm(AddressArgs),
    /// List the well-known addresses of the name database.
    WellKnown(WellKnownArgs),
}

#[derive(Parser, Debug)]
pub struct AddressArgs {
    pub address: String,
}

#[derive(Parser, Debug)]
pub struct IdentifyArgs {
    pub address: String,

    #[arg(long, value_enum, default_value = "all")]
    pub hint: KindArg,
}

#[derive(Parser, Debug)]
pub struct WellKnownArgs {
    #[arg(long, value_enum, default_value = "all")]
    pub kind: KindArg,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum KindArg {
    Instance,
    Vtable,
    Function,
    Global,
    All,
}

/// Parses `0x1234`, `1234h` or bare hex.
pub fn parse_address(text: &str) -> Result<u64, String> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .or_else(|| trimmed.strip_suffix('h'))
        .unwrap_or(trimmed)
        .replace('`', "");
    u64::from_str_radix(&digits, 16).map_err(|e| format!("invalid address '{}': {}", text, e))
}
