//! Command-line interface definitions for the `verge-ip` binary.
//!
//! This module isolates the clap parser structures so the build script can
//! reuse them when generating the manual page.

use clap::{ArgGroup, Parser};

/// Top-level CLI for the `verge-ip` binary.
#[derive(Debug, Parser)]
#[command(
    name = "verge-ip",
    about = "Print the IP addresses allocated to a VergeOS virtual machine",
    arg_required_else_help = true
)]
#[command(group(
    ArgGroup::new("machine")
        .required(true)
        .args(["machine_id", "machine_name"])
))]
pub(crate) struct Cli {
    /// Numeric machine ID (for example `93`).
    #[arg(long, value_name = "ID")]
    pub(crate) machine_id: Option<u64>,
    /// Virtual machine name (for example `talos-cp-01`).
    ///
    /// The name is resolved to a machine ID once, before polling starts.
    #[arg(long, value_name = "NAME")]
    pub(crate) machine_name: Option<String>,
    /// Seconds to keep polling for an address. `0` (the default) or a
    /// negative value checks exactly once.
    #[arg(
        long,
        value_name = "SECONDS",
        default_value_t = 0,
        allow_negative_numbers = true
    )]
    pub(crate) timeout: i64,
    /// Log debug diagnostics to standard error.
    #[arg(short, long)]
    pub(crate) verbose: bool,
}
