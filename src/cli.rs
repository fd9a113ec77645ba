//! Tool options and startup glue for engine adapters.
//!
//! The host engine forwards the tool's argv; an adapter parses it with
//! [`Args`] and calls [`build_campaign`]. Configuration errors are meant to
//! terminate the process before any instrumentation happens, with a
//! non-zero status set by the adapter.

use crate::address_set::AddressSet;
use crate::errors::ConfigError;
use crate::injection::{Campaign, CampaignOptions, InstrumentAction, DEFAULT_MAX_FLIP_ATTEMPTS};
use crate::logging::LogSink;
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;

/// Command line parameter structure
///
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// PRNG seed, use to reproduce runs of the tool that involved random bit
    /// flips. A given seed of zero is ignored and entropy is used instead
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// File containing a list of addresses to instrument at, one per line
    /// (can be specified multiple times)
    #[arg(long = "address-file")]
    pub address_files: Vec<PathBuf>,

    /// File containing a list of addresses to ignore, one per line
    /// (can be specified multiple times)
    #[arg(long = "ignore-file")]
    pub ignore_files: Vec<PathBuf>,

    /// Mutation applied to every instrumented instruction
    #[arg(long, value_enum, default_value_t = InstrumentAction::Delete)]
    pub instrument_action: InstrumentAction,

    /// Whether to limit inserted branches to targets within executable sections
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub avoid_segfaults: bool,

    /// Write the mutation log to file instead of standard error
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Loads the address files named on the command line and configures a
/// campaign from them.
pub fn build_campaign(args: &Args) -> Result<Campaign, ConfigError> {
    let instrument = AddressSet::load_all(&args.address_files)?;
    let ignore = AddressSet::load_all(&args.ignore_files)?;

    let sink = match &args.output {
        Some(path) => LogSink::file(path)?,
        None => LogSink::stderr(),
    };

    Campaign::configure(CampaignOptions {
        instrument,
        ignore,
        seed: args.seed,
        action: args.instrument_action,
        avoid_segfaults: args.avoid_segfaults,
        max_flip_attempts: DEFAULT_MAX_FLIP_ATTEMPTS,
        sink,
    })
}

/// Switch on with: RUST_LOG=debug
pub fn init_diagnostics() {
    let _ = env_logger::builder().try_init();
}

/// Renders a fatal configuration error for the operator.
pub fn report_fatal(error: &ConfigError) {
    eprintln!("{}", error.to_string().red().bold());
}
