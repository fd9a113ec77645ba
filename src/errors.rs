use itertools::Itertools;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal configuration problems, reported before any instruction is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not open {} for reading: {source}", .path.display())]
    AddressFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{token:?} in {} is not a hexadecimal address", .path.display())]
    MalformedAddress { path: PathBuf, token: String },

    /// The same address was requested to be both instrumented and ignored.
    /// Proceeding would apply a mutation and a "leave untouched" request to
    /// the same instruction, so configuration stops here.
    #[error(
        "the following addresses were requested to both be instrumented and ignored: {}",
        join_hex(.addresses)
    )]
    OverlappingSets { addresses: Vec<u64> },

    #[error("could not open {} for writing: {source}", .path.display())]
    OutputFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Failures while applying a mutation to a selected instruction.
#[derive(Debug, Error)]
pub enum InjectError {
    /// Rejection sampling could not place a corrupted branch target inside
    /// any recorded executable range. Typically the section list is still
    /// empty, or the attempt bound is set too low for a sparse code layout.
    #[error("no executable branch target found for {address:#x} after {attempts} bit flips")]
    UnsatisfiableConstraint { address: u64, attempts: usize },
}

fn join_hex(addresses: &[u64]) -> String {
    addresses.iter().map(|a| format!("{a:#x}")).join(", ")
}
