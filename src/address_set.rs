//! Ordered sets of instruction addresses selected for, or protected from,
//! mutation. Addresses are opaque keys and are never dereferenced here.

use crate::errors::ConfigError;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// An ordered set of unique instruction addresses.
///
/// Two instances exist per campaign: the addresses to instrument and the
/// addresses to ignore. Address files contain whitespace-separated
/// hexadecimal integers, one per line by convention, with an optional `0x`
/// prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressSet {
    addresses: BTreeSet<u64>,
}

impl AddressSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads one address file. An unreadable file is a fatal configuration
    /// error, as is a token that does not parse as a hexadecimal integer.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut set = Self::new();
        set.extend_from_file(path)?;
        Ok(set)
    }

    /// Reads several address files and unions their contents.
    pub fn load_all(paths: &[PathBuf]) -> Result<Self, ConfigError> {
        let mut set = Self::new();
        for path in paths {
            set.extend_from_file(path)?;
        }
        Ok(set)
    }

    fn extend_from_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::AddressFile {
            path: path.to_path_buf(),
            source,
        })?;

        for token in content.split_whitespace() {
            let digits = token.strip_prefix("0x").unwrap_or(token);
            let address = u64::from_str_radix(digits, 16).map_err(|_| {
                ConfigError::MalformedAddress {
                    path: path.to_path_buf(),
                    token: token.to_string(),
                }
            })?;
            self.addresses.insert(address);
        }
        Ok(())
    }

    pub fn insert(&mut self, address: u64) {
        self.addresses.insert(address);
    }

    pub fn contains(&self, address: u64) -> bool {
        self.addresses.contains(&address)
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Every member address satisfying `start <= a < end`, in ascending order.
    pub fn range_members(&self, start: u64, end: u64) -> Vec<u64> {
        self.addresses.range(start..end).copied().collect()
    }

    /// Addresses present in both sets, in ascending order.
    pub fn intersection(&self, other: &AddressSet) -> Vec<u64> {
        self.addresses
            .intersection(&other.addresses)
            .copied()
            .collect()
    }
}

impl FromIterator<u64> for AddressSet {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        Self {
            addresses: iter.into_iter().collect(),
        }
    }
}
