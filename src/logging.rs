use crate::errors::ConfigError;
use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

/// Append-only sink for mutation and signal records.
///
/// Defaults to standard error; an output file can be configured instead. The
/// mutex serializes appends from concurrently faulting target threads.
pub struct LogSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl LogSink {
    pub fn stderr() -> Self {
        Self::from_writer(Box::new(io::stderr()))
    }

    pub fn file(path: &Path) -> Result<Self, ConfigError> {
        let file = File::create(path).map_err(|source| ConfigError::OutputFile {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_writer(Box::new(file)))
    }

    pub fn from_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Appends one record line. Flushed immediately since the process may
    /// fault on the very next instruction.
    pub fn append(&self, record: &dyn fmt::Display) {
        let mut out = self.out.lock().expect("log sink lock");
        let _ = writeln!(out, "{record}");
        let _ = out.flush();
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::stderr()
    }
}
