//! Configuration errors and checker failure records.
//!
//! This module defines the error taxonomy of the harness:
//! 1. **Configuration errors:** Reported before simulation starts; each maps to a `sysexits` code.
//! 2. **Memory errors:** Raised by a DUT when a memory-load hook cannot reach its target.
//! 3. **Checker failures:** Per-cycle mismatches accumulated by the reference model.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::constants::exit;

/// Errors raised by a DUT's memory-load hooks.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryError {
    /// The design has no memory instantiated at the given scope.
    #[error("no memory found at {location}")]
    NoMemoryAt {
        /// Design scope that was looked up.
        location: String,
    },

    /// A word index fell outside the memory's capacity.
    #[error("word index {index} out of range for memory at {location} ({words} words)")]
    IndexOutOfRange {
        /// Design scope of the memory.
        location: String,
        /// Offending word index.
        index: usize,
        /// Capacity of the memory in words.
        words: usize,
    },

    /// A memory image could not be interpreted by the design's loader.
    #[error("invalid memory image for {location}: {reason}")]
    InvalidImage {
        /// Design scope of the memory.
        location: String,
        /// Loader diagnostic.
        reason: String,
    },
}

/// Configuration errors; any of these aborts the run before the first tick.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A memory name was registered twice.
    #[error("can not register \"{name}\" at: \"{location}\" (previously defined at: \"{previous}\")")]
    DuplicateMemory {
        /// Memory name.
        name: String,
        /// Location of the rejected registration.
        location: String,
        /// Location of the existing registration.
        previous: String,
    },

    /// A `--meminit` argument contained an empty field.
    #[error("empty field in: {arg}")]
    EmptyMeminitField {
        /// The full argument.
        arg: String,
    },

    /// A `--meminit` argument did not have the `name,file[,type]` shape.
    #[error("meminit must be in \"name,file[,type]\" got: {arg}")]
    MalformedMeminit {
        /// The full argument.
        arg: String,
    },

    /// No memory was registered under the requested name.
    #[error("memory location not set for: '{name}' (registered: {registered})")]
    UnknownMemory {
        /// Requested name.
        name: String,
        /// Comma-separated list of registered names.
        registered: String,
    },

    /// A memory initialization file could not be read.
    #[error("memory initialization file '{}' is not readable: {source}", path.display())]
    UnreadableFile {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The memory image type could not be determined or is not supported.
    #[error("unknown file type for '{}'", path.display())]
    UnknownFileType {
        /// Path of the image.
        path: PathBuf,
    },

    /// The DUT could not accept the memory image.
    #[error(transparent)]
    Memory(#[from] MemoryError),

    /// An ELF image could not be converted to a flat binary.
    #[error("{reason} in: {}", path.display())]
    Elf {
        /// Path of the image.
        path: PathBuf,
        /// Parser diagnostic.
        reason: String,
    },

    /// The JSON configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration parsed but is inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// Tracing was requested but the selected tracer cannot write traces.
    #[error("tracing has not been enabled for this simulation")]
    TracingUnsupported,
}

impl ConfigError {
    /// Returns the distinguished process exit status for this error.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::EmptyMeminitField { .. }
            | Self::MalformedMeminit { .. }
            | Self::TracingUnsupported
            | Self::Invalid(_) => exit::EX_USAGE,
            Self::DuplicateMemory { .. }
            | Self::UnknownMemory { .. }
            | Self::UnknownFileType { .. }
            | Self::Json(_) => exit::EX_DATAERR,
            Self::UnreadableFile { .. } => exit::EX_NOINPUT,
            Self::Memory(_) => exit::EX_UNAVAILABLE,
            Self::Elf { .. } => exit::EX_SOFTWARE,
        }
    }
}

/// A single discrepancy between the DUT and the reference model.
///
/// Failures are local to one cycle; the model records them and keeps checking.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckerFailure {
    /// The DUT returned different read data than the model predicted.
    ReadMismatch {
        /// CSR address of the transaction.
        addr: u32,
        /// Value predicted by the model.
        expected: u32,
        /// Value reported by the DUT.
        actual: u32,
        /// Simulation tick at which the transaction was observed.
        tick: u64,
    },

    /// An access to a non-existent register was not flagged as illegal.
    MissedIllegalAccess {
        /// CSR address of the transaction.
        addr: u32,
        /// Simulation tick at which the transaction was observed.
        tick: u64,
    },
}

impl CheckerFailure {
    /// Returns the CSR address the failure refers to.
    pub const fn addr(&self) -> u32 {
        match self {
            Self::ReadMismatch { addr, .. } | Self::MissedIllegalAccess { addr, .. } => *addr,
        }
    }
}

impl fmt::Display for CheckerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadMismatch {
                addr,
                expected,
                actual,
                tick,
            } => write!(
                f,
                "reg_read addr: {addr:#x} expected: {expected:#010x} got: {actual:#010x} (tick {tick})"
            ),
            Self::MissedIllegalAccess { addr, tick } => write!(
                f,
                "non-existent register: {addr:#x} should have signalled an error (tick {tick})"
            ),
        }
    }
}
