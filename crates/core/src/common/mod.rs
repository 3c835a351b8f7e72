//! Common types and constants shared across the harness.
//!
//! This module provides the building blocks used by every component:
//! 1. **Constants:** CSR addresses and field masks of the PMP block, process exit codes.
//! 2. **Error Handling:** Configuration errors and checker failures.

/// CSR addresses, PMP field encodings and exit codes.
pub mod constants;

/// Configuration errors and checker failure records.
pub mod error;

pub use error::{CheckerFailure, ConfigError, MemoryError};
