//! Register reference model.
//!
//! A golden copy of the PMP register file that checks every transaction the design
//! reports. The model provides:
//! 1. **Register semantics:** Read, write, set and clear with lock masks and WARL legalization.
//! 2. **Register file:** Address-ordered storage with index-based cross-register lookups.
//! 3. **Checking:** Per-cycle comparison of the design's read data and illegal-access flag.
//!
//! Checker failures are accumulated and logged; they never stop the run.

/// Address-mapped register file.
pub mod file;

/// Shadow register and its access semantics.
pub mod register;

pub use file::RegisterFile;
pub use register::{Register, RegisterKind};

use tracing::{debug, error};

use crate::common::CheckerFailure;
use crate::config::{RegModelConfig, ResetPolarity};
use crate::dut::CsrPorts;

/// Reference model of the PMP CSR block.
#[derive(Debug)]
pub struct RegisterModel {
    file: RegisterFile,
    polarity: ResetPolarity,
    failures: Vec<CheckerFailure>,
    checked: u64,
}

impl RegisterModel {
    /// Creates a model with every register at zero.
    pub fn new(map: &RegModelConfig, polarity: ResetPolarity) -> Self {
        Self {
            file: RegisterFile::build(map),
            polarity,
            failures: Vec::new(),
            checked: 0,
        }
    }

    /// Observes the design's ports for one rising edge.
    ///
    /// Under reset every register is cleared and nothing is checked. Otherwise a
    /// presented transaction is applied to the shadow file and compared with the
    /// design's outputs.
    pub fn on_clock(&mut self, tick: u64, ports: &CsrPorts) {
        if self.polarity.is_active(ports.rst_ni) {
            self.file.reset();
            return;
        }
        if !ports.transaction_valid() {
            return;
        }

        self.checked += 1;
        let addr = ports.csr_addr_i;
        let op = ports.op();
        match self.file.access(addr, op, ports.csr_wdata_i) {
            Some(expected) => {
                debug!(tick, addr, ?op, expected, "register access");
                if expected != ports.csr_rdata_o {
                    self.record(CheckerFailure::ReadMismatch {
                        addr,
                        expected,
                        actual: ports.csr_rdata_o,
                        tick,
                    });
                }
            }
            None => {
                debug!(tick, addr, ?op, "non-existent register access");
                if !ports.illegal_csr_insn_o {
                    self.record(CheckerFailure::MissedIllegalAccess { addr, tick });
                }
            }
        }
    }

    fn record(&mut self, failure: CheckerFailure) {
        error!("{failure}");
        self.failures.push(failure);
    }

    /// Shadow register file.
    pub fn file(&self) -> &RegisterFile {
        &self.file
    }

    /// Checker failures in the order they occurred.
    pub fn failures(&self) -> &[CheckerFailure] {
        &self.failures
    }

    /// Number of checker failures so far.
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Returns true if no checker failure has occurred.
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of transactions checked outside reset.
    pub const fn checked_transactions(&self) -> u64 {
        self.checked
    }
}
