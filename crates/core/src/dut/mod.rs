//! Design-under-test boundary.
//!
//! The scheduler treats a design as an opaque steppable object: it drives the clock
//! and reset lines, calls `eval` once per half period and `finalize` at the end of
//! the run. This module defines:
//! 1. **`Dut`:** The steppable interface, including tracing and memory-load hooks.
//! 2. **`CsrPorts` / `CsrDut`:** The port bundle of the cs-registers block used by the checker and drivers.
//! 3. **`BehavioralCsrDut`:** A cycle-based behavioral model of the PMP CSR block.

use std::path::Path;

use crate::common::MemoryError;

/// Behavioral PMP CSR block.
pub mod behavioral;

pub use behavioral::BehavioralCsrDut;

/// One sampled signal, as handed to a tracer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignalValue {
    /// Hierarchical signal name.
    pub name: &'static str,
    /// Width in bits (1..=64).
    pub width: u32,
    /// Current value, right-aligned.
    pub value: u64,
}

impl SignalValue {
    /// Creates a sample of a single-bit signal.
    pub const fn bit(name: &'static str, level: bool) -> Self {
        Self {
            name,
            width: 1,
            value: level as u64,
        }
    }

    /// Creates a sample of a multi-bit signal.
    pub const fn bus(name: &'static str, width: u32, value: u64) -> Self {
        Self { name, width, value }
    }
}

/// A steppable design under test.
///
/// Implementations own all design state. The scheduler only toggles the clock,
/// drives the reset line and advances evaluation; everything else is reached
/// through the per-edge callback.
pub trait Dut {
    /// Returns the top-level name of the design.
    fn name(&self) -> &str;

    /// Drives the clock input.
    fn set_clock(&mut self, level: bool);

    /// Returns the current clock input level.
    fn clock(&self) -> bool;

    /// Drives the raw reset line (polarity is applied by the caller).
    fn set_reset_line(&mut self, level: bool);

    /// Returns the raw reset line level.
    fn reset_line(&self) -> bool;

    /// Evaluates combinational and sequential logic for the current inputs.
    fn eval(&mut self);

    /// Runs end-of-simulation hooks.
    fn finalize(&mut self) {}

    /// Returns true once the design has requested termination.
    fn got_finish(&self) -> bool {
        false
    }

    /// Samples the signals written to trace files.
    fn trace_signals(&self) -> Vec<SignalValue> {
        Vec::new()
    }

    /// Writes one 32-bit word of a flat memory image into the memory at `location`.
    ///
    /// # Errors
    ///
    /// Returns a `MemoryError` if no memory exists at `location` or `index` is out of range.
    fn write_memory_word(
        &mut self,
        location: &str,
        _index: usize,
        _word: u32,
    ) -> Result<(), MemoryError> {
        Err(MemoryError::NoMemoryAt {
            location: location.to_owned(),
        })
    }

    /// Loads a VMEM file into the memory at `location`.
    ///
    /// # Errors
    ///
    /// Returns a `MemoryError` if no memory exists at `location`.
    fn load_vmem(&mut self, location: &str, _path: &Path) -> Result<(), MemoryError> {
        Err(MemoryError::NoMemoryAt {
            location: location.to_owned(),
        })
    }
}

/// CSR operation encoded on `csr_op_i`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CsrOp {
    /// Read without side effect.
    Read = 0,
    /// Replace the register value.
    Write = 1,
    /// Set the bits given in the write data.
    Set = 2,
    /// Clear the bits given in the write data.
    Clear = 3,
}

impl CsrOp {
    /// Decodes the 2-bit operation field.
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 0x3 {
            0 => Self::Read,
            1 => Self::Write,
            2 => Self::Set,
            _ => Self::Clear,
        }
    }

    /// Returns the 2-bit encoding.
    pub const fn bits(self) -> u32 {
        self as u32
    }
}

/// Port bundle of the cs-registers block.
///
/// Field names follow the design's port names; `_i` suffixes are inputs driven
/// by the testbench and `_o` suffixes are outputs observed by the checker.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CsrPorts {
    /// Active-low reset.
    pub rst_ni: bool,
    /// A CSR access is requested this cycle.
    pub csr_access_i: bool,
    /// The access belongs to a newly issued instruction.
    pub instr_new_id_i: bool,
    /// 12-bit CSR address.
    pub csr_addr_i: u32,
    /// 2-bit CSR operation (see [`CsrOp`]).
    pub csr_op_i: u32,
    /// Write data.
    pub csr_wdata_i: u32,
    /// Read data of the access.
    pub csr_rdata_o: u32,
    /// The access targeted a register that does not exist.
    pub illegal_csr_insn_o: bool,
}

impl CsrPorts {
    /// Returns true if a new transaction is presented this cycle.
    pub const fn transaction_valid(&self) -> bool {
        self.csr_access_i && self.instr_new_id_i
    }

    /// Returns the decoded operation.
    pub const fn op(&self) -> CsrOp {
        CsrOp::from_bits(self.csr_op_i)
    }
}

/// A design exposing the cs-registers port bundle.
pub trait CsrDut: Dut {
    /// Returns the port bundle.
    fn ports(&self) -> &CsrPorts;

    /// Returns the port bundle for driving inputs.
    fn ports_mut(&mut self) -> &mut CsrPorts;
}
