//! Cycle-driven verification harness for the RISC-V PMP CSR block.
//!
//! This crate steps a design under test through clock and reset cycles and
//! cross-checks every CSR transaction it performs against a shadow model:
//! 1. **Scheduler:** Clock/reset generation, stop conditions, per-edge callbacks (`sim`).
//! 2. **Reference model:** Bit-accurate PMP configuration/address registers with lock propagation (`model`).
//! 3. **Stimulus:** Randomized CSR transactions and reset pulses (`driver`).
//! 4. **DUT boundary:** The steppable design interface and a behavioral CSR block (`dut`).
//! 5. **Support:** Configuration, errors, memory-image loading, tracing hooks and run statistics.

/// Common types and constants (CSR addresses, errors, exit codes).
pub mod common;
/// Harness configuration (defaults, JSON deserialization, validation).
pub mod config;
/// Randomized stimulus generators.
pub mod driver;
/// Design-under-test boundary and the behavioral PMP CSR block.
pub mod dut;
/// Shadow register file and transaction checker.
pub mod model;
/// Simulation control: scheduler, signals, tracing, memory loading.
pub mod sim;
/// Run statistics collection and reporting.
pub mod stats;
/// Wiring of model, drivers and scheduler into the CSR testbench.
pub mod testbench;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// Behavioral implementation of the PMP CSR block.
pub use crate::dut::BehavioralCsrDut;
/// Shadow register model checked against the DUT every cycle.
pub use crate::model::RegisterModel;
/// Simulation controller driving clock, reset and callbacks.
pub use crate::sim::SimCtrl;
