//! Simulation scheduling and its collaborators.
//!
//! This module drives a design through time and connects it to the outside world:
//! 1. **Control:** The clock/reset scheduler and stop-condition evaluator.
//! 2. **Signals:** Asynchronous stop and trace requests.
//! 3. **Tracing:** Per-tick waveform sinks.
//! 4. **Memory:** Registration and initialization of design memories from ELF or VMEM images.

/// Clock/reset scheduler.
pub mod control;

/// ELF image flattening.
pub mod loader;

/// Memory registration and initialization.
pub mod memory;

/// Asynchronous run control.
pub mod signals;

/// Waveform tracing.
pub mod trace;

pub use control::{ResetPhase, RunOutcome, SimCtrl, StopReason};
pub use memory::{MemInitArg, MemInitRequest, MemInitType, MemoryRegistry, parse_meminit};
pub use signals::{SimSignals, install_handlers};
pub use trace::{NullTracer, Tracer, VcdTracer};
