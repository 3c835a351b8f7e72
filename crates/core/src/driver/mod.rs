//! Stimulus generation.
//!
//! Two independent random processes drive the design's inputs once per rising edge:
//! 1. **`RegisterDriver`:** Randomized CSR transactions separated by randomized delays.
//! 2. **`EnvDriver`:** Reset pulses at randomized intervals.
//!
//! Both draw from a seeded `XorShift64`, so a seed reproduces a run exactly.

/// Reset-pulse generator.
pub mod env;

/// Xorshift pseudo-random source.
pub mod rng;

pub use env::EnvDriver;
pub use rng::XorShift64;

use std::ops::RangeInclusive;

use tracing::trace;

use crate::config::DriverConfig;
use crate::dut::{CsrOp, CsrPorts};

/// Randomized CSR transaction generator.
///
/// Each transaction is asserted on `csr_access_i`/`instr_new_id_i` for exactly
/// one cycle; address, operation and write data stay on the bus until the next draw.
#[derive(Debug)]
pub struct RegisterDriver {
    rng: XorShift64,
    addr_range: RangeInclusive<u32>,
    delay_range: RangeInclusive<u32>,
    delay: u32,
    access: bool,
    addr: u32,
    op: CsrOp,
    wdata: u32,
    issued: u64,
}

impl RegisterDriver {
    /// Creates a driver that issues its first transaction on the first clock.
    pub fn new(config: &DriverConfig, seed: u64) -> Self {
        Self {
            rng: XorShift64::new(seed),
            addr_range: config.addr_range(),
            delay_range: config.delay_range(),
            delay: 1,
            access: false,
            addr: 0,
            op: CsrOp::Read,
            wdata: 0,
            issued: 0,
        }
    }

    /// Advances the delay countdown and drives the CSR inputs.
    pub fn on_clock(&mut self, ports: &mut CsrPorts) {
        self.delay = self.delay.saturating_sub(1);
        if self.delay == 0 {
            self.randomize();
        } else {
            self.access = false;
        }
        self.drive(ports);
    }

    fn randomize(&mut self) {
        self.addr = self.rng.uniform(self.addr_range.clone());
        self.op = if self.rng.next_bool() {
            CsrOp::Write
        } else {
            CsrOp::Read
        };
        if self.op == CsrOp::Write {
            self.wdata = self.rng.next_u32();
        }
        self.delay = self.rng.uniform(self.delay_range.clone());
        self.access = true;
        self.issued += 1;
        trace!(addr = self.addr, op = ?self.op, wdata = self.wdata, delay = self.delay, "new transaction");
    }

    fn drive(&self, ports: &mut CsrPorts) {
        ports.csr_access_i = self.access;
        ports.instr_new_id_i = self.access;
        ports.csr_addr_i = self.addr;
        ports.csr_op_i = self.op.bits();
        ports.csr_wdata_i = self.wdata;
    }

    /// Number of transactions issued so far.
    pub const fn issued(&self) -> u64 {
        self.issued
    }
}
