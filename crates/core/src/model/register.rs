//! A single shadow register and its access semantics.

use crate::common::constants::{
    LANE_BITS, LANE_MASK, PMP_L, PMP_RW_MASK, PMP_RW_RESERVED, PMPCFG_RAZ_MASK,
};
use crate::dut::CsrOp;

/// Kind of a shadow register; selects the access semantics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegisterKind {
    /// `pmpcfg`: four configuration lanes with per-lane locking and WARL legalization.
    Config,
    /// `pmpaddr`: a plain 32-bit value, locked as a whole.
    Address,
    /// A slot in the map with no storage; reads as zero and ignores writes.
    Unimplemented,
}

/// One addressable register of the reference model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Register {
    address: u32,
    value: u32,
    kind: RegisterKind,
}

impl Register {
    /// Creates a register holding zero.
    pub const fn new(address: u32, kind: RegisterKind) -> Self {
        Self {
            address,
            value: 0,
            kind,
        }
    }

    /// CSR address of the register.
    pub const fn address(&self) -> u32 {
        self.address
    }

    /// Register kind.
    pub const fn kind(&self) -> RegisterKind {
        self.kind
    }

    /// Returns the current value without side effects.
    pub const fn read(&self) -> u32 {
        match self.kind {
            RegisterKind::Unimplemented => 0,
            RegisterKind::Config | RegisterKind::Address => self.value,
        }
    }

    /// Replaces the unlocked bits with `new`. Returns the prior value.
    pub fn write(&mut self, new: u32, lock_mask: u32) -> u32 {
        let prior = self.read();
        self.store((prior & lock_mask) | (new & !lock_mask));
        prior
    }

    /// Sets the unlocked bits given in `new`. Returns the prior value.
    pub fn set(&mut self, new: u32, lock_mask: u32) -> u32 {
        let prior = self.read();
        self.store(prior | (new & !lock_mask));
        prior
    }

    /// Clears the unlocked bits given in `new`. Returns the prior value.
    pub fn clear(&mut self, new: u32, lock_mask: u32) -> u32 {
        let prior = self.read();
        self.store(prior & (!new | lock_mask));
        prior
    }

    /// Dispatches a CSR operation. Returns the value the access reads.
    pub fn apply(&mut self, op: CsrOp, wdata: u32, lock_mask: u32) -> u32 {
        match op {
            CsrOp::Read => self.read(),
            CsrOp::Write => self.write(wdata, lock_mask),
            CsrOp::Set => self.set(wdata, lock_mask),
            CsrOp::Clear => self.clear(wdata, lock_mask),
        }
    }

    /// Forces the value to zero.
    pub fn reset(&mut self) {
        self.value = 0;
    }

    fn store(&mut self, value: u32) {
        self.value = match self.kind {
            RegisterKind::Config => legalize_cfg(value),
            RegisterKind::Address => value,
            RegisterKind::Unimplemented => 0,
        };
    }
}

/// Clears the reserved `W=1, R=0` encoding in every lane, then masks read-as-zero bits.
pub const fn legalize_cfg(value: u32) -> u32 {
    let mut value = value;
    let mut lane = 0;
    while lane < 4 {
        let shift = lane * LANE_BITS;
        if (value >> shift) & PMP_RW_MASK == PMP_RW_RESERVED {
            value &= !(PMP_RW_MASK << shift);
        }
        lane += 1;
    }
    value & PMPCFG_RAZ_MASK
}

/// Per-lane lock mask of a configuration value: a lane with L set contributes `0xFF`.
pub const fn cfg_lock_mask(value: u32) -> u32 {
    let mut mask = 0;
    let mut lane = 0;
    while lane < 4 {
        let shift = lane * LANE_BITS;
        if (value >> shift) & PMP_L != 0 {
            mask |= LANE_MASK << shift;
        }
        lane += 1;
    }
    mask
}
