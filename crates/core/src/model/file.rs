//! Address-mapped register file.
//!
//! The file is built once from the address map and never changes shape afterwards;
//! only register values move. Cross-register lock dependencies are resolved by
//! address lookup on every access.

use super::register::{Register, RegisterKind, cfg_lock_mask};
use crate::common::constants::{LANE_BITS, PMP_A_MASK, PMP_A_TOR, PMP_L, REGIONS_PER_CFG};
use crate::config::RegModelConfig;
use crate::dut::CsrOp;

/// Ordered collection of shadow registers, keyed by address.
#[derive(Clone, Debug)]
pub struct RegisterFile {
    map: RegModelConfig,
    /// Sorted by address; addresses are unique.
    registers: Vec<Register>,
}

impl RegisterFile {
    /// Builds the file for `map`: implemented slots get storage, the rest of each
    /// range is filled with unimplemented registers.
    ///
    /// # Panics
    ///
    /// Panics if two registers share an address or a range runs past `u32::MAX`;
    /// a map accepted by `Config::validate` does neither.
    pub fn build(map: &RegModelConfig) -> Self {
        let cfg = (0..map.cfg_slots).map(|idx| {
            let kind = if idx < map.implemented_cfg() {
                RegisterKind::Config
            } else {
                RegisterKind::Unimplemented
            };
            Register::new(map.cfg_base + idx, kind)
        });
        let addr = (0..map.addr_slots).map(|idx| {
            let kind = if idx < map.implemented_addr() {
                RegisterKind::Address
            } else {
                RegisterKind::Unimplemented
            };
            Register::new(map.addr_base + idx, kind)
        });
        let mut registers: Vec<Register> = cfg.chain(addr).collect();
        registers.sort_by_key(Register::address);
        if let Some(pair) = registers
            .windows(2)
            .find(|pair| pair[0].address() == pair[1].address())
        {
            panic!(
                "register file has two registers at address {:#x}",
                pair[0].address()
            );
        }

        Self {
            map: map.clone(),
            registers,
        }
    }

    /// Number of registers in the file.
    pub fn len(&self) -> usize {
        self.registers.len()
    }

    /// Returns true if the file holds no registers.
    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    /// Registers in address order.
    pub fn registers(&self) -> &[Register] {
        &self.registers
    }

    /// Index of the register at `address`, if one exists.
    pub fn position(&self, address: u32) -> Option<usize> {
        self.registers
            .binary_search_by_key(&address, Register::address)
            .ok()
    }

    /// Reads the register at `address`; `None` if no register exists there.
    pub fn read(&self, address: u32) -> Option<u32> {
        self.position(address).map(|idx| self.registers[idx].read())
    }

    /// Lock mask currently in force for the register at `address`.
    ///
    /// Configuration registers lock lane by lane. An address register is locked as a whole
    /// when its own region's L bit is set or the next region is configured for TOR. A
    /// referenced configuration register that does not exist contributes zero.
    pub fn lock_mask(&self, address: u32) -> u32 {
        let Some(idx) = self.position(address) else {
            return 0;
        };
        let register = &self.registers[idx];
        match register.kind() {
            RegisterKind::Config => cfg_lock_mask(register.read()),
            RegisterKind::Address => {
                let region = address - self.map.addr_base;
                let own = self.cfg_lane(region);
                let next = self.cfg_lane(region + 1);
                if own & PMP_L != 0 || next & PMP_A_MASK == PMP_A_TOR {
                    u32::MAX
                } else {
                    0
                }
            }
            RegisterKind::Unimplemented => 0,
        }
    }

    /// Applies `op` to the register at `address` and returns the value the access reads,
    /// or `None` for a non-existent register.
    pub fn access(&mut self, address: u32, op: CsrOp, wdata: u32) -> Option<u32> {
        let idx = self.position(address)?;
        let lock_mask = self.lock_mask(address);
        Some(self.registers[idx].apply(op, wdata, lock_mask))
    }

    /// Forces every register to zero.
    pub fn reset(&mut self) {
        self.registers.iter_mut().for_each(Register::reset);
    }

    /// Configuration lane of `region`, read through its `pmpcfg` register.
    fn cfg_lane(&self, region: u32) -> u32 {
        if region / REGIONS_PER_CFG >= self.map.cfg_slots {
            return 0;
        }
        let cfg_addr = self.map.cfg_base + region / REGIONS_PER_CFG;
        let shift = (region % REGIONS_PER_CFG) * LANE_BITS;
        self.read(cfg_addr).map_or(0, |value| (value >> shift) & 0xFF)
    }
}
