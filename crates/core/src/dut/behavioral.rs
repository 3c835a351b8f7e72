//! Behavioral PMP CSR block.
//!
//! A cycle-based model of the cs-registers PMP slice, used when no compiled design is
//! attached to the scheduler. It mirrors the register-transfer behavior the checker expects:
//! 1. **Timing:** Outputs for a transaction are sampled on the rising edge that sees it; the
//!    write side effect commits on the following rising edge.
//! 2. **Legalization:** Configuration lanes drop bits 6:5 and the reserved `W=1, R=0`
//!    permission encoding.
//! 3. **Locking:** Locked lanes and address registers ignore writes, including the
//!    address register below a locked TOR region.
//! 4. **Memory:** A word-addressed RAM reachable through the memory-load hooks.

use std::fs;
use std::path::Path;

use super::{CsrDut, CsrOp, CsrPorts, Dut, SignalValue};
use crate::common::MemoryError;
use crate::common::constants::{LANE_BITS, LANE_MASK, REGIONS_PER_CFG};
use crate::config::{RegModelConfig, ResetPolarity, in_range};

/// Design scope of the instruction RAM.
pub const RAM_LOCATION: &str = "TOP.csr_tb.u_ram";

/// Capacity of the instruction RAM in 32-bit words.
pub const RAM_WORDS: usize = 16 * 1024;

/// PMP address-matching mode field (bits 4:3 of a configuration lane).
const A_SHIFT: u8 = 3;
const A_MASK: u8 = 0x3;

/// Lane bits that read as zero.
const LANE_WARL_MASK: u8 = 0x9F;

/// Lock bit of a configuration lane.
const LANE_L: u8 = 1 << 7;

/// Address matching mode extracted from a configuration lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PmpAddrMatch {
    /// Entry is off.
    Off = 0,
    /// Top of Range: the region ends at this entry's address register.
    Tor = 1,
    /// Naturally aligned 4-byte region.
    Na4 = 2,
    /// Naturally aligned power-of-two region.
    Napot = 3,
}

impl PmpAddrMatch {
    /// Decode from the 2-bit A field.
    pub const fn from_bits(bits: u8) -> Self {
        match bits & A_MASK {
            0 => Self::Off,
            1 => Self::Tor,
            2 => Self::Na4,
            _ => Self::Napot,
        }
    }
}

/// One PMP region: its configuration lane and address register.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PmpEntry {
    /// Legalized configuration byte.
    pub cfg: u8,
    /// Address register value.
    pub addr: u32,
}

impl PmpEntry {
    /// Returns the address-matching mode.
    pub const fn match_mode(&self) -> PmpAddrMatch {
        PmpAddrMatch::from_bits(self.cfg >> A_SHIFT)
    }

    /// Returns true if the L (lock) bit is set.
    pub const fn is_locked(&self) -> bool {
        self.cfg & LANE_L != 0
    }

    /// Applies a CSR operation to the configuration lane unless it is locked.
    fn update_cfg(&mut self, op: CsrOp, byte: u8) {
        if self.is_locked() {
            return;
        }
        let next = match op {
            CsrOp::Read => return,
            CsrOp::Write => byte,
            CsrOp::Set => self.cfg | byte,
            CsrOp::Clear => self.cfg & !byte,
        };
        self.cfg = legalize_lane(next);
    }
}

/// Clears the read-as-zero bits and the reserved R/W combination of a lane.
pub const fn legalize_lane(byte: u8) -> u8 {
    let byte = byte & LANE_WARL_MASK;
    if byte & 0x3 == 0x2 { byte & !0x3 } else { byte }
}

/// Decoded target of a CSR address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Target {
    Cfg(usize),
    Addr(usize),
    Hardwired,
    Illegal,
}

/// A write-side effect waiting for the next rising edge.
#[derive(Clone, Copy, Debug)]
struct PendingWrite {
    target: Target,
    op: CsrOp,
    wdata: u32,
}

/// Behavioral model of the PMP CSR block.
#[derive(Debug)]
pub struct BehavioralCsrDut {
    map: RegModelConfig,
    polarity: ResetPolarity,
    ports: CsrPorts,
    clk: bool,
    prev_clk: bool,
    /// One entry per configuration lane of the implemented `pmpcfg` registers.
    entries: Vec<PmpEntry>,
    pending: Option<PendingWrite>,
    ram: Vec<u32>,
    finished: bool,
    finalized: bool,
}

impl BehavioralCsrDut {
    /// Creates a block implementing `map.num_regions` regions, out of reset.
    pub fn new(map: &RegModelConfig, polarity: ResetPolarity) -> Self {
        let lanes = (map.implemented_cfg() * REGIONS_PER_CFG) as usize;
        Self {
            map: map.clone(),
            polarity,
            ports: CsrPorts {
                rst_ni: !polarity.active_level(),
                ..CsrPorts::default()
            },
            clk: false,
            prev_clk: false,
            entries: vec![PmpEntry::default(); lanes],
            pending: None,
            ram: vec![0; RAM_WORDS],
            finished: false,
            finalized: false,
        }
    }

    /// Returns the PMP entries, one per configuration lane.
    pub fn entries(&self) -> &[PmpEntry] {
        &self.entries
    }

    /// Returns the RAM contents.
    pub fn ram(&self) -> &[u32] {
        &self.ram
    }

    /// Returns true once `finalize` has run.
    pub const fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Makes `got_finish` report true, as a `$finish` in the design would.
    pub fn request_finish(&mut self) {
        self.finished = true;
    }

    /// Reads a CSR the way the design would present it on `csr_rdata_o`.
    pub fn peek(&self, addr: u32) -> u32 {
        self.read(self.decode(addr))
    }

    fn decode(&self, addr: u32) -> Target {
        let map = &self.map;
        if in_range(map.cfg_base, map.cfg_slots, addr) {
            let idx = addr - map.cfg_base;
            if idx < map.implemented_cfg() {
                Target::Cfg(idx as usize)
            } else {
                Target::Hardwired
            }
        } else if in_range(map.addr_base, map.addr_slots, addr) {
            let idx = addr - map.addr_base;
            if idx < map.implemented_addr() {
                Target::Addr(idx as usize)
            } else {
                Target::Hardwired
            }
        } else {
            Target::Illegal
        }
    }

    fn read(&self, target: Target) -> u32 {
        match target {
            Target::Cfg(reg) => self.lanes(reg).enumerate().fold(0, |acc, (lane, entry)| {
                acc | (u32::from(entry.cfg) << (lane as u32 * LANE_BITS))
            }),
            Target::Addr(idx) => self.entries[idx].addr,
            Target::Hardwired | Target::Illegal => 0,
        }
    }

    fn lanes(&self, reg: usize) -> impl Iterator<Item = &PmpEntry> {
        let per = REGIONS_PER_CFG as usize;
        self.entries[reg * per..(reg + 1) * per].iter()
    }

    /// An address register is locked by its own lane, or by the next lane in TOR mode.
    fn addr_locked(&self, idx: usize) -> bool {
        self.entries[idx].is_locked()
            || self
                .entries
                .get(idx + 1)
                .is_some_and(|next| next.match_mode() == PmpAddrMatch::Tor)
    }

    fn commit(&mut self, write: PendingWrite) {
        match write.target {
            Target::Cfg(reg) => {
                let per = REGIONS_PER_CFG as usize;
                for lane in 0..per {
                    let byte = ((write.wdata >> (lane as u32 * LANE_BITS)) & LANE_MASK) as u8;
                    self.entries[reg * per + lane].update_cfg(write.op, byte);
                }
            }
            Target::Addr(idx) => {
                if self.addr_locked(idx) {
                    return;
                }
                let old = self.entries[idx].addr;
                self.entries[idx].addr = match write.op {
                    CsrOp::Read => old,
                    CsrOp::Write => write.wdata,
                    CsrOp::Set => old | write.wdata,
                    CsrOp::Clear => old & !write.wdata,
                };
            }
            Target::Hardwired | Target::Illegal => {}
        }
    }

    fn reset(&mut self) {
        self.entries.fill(PmpEntry::default());
        self.pending = None;
        self.ports.csr_rdata_o = 0;
        self.ports.illegal_csr_insn_o = false;
    }

    fn rising_edge(&mut self) {
        if self.polarity.is_active(self.ports.rst_ni) {
            self.reset();
            return;
        }
        if let Some(write) = self.pending.take() {
            self.commit(write);
        }
        if !self.ports.transaction_valid() {
            self.ports.csr_rdata_o = 0;
            self.ports.illegal_csr_insn_o = false;
            return;
        }
        let target = self.decode(self.ports.csr_addr_i);
        self.ports.csr_rdata_o = self.read(target);
        self.ports.illegal_csr_insn_o = target == Target::Illegal;
        let op = self.ports.op();
        if op != CsrOp::Read && target != Target::Illegal {
            self.pending = Some(PendingWrite {
                target,
                op,
                wdata: self.ports.csr_wdata_i,
            });
        }
    }
}

impl Default for BehavioralCsrDut {
    fn default() -> Self {
        Self::new(&RegModelConfig::default(), ResetPolarity::default())
    }
}

impl Dut for BehavioralCsrDut {
    fn name(&self) -> &str {
        "csr_tb"
    }

    fn set_clock(&mut self, level: bool) {
        self.clk = level;
    }

    fn clock(&self) -> bool {
        self.clk
    }

    fn set_reset_line(&mut self, level: bool) {
        self.ports.rst_ni = level;
    }

    fn reset_line(&self) -> bool {
        self.ports.rst_ni
    }

    fn eval(&mut self) {
        let rising = self.clk && !self.prev_clk;
        self.prev_clk = self.clk;
        if rising {
            self.rising_edge();
        }
    }

    fn finalize(&mut self) {
        self.finalized = true;
    }

    fn got_finish(&self) -> bool {
        self.finished
    }

    fn trace_signals(&self) -> Vec<SignalValue> {
        let p = &self.ports;
        vec![
            SignalValue::bit("clk_i", self.clk),
            SignalValue::bit("rst_ni", p.rst_ni),
            SignalValue::bit("csr_access_i", p.csr_access_i),
            SignalValue::bit("instr_new_id_i", p.instr_new_id_i),
            SignalValue::bus("csr_addr_i", 12, u64::from(p.csr_addr_i & 0xFFF)),
            SignalValue::bus("csr_op_i", 2, u64::from(p.csr_op_i & 0x3)),
            SignalValue::bus("csr_wdata_i", 32, u64::from(p.csr_wdata_i)),
            SignalValue::bus("csr_rdata_o", 32, u64::from(p.csr_rdata_o)),
            SignalValue::bit("illegal_csr_insn_o", p.illegal_csr_insn_o),
        ]
    }

    fn write_memory_word(
        &mut self,
        location: &str,
        index: usize,
        word: u32,
    ) -> Result<(), MemoryError> {
        if location != RAM_LOCATION {
            return Err(MemoryError::NoMemoryAt {
                location: location.to_owned(),
            });
        }
        let words = self.ram.len();
        let slot = self
            .ram
            .get_mut(index)
            .ok_or_else(|| MemoryError::IndexOutOfRange {
                location: location.to_owned(),
                index,
                words,
            })?;
        *slot = word;
        Ok(())
    }

    fn load_vmem(&mut self, location: &str, path: &Path) -> Result<(), MemoryError> {
        if location != RAM_LOCATION {
            return Err(MemoryError::NoMemoryAt {
                location: location.to_owned(),
            });
        }
        let text = fs::read_to_string(path).map_err(|e| MemoryError::InvalidImage {
            location: location.to_owned(),
            reason: format!("{}: {e}", path.display()),
        })?;
        for (index, word) in parse_vmem(&text).map_err(|reason| MemoryError::InvalidImage {
            location: location.to_owned(),
            reason,
        })? {
            self.write_memory_word(location, index, word)?;
        }
        Ok(())
    }
}

impl CsrDut for BehavioralCsrDut {
    fn ports(&self) -> &CsrPorts {
        &self.ports
    }

    fn ports_mut(&mut self) -> &mut CsrPorts {
        &mut self.ports
    }
}

/// Parses a VMEM image into `(word index, word)` pairs.
///
/// Supports `@<hex>` address markers, whitespace-separated hex words and `//` comments.
///
/// # Errors
///
/// Returns a diagnostic naming the first token that is not valid hex.
pub fn parse_vmem(text: &str) -> Result<Vec<(usize, u32)>, String> {
    let mut words = Vec::new();
    let mut index = 0usize;
    for (line_no, line) in text.lines().enumerate() {
        let code = line.split("//").next().unwrap_or_default();
        for token in code.split_whitespace() {
            if let Some(addr) = token.strip_prefix('@') {
                index = usize::from_str_radix(addr, 16)
                    .map_err(|_| format!("line {}: bad address '{token}'", line_no + 1))?;
            } else {
                let word = u32::from_str_radix(token, 16)
                    .map_err(|_| format!("line {}: bad word '{token}'", line_no + 1))?;
                words.push((index, word));
                index += 1;
            }
        }
    }
    Ok(words)
}
