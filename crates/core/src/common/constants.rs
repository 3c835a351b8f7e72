//! CSR addresses, PMP field encodings and process exit codes.

/// Address of `pmpcfg0`; configuration registers follow contiguously.
pub const PMPCFG0: u32 = 0x3A0;

/// Address of `pmpaddr0`; address registers follow contiguously.
pub const PMPADDR0: u32 = 0x3B0;

/// Size of the 12-bit CSR address space.
pub const CSR_ADDR_SPACE: u32 = 1 << 12;

/// Number of `pmpcfg` CSR slots in the address map.
pub const PMPCFG_SLOTS: u32 = 4;

/// Number of `pmpaddr` CSR slots in the address map.
pub const PMPADDR_SLOTS: u32 = 16;

/// PMP regions packed into one 32-bit `pmpcfg` register (one byte lane each).
pub const REGIONS_PER_CFG: u32 = 4;

/// Width of one configuration lane in bits.
pub const LANE_BITS: u32 = 8;

/// Lock bit (L) within a configuration lane.
pub const PMP_L: u32 = 1 << 7;

/// Address-matching mode field (A, bits 4:3) within a configuration lane.
pub const PMP_A_MASK: u32 = 0x18;

/// A field value selecting top-of-range matching.
pub const PMP_A_TOR: u32 = 0x08;

/// Read/write permission bits (R, W) within a configuration lane.
pub const PMP_RW_MASK: u32 = 0x3;

/// Reserved R/W encoding: W = 1 with R = 0.
pub const PMP_RW_RESERVED: u32 = 0x2;

/// Bits of a 4-region `pmpcfg` register that read as zero (bits 6:5 of every lane).
pub const PMPCFG_RAZ_MASK: u32 = 0x9F9F_9F9F;

/// Mask covering one full configuration lane.
pub const LANE_MASK: u32 = 0xFF;

/// Process exit codes following BSD `sysexits.h`.
pub mod exit {
    /// Successful termination.
    pub const EX_OK: i32 = 0;
    /// Generic failure (checker mismatches, unsuccessful stop).
    pub const EX_FAILURE: i32 = 1;
    /// Command line usage error.
    pub const EX_USAGE: i32 = 64;
    /// Data format error.
    pub const EX_DATAERR: i32 = 65;
    /// Cannot open input.
    pub const EX_NOINPUT: i32 = 66;
    /// Service unavailable.
    pub const EX_UNAVAILABLE: i32 = 69;
    /// Internal software error.
    pub const EX_SOFTWARE: i32 = 70;
}
