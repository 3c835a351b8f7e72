//! Pseudo-random source for stimulus generation.
//!
//! A xorshift64 generator: cheap, deterministic for a given seed, and good enough
//! for drawing addresses, data and delays.

use std::ops::RangeInclusive;

/// Replaces an all-zero state, which xorshift can never leave.
const ZERO_SEED_STATE: u64 = 123456789;

/// Xorshift64 pseudo-random number generator.
#[derive(Clone, Debug)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    /// Creates a generator; equal seeds produce equal sequences.
    pub const fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { ZERO_SEED_STATE } else { seed },
        }
    }

    /// Advances the generator and returns the next 64-bit value.
    pub const fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Returns the next 32-bit value, uniform over the full range.
    pub const fn next_u32(&mut self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// Returns a fair coin flip.
    pub const fn next_bool(&mut self) -> bool {
        self.next_u64() >> 63 == 1
    }

    /// Draws uniformly from the inclusive `range`.
    ///
    /// An empty range yields its start.
    pub fn uniform(&mut self, range: RangeInclusive<u32>) -> u32 {
        let (lo, hi) = range.into_inner();
        if hi <= lo {
            return lo;
        }
        let span = u64::from(hi - lo) + 1;
        lo + (self.next_u64() % span) as u32
    }
}
