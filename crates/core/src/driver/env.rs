//! Reset-pulse generator.

use tracing::debug;

use super::rng::XorShift64;
use crate::config::{DriverConfig, ResetPolarity};
use crate::dut::CsrPorts;

/// Pulses reset at random intervals while the design is running.
///
/// The driver only touches the reset line when a pulse starts or ends, so the
/// scheduler's own reset sequence is left alone between pulses.
#[derive(Debug)]
pub struct EnvDriver {
    rng: XorShift64,
    polarity: ResetPolarity,
    interval: std::ops::RangeInclusive<u32>,
    pulse_cycles: u32,
    /// Cycles until the next pulse starts.
    countdown: u32,
    /// Cycles left in the current pulse.
    pulse_left: u32,
    pulses: u64,
}

impl EnvDriver {
    /// Creates a driver with its first pulse scheduled one interval from now.
    pub fn new(config: &DriverConfig, polarity: ResetPolarity, seed: u64) -> Self {
        let mut rng = XorShift64::new(seed);
        let countdown = rng.uniform(config.reset_interval_range());
        Self {
            rng,
            polarity,
            interval: config.reset_interval_range(),
            pulse_cycles: config.reset_pulse_cycles,
            countdown,
            pulse_left: 0,
            pulses: 0,
        }
    }

    /// Advances both countdowns by one cycle and drives the reset line on pulse edges.
    pub fn on_clock(&mut self, ports: &mut CsrPorts) {
        if self.pulse_left > 0 {
            self.pulse_left -= 1;
            if self.pulse_left == 0 {
                ports.rst_ni = !self.polarity.active_level();
            }
        }

        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown == 0 {
            self.countdown = self.rng.uniform(self.interval.clone());
            if self.pulse_cycles > 0 {
                self.pulse_left = self.pulse_cycles;
                self.pulses += 1;
                ports.rst_ni = self.polarity.active_level();
                debug!(next_in = self.countdown, "reset pulse");
            }
        }
    }

    /// Returns true while a pulse holds reset asserted.
    pub const fn in_pulse(&self) -> bool {
        self.pulse_left > 0
    }

    /// Number of pulses started so far.
    pub const fn pulses(&self) -> u64 {
        self.pulses
    }
}
