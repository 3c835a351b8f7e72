//! Configuration system for the CSR testbench.
//!
//! This module defines the configuration structures used to parameterize a run. It provides:
//! 1. **Defaults:** Reset timing, PMP address map and stimulus ranges.
//! 2. **Structures:** Hierarchical config for the scheduler, the reference model and the drivers.
//! 3. **Validation:** Consistency checks performed before the first tick.
//!
//! Configuration is supplied as JSON (`Config::from_json_file`) or built with `Config::default()`.

use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::common::ConfigError;
use crate::common::constants::{
    CSR_ADDR_SPACE, PMPADDR_SLOTS, PMPADDR0, PMPCFG_SLOTS, PMPCFG0, REGIONS_PER_CFG,
};

/// Default configuration constants for the harness.
mod defaults {
    /// Clock periods before reset is asserted.
    pub const INITIAL_RESET_DELAY: u32 = 2;

    /// Clock periods reset stays asserted.
    pub const RESET_DURATION: u32 = 2;

    /// Trace file written when tracing is enabled.
    pub const TRACE_FILE: &str = "sim.vcd";

    /// PMP regions implemented by the design.
    pub const NUM_REGIONS: u32 = 4;

    /// Lowest CSR address drawn by the register driver.
    pub const ADDR_LOW: u32 = 0x3A0;

    /// Highest CSR address drawn by the register driver.
    pub const ADDR_HIGH: u32 = 0x3BF;

    /// Shortest gap between two transactions, in cycles.
    pub const DELAY_MIN: u32 = 1;

    /// Longest gap between two transactions, in cycles.
    pub const DELAY_MAX: u32 = 20;

    /// Shortest interval between two reset pulses, in cycles.
    pub const RESET_INTERVAL_MIN: u32 = 100;

    /// Longest interval between two reset pulses, in cycles.
    pub const RESET_INTERVAL_MAX: u32 = 1000;

    /// Cycles a reset pulse holds `rst_ni` low.
    pub const RESET_PULSE_CYCLES: u32 = 2;

    /// Transactions driven before the testbench requests a stop.
    pub const TRANSACTION_LIMIT: u64 = 10_000;
}

/// Reset signal polarity of the design under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ResetPolarity {
    /// Reset is active when the line is low (`rst_ni`).
    #[default]
    Negative,
    /// Reset is active when the line is high.
    Positive,
}

impl ResetPolarity {
    /// Line level that asserts reset.
    pub const fn active_level(self) -> bool {
        matches!(self, Self::Positive)
    }

    /// Returns true if `level` asserts reset under this polarity.
    pub const fn is_active(self, level: bool) -> bool {
        level == self.active_level()
    }
}

/// Root configuration structure containing all harness settings.
///
/// # Examples
///
/// ```
/// use csrtb_core::config::Config;
///
/// let config = Config::default();
/// assert_eq!(config.sim.initial_reset_delay, 2);
/// assert_eq!(config.model.num_regions, 4);
/// ```
///
/// Deserializing from JSON; omitted fields take their defaults:
///
/// ```
/// use csrtb_core::config::{Config, ResetPolarity};
///
/// let json = r#"{
///     "sim": { "term_after_cycles": 5000, "reset_polarity": "Positive", "seed": 7 },
///     "driver": { "transaction_limit": 250 }
/// }"#;
///
/// let config = Config::from_json_str(json).unwrap();
/// assert_eq!(config.sim.term_after_cycles, 5000);
/// assert_eq!(config.sim.reset_polarity, ResetPolarity::Positive);
/// assert_eq!(config.driver.transaction_limit, 250);
/// assert_eq!(config.driver.delay_max, 20);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Scheduler settings
    #[serde(default)]
    pub sim: SimConfig,
    /// Reference model address map
    #[serde(default)]
    pub model: RegModelConfig,
    /// Stimulus generator settings
    #[serde(default)]
    pub driver: DriverConfig,
}

impl Config {
    /// Parses and validates a configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Json` on malformed input and `ConfigError::Invalid`
    /// when the values are inconsistent.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnreadableFile` if the file cannot be read, otherwise
    /// the errors of [`Config::from_json_str`].
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::UnreadableFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Checks cross-field consistency.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` describing the first inconsistency found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.model.validate()?;
        self.driver.validate()
    }
}

/// Scheduler settings: reset timing, termination and tracing.
#[derive(Debug, Clone, Deserialize)]
pub struct SimConfig {
    /// Clock periods before reset is asserted
    #[serde(default = "SimConfig::default_initial_reset_delay")]
    pub initial_reset_delay: u32,

    /// Clock periods reset stays asserted
    #[serde(default = "SimConfig::default_reset_duration")]
    pub reset_duration: u32,

    /// Stop once the tick counter exceeds this value (0 = unbounded)
    #[serde(default)]
    pub term_after_cycles: u64,

    /// Write a trace file from the start of the run
    #[serde(default)]
    pub trace: bool,

    /// Trace file path
    #[serde(default = "SimConfig::default_trace_file")]
    pub trace_file: PathBuf,

    /// Reset polarity of the design
    #[serde(default)]
    pub reset_polarity: ResetPolarity,

    /// Seed for the stimulus generators
    #[serde(default)]
    pub seed: u64,
}

impl SimConfig {
    fn default_initial_reset_delay() -> u32 {
        defaults::INITIAL_RESET_DELAY
    }

    fn default_reset_duration() -> u32 {
        defaults::RESET_DURATION
    }

    fn default_trace_file() -> PathBuf {
        PathBuf::from(defaults::TRACE_FILE)
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            initial_reset_delay: defaults::INITIAL_RESET_DELAY,
            reset_duration: defaults::RESET_DURATION,
            term_after_cycles: 0,
            trace: false,
            trace_file: PathBuf::from(defaults::TRACE_FILE),
            reset_polarity: ResetPolarity::Negative,
            seed: 0,
        }
    }
}

/// Address map of the PMP register file mirrored by the reference model.
#[derive(Debug, Clone, Deserialize)]
pub struct RegModelConfig {
    /// Address of the first configuration register
    #[serde(default = "RegModelConfig::default_cfg_base")]
    pub cfg_base: u32,

    /// Address of the first address register
    #[serde(default = "RegModelConfig::default_addr_base")]
    pub addr_base: u32,

    /// Configuration register slots in the map (implemented or not)
    #[serde(default = "RegModelConfig::default_cfg_slots")]
    pub cfg_slots: u32,

    /// Address register slots in the map (implemented or not)
    #[serde(default = "RegModelConfig::default_addr_slots")]
    pub addr_slots: u32,

    /// PMP regions implemented by the design
    #[serde(default = "RegModelConfig::default_num_regions")]
    pub num_regions: u32,
}

impl RegModelConfig {
    fn default_cfg_base() -> u32 {
        PMPCFG0
    }

    fn default_addr_base() -> u32 {
        PMPADDR0
    }

    fn default_cfg_slots() -> u32 {
        PMPCFG_SLOTS
    }

    fn default_addr_slots() -> u32 {
        PMPADDR_SLOTS
    }

    fn default_num_regions() -> u32 {
        defaults::NUM_REGIONS
    }

    /// Number of implemented configuration registers (four regions per register).
    pub const fn implemented_cfg(&self) -> u32 {
        self.num_regions.div_ceil(REGIONS_PER_CFG)
    }

    /// Number of implemented address registers (one per region).
    pub const fn implemented_addr(&self) -> u32 {
        self.num_regions
    }

    /// Returns true if `addr` falls inside the configuration or address slots.
    pub const fn in_map(&self, addr: u32) -> bool {
        in_range(self.cfg_base, self.cfg_slots, addr)
            || in_range(self.addr_base, self.addr_slots, addr)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.num_regions > self.addr_slots {
            return Err(ConfigError::Invalid(format!(
                "{} PMP regions do not fit in {} address slots",
                self.num_regions, self.addr_slots
            )));
        }
        if self.implemented_cfg() > self.cfg_slots {
            return Err(ConfigError::Invalid(format!(
                "{} PMP regions need more than {} configuration slots",
                self.num_regions, self.cfg_slots
            )));
        }
        let cfg_end = range_end("configuration", self.cfg_base, self.cfg_slots)?;
        let addr_end = range_end("address", self.addr_base, self.addr_slots)?;
        if self.cfg_base < addr_end && self.addr_base < cfg_end {
            return Err(ConfigError::Invalid(format!(
                "configuration range {:#x}..{cfg_end:#x} overlaps address range {:#x}..{addr_end:#x}",
                self.cfg_base, self.addr_base
            )));
        }
        Ok(())
    }
}

/// Returns true if `addr` lies in the `slots` registers starting at `base`.
pub const fn in_range(base: u32, slots: u32, addr: u32) -> bool {
    addr >= base && addr - base < slots
}

/// End of a register range, which must stay inside the CSR address space.
fn range_end(kind: &str, base: u32, slots: u32) -> Result<u32, ConfigError> {
    base.checked_add(slots)
        .filter(|&end| end <= CSR_ADDR_SPACE)
        .ok_or_else(|| {
            ConfigError::Invalid(format!(
                "{kind} range at {base:#x} with {slots} slots runs past the CSR address space"
            ))
        })
}

impl Default for RegModelConfig {
    fn default() -> Self {
        Self {
            cfg_base: PMPCFG0,
            addr_base: PMPADDR0,
            cfg_slots: PMPCFG_SLOTS,
            addr_slots: PMPADDR_SLOTS,
            num_regions: defaults::NUM_REGIONS,
        }
    }
}

/// Stimulus generator settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DriverConfig {
    /// Lowest CSR address drawn
    #[serde(default = "DriverConfig::default_addr_low")]
    pub addr_low: u32,

    /// Highest CSR address drawn (inclusive)
    #[serde(default = "DriverConfig::default_addr_high")]
    pub addr_high: u32,

    /// Shortest gap between transactions, in cycles
    #[serde(default = "DriverConfig::default_delay_min")]
    pub delay_min: u32,

    /// Longest gap between transactions, in cycles
    #[serde(default = "DriverConfig::default_delay_max")]
    pub delay_max: u32,

    /// Shortest interval between reset pulses, in cycles
    #[serde(default = "DriverConfig::default_reset_interval_min")]
    pub reset_interval_min: u32,

    /// Longest interval between reset pulses, in cycles
    #[serde(default = "DriverConfig::default_reset_interval_max")]
    pub reset_interval_max: u32,

    /// Cycles a reset pulse holds reset asserted
    #[serde(default = "DriverConfig::default_reset_pulse_cycles")]
    pub reset_pulse_cycles: u32,

    /// Transactions driven before the testbench stops the run
    #[serde(default = "DriverConfig::default_transaction_limit")]
    pub transaction_limit: u64,
}

impl DriverConfig {
    fn default_addr_low() -> u32 {
        defaults::ADDR_LOW
    }

    fn default_addr_high() -> u32 {
        defaults::ADDR_HIGH
    }

    fn default_delay_min() -> u32 {
        defaults::DELAY_MIN
    }

    fn default_delay_max() -> u32 {
        defaults::DELAY_MAX
    }

    fn default_reset_interval_min() -> u32 {
        defaults::RESET_INTERVAL_MIN
    }

    fn default_reset_interval_max() -> u32 {
        defaults::RESET_INTERVAL_MAX
    }

    fn default_reset_pulse_cycles() -> u32 {
        defaults::RESET_PULSE_CYCLES
    }

    fn default_transaction_limit() -> u64 {
        defaults::TRANSACTION_LIMIT
    }

    /// Inclusive range of CSR addresses drawn by the register driver.
    pub const fn addr_range(&self) -> RangeInclusive<u32> {
        self.addr_low..=self.addr_high
    }

    /// Inclusive range of inter-transaction delays.
    pub const fn delay_range(&self) -> RangeInclusive<u32> {
        self.delay_min..=self.delay_max
    }

    /// Inclusive range of reset-pulse intervals.
    pub const fn reset_interval_range(&self) -> RangeInclusive<u32> {
        self.reset_interval_min..=self.reset_interval_max
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.addr_low > self.addr_high {
            return Err(ConfigError::Invalid(format!(
                "empty address range {:#x}..={:#x}",
                self.addr_low, self.addr_high
            )));
        }
        if self.delay_min == 0 || self.delay_min > self.delay_max {
            return Err(ConfigError::Invalid(format!(
                "delay range {}..={} must be non-empty and start at 1 or more",
                self.delay_min, self.delay_max
            )));
        }
        if self.reset_interval_min == 0 || self.reset_interval_min > self.reset_interval_max {
            return Err(ConfigError::Invalid(format!(
                "reset interval range {}..={} must be non-empty and start at 1 or more",
                self.reset_interval_min, self.reset_interval_max
            )));
        }
        if self.reset_pulse_cycles >= self.reset_interval_min {
            return Err(ConfigError::Invalid(format!(
                "reset pulse of {} cycles does not fit in a {}-cycle interval",
                self.reset_pulse_cycles, self.reset_interval_min
            )));
        }
        Ok(())
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            addr_low: defaults::ADDR_LOW,
            addr_high: defaults::ADDR_HIGH,
            delay_min: defaults::DELAY_MIN,
            delay_max: defaults::DELAY_MAX,
            reset_interval_min: defaults::RESET_INTERVAL_MIN,
            reset_interval_max: defaults::RESET_INTERVAL_MAX,
            reset_pulse_cycles: defaults::RESET_PULSE_CYCLES,
            transaction_limit: defaults::TRANSACTION_LIMIT,
        }
    }
}
