//! Simulation scheduler.
//!
//! `SimCtrl` owns simulated time and the clock and reset waveform of a design. Each
//! tick is one clock half period and runs, in order:
//! 1. **Clock:** Toggle the clock; on the rising phase invoke the per-edge callback.
//! 2. **Reset:** Drive the reset line if the reset phase changed at this tick.
//! 3. **Evaluate:** Advance the design and the tick counter.
//! 4. **Trace:** Act on pending trace toggles, then sample the design if a trace is open.
//! 5. **Stop:** Check stop request, design finish and cycle budget, first match wins.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info};

use super::memory::{MemInitRequest, MemInitType, MemoryRegistry};
use super::signals::SimSignals;
use super::trace::{NullTracer, Tracer};
use crate::common::ConfigError;
use crate::config::SimConfig;
use crate::dut::Dut;
use crate::stats::RunStats;

/// Reset waveform phase of the scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResetPhase {
    /// Before the initial reset delay has elapsed; reset inactive.
    PreReset,
    /// Reset asserted for the configured duration.
    InReset,
    /// Reset released; normal operation.
    Running,
}

/// Why a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// An operator, signal or callback requested the stop.
    StopRequested,
    /// The design signalled termination.
    DesignFinished,
    /// The tick counter exceeded the configured budget.
    CycleBudgetExhausted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::StopRequested => "stop requested",
            Self::DesignFinished => "design finished",
            Self::CycleBudgetExhausted => "cycle budget exhausted",
        })
    }
}

/// Result of a completed run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunOutcome {
    /// First stop condition observed.
    pub reason: StopReason,
    /// Combined success flag of all stop requests.
    pub success: bool,
    /// Ticks simulated.
    pub ticks: u64,
    /// Clock cycles simulated.
    pub cycles: u64,
}

type ClockCallback<D> = Box<dyn FnMut(u64, &mut D) -> bool>;

/// Clock/reset generator, callback dispatcher and stop-condition evaluator.
pub struct SimCtrl<D: Dut> {
    dut: D,
    config: SimConfig,
    tick: u64,
    callback: Option<ClockCallback<D>>,
    tracer: Box<dyn Tracer>,
    signals: Arc<SimSignals>,
    memories: MemoryRegistry,
    stats: RunStats,
}

impl<D: Dut> SimCtrl<D> {
    /// Creates a scheduler for `dut` without tracing support.
    pub fn new(dut: D, config: &SimConfig) -> Self {
        Self {
            dut,
            config: config.clone(),
            tick: 0,
            callback: None,
            tracer: Box::new(NullTracer),
            signals: Arc::new(SimSignals::new(false)),
            memories: MemoryRegistry::new(),
            stats: RunStats::new(),
        }
    }

    /// Attaches a tracer; tracing becomes possible if the tracer supports it.
    #[must_use]
    pub fn with_tracer(mut self, tracer: Box<dyn Tracer>) -> Self {
        self.signals.set_tracing_possible(tracer.is_supported());
        self.tracer = tracer;
        self
    }

    /// Shared flag set for stop and trace requests from other contexts.
    pub fn signals(&self) -> Arc<SimSignals> {
        Arc::clone(&self.signals)
    }

    /// The design under test.
    pub const fn dut(&self) -> &D {
        &self.dut
    }

    /// The design under test, mutably.
    pub const fn dut_mut(&mut self) -> &mut D {
        &mut self.dut
    }

    /// Consumes the scheduler and returns the design.
    pub fn into_dut(self) -> D {
        self.dut
    }

    /// Scheduler settings.
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Current tick.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Statistics of the last run.
    pub const fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Trace file written while tracing is enabled.
    pub fn trace_file(&self) -> &Path {
        &self.config.trace_file
    }

    /// Reset phase in force at `tick`.
    pub fn reset_phase(&self, tick: u64) -> ResetPhase {
        let delay = u64::from(self.config.initial_reset_delay);
        let duration = u64::from(self.config.reset_duration);
        if tick < delay * 2 {
            ResetPhase::PreReset
        } else if tick < (delay + duration) * 2 {
            ResetPhase::InReset
        } else {
            ResetPhase::Running
        }
    }

    /// Registers the callback invoked on every rising clock edge.
    ///
    /// The callback receives the tick and the design; returning `true` requests a
    /// successful stop after the current tick.
    pub fn set_on_clock(&mut self, callback: impl FnMut(u64, &mut D) -> bool + 'static) {
        self.callback = Some(Box::new(callback));
    }

    /// Registers a design memory under `name`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DuplicateMemory` if `name` is taken.
    pub fn register_memory(&mut self, name: &str, location: &str) -> Result<(), ConfigError> {
        self.memories.register(name, location)
    }

    /// Registered design memories.
    pub const fn memories(&self) -> &MemoryRegistry {
        &self.memories
    }

    /// Loads `path` into the memory registered as `name`.
    ///
    /// The file kind is taken from `kind` or, if absent, from the extension.
    ///
    /// # Errors
    ///
    /// Returns the `ConfigError` of [`MemoryRegistry::load`].
    pub fn load_memory(
        &mut self,
        name: &str,
        path: &Path,
        kind: Option<MemInitType>,
    ) -> Result<(), ConfigError> {
        let request = MemInitRequest {
            name: name.to_owned(),
            path: path.to_path_buf(),
            kind: kind.unwrap_or_else(|| MemInitType::from_path(path)),
        };
        self.apply_meminit(&request)
    }

    /// Executes a parsed `--meminit` request.
    ///
    /// # Errors
    ///
    /// Returns the `ConfigError` of [`MemoryRegistry::load`].
    pub fn apply_meminit(&mut self, request: &MemInitRequest) -> Result<(), ConfigError> {
        self.memories.load(&mut self.dut, request)
    }

    /// Validates the trace request of the configuration and enables tracing from tick 0.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::TracingUnsupported` if tracing was requested but the
    /// attached tracer cannot write traces.
    pub fn prepare(&mut self) -> Result<(), ConfigError> {
        if self.config.trace {
            if !self.signals.tracing_possible() {
                return Err(ConfigError::TracingUnsupported);
            }
            let _ = self.signals.trace_on();
        }
        Ok(())
    }

    /// Requests a stop; see [`SimSignals::request_stop`].
    pub fn request_stop(&self, success: bool) {
        self.signals.request_stop(success);
    }

    /// Enables tracing. Returns the resulting enabled state.
    pub fn trace_on(&self) -> bool {
        self.signals.trace_on()
    }

    /// Disables tracing. Returns the resulting enabled state.
    pub fn trace_off(&self) -> bool {
        self.signals.trace_off()
    }

    /// Runs until a stop condition fires, then finalizes the design.
    pub fn run(&mut self) -> RunOutcome {
        info!(dut = self.dut.name(), "starting simulation");
        self.stats.start();

        let mut phase = self.reset_phase(self.tick);
        self.drive_reset(phase);

        let reason = loop {
            let clock = !self.dut.clock();
            self.dut.set_clock(clock);
            if clock {
                if let Some(callback) = self.callback.as_mut() {
                    if callback(self.tick, &mut self.dut) {
                        self.signals.request_stop(true);
                    }
                }
            }

            // InReset holds the line on every tick so a stimulus pulse ending inside
            // the window cannot release it early.
            let next = self.reset_phase(self.tick);
            if next != phase {
                debug!(tick = self.tick, ?next, "reset phase change");
                phase = next;
                self.drive_reset(phase);
            } else if phase == ResetPhase::InReset {
                self.drive_reset(phase);
            }

            self.dut.eval();
            self.tick += 1;
            self.trace_step();

            if let Some(reason) = self.stop_condition() {
                break reason;
            }
        };

        self.dut.finalize();
        if let Err(e) = self.tracer.close() {
            error!("could not close trace file: {e}");
        }
        self.stats.stop(self.tick);

        RunOutcome {
            reason,
            success: self.signals.stop_success(),
            ticks: self.tick,
            cycles: self.stats.cycles(),
        }
    }

    fn drive_reset(&mut self, phase: ResetPhase) {
        let active = self.config.reset_polarity.active_level();
        let level = if phase == ResetPhase::InReset {
            active
        } else {
            !active
        };
        self.dut.set_reset_line(level);
    }

    fn stop_condition(&self) -> Option<StopReason> {
        let term = self.config.term_after_cycles;
        if self.signals.stop_requested() {
            info!("received stop request, shutting down simulation");
            Some(StopReason::StopRequested)
        } else if self.dut.got_finish() {
            info!("design signalled finish, shutting down simulation");
            Some(StopReason::DesignFinished)
        } else if term > 0 && self.tick > term {
            info!("simulation timeout of {term} cycles reached, shutting down simulation");
            Some(StopReason::CycleBudgetExhausted)
        } else {
            None
        }
    }

    /// Opens or closes the trace file on a pending toggle, then samples the design.
    fn trace_step(&mut self) {
        if self.signals.take_trace_change() {
            if self.signals.tracing_enabled() {
                self.open_trace();
            } else {
                println!("Tracing disabled.");
                if let Err(e) = self.tracer.close() {
                    error!("could not close trace file: {e}");
                }
            }
        }

        if self.tracer.is_open() {
            if let Err(e) = self.tracer.dump(self.tick, &self.dut.trace_signals()) {
                error!("trace write failed, disabling tracing: {e}");
                let _ = self.signals.trace_off();
                let _ = self.signals.take_trace_change();
                let _ = self.tracer.close();
            }
        }
    }

    fn open_trace(&mut self) {
        let path = self.config.trace_file.clone();
        if !self.tracer.is_open() {
            if let Err(e) = self.tracer.open(&path) {
                error!("could not open trace file {}: {e}", path.display());
                let _ = self.signals.trace_off();
                let _ = self.signals.take_trace_change();
                return;
            }
            info!("writing trace to {}", path.display());
        }
        println!("Tracing enabled.");
        self.signals.mark_ever_enabled();
        self.stats.set_trace_file(&path);
    }
}

impl<D: Dut + fmt::Debug> fmt::Debug for SimCtrl<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimCtrl")
            .field("dut", &self.dut)
            .field("config", &self.config)
            .field("tick", &self.tick)
            .field("signals", &self.signals)
            .field("memories", &self.memories)
            .finish_non_exhaustive()
    }
}
