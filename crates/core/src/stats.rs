//! Run statistics collection and reporting.
//!
//! This module tracks how long a run took and how fast it went. It provides:
//! 1. **Timing:** Wall-clock start and end of the scheduling loop.
//! 2. **Progress:** Ticks and executed clock cycles.
//! 3. **Throughput:** Cycles per second and simulated frequency.
//! 4. **Tracing:** Size of the trace file, if one was written.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Statistics of one simulation run.
#[derive(Clone, Debug, Default)]
pub struct RunStats {
    start: Option<Instant>,
    end: Option<Instant>,
    /// Half-period ticks simulated.
    pub ticks: u64,
    trace_file: Option<PathBuf>,
}

impl RunStats {
    /// Creates empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the start of the scheduling loop.
    pub fn start(&mut self) {
        self.start = Some(Instant::now());
        self.end = None;
    }

    /// Marks the end of the scheduling loop after `ticks` ticks.
    pub fn stop(&mut self, ticks: u64) {
        self.end = Some(Instant::now());
        self.ticks = ticks;
    }

    /// Records the trace file whose size is reported.
    pub fn set_trace_file(&mut self, path: &Path) {
        self.trace_file = Some(path.to_path_buf());
    }

    /// Executed clock cycles (two ticks per cycle).
    pub const fn cycles(&self) -> u64 {
        self.ticks / 2
    }

    /// Wall-clock time of the loop; measured up to now while it is still running.
    pub fn wall_time(&self) -> Duration {
        match (self.start, self.end) {
            (Some(start), Some(end)) => end.duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }

    /// Simulation speed in cycles per second (0 for an unmeasurably short run).
    pub fn cycles_per_second(&self) -> f64 {
        let millis = self.wall_time().as_millis();
        if millis == 0 {
            return 0.0;
        }
        self.cycles() as f64 * 1000.0 / millis as f64
    }

    /// Size of the trace file in bytes, if one exists.
    pub fn trace_file_size(&self) -> Option<u64> {
        let path = self.trace_file.as_ref()?;
        fs::metadata(path).ok().map(|meta| meta.len())
    }

    /// Prints the statistics table to stdout.
    pub fn print(&self) {
        let speed = self.cycles_per_second();
        println!("\n==========================================================");
        println!("SIMULATION STATISTICS");
        println!("==========================================================");
        println!("sim_cycles               {}", self.cycles());
        println!("host_seconds             {:.3} s", self.wall_time().as_secs_f64());
        println!("sim_speed                {speed:.2} cycles/s");
        println!("sim_freq                 {:.2} kHz", speed / 1000.0);
        if let Some(size) = self.trace_file_size() {
            println!("trace_file_size          {size} B");
        }
        println!("==========================================================");
    }
}
