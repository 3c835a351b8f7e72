//! Waveform tracing.
//!
//! The scheduler samples the design once per tick and hands the samples to a `Tracer`.
//! This module provides:
//! 1. **`Tracer`:** The sink interface; opening and closing are driven by the scheduler only.
//! 2. **`NullTracer`:** For builds without tracing support.
//! 3. **`VcdTracer`:** A value-change-dump writer.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::dut::SignalValue;

/// Sink for per-tick signal samples.
pub trait Tracer {
    /// Returns true if this tracer can write trace files at all.
    fn is_supported(&self) -> bool;

    /// Returns true while a trace file is open.
    fn is_open(&self) -> bool;

    /// Opens (truncating) the trace file at `path`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error of creating the file.
    fn open(&mut self, path: &Path) -> io::Result<()>;

    /// Records the samples of tick `time`. A closed tracer ignores the call.
    ///
    /// # Errors
    ///
    /// Returns the I/O error of writing the trace.
    fn dump(&mut self, time: u64, signals: &[SignalValue]) -> io::Result<()>;

    /// Flushes and closes the trace file, if open.
    ///
    /// # Errors
    ///
    /// Returns the I/O error of flushing the trace.
    fn close(&mut self) -> io::Result<()>;
}

/// Tracer of a build without trace support; never opens anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullTracer;

impl Tracer for NullTracer {
    fn is_supported(&self) -> bool {
        false
    }

    fn is_open(&self) -> bool {
        false
    }

    fn open(&mut self, _path: &Path) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "tracing is not supported by this build",
        ))
    }

    fn dump(&mut self, _time: u64, _signals: &[SignalValue]) -> io::Result<()> {
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Value-change-dump writer.
///
/// The header is emitted from the first sample after `open`; afterwards only
/// signals whose value changed are written, each batch under its `#time` marker.
#[derive(Debug, Default)]
pub struct VcdTracer {
    out: Option<BufWriter<File>>,
    header_written: bool,
    last: Vec<Option<u64>>,
}

impl VcdTracer {
    /// Creates a closed tracer.
    pub fn new() -> Self {
        Self::default()
    }

    fn write_header(out: &mut impl Write, signals: &[SignalValue]) -> io::Result<()> {
        writeln!(out, "$timescale 1ns $end")?;
        writeln!(out, "$scope module TOP $end")?;
        for (idx, signal) in signals.iter().enumerate() {
            writeln!(
                out,
                "$var wire {} {} {} $end",
                signal.width,
                identifier(idx),
                signal.name
            )?;
        }
        writeln!(out, "$upscope $end")?;
        writeln!(out, "$enddefinitions $end")
    }
}

impl Tracer for VcdTracer {
    fn is_supported(&self) -> bool {
        true
    }

    fn is_open(&self) -> bool {
        self.out.is_some()
    }

    fn open(&mut self, path: &Path) -> io::Result<()> {
        self.close()?;
        self.out = Some(BufWriter::new(File::create(path)?));
        self.header_written = false;
        self.last.clear();
        Ok(())
    }

    fn dump(&mut self, time: u64, signals: &[SignalValue]) -> io::Result<()> {
        let Some(out) = self.out.as_mut() else {
            return Ok(());
        };
        if !self.header_written {
            Self::write_header(out, signals)?;
            self.header_written = true;
            self.last = vec![None; signals.len()];
        }

        let mut changes = String::new();
        for (idx, signal) in signals.iter().enumerate() {
            let Some(last) = self.last.get_mut(idx) else {
                break;
            };
            if *last == Some(signal.value) {
                continue;
            }
            *last = Some(signal.value);
            let id = identifier(idx);
            let _ = if signal.width == 1 {
                writeln!(changes, "{}{id}", signal.value & 1)
            } else {
                writeln!(changes, "b{:b} {id}", signal.value)
            };
        }
        if !changes.is_empty() {
            writeln!(out, "#{time}")?;
            out.write_all(changes.as_bytes())?;
        }
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        match self.out.take() {
            Some(mut out) => out.flush(),
            None => Ok(()),
        }
    }
}

/// Short VCD identifier for the `idx`-th signal, drawn from printable ASCII.
fn identifier(idx: usize) -> String {
    const FIRST: u8 = b'!';
    const RADIX: usize = 94;

    let mut id = String::new();
    let mut n = idx;
    loop {
        id.push(char::from(FIRST + (n % RADIX) as u8));
        n /= RADIX;
        if n == 0 {
            break;
        }
        n -= 1;
    }
    id
}
