//! Asynchronous run control.
//!
//! Stop and trace requests may arrive from a signal handler at any wall-clock time.
//! They only flip atomics in a shared `SimSignals`; the scheduler observes the flags
//! at a fixed point of every tick and performs the I/O itself.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Flags shared between the scheduler and asynchronous requesters.
#[derive(Debug)]
pub struct SimSignals {
    stop_requested: AtomicBool,
    stop_success: AtomicBool,
    tracing_possible: AtomicBool,
    tracing_enabled: AtomicBool,
    tracing_changed: AtomicBool,
    tracing_ever_enabled: AtomicBool,
}

impl SimSignals {
    /// Creates the flag set; `tracing_possible` reports whether the tracer can write traces.
    pub const fn new(tracing_possible: bool) -> Self {
        Self {
            stop_requested: AtomicBool::new(false),
            stop_success: AtomicBool::new(true),
            tracing_possible: AtomicBool::new(tracing_possible),
            tracing_enabled: AtomicBool::new(false),
            tracing_changed: AtomicBool::new(false),
            tracing_ever_enabled: AtomicBool::new(false),
        }
    }

    /// Requests the run to stop after the current tick.
    ///
    /// Repeated requests are harmless; the run succeeds only if every request did.
    pub fn request_stop(&self, success: bool) {
        self.stop_requested.store(true, Ordering::SeqCst);
        let _ = self.stop_success.fetch_and(success, Ordering::SeqCst);
    }

    /// Returns true once a stop has been requested.
    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// Combined success flag of all stop requests.
    pub fn stop_success(&self) -> bool {
        self.stop_success.load(Ordering::SeqCst)
    }

    /// Enables tracing if it is possible. Returns the resulting enabled state.
    pub fn trace_on(&self) -> bool {
        let possible = self.tracing_possible();
        if self.tracing_enabled.swap(possible, Ordering::SeqCst) != possible {
            self.tracing_changed.store(true, Ordering::SeqCst);
        }
        possible
    }

    /// Disables tracing. Returns the resulting enabled state (always false).
    pub fn trace_off(&self) -> bool {
        if self.tracing_enabled.swap(false, Ordering::SeqCst) {
            self.tracing_changed.store(true, Ordering::SeqCst);
        }
        false
    }

    /// Flips the tracing state. Returns the resulting enabled state.
    pub fn toggle_trace(&self) -> bool {
        if self.tracing_enabled() {
            self.trace_off()
        } else {
            self.trace_on()
        }
    }

    /// Returns true if tracing is currently enabled.
    pub fn tracing_enabled(&self) -> bool {
        self.tracing_enabled.load(Ordering::SeqCst)
    }

    /// Returns true if the attached tracer can write traces.
    pub fn tracing_possible(&self) -> bool {
        self.tracing_possible.load(Ordering::SeqCst)
    }

    /// Returns true if a trace file was opened at any point of the run.
    pub fn tracing_ever_enabled(&self) -> bool {
        self.tracing_ever_enabled.load(Ordering::SeqCst)
    }

    pub(crate) fn set_tracing_possible(&self, possible: bool) {
        self.tracing_possible.store(possible, Ordering::SeqCst);
    }

    pub(crate) fn mark_ever_enabled(&self) {
        self.tracing_ever_enabled.store(true, Ordering::SeqCst);
    }

    /// Consumes the pending "enabled changed" flag.
    pub(crate) fn take_trace_change(&self) -> bool {
        self.tracing_changed.swap(false, Ordering::SeqCst)
    }
}

impl Default for SimSignals {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Process-lifetime handle reached from the signal handler.
static HANDLE: OnceLock<Arc<SimSignals>> = OnceLock::new();

/// Routes SIGINT to `request_stop(true)` and SIGUSR1 to a tracing toggle.
///
/// Only one flag set can be installed per process.
///
/// # Errors
///
/// Returns `AlreadyExists` if handlers were installed before, or the OS error of
/// `sigaction(2)`.
pub fn install_handlers(signals: Arc<SimSignals>) -> io::Result<()> {
    HANDLE.set(signals).map_err(|_| {
        io::Error::new(
            io::ErrorKind::AlreadyExists,
            "signal handlers are already installed",
        )
    })?;

    #[cfg(unix)]
    {
        install(libc::SIGINT)?;
        install(libc::SIGUSR1)?;
    }
    Ok(())
}

#[cfg(unix)]
extern "C" fn handle_signal(sig: libc::c_int) {
    let Some(signals) = HANDLE.get() else {
        return;
    };
    match sig {
        libc::SIGINT => signals.request_stop(true),
        libc::SIGUSR1 => {
            let _ = signals.toggle_trace();
        }
        _ => {}
    }
}

#[cfg(unix)]
fn install(sig: libc::c_int) -> io::Result<()> {
    let handler = handle_signal as extern "C" fn(libc::c_int);
    // SAFETY: an all-zero `sigaction` is a valid value (no flags, empty mask) that is then
    // filled in; the handler only performs atomic loads and stores.
    let rc = unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = handler as libc::sighandler_t;
        let _ = libc::sigemptyset(&raw mut action.sa_mask);
        action.sa_flags = 0;
        libc::sigaction(sig, &raw const action, std::ptr::null_mut())
    };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}
