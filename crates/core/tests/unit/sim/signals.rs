//! # Run Control Signal Tests
//!
//! Stop and trace flags shared with asynchronous requesters, and the process
//! signal routing.

use csrtb_core::sim::SimSignals;

#[test]
fn test_stop_flags() {
    let signals = SimSignals::new(false);
    assert!(!signals.stop_requested());
    assert!(signals.stop_success());

    signals.request_stop(true);
    assert!(signals.stop_requested());
    assert!(signals.stop_success());

    signals.request_stop(false);
    signals.request_stop(true);
    assert!(!signals.stop_success());
}

#[test]
fn test_trace_requires_support() {
    let signals = SimSignals::default();
    assert!(!signals.tracing_possible());
    assert!(!signals.trace_on());
    assert!(!signals.tracing_enabled());
    assert!(!signals.toggle_trace());
}

#[test]
fn test_trace_toggle() {
    let signals = SimSignals::new(true);
    assert!(signals.trace_on());
    assert!(signals.trace_on());
    assert!(signals.tracing_enabled());
    assert!(!signals.toggle_trace());
    assert!(!signals.tracing_enabled());
    assert!(signals.toggle_trace());
    assert!(!signals.trace_off());
    assert!(!signals.tracing_ever_enabled());
}

#[cfg(unix)]
#[test]
fn test_process_signals_reach_flags() {
    use std::sync::Arc;

    use csrtb_core::sim::install_handlers;

    let signals = Arc::new(SimSignals::new(true));
    install_handlers(Arc::clone(&signals)).unwrap();

    // SAFETY: the handlers installed above only touch atomics.
    unsafe {
        assert_eq!(libc::raise(libc::SIGUSR1), 0);
    }
    assert!(signals.tracing_enabled());
    // SAFETY: as above.
    unsafe {
        assert_eq!(libc::raise(libc::SIGUSR1), 0);
    }
    assert!(!signals.tracing_enabled());

    assert!(!signals.stop_requested());
    // SAFETY: as above.
    unsafe {
        assert_eq!(libc::raise(libc::SIGINT), 0);
    }
    assert!(signals.stop_requested());
    assert!(signals.stop_success());

    let err = install_handlers(Arc::new(SimSignals::default())).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
}
