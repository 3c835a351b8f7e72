//! # Tracing Tests
//!
//! How the scheduler drives a tracer (open on enable, one dump per tick, close at the
//! end) and the value-change-dump output format.

use std::fs;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use csrtb_core::config::SimConfig;
use csrtb_core::dut::SignalValue;
use csrtb_core::sim::{NullTracer, SimCtrl, Tracer, VcdTracer};
use pretty_assertions::assert_eq;

use crate::common::harness::{RecordingDut, init_tracing};
use crate::common::mocks::MockTracer;

fn tracing_config(term_after_cycles: u64, trace: bool) -> SimConfig {
    SimConfig {
        term_after_cycles,
        trace,
        trace_file: std::env::temp_dir().join("csrtb-mock.vcd"),
        ..SimConfig::default()
    }
}

/// A mock whose `is_open` follows successful `open` and `close` calls.
fn stateful_mock(open: Arc<AtomicBool>) -> MockTracer {
    let mut tracer = MockTracer::new();
    let _ = tracer.expect_is_supported().return_const(true);
    let state = Arc::clone(&open);
    let _ = tracer
        .expect_is_open()
        .returning(move || state.load(Ordering::SeqCst));
    let state = Arc::clone(&open);
    let _ = tracer.expect_open().times(1).returning(move |_| {
        state.store(true, Ordering::SeqCst);
        Ok(())
    });
    let _ = tracer.expect_close().returning(move || {
        open.store(false, Ordering::SeqCst);
        Ok(())
    });
    tracer
}

#[test]
fn test_trace_from_start_dumps_every_tick() {
    init_tracing();
    let open = Arc::new(AtomicBool::new(false));
    let times = Arc::new(Mutex::new(Vec::new()));
    let mut tracer = stateful_mock(Arc::clone(&open));
    let seen = Arc::clone(&times);
    let _ = tracer.expect_dump().times(10).returning(move |time, signals| {
        assert_eq!(signals.len(), 2);
        seen.lock().unwrap().push(time);
        Ok(())
    });

    let mut sim =
        SimCtrl::new(RecordingDut::new(), &tracing_config(9, true)).with_tracer(Box::new(tracer));
    sim.prepare().unwrap();
    let _ = sim.run();

    assert_eq!(*times.lock().unwrap(), (1..=10).collect::<Vec<_>>());
    assert!(!open.load(Ordering::SeqCst));
    assert!(sim.signals().tracing_ever_enabled());
}

#[test]
fn test_trace_enabled_mid_run() {
    let open = Arc::new(AtomicBool::new(false));
    let times = Arc::new(Mutex::new(Vec::new()));
    let mut tracer = stateful_mock(Arc::clone(&open));
    let seen = Arc::clone(&times);
    let _ = tracer.expect_dump().returning(move |time, _| {
        seen.lock().unwrap().push(time);
        Ok(())
    });

    let mut sim =
        SimCtrl::new(RecordingDut::new(), &tracing_config(9, false)).with_tracer(Box::new(tracer));
    let signals = sim.signals();
    sim.set_on_clock(move |tick, _| {
        if tick == 4 {
            assert!(signals.trace_on());
        }
        false
    });
    sim.prepare().unwrap();
    let _ = sim.run();

    assert_eq!(*times.lock().unwrap(), vec![5, 6, 7, 8, 9, 10]);
}

#[test]
fn test_trace_disabled_mid_run_closes_file() {
    let open = Arc::new(AtomicBool::new(false));
    let times = Arc::new(Mutex::new(Vec::new()));
    let mut tracer = stateful_mock(Arc::clone(&open));
    let seen = Arc::clone(&times);
    let _ = tracer.expect_dump().returning(move |time, _| {
        seen.lock().unwrap().push(time);
        Ok(())
    });

    let mut sim =
        SimCtrl::new(RecordingDut::new(), &tracing_config(9, true)).with_tracer(Box::new(tracer));
    let signals = sim.signals();
    sim.set_on_clock(move |tick, _| {
        if tick == 4 {
            assert!(!signals.trace_off());
        }
        false
    });
    sim.prepare().unwrap();
    let _ = sim.run();

    assert_eq!(*times.lock().unwrap(), vec![1, 2, 3, 4]);
    assert!(sim.signals().tracing_ever_enabled());
    assert!(!sim.signals().tracing_enabled());
}

#[test]
fn test_failed_open_disables_tracing() {
    let mut tracer = MockTracer::new();
    let _ = tracer.expect_is_supported().return_const(true);
    let _ = tracer.expect_is_open().return_const(false);
    let _ = tracer
        .expect_open()
        .times(1)
        .returning(|_| Err(io::Error::from(io::ErrorKind::PermissionDenied)));
    let _ = tracer.expect_dump().never();
    let _ = tracer.expect_close().returning(|| Ok(()));

    let mut sim =
        SimCtrl::new(RecordingDut::new(), &tracing_config(9, true)).with_tracer(Box::new(tracer));
    sim.prepare().unwrap();
    let outcome = sim.run();

    assert_eq!(outcome.ticks, 10);
    assert!(!sim.signals().tracing_enabled());
    assert!(!sim.signals().tracing_ever_enabled());
}

#[test]
fn test_failed_dump_disables_tracing() {
    let open = Arc::new(AtomicBool::new(false));
    let mut tracer = stateful_mock(Arc::clone(&open));
    let _ = tracer
        .expect_dump()
        .times(1)
        .returning(|_, _| Err(io::Error::from(io::ErrorKind::WriteZero)));

    let mut sim =
        SimCtrl::new(RecordingDut::new(), &tracing_config(9, true)).with_tracer(Box::new(tracer));
    sim.prepare().unwrap();
    let _ = sim.run();

    assert!(!open.load(Ordering::SeqCst));
    assert!(!sim.signals().tracing_enabled());
}

#[test]
fn test_null_tracer_refuses_to_open() {
    let mut tracer = NullTracer;
    assert!(!tracer.is_supported());
    let err = tracer.open(std::path::Path::new("x.vcd")).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::Unsupported);
    assert!(!tracer.is_open());
}

#[test]
fn test_vcd_output_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wave.vcd");
    let mut tracer = VcdTracer::new();
    assert!(tracer.is_supported());
    tracer.open(&path).unwrap();
    assert!(tracer.is_open());

    let data = SignalValue::bus("data", 3, 5);
    tracer.dump(1, &[SignalValue::bit("clk", true), data]).unwrap();
    tracer.dump(2, &[SignalValue::bit("clk", true), data]).unwrap();
    tracer.dump(3, &[SignalValue::bit("clk", false), data]).unwrap();
    tracer.close().unwrap();
    assert!(!tracer.is_open());

    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(
        text,
        "$timescale 1ns $end\n\
         $scope module TOP $end\n\
         $var wire 1 ! clk $end\n\
         $var wire 3 \" data $end\n\
         $upscope $end\n\
         $enddefinitions $end\n\
         #1\n\
         1!\n\
         b101 \"\n\
         #3\n\
         0!\n"
    );
}

#[test]
fn test_vcd_dump_while_closed_is_ignored() {
    let mut tracer = VcdTracer::new();
    tracer.dump(1, &[SignalValue::bit("clk", true)]).unwrap();
    tracer.close().unwrap();
    assert!(!tracer.is_open());
}

#[test]
fn test_vcd_scheduler_run_writes_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = SimConfig {
        term_after_cycles: 20,
        trace: true,
        trace_file: dir.path().join("sim.vcd"),
        ..SimConfig::default()
    };
    let mut sim =
        SimCtrl::new(RecordingDut::new(), &config).with_tracer(Box::new(VcdTracer::new()));
    sim.prepare().unwrap();
    let _ = sim.run();

    let text = fs::read_to_string(dir.path().join("sim.vcd")).unwrap();
    assert!(text.contains("$var wire 1 ! clk_i $end"));
    assert!(text.contains("$var wire 1 \" rst_ni $end"));
    assert!(text.contains("#4\n"));
    assert!(text.contains("#21\n"));
    assert!(sim.stats().trace_file_size().is_some_and(|size| size > 0));
}
