//! # Scheduler Tests
//!
//! Clock and reset waveform, callback dispatch and the stop conditions of `SimCtrl`.

use std::cell::RefCell;
use std::rc::Rc;

use csrtb_core::common::ConfigError;
use csrtb_core::config::{DriverConfig, ResetPolarity, SimConfig};
use csrtb_core::driver::EnvDriver;
use csrtb_core::dut::CsrDut;
use csrtb_core::sim::{ResetPhase, SimCtrl, StopReason};
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::harness::{RecordingDut, init_tracing, sim_config};

#[test]
fn test_budget_bounds_the_run() {
    init_tracing();
    let mut sim = SimCtrl::new(RecordingDut::new(), &sim_config(20));
    let outcome = sim.run();

    assert_eq!(outcome.reason, StopReason::CycleBudgetExhausted);
    assert!(outcome.success);
    assert_eq!(outcome.ticks, 21);
    assert_eq!(outcome.cycles, 10);
    assert_eq!(sim.tick(), 21);
    assert_eq!(sim.dut().evals.len(), 21);
}

#[test]
fn test_clock_rises_on_even_ticks() {
    let mut sim = SimCtrl::new(RecordingDut::new(), &sim_config(9));
    let _ = sim.run();
    for (tick, sample) in sim.dut().evals.iter().enumerate() {
        assert_eq!(sample.clock, tick % 2 == 0, "tick {tick}");
    }
}

#[test]
fn test_reset_waveform() {
    let mut sim = SimCtrl::new(RecordingDut::new(), &sim_config(20));
    let _ = sim.run();
    let dut = sim.dut();
    for tick in 0..4 {
        assert!(dut.reset_at(tick), "tick {tick} should be out of reset");
    }
    for tick in 4..8 {
        assert!(!dut.reset_at(tick), "tick {tick} should be in reset");
    }
    for tick in 8..21 {
        assert!(dut.reset_at(tick), "tick {tick} should be released");
    }
}

#[test]
fn test_positive_polarity_waveform() {
    let config = SimConfig {
        term_after_cycles: 12,
        reset_polarity: ResetPolarity::Positive,
        ..SimConfig::default()
    };
    let mut dut = RecordingDut::new();
    dut.ports.rst_ni = false;
    let mut sim = SimCtrl::new(dut, &config);
    let _ = sim.run();
    let levels: Vec<_> = sim.dut().evals.iter().map(|s| s.reset_line).collect();
    let expected: Vec<_> = (0..13).map(|tick| (4..8).contains(&tick)).collect();
    assert_eq!(levels, expected);
}

#[rstest]
#[case(0, ResetPhase::PreReset)]
#[case(5, ResetPhase::PreReset)]
#[case(6, ResetPhase::InReset)]
#[case(13, ResetPhase::InReset)]
#[case(14, ResetPhase::Running)]
#[case(1000, ResetPhase::Running)]
fn test_reset_phase_boundaries(#[case] tick: u64, #[case] phase: ResetPhase) {
    let config = SimConfig {
        initial_reset_delay: 3,
        reset_duration: 4,
        ..SimConfig::default()
    };
    let sim = SimCtrl::new(RecordingDut::new(), &config);
    assert_eq!(sim.reset_phase(tick), phase);
}

#[test]
fn test_zero_duration_never_asserts_reset() {
    let config = SimConfig {
        reset_duration: 0,
        term_after_cycles: 10,
        ..SimConfig::default()
    };
    let mut sim = SimCtrl::new(RecordingDut::new(), &config);
    let _ = sim.run();
    assert!(sim.dut().evals.iter().all(|s| s.reset_line));
}

#[test]
fn test_callback_runs_on_rising_edges() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut sim = SimCtrl::new(RecordingDut::new(), &sim_config(9));
    let log = Rc::clone(&seen);
    sim.set_on_clock(move |tick, dut: &mut RecordingDut| {
        log.borrow_mut().push((tick, dut.clk));
        false
    });
    let _ = sim.run();
    assert_eq!(
        *seen.borrow(),
        vec![(0, true), (2, true), (4, true), (6, true), (8, true)]
    );
}

#[test]
fn test_callback_stop_request() {
    let calls = Rc::new(RefCell::new(0u32));
    let mut sim = SimCtrl::new(RecordingDut::new(), &sim_config(0));
    let counter = Rc::clone(&calls);
    sim.set_on_clock(move |_, _| {
        *counter.borrow_mut() += 1;
        *counter.borrow() == 5
    });
    let outcome = sim.run();

    assert_eq!(*calls.borrow(), 5);
    assert_eq!(outcome.reason, StopReason::StopRequested);
    assert!(outcome.success);
    assert_eq!(outcome.ticks, 9);
}

#[test]
fn test_callback_drives_design_inputs() {
    let mut sim = SimCtrl::new(RecordingDut::new(), &sim_config(5));
    sim.set_on_clock(|tick, dut: &mut RecordingDut| {
        dut.ports_mut().csr_addr_i = u32::try_from(tick).unwrap_or_default();
        false
    });
    let _ = sim.run();
    assert_eq!(sim.dut().ports().csr_addr_i, 4);
}

#[test]
fn test_design_finish_stops_run() {
    let mut sim = SimCtrl::new(RecordingDut::finishing_after(7), &sim_config(100));
    let outcome = sim.run();
    assert_eq!(outcome.reason, StopReason::DesignFinished);
    assert!(outcome.success);
    assert_eq!(outcome.ticks, 7);
}

#[test]
fn test_stop_request_wins_over_finish() {
    let mut sim = SimCtrl::new(RecordingDut::finishing_after(1), &sim_config(0));
    sim.request_stop(true);
    let outcome = sim.run();
    assert_eq!(outcome.reason, StopReason::StopRequested);
    assert_eq!(outcome.ticks, 1);
}

#[test]
fn test_failed_stop_request() {
    let mut sim = SimCtrl::new(RecordingDut::new(), &sim_config(0));
    sim.request_stop(false);
    let outcome = sim.run();
    assert_eq!(outcome.reason, StopReason::StopRequested);
    assert!(!outcome.success);
    assert_eq!(outcome.ticks, 1);
}

#[test]
fn test_success_is_and_of_all_requests() {
    let mut sim = SimCtrl::new(RecordingDut::new(), &sim_config(0));
    let signals = sim.signals();
    signals.request_stop(false);
    sim.set_on_clock(|_, _| true);
    let outcome = sim.run();
    assert!(!outcome.success);
}

#[test]
fn test_design_is_finalized() {
    let mut sim = SimCtrl::new(RecordingDut::new(), &sim_config(3));
    let _ = sim.run();
    assert!(sim.into_dut().finalized);
}

#[test]
fn test_stats_follow_run() {
    let mut sim = SimCtrl::new(RecordingDut::new(), &sim_config(40));
    let _ = sim.run();
    assert_eq!(sim.stats().ticks, 41);
    assert_eq!(sim.stats().cycles(), 20);
    assert!(sim.stats().trace_file_size().is_none());
}

#[test]
fn test_prepare_without_trace_support() {
    let config = SimConfig {
        trace: true,
        ..SimConfig::default()
    };
    let mut sim = SimCtrl::new(RecordingDut::new(), &config);
    let err = sim.prepare().unwrap_err();
    assert!(matches!(err, ConfigError::TracingUnsupported));
    assert_eq!(err.exit_code(), 64);
}

#[test]
fn test_prepare_without_trace_request() {
    let mut sim = SimCtrl::new(RecordingDut::new(), &sim_config(0));
    assert!(sim.prepare().is_ok());
    assert!(!sim.trace_on());
    assert!(!sim.signals().tracing_enabled());
}

#[test]
fn test_stimulus_pulse_cannot_shorten_reset_window() {
    let config = SimConfig {
        term_after_cycles: 50,
        initial_reset_delay: 5,
        reset_duration: 10,
        ..SimConfig::default()
    };
    let drivers = DriverConfig {
        reset_interval_min: 5,
        reset_interval_max: 5,
        reset_pulse_cycles: 2,
        ..DriverConfig::default()
    };
    let mut env = EnvDriver::new(&drivers, ResetPolarity::Negative, 1);
    let mut sim = SimCtrl::new(RecordingDut::new(), &config);
    sim.set_on_clock(move |_, dut: &mut RecordingDut| {
        env.on_clock(dut.ports_mut());
        false
    });
    let _ = sim.run();

    // Pulses start at ticks 8, 18, 28 and 38 and release at 12, 22, 32 and 42;
    // the reset window covers ticks 10..30.
    let dut = sim.dut();
    for tick in 8..30 {
        assert!(!dut.reset_at(tick), "tick {tick} should be in reset");
    }
    assert!(dut.reset_at(30));
    for tick in 38..42 {
        assert!(!dut.reset_at(tick), "tick {tick} should be in a pulse");
    }
    assert!(dut.reset_at(42));
}
