//! CSR testbench wiring.
//!
//! Connects the reference model and the stimulus drivers to the scheduler's per-edge
//! callback. On every rising edge the testbench counts the transaction on the bus, lets
//! the model check it, then lets the drivers present the next inputs. The run stops
//! once the configured number of transactions has been counted.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::info;

use crate::common::CheckerFailure;
use crate::common::constants::exit;
use crate::config::Config;
use crate::driver::{EnvDriver, RegisterDriver};
use crate::dut::CsrDut;
use crate::model::RegisterModel;
use crate::sim::{RunOutcome, SimCtrl};

/// Decorrelates the reset-pulse stream from the transaction stream of the same seed.
const ENV_SEED_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Reference model plus stimulus for one run.
#[derive(Debug)]
pub struct CsrTestbench {
    model: RegisterModel,
    reg_driver: RegisterDriver,
    env_driver: EnvDriver,
    transactions: u64,
    limit: u64,
}

impl CsrTestbench {
    /// Creates the testbench described by `config`.
    pub fn new(config: &Config) -> Self {
        let polarity = config.sim.reset_polarity;
        Self {
            model: RegisterModel::new(&config.model, polarity),
            reg_driver: RegisterDriver::new(&config.driver, config.sim.seed),
            env_driver: EnvDriver::new(&config.driver, polarity, config.sim.seed ^ ENV_SEED_SALT),
            transactions: 0,
            limit: config.driver.transaction_limit,
        }
    }

    /// Per-edge callback body. Returns true once the transaction limit is reached.
    pub fn on_clock<D: CsrDut + ?Sized>(&mut self, tick: u64, dut: &mut D) -> bool {
        if dut.ports().csr_access_i {
            self.transactions += 1;
        }
        self.model.on_clock(tick, dut.ports());

        let ports = dut.ports_mut();
        self.reg_driver.on_clock(ports);
        self.env_driver.on_clock(ports);

        self.transactions >= self.limit
    }

    /// Transactions observed on the bus.
    pub const fn transactions(&self) -> u64 {
        self.transactions
    }

    /// The reference model.
    pub const fn model(&self) -> &RegisterModel {
        &self.model
    }

    /// The reset-pulse generator.
    pub const fn env_driver(&self) -> &EnvDriver {
        &self.env_driver
    }
}

/// Summary of a testbench run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestbenchReport {
    /// How the scheduler stopped.
    pub outcome: RunOutcome,
    /// Transactions observed on the bus.
    pub transactions: u64,
    /// Transactions the model checked (outside reset).
    pub checked: u64,
    /// Reset pulses issued by the environment driver.
    pub reset_pulses: u64,
    /// Checker failures in order of occurrence.
    pub failures: Vec<CheckerFailure>,
}

impl TestbenchReport {
    /// Returns true if the run stopped successfully without checker failures.
    pub fn passed(&self) -> bool {
        self.outcome.success && self.failures.is_empty()
    }

    /// Process exit status for this report.
    pub fn exit_code(&self) -> i32 {
        if self.passed() {
            exit::EX_OK
        } else {
            exit::EX_FAILURE
        }
    }
}

/// Installs the testbench callback on `ctrl`, runs it and reports the result.
pub fn run_csr_testbench<D: CsrDut + 'static>(
    ctrl: &mut SimCtrl<D>,
    config: &Config,
) -> TestbenchReport {
    let bench = Rc::new(RefCell::new(CsrTestbench::new(config)));
    let hook = Rc::clone(&bench);
    ctrl.set_on_clock(move |tick, dut| hook.borrow_mut().on_clock(tick, dut));

    let outcome = ctrl.run();
    let bench = bench.borrow();
    let report = TestbenchReport {
        outcome,
        transactions: bench.transactions(),
        checked: bench.model().checked_transactions(),
        reset_pulses: bench.env_driver().pulses(),
        failures: bench.model().failures().to_vec(),
    };
    info!(
        transactions = report.transactions,
        checked = report.checked,
        failures = report.failures.len(),
        reason = %outcome.reason,
        "testbench finished"
    );
    report
}
