//! PMP CSR testbench CLI.
//!
//! This binary runs the register testbench against the behavioral CSR block. It performs:
//! 1. **Configuration:** Built-in defaults, an optional JSON file, then command-line overrides.
//! 2. **Memory initialization:** `--meminit name,file[,type]` loads ELF or VMEM images.
//! 3. **Run:** Drives randomized CSR transactions until the transaction limit, a signal or the cycle budget stops it.
//! 4. **Report:** Transaction count, checker failures, statistics and the trace-viewing hint.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use csrtb_core::common::ConfigError;
use csrtb_core::common::constants::exit;
use csrtb_core::config::Config;
use csrtb_core::dut::behavioral::RAM_LOCATION;
use csrtb_core::sim::{MemInitArg, VcdTracer, install_handlers, parse_meminit};
use csrtb_core::testbench::run_csr_testbench;
use csrtb_core::{BehavioralCsrDut, SimCtrl};

#[derive(Parser, Debug)]
#[command(
    name = "csrtb",
    author,
    version,
    about = "Cycle-driven verification harness for the PMP CSR block",
    long_about = "Drives randomized CSR transactions into the PMP CSR block and checks every one against a reference model.\n\nSend SIGUSR1 to toggle tracing, SIGINT to stop.\n\nExamples:\n  csrtb\n  csrtb -t -c 20000\n  csrtb -m ram,sw/test.elf --seed 7\n  csrtb -m list"
)]
struct Cli {
    /// Initialize a memory: NAME,FILE[,TYPE] (TYPE is elf or vmem); "list" shows the memories
    #[arg(short = 'm', long = "meminit", value_name = "NAME,FILE[,TYPE]")]
    meminit: Vec<String>,

    /// Stop once the tick counter exceeds this value (0 = unbounded)
    #[arg(short = 'c', long)]
    term_after_cycles: Option<u64>,

    /// Write a trace file from the start of the run
    #[arg(short = 't', long)]
    trace: bool,

    /// Seed for the stimulus generators
    #[arg(long)]
    seed: Option<u64>,

    /// Transactions to drive before stopping
    #[arg(long)]
    transactions: Option<u64>,

    /// JSON configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// PMP regions implemented by the design
    #[arg(long)]
    regions: Option<u32>,
}

fn main() {
    init_logging();
    let code = match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("ERROR: {e}");
            e.exit_code()
        }
    };
    process::exit(code);
}

/// Logs go to stderr, filtered by `RUST_LOG` (default `info`).
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Builds the configuration from the JSON file (if any) and the command-line overrides.
fn load_config(cli: &Cli) -> Result<Config, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };
    if let Some(cycles) = cli.term_after_cycles {
        config.sim.term_after_cycles = cycles;
    }
    if cli.trace {
        config.sim.trace = true;
    }
    if let Some(seed) = cli.seed {
        config.sim.seed = seed;
    }
    if let Some(limit) = cli.transactions {
        config.driver.transaction_limit = limit;
    }
    if let Some(regions) = cli.regions {
        config.model.num_regions = regions;
    }
    config.validate()?;
    Ok(config)
}

fn run(cli: Cli) -> Result<i32, ConfigError> {
    let config = load_config(&cli)?;

    let dut = BehavioralCsrDut::new(&config.model, config.sim.reset_polarity);
    let mut ctrl = SimCtrl::new(dut, &config.sim).with_tracer(Box::new(VcdTracer::new()));
    ctrl.register_memory("ram", RAM_LOCATION)?;

    for arg in &cli.meminit {
        match parse_meminit(arg)? {
            MemInitArg::List => {
                ctrl.memories().print_list();
                return Ok(exit::EX_OK);
            }
            MemInitArg::Load(request) => ctrl.apply_meminit(&request)?,
        }
    }
    ctrl.prepare()?;

    if let Err(e) = install_handlers(ctrl.signals()) {
        warn!("signal handlers not installed: {e}");
    }

    println!("Simulation of the PMP CSR block");
    println!("===============================");
    println!();
    if ctrl.signals().tracing_possible() {
        println!("Tracing can be toggled by sending SIGUSR1 to this process:");
        println!("$ kill -USR1 {}", process::id());
    }

    let report = run_csr_testbench(&mut ctrl, &config);

    println!("Drove {} register transactions", report.transactions);
    if report.failures.is_empty() {
        println!("All {} checked transactions matched the reference model", report.checked);
    } else {
        println!(
            "{} of {} checked transactions failed",
            report.failures.len(),
            report.checked
        );
    }
    ctrl.stats().print();

    if ctrl.signals().tracing_ever_enabled() {
        println!();
        println!("You can view the simulation traces by calling");
        println!("$ gtkwave {}", ctrl.trace_file().display());
    }

    Ok(report.exit_code())
}
