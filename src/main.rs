//! Cycle-accurate multi-core pipeline simulator CLI.

use std::path::PathBuf;
use std::process;

use clap::Parser;

use coresim::config::{CacheConfig, LatencyTable, RuntimeConfig};
use coresim::Simulator;

#[derive(Parser, Debug)]
#[command(
    name = "coresim",
    author,
    version,
    about = "Cycle-accurate multi-core in-order pipeline simulator",
    long_about = "Runs a RISC-style assembly program on 1-4 in-order five-stage cores with a three-level \
cache hierarchy, per-core scratchpad, and a cross-core SYNC barrier.\n\nExample:\n  coresim prog.asm --cores 2 --forwarding"
)]
struct Cli {
    /// Assembly program to run.
    program: PathBuf,

    /// Cache configuration file (KEY VALUE lines); defaults are used if omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of active cores, 1-4.
    #[arg(long, default_value_t = 4)]
    cores: u32,

    /// Enable EX/MEM forwarding.
    #[arg(long, default_value_t = true)]
    forwarding: bool,

    /// ADD latency, cycles.
    #[arg(long, default_value_t = 1)]
    add_latency: u64,

    /// SUB latency, cycles.
    #[arg(long, default_value_t = 1)]
    sub_latency: u64,

    /// MUL latency, cycles.
    #[arg(long, default_value_t = 1)]
    mul_latency: u64,

    /// DIV latency, cycles (reserved, no opcode currently uses it).
    #[arg(long, default_value_t = 1)]
    div_latency: u64,

    /// Cycle ceiling, guards against livelock from malformed programs.
    #[arg(long, default_value_t = 10_000)]
    cycle_limit: u64,

    /// Emit the final report as JSON instead of the human-readable form.
    #[arg(long)]
    json: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let cache_config = match &cli.config {
        Some(path) => CacheConfig::load_from_file(path),
        None => Ok(CacheConfig::default()),
    };
    let cache_config = cache_config.unwrap_or_else(|err| {
        eprintln!("error: {err}");
        process::exit(1);
    });

    let runtime = RuntimeConfig {
        num_cores: cli.cores,
        forwarding: cli.forwarding,
        latencies: LatencyTable { add: cli.add_latency, sub: cli.sub_latency, mul: cli.mul_latency, div: cli.div_latency },
        cycle_limit: cli.cycle_limit,
    };

    let simulator = Simulator::new(&cli.program, &cache_config, &runtime).unwrap_or_else(|err| {
        eprintln!("error: {err}");
        process::exit(1);
    });

    let (report, _diagnostics) = simulator.run();

    if cli.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                eprintln!("error: failed to serialize report: {err}");
                process::exit(1);
            }
        }
    } else {
        report.print();
    }
}
