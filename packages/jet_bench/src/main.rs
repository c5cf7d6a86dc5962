#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))]

//! Binary entry point for the jet clustering benchmark.
//!
//! This module is excluded from mutation testing because testing process entry/exit behavior
//! is impractical - it requires spawning subprocesses and checking exit codes.

use std::path::PathBuf;
use std::process::ExitCode;

use argh::FromArgs;
use jet_bench::{DEFAULT_RADIUS, DEFAULT_TRIALS, RunInput, run};
use tracing_subscriber::EnvFilter;

/// Times jet clustering over the events of a HepMC3 file.
#[derive(FromArgs)]
struct Args {
    /// maximum number of events to read, -1 for all (default -1)
    #[argh(option, short = 'm', default = "-1")]
    maxevents: i64,

    /// number of events to skip at the start of the file; dumps keep numbering events by file
    /// position (default 0)
    #[argh(option, default = "0")]
    skipevents: usize,

    /// number of timed passes over all events (default 8)
    #[argh(option, short = 'n', default = "DEFAULT_TRIALS")]
    trials: usize,

    /// nearest-neighbour search strategy: Best, N2Plain or N2Tiled (default Best)
    #[argh(option, short = 's', default = "String::from(\"Best\")")]
    strategy: String,

    /// algorithm power: -1 anti-kt, 0 Cambridge/Aachen, 1 kt, other values generalised kt
    #[argh(option, short = 'p', default = "-1.0")]
    power: f64,

    /// algorithm name (AntiKt, CA, Kt or GenKt), overriding the algorithm implied by power
    #[argh(option, short = 'A')]
    algorithm: Option<String>,

    /// clustering radius (default 0.4)
    #[argh(option, short = 'R', default = "DEFAULT_RADIUS")]
    radius: f64,

    /// report inclusive jets above this transverse momentum (default 0.5)
    #[argh(option, short = 'P')]
    ptmin: Option<f64>,

    /// report exclusive jets with this maximum merging distance
    #[argh(option)]
    dijmax: Option<f64>,

    /// report this many exclusive jets
    #[argh(option)]
    njets: Option<usize>,

    /// write the jets of every event to this file, or to standard output for "-"
    #[argh(option, short = 'd')]
    dump: Option<String>,

    /// the HepMC3 event file
    #[argh(positional)]
    event_files: Vec<PathBuf>,
}

// Binary entry point - mutations would require subprocess testing which is impractical.
#[cfg_attr(test, mutants::skip)]
fn main() -> ExitCode {
    // Diagnostics go to stderr so that stdout carries only the report and the jet dump.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let env_args: Vec<String> = std::env::args().collect();
    let str_args: Vec<&str> = env_args.iter().map(String::as_str).collect();

    let program_name = str_args.first().copied().unwrap_or("jet-bench");

    let args = match Args::from_args(&[program_name], str_args.get(1..).unwrap_or(&[])) {
        Ok(args) => args,
        Err(early_exit) => {
            // Help output is a success; anything else is a usage error.
            return if early_exit.status.is_ok() {
                println!("{}", early_exit.output);
                ExitCode::SUCCESS
            } else {
                eprintln!("{}", early_exit.output);
                ExitCode::FAILURE
            };
        }
    };

    let input = RunInput {
        event_files: args.event_files,
        max_events: args.maxevents,
        skip_events: args.skipevents,
        trials: args.trials,
        strategy: args.strategy,
        power: args.power,
        algorithm: args.algorithm,
        radius: args.radius,
        pt_min: args.ptmin,
        dij_max: args.dijmax,
        n_jets: args.njets,
        dump: args.dump,
    };

    match run(&input) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
