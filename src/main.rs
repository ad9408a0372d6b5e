//! Command-line entry point.

use clap::{Parser, ValueEnum};
use clauseforge::{
    parse_problem_file, report_human, report_spider, selector_from_name, Env, Limits, ProofMode,
    ProverError, Saturation, SaturationOptions,
};
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Full human-readable output
    Vampire,
    /// Terse one-line summary
    Spider,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ProofOption {
    On,
    Off,
    Tptp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Switch {
    On,
    Off,
}

/// Saturation-based first-order theorem prover with clause splitting.
#[derive(Parser, Debug)]
#[command(name = "clauseforge", version, about)]
struct Cli {
    /// Problem file in TPTP cnf syntax
    #[arg(value_name = "FILE")]
    input: Option<String>,

    /// Problem file (alternative to the positional argument)
    #[arg(long, value_name = "FILE")]
    input_file: Option<String>,

    /// Output mode
    #[arg(long, value_enum, default_value = "vampire")]
    mode: Mode,

    /// Time limit in seconds
    #[arg(long, value_name = "SECONDS")]
    time_limit: Option<u64>,

    /// Memory limit in MB
    #[arg(long, value_name = "MB")]
    memory_limit: Option<usize>,

    /// Proof output
    #[arg(long, value_enum, default_value = "off")]
    proof: ProofOption,

    /// Seed for randomized tie-breaking
    #[arg(long, default_value_t = 123456)]
    random_seed: u64,

    /// Opaque identifier echoed into the output
    #[arg(long, default_value = "unspecified_test")]
    test_id: String,

    /// AVATAR-style clause splitting
    #[arg(long, value_enum, default_value = "on")]
    splitting: Switch,

    /// Literal selection strategy
    #[arg(long, default_value = "unique_maximal")]
    selection: String,

    /// Directories searched for include() files
    #[arg(long, value_name = "DIR")]
    include: Vec<String>,
}

fn run(cli: &Cli) -> Result<(), ProverError> {
    let input = cli
        .input
        .as_deref()
        .or(cli.input_file.as_deref())
        .ok_or_else(|| ProverError::UserError("no input file given".to_string()))?;

    let selector = selector_from_name(&cli.selection).ok_or_else(|| {
        ProverError::UserError(format!("unknown selection strategy '{}'", cli.selection))
    })?;

    let include_dirs: Vec<&str> = cli.include.iter().map(String::as_str).collect();
    let parsed = parse_problem_file(input, &include_dirs)?;

    let limits = Limits::new(cli.time_limit.map(Duration::from_secs), cli.memory_limit);
    let env = Env::new(parsed.interner, limits, cli.random_seed);

    let options = SaturationOptions {
        splitting: cli.splitting == Switch::On,
        selector,
        ..SaturationOptions::default()
    };

    let mut saturation = Saturation::new(parsed.clauses.clauses, env, options);
    saturation.run()?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match cli.mode {
        Mode::Vampire => {
            let proof_mode = match cli.proof {
                ProofOption::Off => ProofMode::Off,
                ProofOption::On => ProofMode::On,
                ProofOption::Tptp => ProofMode::Tptp,
            };
            report_human(&mut out, &saturation.store, &saturation.env, proof_mode)
                .map_err(|e| ProverError::UserError(format!("cannot write output: {}", e)))?;
        }
        Mode::Spider => {
            let problem = Path::new(input)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or(input);
            report_spider(&mut out, &saturation.env, problem, &cli.test_id)
                .map_err(|e| ProverError::UserError(format!("cannot write output: {}", e)))?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(ProverError::UserError(msg)) => {
            eprintln!("User error: {}", msg);
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("Internal error: {}", err);
            ExitCode::FAILURE
        }
    }
}
