use std::path::PathBuf;

use clap::Parser;

use bridge_bench::config::{BenchmarkConfig, ResolvedOutputs};
use bridge_bench::logging::init_telemetry;
use bridge_bench::tournament::TournamentRunner;

/// Benchmark harness pitting card-play agents against each other.
#[derive(Debug, Parser)]
#[command(
    name = "bridge-bench",
    author,
    version,
    about = "Deterministic bridge card-play benchmark"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "bench/bench.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the RNG seed for deal generation.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Override how many times each board is played.
    #[arg(long, value_name = "COUNT")]
    repetitions: Option<usize>,

    /// Exit after validating the configuration (no boards are played).
    #[arg(long)]
    validate_only: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = BenchmarkConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(seed) = cli.seed {
        config.deals.seed = Some(seed);
    }

    if let Some(repetitions) = cli.repetitions {
        config.deals.repetitions = repetitions;
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let run_id = config.run_id.clone();
    let boards = config.deals.boards.len();
    let repetitions = config.deals.repetitions;
    let lineups = config.lineups.len();

    println!(
        "Loaded configuration '{run_id}' with {boards} board{} × {repetitions} repetition{} and {lineups} lineup{}",
        if boards == 1 { "" } else { "s" },
        if repetitions == 1 { "" } else { "s" },
        if lineups == 1 { "" } else { "s" },
    );

    let _telemetry = init_telemetry(&config, &outputs)?;
    let runner = TournamentRunner::new(config, outputs)?;

    if cli.validate_only {
        println!("Validation-only mode: no boards played.");
        return Ok(());
    }

    let summary = runner.run()?;
    println!(
        "Run complete for '{run_id}': {} boards → {} rows at {}",
        summary.boards_played,
        summary.rows_written,
        summary.jsonl_path.display()
    );
    println!("Summary table: {}", summary.summary_path.display());
    if let Some(telemetry_path) = summary.telemetry_path.as_ref() {
        println!("Telemetry log: {}", telemetry_path.display());
    }

    Ok(())
}
