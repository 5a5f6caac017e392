use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::Level;
use tracing_appender::non_blocking::{NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{BenchmarkConfig, ResolvedOutputs};

const TELEMETRY_FILE: &str = "telemetry.jsonl";

/// Crates whose events land in the telemetry file; everything else is
/// kept at `warn`.
const BENCH_TARGETS: [&str; 3] = ["bridge_bench", "bridge_bot", "bridge_core"];

/// Keeps the background writer alive; dropping it flushes the file.
pub struct Telemetry {
    _guard: WorkerGuard,
    pub path: PathBuf,
}

/// Routes per-play (`bridge_bench::play`), search and inference events into
/// one JSON line each. `RUST_LOG` replaces the configured filter.
pub fn init_telemetry(
    config: &BenchmarkConfig,
    outputs: &ResolvedOutputs,
) -> Result<Option<Telemetry>> {
    if !config.logging.enable_structured {
        return Ok(None);
    }

    let path = telemetry_path(outputs);
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating telemetry directory at {}", dir.display()))?;
    }
    let file = File::create(&path)
        .with_context(|| format!("creating telemetry file at {}", path.display()))?;
    let (writer, guard) = NonBlockingBuilder::default().lossy(false).finish(file);

    let level = config.logging.level().unwrap_or(Level::INFO);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directives(level)));
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .json()
        .flatten_event(true)
        .with_current_span(false)
        .with_writer(writer)
        .finish();

    // Tests may have installed one already.
    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        tracing::info!(
            target: "bridge_bench::run",
            run_id = %config.run_id,
            boards = config.deals.boards.len(),
            repetitions = config.deals.repetitions,
            lineups = config.lineups.len(),
            "run started"
        );
    }

    Ok(Some(Telemetry {
        _guard: guard,
        path,
    }))
}

/// `telemetry.jsonl` next to the summary table.
pub fn telemetry_path(outputs: &ResolvedOutputs) -> PathBuf {
    outputs
        .summary_md
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
        .join(TELEMETRY_FILE)
}

fn directives(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    BENCH_TARGETS
        .iter()
        .fold("warn".to_string(), |acc, target| format!("{acc},{target}={level}"))
}
