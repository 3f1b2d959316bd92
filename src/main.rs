use anyhow::Result;
use clap::Parser;
use loop_profiler::{cli::Cli, LoopProfiler};
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber so reports at `report_level` are visible
fn init_tracing(debug: bool, report_level: tracing::Level) {
    let base = if debug {
        tracing::Level::TRACE
    } else {
        tracing::Level::INFO
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(base.into())
        .add_directive(
            format!("loop_profiler={}", report_level.max(base))
                .parse()
                .unwrap_or_else(|_| base.into()),
        );

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Sleep time for checkpoint `step` of `iteration`
///
/// Later steps take longer, with a small per-iteration jitter so the
/// standard errors are not all zero.
fn step_duration(base_ms: u64, step: usize, iteration: usize) -> Duration {
    Duration::from_millis(base_ms * (step as u64 + 1) + (iteration % 3) as u64)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    if args.checkpoints.is_empty() {
        anyhow::bail!("At least one checkpoint name is required");
    }

    let config = args.profiler_config()?;
    init_tracing(args.debug, config.log_level);

    let profiler = LoopProfiler::new(config);
    for iteration in 0..args.iterations {
        for (step, name) in args.checkpoints.iter().enumerate() {
            profiler.record(name)?;
            thread::sleep(step_duration(args.step_ms, step, iteration));
        }
    }

    profiler.show();
    profiler.shutdown();

    Ok(())
}
