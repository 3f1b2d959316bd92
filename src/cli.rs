//! CLI argument parsing for the loop-profiler demo binary

use crate::config::ProfilerConfig;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "loop-profiler")]
#[command(version)]
#[command(about = "Run a synthetic instrumented loop and report per-checkpoint timings", long_about = None)]
pub struct Cli {
    /// Number of loop iterations to run
    #[arg(short = 'n', long = "iterations", default_value = "50")]
    pub iterations: usize,

    /// Comma-separated checkpoint names, in cycle order
    #[arg(
        short = 'k',
        long = "checkpoints",
        value_delimiter = ',',
        default_value = "load,forward,backward"
    )]
    pub checkpoints: Vec<String>,

    /// Base sleep per simulated step in milliseconds
    #[arg(long = "step-ms", value_name = "MS", default_value = "5")]
    pub step_ms: u64,

    /// TOML profiler configuration file (flags below override it)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Seconds between periodic reports
    #[arg(short = 'i', long = "interval", value_name = "SECS")]
    pub interval: Option<f64>,

    /// Samples retained per checkpoint
    #[arg(long = "max-samples", value_name = "N")]
    pub max_samples: Option<usize>,

    /// Count the last-to-first checkpoint interval toward the cycle total
    #[arg(long = "include-wrap-around")]
    pub include_wrap_around: bool,

    /// Enable trace-level diagnostics
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Build the profiler configuration from the config file and flags
    pub fn profiler_config(&self) -> Result<ProfilerConfig> {
        let mut config = match &self.config {
            Some(path) => ProfilerConfig::from_toml(path)?,
            None => ProfilerConfig::default(),
        };

        if let Some(interval) = self.interval {
            config.interval = interval;
        }
        if let Some(max_samples) = self.max_samples {
            config.max_samples = max_samples;
        }
        if self.include_wrap_around {
            config.include_wrap_around = true;
        }

        config.validate()?;
        Ok(config)
    }
}
