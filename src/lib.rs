//! Loop profiler - per-checkpoint timing statistics for long-running loops
//!
//! The host loop calls [`LoopProfiler::record`] once per checkpoint per
//! iteration. After the first full cycle the checkpoint order is frozen and a
//! background reporter periodically logs the mean, standard error, sample
//! count and share of cycle time for every pair of adjacent checkpoints.
//!
//! # Example
//!
//! ```no_run
//! use loop_profiler::{LoopProfiler, ProfilerConfig};
//!
//! let profiler = LoopProfiler::new(ProfilerConfig::default());
//! for _ in 0..1000 {
//!     profiler.record("load")?;
//!     // ... load a batch
//!     profiler.record("forward")?;
//!     // ... run the model
//!     profiler.record("backward")?;
//! }
//! profiler.show();
//! # Ok::<(), loop_profiler::ProfilerError>(())
//! ```

pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod error;
pub mod profiler;
pub mod report;
pub mod sink;
pub mod stats;

pub use checkpoint::{CheckpointTable, Phase, SourceLocation};
pub use config::ProfilerConfig;
pub use error::{ProfilerError, Result};
pub use profiler::LoopProfiler;
pub use report::{PairReport, Report};
pub use sink::{LogSink, TracingSink};
pub use stats::DeltaStats;
