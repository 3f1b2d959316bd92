//! Log sinks for profiling reports
//!
//! A report is one multi-line message emitted at a configured severity. The
//! sink is injected at construction; [`TracingSink`] forwards to `tracing`
//! and lets the host application's subscriber decide where it ends up.

use tracing::Level;

/// Receives fully formatted profiling reports
pub trait LogSink: Send + Sync {
    fn log(&self, level: Level, message: &str);
}

impl<F> LogSink for F
where
    F: Fn(Level, &str) + Send + Sync,
{
    fn log(&self, level: Level, message: &str) {
        self(level, message)
    }
}

/// Default sink: emits a `tracing` event under the `loop_profiler` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: Level, message: &str) {
        // The level of a tracing event must be known at compile time
        match level {
            Level::ERROR => tracing::error!(target: "loop_profiler", "{}", message),
            Level::WARN => tracing::warn!(target: "loop_profiler", "{}", message),
            Level::INFO => tracing::info!(target: "loop_profiler", "{}", message),
            Level::DEBUG => tracing::debug!(target: "loop_profiler", "{}", message),
            _ => tracing::trace!(target: "loop_profiler", "{}", message),
        }
    }
}
