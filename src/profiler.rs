//! Host-facing loop profiler and its periodic reporter thread
//!
//! The checkpoint table lives behind a single mutex shared by the host loop
//! and the reporter:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ HOST LOOP                                                    │
//! │   record("load") ─┐                                          │
//! │   record("fwd")  ─┼──► Mutex<CheckpointTable> ◄──┐           │
//! │   record("bwd")  ─┘                              │           │
//! └──────────────────────────────────────────────────┼───────────┘
//!                                                    │
//! ┌──────────────────────────────────────────────────┼───────────┐
//! │ REPORTER THREAD (started when the table arms)    │           │
//! │   loop {                                         │           │
//! │     wait(interval) or stop                       │           │
//! │     lock ─► report to sink ─► trim ──────────────┘           │
//! │   }                                                          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Dropping the profiler disconnects the stop channel and joins the thread.

use crate::checkpoint::{CheckpointTable, SourceLocation};
use crate::config::ProfilerConfig;
use crate::error::{ProfilerError, Result};
use crate::report::Report;
use crate::sink::{LogSink, TracingSink};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use std::panic::Location;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// State shared with the reporter thread
struct Shared {
    table: Mutex<CheckpointTable>,
    config: ProfilerConfig,
    sink: Box<dyn LogSink>,
}

impl Shared {
    fn lock_table(&self) -> MutexGuard<'_, CheckpointTable> {
        // The table is never left half-updated, so a poisoned lock is still usable
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn report(&self, table: &CheckpointTable) -> Report {
        Report::from_table(table, self.config.include_wrap_around)
    }

    fn emit(&self, table: &CheckpointTable) {
        if table.is_empty() {
            return;
        }
        let report = self.report(table);
        self.sink.log(self.config.log_level, &report.render());
    }
}

/// Running reporter thread and its stop signal
struct Reporter {
    stop: Sender<()>,
    handle: JoinHandle<()>,
}

/// Cyclic loop profiler
///
/// # Example
///
/// ```
/// use loop_profiler::{LoopProfiler, ProfilerConfig};
///
/// let profiler = LoopProfiler::new(ProfilerConfig::default());
/// for _ in 0..3 {
///     profiler.record("load")?;
///     profiler.record("step")?;
/// }
/// assert!(profiler.is_armed());
///
/// // A checkpoint that was not part of the first cycle is a bug
/// assert!(profiler.record("eval").is_err());
/// # Ok::<(), loop_profiler::ProfilerError>(())
/// ```
pub struct LoopProfiler {
    shared: Arc<Shared>,
    reporter: Mutex<Option<Reporter>>,
}

impl LoopProfiler {
    /// Create a profiler that reports through [`TracingSink`]
    ///
    /// The config is used as given; call [`ProfilerConfig::validate`] first
    /// or use [`LoopProfiler::try_new`] for untrusted values.
    pub fn new(config: ProfilerConfig) -> Self {
        Self::with_sink(config, TracingSink)
    }

    /// Validate `config` and create a profiler that reports through [`TracingSink`]
    pub fn try_new(config: ProfilerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Create a profiler that reports through `sink`
    pub fn with_sink(config: ProfilerConfig, sink: impl LogSink + 'static) -> Self {
        Self {
            shared: Arc::new(Shared {
                table: Mutex::new(CheckpointTable::new()),
                config,
                sink: Box::new(sink),
            }),
            reporter: Mutex::new(None),
        }
    }

    /// Record the current time against checkpoint `name`
    ///
    /// The caller's file and line are remembered the first time `name` is
    /// seen. The first repeated name completes the first cycle, freezes the
    /// checkpoint order and starts the periodic reporter.
    ///
    /// # Errors
    ///
    /// [`ProfilerError::OrderingViolation`] if `name` breaks the cycle order
    /// established by the first cycle. [`ProfilerError::Spawn`] if the
    /// reporter thread could not be started. Errors are only returned, not
    /// logged; the caller decides how to surface them.
    #[track_caller]
    pub fn record(&self, name: &str) -> Result<()> {
        let caller = Location::caller();
        let mut table = self.shared.lock_table();

        let location = table
            .get(name)
            .is_none()
            .then(|| SourceLocation::from(caller));
        let was_armed = table.is_armed();
        let result = table.record_at(name, Instant::now(), location);

        if !was_armed && table.is_armed() {
            self.start_reporter()?;
        }

        result
    }

    /// Log the current statistics through the sink
    ///
    /// Does nothing if no checkpoint was recorded yet.
    pub fn show(&self) {
        let table = self.shared.lock_table();
        self.shared.emit(&table);
    }

    /// Current statistics, without logging them
    pub fn snapshot(&self) -> Report {
        let table = self.shared.lock_table();
        self.shared.report(&table)
    }

    /// Whether the first cycle is complete
    pub fn is_armed(&self) -> bool {
        self.shared.lock_table().is_armed()
    }

    /// Whether the periodic reporter thread is running
    pub fn is_reporting(&self) -> bool {
        self.lock_reporter().is_some()
    }

    /// Checkpoint names in cycle order
    pub fn checkpoint_names(&self) -> Vec<String> {
        self.shared.lock_table().names()
    }

    /// `(name, retained sample count)` in cycle order
    pub fn sample_counts(&self) -> Vec<(String, usize)> {
        self.shared.lock_table().sample_counts()
    }

    /// Stop the periodic reporter and wait for it to exit
    ///
    /// Recording keeps working afterwards; reports are then only produced by
    /// [`LoopProfiler::show`]. Calling this more than once is harmless.
    pub fn shutdown(&self) {
        let reporter = self.lock_reporter().take();
        if let Some(Reporter { stop, handle }) = reporter {
            drop(stop);
            if handle.join().is_err() {
                tracing::warn!("loop profiler reporter thread panicked");
            }
            tracing::debug!("loop profiler reporter stopped");
        }
    }

    fn lock_reporter(&self) -> MutexGuard<'_, Option<Reporter>> {
        self.reporter.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_reporter(&self) -> Result<()> {
        let mut slot = self.lock_reporter();
        if slot.is_some() {
            return Ok(());
        }

        let (stop, stopped) = channel::bounded::<()>(0);
        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("loop-profiler-reporter".to_string())
            .spawn(move || reporter_loop(shared, stopped))
            .map_err(ProfilerError::Spawn)?;

        tracing::debug!(
            interval_secs = self.shared.config.interval,
            max_samples = self.shared.config.max_samples,
            "loop profiler reporter started"
        );
        *slot = Some(Reporter { stop, handle });
        Ok(())
    }
}

impl Drop for LoopProfiler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for LoopProfiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopProfiler")
            .field("config", &self.shared.config)
            .field("reporting", &self.is_reporting())
            .finish_non_exhaustive()
    }
}

/// Report and trim every interval until the stop channel disconnects
fn reporter_loop(shared: Arc<Shared>, stopped: Receiver<()>) {
    let interval = shared.config.interval_duration();
    loop {
        match stopped.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }

        let mut table = shared.lock_table();
        shared.emit(&table);
        table.trim(shared.config.max_samples);
    }
}
