//! Checkpoint table: cycle-order state machine and timestamp storage
//!
//! Checkpoints keep their first-insertion order, which is the declared cycle
//! order. The table starts in [`Phase::Learning`], where any new name is
//! appended to the cycle. The first time a name is seen again the first cycle
//! is complete and the table switches to [`Phase::Armed`]: from then on the
//! set of names is frozen.
//!
//! Every call is checked against its predecessor in cycle order (wrapping from
//! the first checkpoint back to the last):
//!
//! ```text
//!   load ──► forward ──► backward
//!    ▲                      │
//!    └──────────────────────┘
//!
//!   count(prev) == count(name) + 1   for every name but the first
//!   count(last) == count(first)      for the first name
//! ```
//!
//! All mutation of checkpoint state goes through this module.

use crate::error::{ProfilerError, Result};
use std::collections::HashMap;
use std::fmt;
use std::panic::Location;
use std::time::Instant;

/// Source file and line where a checkpoint was first recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// Location of the caller of the enclosing `#[track_caller]` function
    #[track_caller]
    pub fn caller() -> Self {
        Self::from(Location::caller())
    }
}

impl From<&Location<'_>> for SourceLocation {
    fn from(location: &Location<'_>) -> Self {
        Self::new(location.file(), location.line())
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}L)", self.file, self.line)
    }
}

/// A named point in the loop and every time it was reached
#[derive(Debug, Clone)]
pub struct Checkpoint {
    name: String,
    record_times: Vec<Instant>,
    location: Option<SourceLocation>,
}

impl Checkpoint {
    fn new(name: &str, location: Option<SourceLocation>) -> Self {
        Self {
            name: name.to_string(),
            record_times: Vec::new(),
            location,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn record_times(&self) -> &[Instant] {
        &self.record_times
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        self.location.as_ref()
    }

    pub fn len(&self) -> usize {
        self.record_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record_times.is_empty()
    }
}

/// Lifecycle of the cycle structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// First cycle in progress; new names extend the cycle
    #[default]
    Learning,
    /// First cycle complete; the set of names is frozen
    Armed,
}

/// Ordered checkpoint storage
#[derive(Debug, Default)]
pub struct CheckpointTable {
    checkpoints: Vec<Checkpoint>,
    index: HashMap<String, usize>,
    phase: Phase,
}

impl CheckpointTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_armed(&self) -> bool {
        self.phase == Phase::Armed
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    /// Checkpoints in cycle order
    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn get(&self, name: &str) -> Option<&Checkpoint> {
        self.index.get(name).map(|&i| &self.checkpoints[i])
    }

    /// Checkpoint names in cycle order
    pub fn names(&self) -> Vec<String> {
        self.checkpoints.iter().map(|c| c.name.clone()).collect()
    }

    /// `(name, sample count)` in cycle order
    pub fn sample_counts(&self) -> Vec<(String, usize)> {
        self.checkpoints
            .iter()
            .map(|c| (c.name.clone(), c.len()))
            .collect()
    }

    /// Record `at` against `name`
    ///
    /// `location` is only used when `name` is seen for the first time. The
    /// first repeated name arms the table even if that call then fails
    /// validation; callers watch [`Self::phase`] for the transition.
    ///
    /// # Errors
    ///
    /// Returns [`ProfilerError::OrderingViolation`] if `name` is new after the
    /// table armed, or if its predecessor's sample count is inconsistent with
    /// a fixed cycle order. Nothing is appended on error.
    pub fn record_at(
        &mut self,
        name: &str,
        at: Instant,
        location: Option<SourceLocation>,
    ) -> Result<()> {
        let existing = self.index.get(name).copied();

        if existing.is_some() && self.phase == Phase::Learning {
            self.phase = Phase::Armed;
            tracing::debug!(
                checkpoints = self.checkpoints.len(),
                "first cycle complete, checkpoint order frozen"
            );
        }

        let idx = match existing {
            Some(idx) => idx,
            None => {
                if self.phase == Phase::Armed {
                    return Err(ProfilerError::ordering(
                        name,
                        format!(
                            "new checkpoint after the first cycle ({} known)",
                            self.checkpoints.len()
                        ),
                    ));
                }
                self.checkpoints.push(Checkpoint::new(name, location));
                self.index.insert(name.to_string(), self.checkpoints.len() - 1);
                self.checkpoints.len() - 1
            }
        };

        let count = self.checkpoints[idx].len();
        // The first checkpoint's predecessor is the last one of the previous cycle,
        // which has already caught up.
        let (prev_idx, expected) = if idx == 0 {
            (self.checkpoints.len() - 1, count)
        } else {
            (idx - 1, count + 1)
        };
        let prev = &self.checkpoints[prev_idx];
        if prev.len() != expected {
            return Err(ProfilerError::ordering(
                name,
                format!(
                    "predecessor '{}' has {} samples, expected {}",
                    prev.name,
                    prev.len(),
                    expected
                ),
            ));
        }

        self.checkpoints[idx].record_times.push(at);
        Ok(())
    }

    /// Index of the checkpoint preceding `idx` in cycle order
    pub fn predecessor(&self, idx: usize) -> usize {
        if idx == 0 {
            self.checkpoints.len().saturating_sub(1)
        } else {
            idx - 1
        }
    }

    /// Deltas (seconds) between checkpoint `idx` and its predecessor
    ///
    /// The first checkpoint is paired with the last one shifted by one cycle,
    /// since that interval spans the cycle boundary.
    pub fn deltas(&self, idx: usize) -> Vec<f64> {
        let current = &self.checkpoints[idx].record_times;
        let previous = &self.checkpoints[self.predecessor(idx)].record_times;
        let current = if idx == 0 {
            current.get(1..).unwrap_or(&[])
        } else {
            &current[..]
        };

        current
            .iter()
            .zip(previous)
            .map(|(c, p)| c.saturating_duration_since(*p).as_secs_f64())
            .collect()
    }

    /// Drop old samples so at most `max_samples + 1` remain on the last checkpoint
    ///
    /// The same number of entries is removed from every checkpoint, so the
    /// retained windows stay aligned. Returns the number removed from each.
    pub fn trim(&mut self, max_samples: usize) -> usize {
        let Some(last) = self.checkpoints.last() else {
            return 0;
        };
        let length = last.len();
        if length <= max_samples {
            return 0;
        }

        let excess = length - max_samples - 1;
        for checkpoint in &mut self.checkpoints {
            checkpoint.record_times.drain(..excess);
        }
        tracing::trace!(excess, max_samples, "trimmed checkpoint samples");
        excess
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    fn replay(table: &mut CheckpointTable, names: &[&str]) -> Result<()> {
        let base = Instant::now();
        for (i, name) in names.iter().enumerate() {
            table.record_at(name, at(base, i as u64), None)?;
        }
        Ok(())
    }

    #[test]
    fn test_new_table_is_learning() {
        let mut table = CheckpointTable::new();
        assert_eq!(table.phase(), Phase::Learning);
        assert!(table.is_empty());
        assert_eq!(table.trim(10), 0);
    }

    #[test]
    fn test_fixed_cycle_records_every_checkpoint() {
        let mut table = CheckpointTable::new();
        let cycle = ["a", "b", "c"];
        let names: Vec<&str> = cycle.iter().copied().cycle().take(3 * 4).collect();

        replay(&mut table, &names).unwrap();

        assert!(table.is_armed());
        assert_eq!(table.names(), vec!["a", "b", "c"]);
        for (_, count) in table.sample_counts() {
            assert_eq!(count, 4);
        }
    }

    #[test]
    fn test_first_repeat_arms_the_table() {
        let mut table = CheckpointTable::new();
        let base = Instant::now();

        table.record_at("a", base, None).unwrap();
        table.record_at("b", base, None).unwrap();
        assert_eq!(table.phase(), Phase::Learning);
        table.record_at("a", base, None).unwrap();
        assert_eq!(table.phase(), Phase::Armed);
        table.record_at("b", base, None).unwrap();
        assert_eq!(table.phase(), Phase::Armed);
    }

    #[test]
    fn test_failing_repeat_still_arms_the_table() {
        let mut table = CheckpointTable::new();
        let base = Instant::now();

        table.record_at("a", base, None).unwrap();
        table.record_at("b", base, None).unwrap();
        // 'b' repeats before 'a' closes the cycle
        let err = table.record_at("b", base, None).unwrap_err();
        assert!(err.is_ordering_violation());
        assert_eq!(table.phase(), Phase::Armed);
        assert_eq!(table.get("b").unwrap().len(), 1);
    }

    #[test]
    fn test_single_checkpoint_cycle() {
        let mut table = CheckpointTable::new();
        replay(&mut table, &["tick", "tick", "tick"]).unwrap();
        assert!(table.is_armed());
        assert_eq!(table.get("tick").unwrap().len(), 3);
        assert_eq!(table.deltas(0).len(), 2);
    }

    #[test]
    fn test_skipped_checkpoint_is_violation() {
        let mut table = CheckpointTable::new();
        replay(&mut table, &["a", "b", "a"]).unwrap();

        let err = table.record_at("a", Instant::now(), None).unwrap_err();
        assert!(err.is_ordering_violation());
        // Nothing appended on failure
        assert_eq!(table.get("a").unwrap().len(), 2);
    }

    #[test]
    fn test_repeated_checkpoint_is_violation() {
        let mut table = CheckpointTable::new();
        replay(&mut table, &["a", "b", "c", "a"]).unwrap();

        let err = table.record_at("c", Instant::now(), None).unwrap_err();
        assert!(err.is_ordering_violation());
        assert!(err.to_string().contains("predecessor 'b'"));
    }

    #[test]
    fn test_new_checkpoint_after_arming_is_violation() {
        let mut table = CheckpointTable::new();
        replay(&mut table, &["a", "b", "a", "b"]).unwrap();

        let err = table.record_at("c", Instant::now(), None).unwrap_err();
        assert!(err.is_ordering_violation());
        assert!(err.to_string().contains("new checkpoint"));
        assert!(table.get("c").is_none());
    }

    #[test]
    fn test_out_of_order_second_checkpoint_arms_then_fails() {
        let mut table = CheckpointTable::new();
        replay(&mut table, &["a", "b"]).unwrap();

        assert!(table.record_at("b", Instant::now(), None).is_err());
        // The repeat still completed the first cycle
        assert!(table.is_armed());
    }

    #[test]
    fn test_location_captured_on_first_record_only() {
        let mut table = CheckpointTable::new();
        let base = Instant::now();
        table
            .record_at("a", base, Some(SourceLocation::new("train.rs", 10)))
            .unwrap();
        table
            .record_at("a", base, Some(SourceLocation::new("other.rs", 99)))
            .unwrap();

        let location = table.get("a").unwrap().location().unwrap();
        assert_eq!(location.to_string(), "train.rs(10L)");
    }

    #[test]
    fn test_caller_location_points_here() {
        let location = SourceLocation::caller();
        assert!(location.file.ends_with("checkpoint.rs"));
        assert!(location.line > 0);
    }

    #[test]
    fn test_deltas_align_across_cycle_boundary() {
        let mut table = CheckpointTable::new();
        let base = Instant::now();
        // cycle 1: a=0 b=10 c=30, cycle 2: a=100 b=110 c=130, cycle 3: a=200
        for (name, ms) in [
            ("a", 0),
            ("b", 10),
            ("c", 30),
            ("a", 100),
            ("b", 110),
            ("c", 130),
            ("a", 200),
        ] {
            table.record_at(name, at(base, ms), None).unwrap();
        }

        let round = |v: Vec<f64>| -> Vec<u64> {
            v.into_iter().map(|d| (d * 1000.0).round() as u64).collect()
        };
        assert_eq!(round(table.deltas(0)), vec![70, 70]);
        assert_eq!(round(table.deltas(1)), vec![10, 10]);
        assert_eq!(round(table.deltas(2)), vec![20, 20]);
    }

    #[test]
    fn test_first_checkpoint_has_no_deltas_during_first_cycle() {
        let mut table = CheckpointTable::new();
        replay(&mut table, &["a", "b"]).unwrap();
        assert!(table.deltas(0).is_empty());
        assert_eq!(table.deltas(1).len(), 1);
    }

    #[test]
    fn test_trim_keeps_most_recent_window() {
        let mut table = CheckpointTable::new();
        let base = Instant::now();
        let mut ms = 0;
        for _ in 0..10 {
            for name in ["a", "b"] {
                table.record_at(name, at(base, ms), None).unwrap();
                ms += 1;
            }
        }
        let before: Vec<Instant> = table.get("b").unwrap().record_times().to_vec();

        let removed = table.trim(4);

        assert_eq!(removed, 5);
        for (_, count) in table.sample_counts() {
            assert_eq!(count, 5);
        }
        assert_eq!(table.get("b").unwrap().record_times(), &before[5..]);

        // Ordering stays consistent after trimming
        table.record_at("a", at(base, ms), None).unwrap();
        table.record_at("b", at(base, ms + 1), None).unwrap();
    }

    #[test]
    fn test_trim_below_bound_is_noop() {
        let mut table = CheckpointTable::new();
        replay(&mut table, &["a", "b", "a", "b"]).unwrap();
        assert_eq!(table.trim(2), 0);
        assert_eq!(table.get("a").unwrap().len(), 2);
    }

    #[test]
    fn test_trim_mid_cycle_removes_same_count() {
        let mut table = CheckpointTable::new();
        let names: Vec<&str> = ["a", "b", "c"].iter().copied().cycle().take(3 * 6 + 1).collect();
        replay(&mut table, &names).unwrap();

        table.trim(2);

        let counts: Vec<usize> = table.sample_counts().into_iter().map(|(_, n)| n).collect();
        assert_eq!(counts, vec![4, 3, 3]);
        table.record_at("b", Instant::now(), None).unwrap();
    }
}
