//! Profiling report: per-pair statistics and text rendering
//!
//! ```text
//! ***** Profiling *****
//! load-forward      | 0.01204s(+-0.00011, n=100), 30.2% | src/main.rs(42L)
//! forward-backward  | 0.02781s(+-0.00020, n=100), 69.8% | src/main.rs(44L)
//! ```

use crate::checkpoint::{CheckpointTable, SourceLocation};
use crate::stats::DeltaStats;

/// First line of every report
pub const HEADER: &str = "***** Profiling *****";

/// Width of the dashed placeholder shown for pairs without data
const PLACEHOLDER_WIDTH: usize = 26;

/// Timing of one checkpoint transition `prev -> name`
#[derive(Debug, Clone, PartialEq)]
pub struct PairReport {
    pub prev: String,
    pub name: String,
    /// `None` until at least one delta exists
    pub stats: Option<DeltaStats>,
    /// Share of the cycle total, in percent
    pub percent: Option<f32>,
    /// Where `name` was first recorded
    pub location: Option<SourceLocation>,
}

impl PairReport {
    fn label_len(&self) -> usize {
        label_len(&self.prev, &self.name)
    }
}

fn label_len(prev: &str, name: &str) -> usize {
    prev.chars().count() + name.chars().count()
}

/// Snapshot of every checkpoint pair
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Pairs in cycle order; the wrap-around pair is only present when included
    pub pairs: Vec<PairReport>,
    /// Sum of the means counted toward the cycle (seconds)
    pub total: f32,
    /// Widest `prev` + `name` over all pairs, wrap-around included
    label_width: usize,
    checkpoint_count: usize,
}

impl Report {
    /// Compute statistics for every checkpoint pair of `table`
    pub fn from_table(table: &CheckpointTable, include_wrap_around: bool) -> Self {
        let checkpoints = table.checkpoints();
        let mut pairs = Vec::with_capacity(checkpoints.len());
        let mut label_width = 0;
        let mut total = 0.0f32;

        for (idx, checkpoint) in checkpoints.iter().enumerate() {
            let prev = &checkpoints[table.predecessor(idx)];
            label_width = label_width.max(label_len(prev.name(), checkpoint.name()));

            let stats = DeltaStats::from_deltas(&table.deltas(idx));
            if idx == 0 && !include_wrap_around {
                continue;
            }
            if let Some(stats) = stats {
                total += stats.mean;
            }
            pairs.push(PairReport {
                prev: prev.name().to_string(),
                name: checkpoint.name().to_string(),
                stats,
                percent: None,
                location: checkpoint.location().cloned(),
            });
        }

        for pair in &mut pairs {
            pair.percent = pair.stats.map(|s| {
                if total > 0.0 {
                    s.mean / total * 100.0
                } else {
                    0.0
                }
            });
        }

        Self {
            pairs,
            total,
            label_width,
            checkpoint_count: checkpoints.len(),
        }
    }

    /// Whether the profiled table had no checkpoints
    pub fn is_empty(&self) -> bool {
        self.checkpoint_count == 0
    }

    /// Find the pair ending at checkpoint `name`
    pub fn pair(&self, name: &str) -> Option<&PairReport> {
        self.pairs.iter().find(|p| p.name == name)
    }

    /// Render the multi-line text report
    pub fn render(&self) -> String {
        let mut lines = Vec::with_capacity(self.pairs.len() + 1);
        lines.push(HEADER.to_string());

        for pair in &self.pairs {
            let padding = " ".repeat(self.label_width.saturating_sub(pair.label_len()));
            let timing = match (pair.stats, pair.percent) {
                (Some(stats), Some(percent)) => format!(
                    "{:.5}s(+-{:.5}, n={}), {:.1}%",
                    stats.mean, stats.stderr, stats.count, percent
                ),
                _ => "-".repeat(PLACEHOLDER_WIDTH),
            };
            let source = pair
                .location
                .as_ref()
                .map_or_else(|| "-".to_string(), |l| l.to_string());

            lines.push(format!(
                "{}-{}{} | {} | {}",
                pair.prev, pair.name, padding, timing, source
            ));
        }

        lines.join("\n")
    }
}
