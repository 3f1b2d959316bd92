//! Delta statistics for checkpoint pairs
//!
//! The mean is accumulated in f64; the standard deviation of the centered
//! deltas comes from Trueno's SIMD vector routines. Trueno uses the population
//! variance (divide by n), so the standard error reported here is
//! `pstdev / sqrt(n)`.

use trueno::Vector;

/// Aggregated timing of one checkpoint pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeltaStats {
    /// Mean delta in seconds
    pub mean: f32,
    /// Standard error of the mean in seconds
    pub stderr: f32,
    /// Number of deltas aggregated
    pub count: usize,
}

impl DeltaStats {
    /// Summarize a delta sequence (seconds)
    ///
    /// Returns `None` for an empty sequence: there is nothing to report yet.
    /// A single delta has a standard error of zero.
    ///
    /// # Example
    /// ```
    /// use loop_profiler::DeltaStats;
    ///
    /// let stats = DeltaStats::from_deltas(&[1.0, 2.0, 3.0]).unwrap();
    /// assert_eq!(stats.count, 3);
    /// assert!((stats.mean - 2.0).abs() < 1e-6);
    /// assert!(DeltaStats::from_deltas(&[]).is_none());
    /// ```
    pub fn from_deltas(deltas: &[f64]) -> Option<Self> {
        if deltas.is_empty() {
            return None;
        }

        let count = deltas.len();
        let mean = deltas.iter().sum::<f64>() / count as f64;

        // Center in f64 before narrowing: seconds-scale means with sub-millisecond
        // jitter lose the variance to cancellation in f32.
        let centered: Vec<f32> = deltas.iter().map(|&d| (d - mean) as f32).collect();
        let v = Vector::from_slice(&centered);

        // trueno 0.7.0 returns Result<f32> for stddev
        let stddev = if count > 1 { v.stddev().unwrap_or(0.0) } else { 0.0 };

        Some(Self {
            mean: mean as f32,
            stderr: stddev / (count as f32).sqrt(),
            count,
        })
    }
}
