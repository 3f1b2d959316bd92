//! Error types for the loop profiler

use thiserror::Error;

/// Fixed explanation attached to every ordering violation
pub const ORDERING_RULE: &str = "for each monitoring cycle, the same name cannot occur twice, \
     and every cycle must visit the names in the same order";

/// Errors raised by the profiler
#[derive(Error, Debug)]
pub enum ProfilerError {
    /// A checkpoint was recorded out of cycle order, skipped, repeated, or
    /// introduced after the cycle structure was frozen.
    ///
    /// This signals a bug in the instrumented loop and is never retried.
    #[error("ordering violation at checkpoint '{name}': {} ({reason})", ORDERING_RULE)]
    OrderingViolation { name: String, reason: String },

    #[error("invalid profiler configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to spawn reporter thread: {0}")]
    Spawn(#[from] std::io::Error),
}

impl ProfilerError {
    pub(crate) fn ordering(name: &str, reason: impl Into<String>) -> Self {
        Self::OrderingViolation {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error reports a checkpoint ordering bug
    pub fn is_ordering_violation(&self) -> bool {
        matches!(self, Self::OrderingViolation { .. })
    }
}

pub type Result<T> = std::result::Result<T, ProfilerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_violation_message() {
        let err = ProfilerError::ordering("forward", "checkpoint 'load' has 3 samples, expected 2");
        let msg = err.to_string();
        assert!(msg.contains("'forward'"));
        assert!(msg.contains("the same name cannot occur twice"));
        assert!(msg.contains("expected 2"));
        assert!(err.is_ordering_violation());
    }

    #[test]
    fn test_invalid_config_is_not_ordering() {
        let err = ProfilerError::InvalidConfig("interval must be positive".to_string());
        assert!(!err.is_ordering_violation());
        assert!(err.to_string().contains("interval must be positive"));
    }
}
