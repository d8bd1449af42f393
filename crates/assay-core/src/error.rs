//! Stage error taxonomy
//!
//! Every pipeline stage classifies its failures into this taxonomy. Transient
//! failures are retried with bounded attempts; malformed structured output is
//! retried with a stricter prompt and then escalated; unrecoverable failures
//! move the job to `Failed` and stop the chain. A branch failure inside the
//! parallel fan-out is recorded but must not halt the sibling branch or the
//! join.

use thiserror::Error;

/// Result alias for stage functions.
pub type StageResult<T> = Result<T, StageError>;

/// Classified failure of one pipeline or workflow stage.
#[derive(Debug, Error)]
pub enum StageError {
    /// Rate limit, timeout, or transient network failure. Retryable.
    #[error("transient failure: {0}")]
    Transient(String),

    /// The generation provider returned structured output that could not be
    /// parsed even after repair. Retryable with a stricter prompt, bounded.
    #[error("malformed structured output: {0}")]
    MalformedOutput(String),

    /// Failure that retries cannot fix; halts the pipeline for this job.
    #[error("unrecoverable stage failure: {0}")]
    Unrecoverable(String),

    /// One branch of the parallel fan-out failed. Recorded at the join, does
    /// not halt the sibling.
    #[error("{branch} branch failed: {message}")]
    BranchFailed { branch: &'static str, message: String },
}

impl StageError {
    /// Whether the per-stage retry policy applies.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StageError::Transient(_) | StageError::MalformedOutput(_)
        )
    }

    /// Convenience constructor for transient failures.
    pub fn transient(msg: impl Into<String>) -> Self {
        StageError::Transient(msg.into())
    }

    /// Convenience constructor for unrecoverable failures.
    pub fn unrecoverable(msg: impl Into<String>) -> Self {
        StageError::Unrecoverable(msg.into())
    }
}

impl From<reqwest::Error> for StageError {
    fn from(err: reqwest::Error) -> Self {
        // Timeouts and connection problems are worth retrying; anything else
        // (4xx bodies, decode failures) is not fixed by waiting.
        if err.is_timeout() || err.is_connect() || err.is_request() {
            StageError::Transient(err.to_string())
        } else {
            StageError::Unrecoverable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StageError {
    fn from(err: serde_json::Error) -> Self {
        StageError::MalformedOutput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryability_follows_the_taxonomy() {
        assert!(StageError::transient("429").is_retryable());
        assert!(StageError::MalformedOutput("bad json".into()).is_retryable());
        assert!(!StageError::unrecoverable("no such file").is_retryable());
        assert!(!StageError::BranchFailed {
            branch: "graph",
            message: "boom".into()
        }
        .is_retryable());
    }

    #[test]
    fn json_errors_classify_as_malformed_output() {
        let err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        assert!(matches!(
            StageError::from(err),
            StageError::MalformedOutput(_)
        ));
    }
}
