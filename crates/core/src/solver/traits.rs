use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while solving a challenge.
#[derive(Debug, Error)]
pub enum SolverError {
    /// Solver executable could not be started.
    #[error("failed to start solver {command}: {reason}")]
    Spawn { command: String, reason: String },

    /// Solver did not answer in time.
    #[error("solver timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// Solver exited unsuccessfully.
    #[error("solver exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("solver returned an empty answer")]
    EmptyAnswer,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Image bytes in, answer text out.
///
/// Implementations must not retry and must not second-guess the answer;
/// the portal decides whether it is right.
#[async_trait]
pub trait ChallengeSolver: Send + Sync {
    /// Solver name for logging.
    fn name(&self) -> &str;

    async fn solve(&self, image: &[u8]) -> Result<String, SolverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSolver(&'static str);

    #[async_trait]
    impl ChallengeSolver for FixedSolver {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn solve(&self, _image: &[u8]) -> Result<String, SolverError> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_solver_is_object_safe() {
        let solver: Box<dyn ChallengeSolver> = Box::new(FixedSolver("ab12"));
        assert_eq!(solver.name(), "fixed");
        assert_eq!(solver.solve(b"\x89PNG").await.unwrap(), "ab12");
    }

    #[test]
    fn test_error_display() {
        let err = SolverError::Timeout { timeout_secs: 10 };
        assert_eq!(err.to_string(), "solver timed out after 10 seconds");
    }
}
