//! Mock challenge solver for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::solver::{ChallengeSolver, SolverError};

/// Mock implementation of the ChallengeSolver trait.
///
/// Returns queued answers first, then the default answer. Every image it
/// receives is counted.
pub struct MockSolver {
    answers: Arc<RwLock<VecDeque<Result<String, SolverError>>>>,
    default_answer: String,
    calls: AtomicUsize,
}

impl std::fmt::Debug for MockSolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSolver")
            .field("answers", &"<scripted>")
            .field("calls", &self.calls.load(Ordering::SeqCst))
            .finish()
    }
}

impl Default for MockSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSolver {
    /// Create a solver that always answers `"abcd"`.
    pub fn new() -> Self {
        Self::with_answer("abcd")
    }

    pub fn with_answer(answer: impl Into<String>) -> Self {
        Self {
            answers: Arc::new(RwLock::new(VecDeque::new())),
            default_answer: answer.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Queue the result of the next solve.
    pub async fn push_answer(&self, answer: Result<String, SolverError>) {
        self.answers.write().await.push_back(answer);
    }

    /// Number of images handed to the solver.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChallengeSolver for MockSolver {
    fn name(&self) -> &str {
        "mock"
    }

    async fn solve(&self, _image: &[u8]) -> Result<String, SolverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(answer) = self.answers.write().await.pop_front() {
            return answer;
        }
        Ok(self.default_answer.clone())
    }
}
