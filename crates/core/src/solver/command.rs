//! Solver backed by an external recognizer process.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

use crate::config::SolverConfig;

use super::traits::{ChallengeSolver, SolverError};

/// Runs the configured command once per image: image bytes on stdin,
/// answer on stdout.
pub struct CommandSolver {
    config: SolverConfig,
}

impl CommandSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ChallengeSolver for CommandSolver {
    fn name(&self) -> &str {
        &self.config.command
    }

    async fn solve(&self, image: &[u8]) -> Result<String, SolverError> {
        let mut child = Command::new(&self.config.command)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SolverError::Spawn {
                command: self.config.command.clone(),
                reason: e.to_string(),
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| SolverError::Spawn {
            command: self.config.command.clone(),
            reason: "stdin not captured".to_string(),
        })?;

        let timeout_secs = self.config.timeout_secs as u64;
        let run = async move {
            stdin.write_all(image).await?;
            // Close stdin so the recognizer sees EOF
            drop(stdin);
            child.wait_with_output().await
        };

        let output = timeout(Duration::from_secs(timeout_secs), run)
            .await
            .map_err(|_| SolverError::Timeout { timeout_secs })??;

        if !output.status.success() {
            return Err(SolverError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr)
                    .chars()
                    .take(200)
                    .collect(),
            });
        }

        let answer = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if answer.is_empty() {
            return Err(SolverError::EmptyAnswer);
        }

        debug!(solver = %self.config.command, bytes = image.len(), "Challenge solved");
        Ok(answer)
    }
}
