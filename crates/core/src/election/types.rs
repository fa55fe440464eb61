//! Types for the election orchestrator.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ConfigError, TargetConfig};
use crate::portal::{CatalogRecord, PortalError};

/// Conditions that end the run abnormally.
#[derive(Debug, Error)]
pub enum ElectionError {
    /// Credentials rejected; nothing will change by retrying.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Local HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl From<PortalError> for ElectionError {
    fn from(err: PortalError) -> Self {
        match err {
            PortalError::Authentication(reason) => ElectionError::Authentication(reason),
            PortalError::Client(reason) => ElectionError::Client(reason),
            other => ElectionError::Client(other.to_string()),
        }
    }
}

/// A seat we want. Matches a catalog record on name, identifier and group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub identifier: u64,
    pub group: String,
}

impl Target {
    pub fn new(name: impl Into<String>, identifier: u64, group: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identifier,
            group: group.into(),
        }
    }

    pub fn matches(&self, record: &CatalogRecord) -> bool {
        self.name == record.name
            && self.identifier == record.identifier
            && self.group == record.group
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{} ({})", self.name, self.identifier, self.group)
    }
}

impl TryFrom<&TargetConfig> for Target {
    type Error = ConfigError;

    fn try_from(config: &TargetConfig) -> Result<Self, Self::Error> {
        let identifier = config.identifier.normalized().ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "target {:?} has non-integer identifier {:?}",
                config.name, config.identifier
            ))
        })?;
        Ok(Target::new(&config.name, identifier, &config.group))
    }
}

/// Where the state machine is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElectionState {
    Authenticating,
    Polling,
    Claiming,
    /// Watch-list empty. Normal end.
    Exhausted,
    /// Credentials rejected. Abnormal end.
    Fatal,
}

impl ElectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElectionState::Authenticating => "authenticating",
            ElectionState::Polling => "polling",
            ElectionState::Claiming => "claiming",
            ElectionState::Exhausted => "exhausted",
            ElectionState::Fatal => "fatal",
        }
    }
}

impl fmt::Display for ElectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a single poll cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Catalog was read and every target was processed.
    Completed { claimed: usize, dropped: usize },
    /// Network trouble; nothing changed, try again next cycle.
    Skipped,
    /// The session died mid-cycle; the next cycle starts with a bootstrap.
    SessionExpired,
}

impl CycleOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleOutcome::Completed { .. } => "completed",
            CycleOutcome::Skipped => "skipped",
            CycleOutcome::SessionExpired => "session_expired",
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionReport {
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub cycles: u64,
    pub bootstraps: u64,
    /// Targets claimed, in the order they succeeded.
    pub claimed: Vec<Target>,
    /// Targets removed without a claim.
    pub dropped: Vec<Target>,
}

impl ElectionReport {
    pub(crate) fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            cycles: 0,
            bootstraps: 0,
            claimed: Vec::new(),
            dropped: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IdentifierValue;

    fn record(name: &str, identifier: u64, group: &str) -> CatalogRecord {
        CatalogRecord {
            name: name.to_string(),
            identifier,
            group: group.to_string(),
            instructor: String::new(),
            capacity: 50,
            occupied: 49,
            claim_url: "http://portal.test/claim".to_string(),
        }
    }

    #[test]
    fn test_target_matches_all_three_fields() {
        let target = Target::new("Intro to X", 1234, "CS");
        assert!(target.matches(&record("Intro to X", 1234, "CS")));
        assert!(!target.matches(&record("Intro to Y", 1234, "CS")));
        assert!(!target.matches(&record("Intro to X", 1235, "CS")));
        assert!(!target.matches(&record("Intro to X", 1234, "Math")));
    }

    #[test]
    fn test_target_from_config_normalizes_identifier() {
        let config = TargetConfig {
            name: "Intro to X".to_string(),
            identifier: IdentifierValue::Text("01234".to_string()),
            group: "CS".to_string(),
        };
        let target = Target::try_from(&config).unwrap();
        assert_eq!(target.identifier, 1234);
        assert!(target.matches(&record("Intro to X", 1234, "CS")));
    }

    #[test]
    fn test_target_from_config_rejects_text_identifier() {
        let config = TargetConfig {
            name: "Intro to X".to_string(),
            identifier: IdentifierValue::Text("CS101".to_string()),
            group: "CS".to_string(),
        };
        assert!(Target::try_from(&config).is_err());
    }

    #[test]
    fn test_target_display() {
        assert_eq!(
            Target::new("Intro to X", 1234, "CS").to_string(),
            "Intro to X #1234 (CS)"
        );
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ElectionState::Claiming.to_string(), "claiming");
        assert_eq!(ElectionState::Exhausted.to_string(), "exhausted");
    }

    #[test]
    fn test_error_from_portal_error() {
        let err: ElectionError = PortalError::Authentication("wrong password".into()).into();
        assert_eq!(err.to_string(), "authentication failed: wrong password");
    }
}
