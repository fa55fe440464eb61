//! Error types for portal operations.

use reqwest::StatusCode;
use thiserror::Error;

use crate::solver::SolverError;

/// Errors surfaced by the session manager, catalog scraper and claim executor.
///
/// The orchestrator is the only place that decides what to do with these:
/// retry, re-authenticate, skip, or abort.
#[derive(Debug, Error)]
pub enum PortalError {
    /// Transport failure: timeout, DNS, connection refused, truncated body.
    /// Always worth retrying after a delay.
    #[error("network error: {0}")]
    Network(String),

    /// The identity provider or SSO bridge rejected us.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The portal answered with something we do not recognize.
    /// With `session_expired` set, the session is assumed dead.
    #[error("illegal operation (session expired: {session_expired}): {reason}")]
    IllegalOperation {
        session_expired: bool,
        reason: String,
    },

    /// Every challenge within the attempt cap was refused.
    #[error("challenge not accepted after {attempts} attempts")]
    ChallengeExhausted { attempts: u32 },

    #[error("challenge solver failed: {0}")]
    Solver(#[from] SolverError),

    /// The local HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl PortalError {
    /// Shorthand for the "portal served a login page" case.
    pub fn session_expired(reason: impl Into<String>) -> Self {
        PortalError::IllegalOperation {
            session_expired: true,
            reason: reason.into(),
        }
    }

    /// Whether recovering from this error requires a fresh session.
    pub fn is_session_expired(&self) -> bool {
        matches!(
            self,
            PortalError::IllegalOperation {
                session_expired: true,
                ..
            }
        )
    }

    /// Errors that no amount of retrying will fix.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PortalError::Authentication(_) | PortalError::Client(_)
        )
    }
}

/// Classify a reqwest failure. Everything that happens on the wire is a
/// network error; the caller decides separately what a bad status means.
pub(crate) fn transport_error(e: reqwest::Error) -> PortalError {
    if e.is_timeout() {
        PortalError::Network(format!("request timed out: {}", e))
    } else if e.is_connect() {
        PortalError::Network(format!("connection failed: {}", e))
    } else {
        PortalError::Network(e.to_string())
    }
}

/// Statuses that mean "try again later" rather than anything about the
/// request or the session.
pub(crate) fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}

/// Turn a transient status into a network error; anything else passes.
pub(crate) fn check_transient(status: StatusCode, endpoint: &str) -> Result<(), PortalError> {
    if is_transient_status(status) {
        return Err(PortalError::Network(format!(
            "{} returned HTTP {}",
            endpoint, status
        )));
    }
    Ok(())
}
