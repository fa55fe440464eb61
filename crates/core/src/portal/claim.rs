//! Claim executor: challenge loop followed by the claim request.

use std::sync::Arc;

use once_cell::sync::Lazy;
use reqwest::header::CONTENT_TYPE;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::PortalConfig;
use crate::metrics;
use crate::solver::ChallengeSolver;

use super::error::{check_transient, transport_error, PortalError};
use super::types::{CatalogRecord, ClaimOutcome, Session};

static STATUS_MESSAGE: Lazy<Selector> = Lazy::new(|| Selector::parse("#msgTips").unwrap());

/// Where the challenge loop ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ChallengeStatus {
    Accepted,
    SessionExpired,
}

/// Portal verdict on one submitted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Validation {
    Accepted,
    Refused(String),
    /// Response had no `valid` field at all.
    Unrecognized,
}

/// Submits claims for catalog records.
///
/// Every claim burns at least one challenge issuance, so only call
/// [`ClaimExecutor::claim`] for records that actually have a free seat.
pub struct ClaimExecutor {
    draw_url: String,
    validate_url: String,
    success_marker: String,
    accepted_valid_code: String,
    max_attempts: u32,
    solver: Arc<dyn ChallengeSolver>,
}

impl ClaimExecutor {
    pub fn new(config: &PortalConfig, max_attempts: u32, solver: Arc<dyn ChallengeSolver>) -> Self {
        Self {
            draw_url: config.draw_url.clone(),
            validate_url: config.validate_url.clone(),
            success_marker: config.success_marker.clone(),
            accepted_valid_code: config.accepted_valid_code.clone(),
            max_attempts,
            solver,
        }
    }

    /// Pass a challenge, then claim the record.
    pub async fn claim(
        &self,
        session: &Session,
        record: &CatalogRecord,
    ) -> Result<ClaimOutcome, PortalError> {
        info!(
            course = %record.name,
            identifier = record.identifier,
            occupied = record.occupied,
            capacity = record.capacity,
            "Attempting claim"
        );

        if self.pass_challenge(session).await? == ChallengeStatus::SessionExpired {
            return Ok(ClaimOutcome::SessionExpired);
        }

        let response = session
            .client()
            .get(&record.claim_url)
            .send()
            .await
            .map_err(transport_error)?;
        check_transient(response.status(), "claim page")?;
        let body = response.text().await.map_err(transport_error)?;

        let outcome = interpret_claim_page(&body, &self.success_marker);
        match &outcome {
            ClaimOutcome::Success => info!(course = %record.name, "Claim succeeded"),
            ClaimOutcome::Rejected(message) => {
                warn!(course = %record.name, message = %message, "Claim rejected")
            }
            ClaimOutcome::SessionExpired => {
                warn!(course = %record.name, "Claim page had no status message")
            }
        }
        Ok(outcome)
    }

    /// Request, solve and submit challenges until one is accepted or the
    /// attempt cap is reached.
    async fn pass_challenge(&self, session: &Session) -> Result<ChallengeStatus, PortalError> {
        for attempt in 1..=self.max_attempts {
            let Some(image) = self.draw(session).await? else {
                return Ok(ChallengeStatus::SessionExpired);
            };

            let answer = self.solver.solve(&image).await?;

            match self.validate(session, &answer).await? {
                Validation::Accepted => {
                    metrics::CHALLENGE_ATTEMPTS
                        .with_label_values(&["accepted"])
                        .inc();
                    debug!(attempt, "Challenge accepted");
                    return Ok(ChallengeStatus::Accepted);
                }
                Validation::Refused(code) => {
                    metrics::CHALLENGE_ATTEMPTS
                        .with_label_values(&["refused"])
                        .inc();
                    debug!(attempt, valid = %code, "Challenge answer refused");
                }
                Validation::Unrecognized => return Ok(ChallengeStatus::SessionExpired),
            }
        }

        Err(PortalError::ChallengeExhausted {
            attempts: self.max_attempts,
        })
    }

    /// Fetch a fresh challenge image. `None` when the portal served a page
    /// instead of an image.
    async fn draw(&self, session: &Session) -> Result<Option<Vec<u8>>, PortalError> {
        let response = session
            .client()
            .get(&self.draw_url)
            .send()
            .await
            .map_err(transport_error)?;
        check_transient(response.status(), "challenge image")?;

        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("text/html"))
            .unwrap_or(false);

        let bytes = response.bytes().await.map_err(transport_error)?;
        if is_html || looks_like_markup(&bytes) {
            return Ok(None);
        }
        Ok(Some(bytes.to_vec()))
    }

    async fn validate(&self, session: &Session, answer: &str) -> Result<Validation, PortalError> {
        let response = session
            .client()
            .post(&self.validate_url)
            .form(&[("validCode", answer)])
            .send()
            .await
            .map_err(transport_error)?;
        check_transient(response.status(), "challenge validation")?;
        let body = response.text().await.map_err(transport_error)?;

        Ok(interpret_validation(&body, &self.accepted_valid_code))
    }
}

/// Empty bodies and HTML documents are not challenge images.
fn looks_like_markup(bytes: &[u8]) -> bool {
    match bytes.iter().position(|b| !b.is_ascii_whitespace()) {
        None => true,
        Some(start) => bytes[start] == b'<',
    }
}

fn interpret_validation(body: &str, accepted_code: &str) -> Validation {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return Validation::Unrecognized;
    };

    // The portal sends the code as a string, but tolerate a bare number
    let code = match json.get("valid") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Validation::Unrecognized,
    };

    if code == accepted_code {
        Validation::Accepted
    } else {
        Validation::Refused(code)
    }
}

/// Read the status message off the claim result page.
fn interpret_claim_page(html: &str, success_marker: &str) -> ClaimOutcome {
    let document = Html::parse_document(html);
    let Some(element) = document.select(&STATUS_MESSAGE).next() else {
        return ClaimOutcome::SessionExpired;
    };

    let message = element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");

    if message.contains(success_marker) {
        ClaimOutcome::Success
    } else {
        ClaimOutcome::Rejected(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_accepted() {
        assert_eq!(
            interpret_validation(r#"{"valid": "2"}"#, "2"),
            Validation::Accepted
        );
        assert_eq!(interpret_validation(r#"{"valid": 2}"#, "2"), Validation::Accepted);
    }

    #[test]
    fn test_validation_refused() {
        assert_eq!(
            interpret_validation(r#"{"valid": "0"}"#, "2"),
            Validation::Refused("0".to_string())
        );
    }

    #[test]
    fn test_validation_unrecognized() {
        assert_eq!(interpret_validation("{}", "2"), Validation::Unrecognized);
        assert_eq!(
            interpret_validation("<html>login</html>", "2"),
            Validation::Unrecognized
        );
        assert_eq!(
            interpret_validation(r#"{"valid": null}"#, "2"),
            Validation::Unrecognized
        );
    }

    #[test]
    fn test_claim_page_success() {
        let html = r#"<html><body><table><tr><td id="msgTips"> 补选 Intro to X 成功 </td></tr></table></body></html>"#;
        assert_eq!(interpret_claim_page(html, "成功"), ClaimOutcome::Success);
    }

    #[test]
    fn test_claim_page_success_in_div() {
        let html = r#"<html><body><div id="msgTips">补选 Linear Algebra 成功</div></body></html>"#;
        assert_eq!(interpret_claim_page(html, "成功"), ClaimOutcome::Success);
    }

    #[test]
    fn test_claim_page_rejected_keeps_message() {
        let html = r#"<div id="msgTips">Time conflict with   Linear Algebra</div>"#;
        assert_eq!(
            interpret_claim_page(html, "成功"),
            ClaimOutcome::Rejected("Time conflict with Linear Algebra".to_string())
        );
    }

    #[test]
    fn test_claim_page_without_status_is_session_expired() {
        let html = r#"<html><body><form action="/login"></form></body></html>"#;
        assert_eq!(
            interpret_claim_page(html, "成功"),
            ClaimOutcome::SessionExpired
        );
    }

    #[test]
    fn test_looks_like_markup() {
        assert!(looks_like_markup(b""));
        assert!(looks_like_markup(b"   \n"));
        assert!(looks_like_markup(b"\n<!DOCTYPE html>"));
        assert!(!looks_like_markup(b"\x89PNG\r\n\x1a\n"));
        assert!(!looks_like_markup(b"GIF89a"));
    }
}
