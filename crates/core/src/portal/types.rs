//! Types shared by the portal components.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::error::PortalError;

/// Identity-provider login. Never mutated, never logged.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password: String,
    appid: String,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        appid: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            appid: appid.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }

    pub fn appid(&self) -> &str {
        &self.appid
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("appid", &self.appid)
            .finish()
    }
}

impl From<&crate::config::CredentialsConfig> for Credentials {
    fn from(config: &crate::config::CredentialsConfig) -> Self {
        Self::new(&config.username, &config.password, &config.appid)
    }
}

/// An authenticated portal session.
///
/// Wraps an HTTP client with its own cookie jar and the spoofed headers the
/// portal insists on. Components only ever borrow it; when it dies the
/// orchestrator throws the whole thing away and bootstraps a new one.
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    headers: HeaderMap,
    established_at: DateTime<Utc>,
    valid: bool,
}

impl Session {
    /// Build an unauthenticated session with the fixed outbound headers.
    pub fn new(referer: &str, user_agent: &str, timeout: Duration) -> Result<Self, PortalError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            REFERER,
            HeaderValue::from_str(referer)
                .map_err(|e| PortalError::Client(format!("invalid Referer header: {}", e)))?,
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .map_err(|e| PortalError::Client(format!("invalid User-Agent header: {}", e)))?,
        );

        let client = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .default_headers(headers.clone())
            .build()
            .map_err(|e| PortalError::Client(e.to_string()))?;

        Ok(Self {
            client,
            headers,
            established_at: Utc::now(),
            valid: true,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The spoofed headers sent with every request.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn established_at(&self) -> DateTime<Utc> {
        self.established_at
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Mark the session dead. Only the owner holds `&mut`.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }
}

/// One row of the live availability listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub name: String,
    /// Normalized class identifier.
    pub identifier: u64,
    /// Grouping label (department).
    pub group: String,
    /// Informational only; not used for matching.
    #[serde(default)]
    pub instructor: String,
    pub capacity: u32,
    /// Always `<= capacity`.
    pub occupied: u32,
    /// Absolute claim URL.
    pub claim_url: String,
}

impl CatalogRecord {
    pub fn has_vacancy(&self) -> bool {
        self.occupied < self.capacity
    }
}

/// Result of one claim attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    Success,
    /// The portal refused; carries its status message.
    Rejected(String),
    SessionExpired,
}

impl ClaimOutcome {
    /// Label for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimOutcome::Success => "success",
            ClaimOutcome::Rejected(_) => "rejected",
            ClaimOutcome::SessionExpired => "session_expired",
        }
    }
}

/// Identifiers are compared as integers; `"01234"` and `"1234"` are the
/// same class.
pub fn normalize_identifier(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok()
}

/// The remote portal as seen by the orchestrator.
#[async_trait]
pub trait Portal: Send + Sync {
    /// Portal name for logging.
    fn name(&self) -> &str;

    /// Log in from scratch and return a fresh session.
    async fn bootstrap(&self) -> Result<Session, PortalError>;

    /// Read the first page of the availability listing.
    async fn fetch_catalog(&self, session: &Session) -> Result<Vec<CatalogRecord>, PortalError>;

    /// Solve challenges until one is accepted, then claim the record.
    async fn claim(
        &self,
        session: &Session,
        record: &CatalogRecord,
    ) -> Result<ClaimOutcome, PortalError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("alice", "hunter2", "syllabus");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_session_carries_spoofed_headers() {
        let session = Session::new(
            "http://portal.test/help",
            "Mozilla/5.0 test",
            Duration::from_secs(2),
        )
        .unwrap();
        assert!(session.is_valid());
        assert_eq!(session.headers().len(), 2);
        assert_eq!(session.headers()[REFERER], "http://portal.test/help");
        assert_eq!(session.headers()[USER_AGENT], "Mozilla/5.0 test");
    }

    #[test]
    fn test_session_rejects_non_latin1_header() {
        let err = Session::new("http://portal.test", "Mozilla\n", Duration::from_secs(2))
            .unwrap_err();
        assert!(matches!(err, PortalError::Client(_)));
    }

    #[test]
    fn test_session_invalidate() {
        let mut session =
            Session::new("http://portal.test", "ua", Duration::from_secs(2)).unwrap();
        session.invalidate();
        assert!(!session.is_valid());
    }

    #[test]
    fn test_normalize_identifier() {
        assert_eq!(normalize_identifier("1234"), Some(1234));
        assert_eq!(normalize_identifier(" 01234 "), Some(1234));
        assert_eq!(normalize_identifier(""), None);
        assert_eq!(normalize_identifier("12b"), None);
    }

    #[test]
    fn test_vacancy() {
        let mut record = CatalogRecord {
            name: "Intro to X".into(),
            identifier: 1234,
            group: "CS".into(),
            instructor: String::new(),
            capacity: 50,
            occupied: 49,
            claim_url: "http://portal.test/claim?id=1".into(),
        };
        assert!(record.has_vacancy());
        record.occupied = 50;
        assert!(!record.has_vacancy());
    }

    #[test]
    fn test_claim_outcome_labels() {
        assert_eq!(ClaimOutcome::Success.as_str(), "success");
        assert_eq!(ClaimOutcome::Rejected("full".into()).as_str(), "rejected");
        assert_eq!(ClaimOutcome::SessionExpired.as_str(), "session_expired");
    }
}
