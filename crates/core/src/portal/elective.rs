//! The production portal: session manager, scraper and claim executor
//! behind the `Portal` trait.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::PortalConfig;
use crate::solver::ChallengeSolver;

use super::catalog::CatalogScraper;
use super::claim::ClaimExecutor;
use super::error::PortalError;
use super::session::SessionManager;
use super::types::{CatalogRecord, ClaimOutcome, Credentials, Portal, Session};

/// HTTP implementation of [`Portal`].
pub struct ElectivePortal {
    sessions: SessionManager,
    scraper: CatalogScraper,
    claims: ClaimExecutor,
}

impl ElectivePortal {
    /// Wire up the three components.
    ///
    /// Fails only if the configured base URL cannot be parsed.
    pub fn new(
        config: PortalConfig,
        credentials: Credentials,
        max_challenge_attempts: u32,
        solver: Arc<dyn ChallengeSolver>,
    ) -> Result<Self, PortalError> {
        let scraper = CatalogScraper::new(&config)?;
        let claims = ClaimExecutor::new(&config, max_challenge_attempts, solver);
        let sessions = SessionManager::new(config, credentials);

        Ok(Self {
            sessions,
            scraper,
            claims,
        })
    }
}

#[async_trait]
impl Portal for ElectivePortal {
    fn name(&self) -> &str {
        "elective"
    }

    async fn bootstrap(&self) -> Result<Session, PortalError> {
        self.sessions.bootstrap().await
    }

    async fn fetch_catalog(&self, session: &Session) -> Result<Vec<CatalogRecord>, PortalError> {
        self.scraper.fetch(session).await
    }

    async fn claim(
        &self,
        session: &Session,
        record: &CatalogRecord,
    ) -> Result<ClaimOutcome, PortalError> {
        self.claims.claim(session, record).await
    }
}
