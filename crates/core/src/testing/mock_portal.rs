//! Mock portal for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::portal::{CatalogRecord, ClaimOutcome, Portal, PortalError, Session};

/// A recorded portal call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortalCall {
    Bootstrap,
    FetchCatalog,
    Claim { name: String, identifier: u64 },
}

/// Mock implementation of the Portal trait.
///
/// Provides controllable behavior for testing:
/// - Scripted bootstrap / fetch / claim results, consumed in order
/// - A default catalog returned once the fetch script runs out
/// - Every call recorded for assertions
///
/// Unscripted bootstraps succeed and unscripted claims return `Success`.
///
/// # Example
///
/// ```rust,ignore
/// use elective_core::testing::{fixtures, MockPortal};
///
/// let portal = MockPortal::new();
/// portal.set_catalog(vec![fixtures::record("Intro to X", 1234, "CS", 49, 50)]).await;
/// portal.push_bootstrap_result(Err(PortalError::Network("timeout".into()))).await;
///
/// // ... run the orchestrator ...
///
/// assert_eq!(portal.bootstrap_count().await, 2);
/// ```
pub struct MockPortal {
    bootstrap_results: Arc<RwLock<VecDeque<Result<(), PortalError>>>>,
    catalog_results: Arc<RwLock<VecDeque<Result<Vec<CatalogRecord>, PortalError>>>>,
    claim_results: Arc<RwLock<VecDeque<Result<ClaimOutcome, PortalError>>>>,
    /// Returned when `catalog_results` is empty.
    catalog: Arc<RwLock<Vec<CatalogRecord>>>,
    calls: Arc<RwLock<Vec<PortalCall>>>,
}

impl std::fmt::Debug for MockPortal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockPortal")
            .field("bootstrap_results", &"<scripted>")
            .field("catalog_results", &"<scripted>")
            .field("claim_results", &"<scripted>")
            .field("catalog", &"<catalog>")
            .field("calls", &"<calls>")
            .finish()
    }
}

impl Default for MockPortal {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPortal {
    /// Create a mock portal with an empty catalog.
    pub fn new() -> Self {
        Self {
            bootstrap_results: Arc::new(RwLock::new(VecDeque::new())),
            catalog_results: Arc::new(RwLock::new(VecDeque::new())),
            claim_results: Arc::new(RwLock::new(VecDeque::new())),
            catalog: Arc::new(RwLock::new(Vec::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Set the catalog returned by unscripted fetches.
    pub async fn set_catalog(&self, records: Vec<CatalogRecord>) {
        *self.catalog.write().await = records;
    }

    /// Queue the result of the next unscripted bootstrap.
    pub async fn push_bootstrap_result(&self, result: Result<(), PortalError>) {
        self.bootstrap_results.write().await.push_back(result);
    }

    /// Queue the result of the next fetch.
    pub async fn push_catalog_result(&self, result: Result<Vec<CatalogRecord>, PortalError>) {
        self.catalog_results.write().await.push_back(result);
    }

    /// Queue the result of the next claim.
    pub async fn push_claim_result(&self, result: Result<ClaimOutcome, PortalError>) {
        self.claim_results.write().await.push_back(result);
    }

    /// All calls in the order they were made.
    pub async fn calls(&self) -> Vec<PortalCall> {
        self.calls.read().await.clone()
    }

    pub async fn bootstrap_count(&self) -> usize {
        self.count(|c| matches!(c, PortalCall::Bootstrap)).await
    }

    pub async fn fetch_count(&self) -> usize {
        self.count(|c| matches!(c, PortalCall::FetchCatalog)).await
    }

    pub async fn claim_count(&self) -> usize {
        self.count(|c| matches!(c, PortalCall::Claim { .. })).await
    }

    /// Clear recorded calls.
    pub async fn clear_calls(&self) {
        self.calls.write().await.clear();
    }

    async fn count(&self, pred: impl Fn(&PortalCall) -> bool) -> usize {
        self.calls.read().await.iter().filter(|c| pred(c)).count()
    }

    async fn record(&self, call: PortalCall) {
        self.calls.write().await.push(call);
    }
}

#[async_trait]
impl Portal for MockPortal {
    fn name(&self) -> &str {
        "mock"
    }

    async fn bootstrap(&self) -> Result<Session, PortalError> {
        self.record(PortalCall::Bootstrap).await;

        if let Some(result) = self.bootstrap_results.write().await.pop_front() {
            result?;
        }

        Session::new("http://mock.portal/", "mock-agent", Duration::from_secs(1))
    }

    async fn fetch_catalog(&self, session: &Session) -> Result<Vec<CatalogRecord>, PortalError> {
        self.record(PortalCall::FetchCatalog).await;

        if !session.is_valid() {
            return Err(PortalError::session_expired("mock session invalidated"));
        }

        if let Some(result) = self.catalog_results.write().await.pop_front() {
            return result;
        }
        Ok(self.catalog.read().await.clone())
    }

    async fn claim(
        &self,
        _session: &Session,
        record: &CatalogRecord,
    ) -> Result<ClaimOutcome, PortalError> {
        self.record(PortalCall::Claim {
            name: record.name.clone(),
            identifier: record.identifier,
        })
        .await;

        self.claim_results
            .write()
            .await
            .pop_front()
            .unwrap_or(Ok(ClaimOutcome::Success))
    }
}
