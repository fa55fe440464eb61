//! Election orchestrator implementation.
//!
//! One logical worker: authenticate, poll the catalog, claim free seats for
//! watched targets, sleep, repeat. All recovery decisions are made here.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::metrics;
use crate::portal::{CatalogRecord, ClaimOutcome, Portal, PortalError, Session};

use super::config::ElectionConfig;
use super::types::{CycleOutcome, ElectionError, ElectionReport, ElectionState, Target};

/// A target plus how many consecutive fetches have not listed it.
#[derive(Debug, Clone)]
struct WatchedTarget {
    target: Target,
    missed_cycles: u32,
}

/// What to do after one claim attempt.
enum ClaimStep {
    Won,
    NextRecord,
    AbortCycle(CycleOutcome),
}

/// Drives the poll / claim / backoff cycle until the watch-list is empty
/// or the credentials are rejected.
pub struct ElectionOrchestrator {
    config: ElectionConfig,
    portal: Arc<dyn Portal>,
    watch_list: Vec<WatchedTarget>,
    session: Option<Session>,
    state: ElectionState,
    report: ElectionReport,
}

impl ElectionOrchestrator {
    /// Create an orchestrator for the given watch-list. Duplicate targets
    /// are collapsed so the same seat is never claimed twice.
    pub fn new(config: ElectionConfig, portal: Arc<dyn Portal>, targets: Vec<Target>) -> Self {
        let mut seen = HashSet::new();
        let watch_list: Vec<WatchedTarget> = targets
            .into_iter()
            .filter(|t| {
                let fresh = seen.insert(t.clone());
                if !fresh {
                    warn!(course = %t, "Duplicate target in watch-list, ignoring");
                }
                fresh
            })
            .map(|target| WatchedTarget {
                target,
                missed_cycles: 0,
            })
            .collect();

        metrics::WATCHED_TARGETS.set(watch_list.len() as i64);

        Self {
            config,
            portal,
            watch_list,
            session: None,
            state: ElectionState::Authenticating,
            report: ElectionReport::new(),
        }
    }

    pub fn state(&self) -> ElectionState {
        self.state
    }

    /// Targets still being watched, in priority order.
    pub fn targets(&self) -> Vec<Target> {
        self.watch_list.iter().map(|w| w.target.clone()).collect()
    }

    /// Whether a live session is currently held.
    pub fn has_session(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_valid)
    }

    /// Progress so far.
    pub fn report(&self) -> &ElectionReport {
        &self.report
    }

    /// Run until the watch-list is exhausted or authentication fails.
    ///
    /// Network trouble never ends the loop.
    pub async fn run(&mut self) -> Result<ElectionReport, ElectionError> {
        info!(
            portal = self.portal.name(),
            targets = self.watch_list.len(),
            poll_interval_ms = self.config.poll_interval_ms,
            "Election started"
        );

        loop {
            if self.watch_list.is_empty() {
                self.transition(ElectionState::Exhausted);
                self.report.finished_at = Some(Utc::now());
                info!(
                    cycles = self.report.cycles,
                    claimed = self.report.claimed.len(),
                    dropped = self.report.dropped.len(),
                    "Watch-list exhausted, election finished"
                );
                return Ok(self.report.clone());
            }

            let outcome = self.run_cycle().await?;

            if self.watch_list.is_empty() {
                continue;
            }

            let delay = match outcome {
                CycleOutcome::SessionExpired => self.config.reauth_backoff_ms,
                _ => self.config.poll_interval_ms,
            };
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }

    /// Execute one poll cycle without the trailing sleep.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, ElectionError> {
        self.report.cycles += 1;
        self.ensure_session().await?;

        // Client handles share their cookie jar, so this clone is the same session
        let Some(session) = self.session.clone() else {
            return Err(ElectionError::Client("no session after bootstrap".to_string()));
        };

        self.transition(ElectionState::Polling);
        let records = match self.fetch_catalog(&session).await? {
            Ok(records) => records,
            Err(outcome) => return Ok(self.end_cycle(outcome)),
        };

        let mut claimed = 0;
        let mut dropped = 0;
        let mut idx = 0;

        while idx < self.watch_list.len() {
            let target = self.watch_list[idx].target.clone();
            let matches: Vec<&CatalogRecord> =
                records.iter().filter(|r| target.matches(r)).collect();

            if matches.is_empty() {
                let entry = &mut self.watch_list[idx];
                entry.missed_cycles += 1;
                if entry.missed_cycles >= self.config.max_missing_cycles {
                    warn!(course = %target, "Target not found in catalog, removing from watch-list");
                    let removed = self.watch_list.remove(idx);
                    self.report.dropped.push(removed.target);
                    metrics::TARGETS_DROPPED.inc();
                    dropped += 1;
                } else {
                    warn!(
                        course = %target,
                        missed = entry.missed_cycles,
                        limit = self.config.max_missing_cycles,
                        "Target not found in catalog"
                    );
                    idx += 1;
                }
                continue;
            }
            self.watch_list[idx].missed_cycles = 0;

            let mut won = false;
            for record in matches {
                if !record.has_vacancy() {
                    debug!(
                        course = %target,
                        occupied = record.occupied,
                        capacity = record.capacity,
                        "No free seat"
                    );
                    continue;
                }

                info!(
                    course = %target,
                    instructor = %record.instructor,
                    occupied = record.occupied,
                    capacity = record.capacity,
                    "Discovered a free seat"
                );
                self.transition(ElectionState::Claiming);

                match self.claim(&session, &target, record).await? {
                    ClaimStep::Won => {
                        won = true;
                        break;
                    }
                    ClaimStep::NextRecord => {}
                    ClaimStep::AbortCycle(outcome) => {
                        if outcome == CycleOutcome::Skipped {
                            self.transition(ElectionState::Polling);
                        }
                        return Ok(self.end_cycle(outcome));
                    }
                }
            }

            if won {
                let removed = self.watch_list.remove(idx);
                self.report.claimed.push(removed.target);
                claimed += 1;
            } else {
                idx += 1;
            }
        }

        self.transition(ElectionState::Polling);
        Ok(self.end_cycle(CycleOutcome::Completed { claimed, dropped }))
    }

    /// Bootstrap a new session unless a live one is held. Network failures
    /// are retried after the backoff; rejected credentials end the run.
    async fn ensure_session(&mut self) -> Result<(), ElectionError> {
        if self.has_session() {
            return Ok(());
        }

        // Discard the dead session and its cookie jar
        self.session = None;
        self.transition(ElectionState::Authenticating);

        loop {
            self.report.bootstraps += 1;
            match self.portal.bootstrap().await {
                Ok(session) => {
                    metrics::BOOTSTRAPS.with_label_values(&["success"]).inc();
                    self.session = Some(session);
                    return Ok(());
                }
                Err(e) if e.is_fatal() => {
                    metrics::BOOTSTRAPS.with_label_values(&["auth_error"]).inc();
                    self.transition(ElectionState::Fatal);
                    error!(error = %e, "Cannot authenticate, giving up");
                    return Err(e.into());
                }
                Err(e) => {
                    metrics::BOOTSTRAPS
                        .with_label_values(&["network_error"])
                        .inc();
                    warn!(
                        error = %e,
                        retry_in_ms = self.config.reauth_backoff_ms,
                        "Bootstrap failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(self.config.reauth_backoff_ms))
                        .await;
                }
            }
        }
    }

    /// Fetch the listing. The inner `Err` carries how the cycle should end
    /// when the catalog is unavailable.
    async fn fetch_catalog(
        &mut self,
        session: &Session,
    ) -> Result<Result<Vec<CatalogRecord>, CycleOutcome>, ElectionError> {
        let start = Instant::now();
        let result = self.portal.fetch_catalog(session).await;
        let elapsed = start.elapsed().as_secs_f64();

        match result {
            Ok(records) => {
                metrics::CATALOG_FETCH_DURATION
                    .with_label_values(&["success"])
                    .observe(elapsed);
                Ok(Ok(records))
            }
            Err(e) => {
                metrics::CATALOG_FETCH_DURATION
                    .with_label_values(&["error"])
                    .observe(elapsed);
                if e.is_session_expired() {
                    self.expire_session(&e);
                    Ok(Err(CycleOutcome::SessionExpired))
                } else if e.is_fatal() {
                    self.transition(ElectionState::Fatal);
                    Err(e.into())
                } else {
                    warn!(error = %e, "Catalog fetch failed, skipping cycle");
                    Ok(Err(CycleOutcome::Skipped))
                }
            }
        }
    }

    /// Attempt one record and decide what the cycle does next.
    async fn claim(
        &mut self,
        session: &Session,
        target: &Target,
        record: &CatalogRecord,
    ) -> Result<ClaimStep, ElectionError> {
        match self.portal.claim(session, record).await {
            Ok(outcome) => {
                metrics::CLAIMS.with_label_values(&[outcome.as_str()]).inc();
                match outcome {
                    ClaimOutcome::Success => {
                        info!(course = %target, "Seat claimed");
                        Ok(ClaimStep::Won)
                    }
                    ClaimOutcome::Rejected(message) => {
                        warn!(course = %target, message = %message, "Claim rejected, keeping target");
                        Ok(ClaimStep::NextRecord)
                    }
                    ClaimOutcome::SessionExpired => {
                        self.expire_session(&PortalError::session_expired(
                            "claim page had no status message",
                        ));
                        Ok(ClaimStep::AbortCycle(CycleOutcome::SessionExpired))
                    }
                }
            }
            Err(e) => {
                metrics::CLAIMS.with_label_values(&["error"]).inc();
                if e.is_session_expired() {
                    self.expire_session(&e);
                    Ok(ClaimStep::AbortCycle(CycleOutcome::SessionExpired))
                } else if e.is_fatal() {
                    self.transition(ElectionState::Fatal);
                    Err(e.into())
                } else if matches!(e, PortalError::Network(_)) {
                    warn!(course = %target, error = %e, "Claim interrupted by network error, skipping cycle");
                    Ok(ClaimStep::AbortCycle(CycleOutcome::Skipped))
                } else {
                    warn!(course = %target, error = %e, "Claim attempt failed, keeping target");
                    Ok(ClaimStep::NextRecord)
                }
            }
        }
    }

    /// Drop the session; the next cycle starts in `Authenticating`.
    fn expire_session(&mut self, cause: &PortalError) {
        let age_secs = self.session.as_mut().map(|session| {
            session.invalidate();
            (Utc::now() - session.established_at()).num_seconds()
        });
        metrics::SESSIONS_EXPIRED.inc();
        warn!(cause = %cause, age_secs = ?age_secs, "Session expired, will re-authenticate");
        self.transition(ElectionState::Authenticating);
    }

    fn end_cycle(&mut self, outcome: CycleOutcome) -> CycleOutcome {
        metrics::POLL_CYCLES
            .with_label_values(&[outcome.as_str()])
            .inc();
        metrics::WATCHED_TARGETS.set(self.watch_list.len() as i64);
        debug!(
            cycle = self.report.cycles,
            outcome = outcome.as_str(),
            remaining = self.watch_list.len(),
            "Poll cycle finished"
        );
        outcome
    }

    fn transition(&mut self, next: ElectionState) {
        if self.state != next {
            info!(from = %self.state, to = %next, "Election state changed");
            self.state = next;
        }
    }
}
