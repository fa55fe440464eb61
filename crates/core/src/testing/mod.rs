//! Testing utilities and mock implementations.
//!
//! This module provides mocks for the two external seams of the engine,
//! allowing the orchestrator and the portal client to be tested without a
//! live portal or an OCR helper.
//!
//! # Example
//!
//! ```rust,ignore
//! use elective_core::testing::{fixtures, MockPortal};
//!
//! let portal = Arc::new(MockPortal::new());
//! portal.set_catalog(vec![fixtures::record("Intro to X", 1234, "CS", 49, 50)]).await;
//!
//! let mut orch = ElectionOrchestrator::new(
//!     fixtures::election_config(),
//!     portal.clone(),
//!     vec![fixtures::target("Intro to X", 1234, "CS")],
//! );
//! orch.run().await?;
//! ```

mod mock_portal;
mod mock_solver;

pub use mock_portal::{MockPortal, PortalCall};
pub use mock_solver::MockSolver;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::election::{ElectionConfig, Target};
    use crate::portal::CatalogRecord;

    /// Create a watch-list target.
    pub fn target(name: &str, identifier: u64, group: &str) -> Target {
        Target::new(name, identifier, group)
    }

    /// Create a catalog record with the given occupancy.
    pub fn record(
        name: &str,
        identifier: u64,
        group: &str,
        occupied: u32,
        capacity: u32,
    ) -> CatalogRecord {
        CatalogRecord {
            name: name.to_string(),
            identifier,
            group: group.to_string(),
            instructor: "Prof. Mock".to_string(),
            capacity,
            occupied,
            claim_url: format!("http://mock.portal/claim?course={}", identifier),
        }
    }

    /// Election settings with millisecond delays so tests finish quickly.
    pub fn election_config() -> ElectionConfig {
        ElectionConfig {
            poll_interval_ms: 10,
            reauth_backoff_ms: 10,
            max_challenge_attempts: 3,
            max_missing_cycles: 1,
        }
    }
}
