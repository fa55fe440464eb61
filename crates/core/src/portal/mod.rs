//! Remote portal access.
//!
//! Three components, all stateless apart from configuration:
//! - **SessionManager**: identity-provider token exchange and SSO bridging
//! - **CatalogScraper**: parses the availability listing into records
//! - **ClaimExecutor**: challenge loop plus the claim request itself
//!
//! `ElectivePortal` bundles them behind the `Portal` trait the orchestrator
//! drives. None of them retries on its own except the bounded challenge loop.

mod catalog;
mod claim;
mod elective;
mod error;
mod session;
mod types;

pub use catalog::{parse_catalog, CatalogScraper};
pub use claim::ClaimExecutor;
pub use elective::ElectivePortal;
pub use error::PortalError;
pub use session::SessionManager;
pub use types::{
    normalize_identifier, CatalogRecord, ClaimOutcome, Credentials, Portal, Session,
};
