pub mod config;
pub mod election;
pub mod metrics;
pub mod portal;
pub mod solver;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, LogFormat,
    PortalConfig, SanitizedConfig, SolverConfig, TargetConfig,
};
pub use election::{
    CycleOutcome, ElectionConfig, ElectionError, ElectionOrchestrator, ElectionReport,
    ElectionState, Target,
};
pub use portal::{
    CatalogRecord, ClaimOutcome, Credentials, ElectivePortal, Portal, PortalError, Session,
};
pub use solver::{ChallengeSolver, CommandSolver, SolverError};
