mod metrics;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use elective_core::{
    load_config, validate_config, ChallengeSolver, CommandSolver, Config, ConfigError,
    Credentials, ElectionOrchestrator, ElectivePortal, LogFormat, Portal, SanitizedConfig, Target,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit status for a rejected login or a client that could not be built.
const EXIT_FATAL: i32 = 1;
/// Exit status for a missing, unparseable or invalid configuration.
const EXIT_CONFIG: i32 = 2;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        let code = if e.downcast_ref::<ConfigError>().is_some() {
            EXIT_CONFIG
        } else {
            EXIT_FATAL
        };
        std::process::exit(code);
    }
}

async fn run() -> Result<()> {
    // Determine config path
    let config_path = std::env::var("ELECTIVE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("elective.toml"));

    // Logging format comes from the config, so fall back to pretty output
    // when the config itself cannot be read
    let config = match load_config(&config_path) {
        Ok(config) => {
            init_logging(config.logging.format);
            config
        }
        Err(e) => {
            init_logging(LogFormat::Pretty);
            return Err(e).with_context(|| format!("Failed to load config from {:?}", config_path));
        }
    };

    info!(version = VERSION, path = ?config_path, "Configuration loaded");
    validate_config(&config).context("Configuration validation failed")?;

    let sanitized = SanitizedConfig::from(&config);
    info!(
        config = %serde_json::to_string(&sanitized).unwrap_or_default(),
        "Effective configuration"
    );

    let targets = build_targets(&config)?;
    let portal = build_portal(&config)?;

    let mut orchestrator = ElectionOrchestrator::new(config.election.clone(), portal, targets);
    let result = orchestrator.run().await;

    if let Some(path) = &config.metrics.path {
        match metrics::write_snapshot(path) {
            Ok(()) => info!(path = ?path, "Metrics snapshot written"),
            Err(e) => warn!(error = %format!("{:#}", e), "Could not write metrics snapshot"),
        }
    }

    let report = result.context("Election aborted")?;
    info!(
        report = %serde_json::to_string(&report).unwrap_or_default(),
        "Election report"
    );

    Ok(())
}

fn init_logging(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// Turn the configured watch-list into targets, in priority order.
fn build_targets(config: &Config) -> Result<Vec<Target>> {
    let targets = config
        .targets
        .iter()
        .map(Target::try_from)
        .collect::<Result<Vec<_>, ConfigError>>()
        .context("Invalid watch-list")?;

    for (priority, target) in targets.iter().enumerate() {
        info!(priority, course = %target, "Watching");
    }
    Ok(targets)
}

fn build_portal(config: &Config) -> Result<Arc<dyn Portal>> {
    let solver: Arc<dyn ChallengeSolver> = Arc::new(CommandSolver::new(config.solver.clone()));
    info!(solver = solver.name(), command = %config.solver.command, "Challenge solver ready");

    let portal = ElectivePortal::new(
        config.portal.clone(),
        Credentials::from(&config.credentials),
        config.election.max_challenge_attempts,
        solver,
    )
    .context("Failed to initialize portal client")?;

    Ok(Arc::new(portal))
}
