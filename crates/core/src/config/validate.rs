use url::Url;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Credentials are non-empty
/// - Watch-list is non-empty and every identifier is numeric
/// - Portal URLs parse and timeouts are non-zero
/// - Election intervals and caps are non-zero
/// - Solver command is set
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.credentials.username.trim().is_empty() {
        return Err(invalid("credentials.username cannot be empty"));
    }
    if config.credentials.password.is_empty() {
        return Err(invalid("credentials.password cannot be empty"));
    }

    if config.targets.is_empty() {
        return Err(invalid("targets must contain at least one entry"));
    }
    for (idx, target) in config.targets.iter().enumerate() {
        if target.name.trim().is_empty() {
            return Err(invalid(format!("targets[{}].name cannot be empty", idx)));
        }
        if target.identifier.normalized().is_none() {
            return Err(invalid(format!(
                "targets[{}].identifier {:?} is not an integer",
                idx, target.identifier
            )));
        }
    }

    let portal = &config.portal;
    for (field, value) in [
        ("portal.base_url", &portal.base_url),
        ("portal.iaaa_login_url", &portal.iaaa_login_url),
        ("portal.sso_bridge_url", &portal.sso_bridge_url),
        ("portal.listing_url", &portal.listing_url),
        ("portal.draw_url", &portal.draw_url),
        ("portal.validate_url", &portal.validate_url),
    ] {
        Url::parse(value).map_err(|e| invalid(format!("{} is not a valid URL: {}", field, e)))?;
    }
    if portal.request_timeout_secs == 0 {
        return Err(invalid("portal.request_timeout_secs cannot be 0"));
    }
    if portal.success_marker.is_empty() {
        return Err(invalid("portal.success_marker cannot be empty"));
    }

    let election = &config.election;
    if election.poll_interval_ms == 0 {
        return Err(invalid("election.poll_interval_ms cannot be 0"));
    }
    if election.max_challenge_attempts == 0 {
        return Err(invalid("election.max_challenge_attempts cannot be 0"));
    }
    if election.max_missing_cycles == 0 {
        return Err(invalid("election.max_missing_cycles cannot be 0"));
    }

    if config.solver.command.trim().is_empty() {
        return Err(invalid("solver.command cannot be empty"));
    }
    if config.solver.timeout_secs == 0 {
        return Err(invalid("solver.timeout_secs cannot be 0"));
    }

    Ok(())
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    fn valid_config() -> Config {
        load_config_from_str(
            r#"
[credentials]
username = "alice"
password = "secret"

[solver]
command = "recognize"

[[targets]]
name = "Intro to X"
identifier = "1234"
group = "CS"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_validate_empty_watch_list_fails() {
        let mut config = valid_config();
        config.targets.clear();
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_non_numeric_identifier_fails() {
        let mut config = valid_config();
        config.targets[0].identifier =
            crate::config::IdentifierValue::Text("12a4".to_string());
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("targets[0].identifier"));
    }

    #[test]
    fn test_validate_zero_poll_interval_fails() {
        let mut config = valid_config();
        config.election.poll_interval_ms = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_challenge_cap_fails() {
        let mut config = valid_config();
        config.election.max_challenge_attempts = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_bad_url_fails() {
        let mut config = valid_config();
        config.portal.listing_url = "not a url".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("portal.listing_url"));
    }

    #[test]
    fn test_validate_empty_password_fails() {
        let mut config = valid_config();
        config.credentials.password.clear();
        assert!(validate_config(&config).is_err());
    }
}
