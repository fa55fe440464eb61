use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from file with environment variable overrides
///
/// `ELECTIVE_CREDENTIALS__PASSWORD=...` overrides `credentials.password`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("ELECTIVE_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[credentials]
username = "alice"
password = "secret"

[solver]
command = "recognize"

[election]
poll_interval_ms = 2500
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.election.poll_interval_ms, 2500);
    }

    #[test]
    fn test_load_config_from_str_missing_solver() {
        let toml = r#"
[credentials]
username = "alice"
password = "secret"
"#;
        let result = load_config_from_str(toml);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/elective.toml"));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[credentials]
username = "alice"
password = "secret"

[solver]
command = "recognize"
args = ["--model", "cnn"]

[[targets]]
name = "Intro to X"
identifier = "1234"
group = "CS"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.credentials.username, "alice");
        assert_eq!(config.solver.args, vec!["--model", "cnn"]);
        assert_eq!(config.targets.len(), 1);
        assert_eq!(config.targets[0].group, "CS");
    }
}
