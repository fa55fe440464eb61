use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::election::ElectionConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub portal: PortalConfig,
    #[serde(default)]
    pub election: ElectionConfig,
    pub solver: SolverConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// Watch-list, in priority order.
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

/// Identity-provider credentials
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CredentialsConfig {
    pub username: String,
    pub password: String,
    /// Application id announced to the identity provider.
    #[serde(default = "default_appid")]
    pub appid: String,
}

fn default_appid() -> String {
    "syllabus".to_string()
}

/// Remote endpoints and the fixed request headers the portal expects.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PortalConfig {
    /// Origin used to resolve relative claim links.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Identity-provider login endpoint (token exchange).
    #[serde(default = "default_iaaa_login_url")]
    pub iaaa_login_url: String,
    /// `redirUrl` submitted alongside the credentials.
    #[serde(default = "default_sso_redirect_url")]
    pub sso_redirect_url: String,
    /// Portal endpoint that turns a token into a session cookie.
    #[serde(default = "default_sso_bridge_url")]
    pub sso_bridge_url: String,
    /// Seat-availability listing.
    #[serde(default = "default_listing_url")]
    pub listing_url: String,
    /// Challenge image endpoint.
    #[serde(default = "default_draw_url")]
    pub draw_url: String,
    /// Challenge validation endpoint.
    #[serde(default = "default_validate_url")]
    pub validate_url: String,
    #[serde(default = "default_referer")]
    pub referer: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Substring of the claim page status message that denotes success.
    #[serde(default = "default_success_marker")]
    pub success_marker: String,
    /// Value of `valid` in the validation response that means "accepted".
    #[serde(default = "default_accepted_valid_code")]
    pub accepted_valid_code: String,
    /// Timeout applied to every HTTP request (default: 5).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u32,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            iaaa_login_url: default_iaaa_login_url(),
            sso_redirect_url: default_sso_redirect_url(),
            sso_bridge_url: default_sso_bridge_url(),
            listing_url: default_listing_url(),
            draw_url: default_draw_url(),
            validate_url: default_validate_url(),
            referer: default_referer(),
            user_agent: default_user_agent(),
            success_marker: default_success_marker(),
            accepted_valid_code: default_accepted_valid_code(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

const PORTAL_ROOT: &str = "http://elective.pku.edu.cn/elective2008";
const CONTROLLER_ROOT: &str =
    "http://elective.pku.edu.cn/elective2008/edu/pku/stu/elective/controller";

fn default_base_url() -> String {
    "http://elective.pku.edu.cn".to_string()
}

fn default_iaaa_login_url() -> String {
    "https://iaaa.pku.edu.cn/iaaa/oauthlogin.do".to_string()
}

fn default_sso_redirect_url() -> String {
    "http://elective.pku.edu.cn:80/elective2008/agent4Iaaa.jsp/../ssoLogin.do".to_string()
}

fn default_sso_bridge_url() -> String {
    format!("{}/ssoLogin.do", PORTAL_ROOT)
}

fn default_listing_url() -> String {
    format!("{}/supplement/SupplyCancel.do", CONTROLLER_ROOT)
}

fn default_draw_url() -> String {
    format!("{}/DrawServlet", PORTAL_ROOT)
}

fn default_validate_url() -> String {
    format!("{}/supplement/validate.do", CONTROLLER_ROOT)
}

fn default_referer() -> String {
    format!("{}/help/HelpController.jpf", CONTROLLER_ROOT)
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/69.0.3497.100 Safari/537.36"
        .to_string()
}

fn default_success_marker() -> String {
    "成功".to_string()
}

fn default_accepted_valid_code() -> String {
    "2".to_string()
}

fn default_request_timeout() -> u32 {
    5
}

/// External challenge recognizer
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SolverConfig {
    /// Executable that reads image bytes on stdin and prints the answer.
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Per-image timeout in seconds (default: 10)
    #[serde(default = "default_solver_timeout")]
    pub timeout_secs: u32,
}

fn default_solver_timeout() -> u32 {
    10
}

/// Log output configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Metrics snapshot configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MetricsConfig {
    /// Where to write a Prometheus text snapshot when the run ends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// One watch-list entry as written in the config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetConfig {
    pub name: String,
    pub identifier: IdentifierValue,
    pub group: String,
}

/// Course identifiers show up both as bare integers and as
/// zero-padded strings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum IdentifierValue {
    Number(u64),
    Text(String),
}

impl IdentifierValue {
    /// Integer form used for matching, if the value is numeric.
    pub fn normalized(&self) -> Option<u64> {
        match self {
            IdentifierValue::Number(n) => Some(*n),
            IdentifierValue::Text(s) => crate::portal::normalize_identifier(s),
        }
    }
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub credentials: SanitizedCredentialsConfig,
    pub portal: PortalConfig,
    pub election: ElectionConfig,
    pub solver: SolverConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
    pub targets: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCredentialsConfig {
    pub username: String,
    pub appid: String,
    pub password_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            credentials: SanitizedCredentialsConfig {
                username: config.credentials.username.clone(),
                appid: config.credentials.appid.clone(),
                password_configured: !config.credentials.password.is_empty(),
            },
            portal: config.portal.clone(),
            election: config.election.clone(),
            solver: config.solver.clone(),
            logging: config.logging.clone(),
            metrics: config.metrics.clone(),
            targets: config.targets.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[credentials]
username = "1800012345"
password = "hunter2"

[solver]
command = "/usr/local/bin/recognize"
"#;

    #[test]
    fn test_deserialize_minimal_config_uses_defaults() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.credentials.username, "1800012345");
        assert_eq!(config.credentials.appid, "syllabus");
        assert_eq!(config.portal.request_timeout_secs, 5);
        assert_eq!(config.portal.success_marker, "成功");
        assert_eq!(config.portal.accepted_valid_code, "2");
        assert!(config
            .portal
            .listing_url
            .ends_with("/supplement/SupplyCancel.do"));
        assert_eq!(config.solver.timeout_secs, 10);
        assert!(config.solver.args.is_empty());
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.metrics.path.is_none());
        assert!(config.targets.is_empty());
    }

    #[test]
    fn test_deserialize_missing_credentials_fails() {
        let toml = r#"
[solver]
command = "recognize"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_targets_with_mixed_identifiers() {
        let toml = format!(
            r#"{}
[[targets]]
name = "Intro to X"
identifier = "1234"
group = "CS"

[[targets]]
name = "Linear Algebra"
identifier = 7
group = "Math"
"#,
            MINIMAL
        );
        let config: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config.targets.len(), 2);
        assert_eq!(
            config.targets[0].identifier,
            IdentifierValue::Text("1234".to_string())
        );
        assert_eq!(config.targets[1].identifier, IdentifierValue::Number(7));
        assert_eq!(config.targets[0].identifier.normalized(), Some(1234));
        assert_eq!(config.targets[1].identifier.normalized(), Some(7));
    }

    #[test]
    fn test_identifier_normalization_strips_padding() {
        assert_eq!(
            IdentifierValue::Text(" 01 ".to_string()).normalized(),
            Some(1)
        );
        assert_eq!(IdentifierValue::Text("abc".to_string()).normalized(), None);
    }

    #[test]
    fn test_json_log_format() {
        let toml = format!(
            r#"{}
[logging]
format = "json"
"#,
            MINIMAL
        );
        let config: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_sanitized_config_hides_password() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.credentials.password_configured);
        assert_eq!(sanitized.credentials.username, "1800012345");

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("hunter2"));
    }
}
