//! Two-stage SSO login: identity-provider token, then portal session cookie.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::config::PortalConfig;

use super::error::{check_transient, transport_error, PortalError};
use super::types::{Credentials, Session};

/// Performs the token exchange and SSO bridging.
///
/// Holds the credentials; nothing else in the crate sees them. Does not
/// retry: a failed bootstrap is reported and the orchestrator decides.
pub struct SessionManager {
    config: PortalConfig,
    credentials: Credentials,
}

impl SessionManager {
    pub fn new(config: PortalConfig, credentials: Credentials) -> Self {
        Self {
            config,
            credentials,
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs as u64)
    }

    /// Log in and return an authenticated session.
    pub async fn bootstrap(&self) -> Result<Session, PortalError> {
        let session = Session::new(&self.config.referer, &self.config.user_agent, self.timeout())?;

        let token = self.fetch_token(&session).await?;
        debug!(username = %self.credentials.username(), "Got token from identity provider");

        self.bridge(&session, &token).await?;
        info!(username = %self.credentials.username(), "Portal session established");

        Ok(session)
    }

    /// Submit the credentials to the identity provider and pull out the token.
    async fn fetch_token(&self, session: &Session) -> Result<String, PortalError> {
        let form = [
            ("appid", self.credentials.appid()),
            ("userName", self.credentials.username()),
            ("password", self.credentials.password()),
            ("randCode", ""),
            ("smsCode", ""),
            ("otpCode", ""),
            ("redirUrl", self.config.sso_redirect_url.as_str()),
        ];

        let response = session
            .client()
            .post(&self.config.iaaa_login_url)
            .form(&form)
            .send()
            .await
            .map_err(transport_error)?;

        // Provider down or throttling us, not a verdict on the credentials
        let status = response.status();
        check_transient(status, "identity provider")?;

        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() && serde_json::from_str::<serde_json::Value>(&body).is_err() {
            return Err(PortalError::Network(format!(
                "identity provider returned HTTP {} without a login response",
                status
            )));
        }
        parse_token(&body)
    }

    /// Trade the token for a portal session cookie (kept by the cookie jar).
    async fn bridge(&self, session: &Session, token: &str) -> Result<(), PortalError> {
        let url = bridge_url(&self.config.sso_bridge_url, token);

        let response = session
            .client()
            .get(&url)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        check_transient(status, "SSO bridge")?;
        if !status.is_success() {
            return Err(PortalError::Authentication(format!(
                "SSO bridge returned HTTP {}",
                status
            )));
        }

        Ok(())
    }
}

/// Identity-provider login response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    errors: Option<TokenErrors>,
}

#[derive(Debug, Deserialize)]
struct TokenErrors {
    #[serde(default)]
    msg: Option<String>,
}

fn parse_token(body: &str) -> Result<String, PortalError> {
    let response: TokenResponse = serde_json::from_str(body).map_err(|e| {
        PortalError::Authentication(format!("unexpected identity provider response: {}", e))
    })?;

    match response.token {
        Some(token) if !token.is_empty() => Ok(token),
        _ => {
            let reason = response
                .errors
                .and_then(|e| e.msg)
                .unwrap_or_else(|| "no token in identity provider response".to_string());
            Err(PortalError::Authentication(reason))
        }
    }
}

fn bridge_url(base: &str, token: &str) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}token={}", base, separator, urlencoding::encode(token))
}
