//! Identity provider client.
//!
//! Verifies campus IdP tokens by calling the provider's userinfo
//! endpoint. Any provider failure collapses to `Unauthorized`.

use serde::Deserialize;
use unipoll_common::{AppError, AppResult, IdpConfig};

/// Profile returned by the identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct IdpUserInfo {
    /// IdP subject identifier.
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub name: String,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub student_id: Option<String>,
}

/// HTTP client for the campus identity provider.
#[derive(Clone)]
pub struct IdpClient {
    http: reqwest::Client,
    base_url: String,
}

impl IdpClient {
    /// Create a new IdP client.
    #[must_use]
    pub fn new(config: &IdpConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the profile behind an IdP-issued token.
    pub async fn fetch_user_info(&self, idp_token: &str) -> AppResult<IdpUserInfo> {
        let response = self
            .http
            .get(format!("{}/userinfo", self.base_url))
            .bearer_auth(idp_token)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "IdP request failed");
                AppError::Unauthorized
            })?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "IdP rejected token");
            return Err(AppError::Unauthorized);
        }

        response.json::<IdpUserInfo>().await.map_err(|e| {
            tracing::warn!(error = %e, "IdP returned malformed userinfo");
            AppError::Unauthorized
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let client = IdpClient::new(&IdpConfig {
            base_url: "https://idp.example.edu/".to_string(),
        });
        assert_eq!(client.base_url, "https://idp.example.edu");
    }

    #[test]
    fn test_userinfo_deserializes_optional_fields() {
        let info: IdpUserInfo = serde_json::from_str(
            r#"{"sub": "uuid-1", "name": "Alice"}"#,
        )
        .unwrap();
        assert_eq!(info.sub, "uuid-1");
        assert!(info.email.is_none());
        assert!(info.student_id.is_none());
    }
}
