//! OAuth2 client-credentials token exchange.

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Deserialize;

use crate::error::ResearchError;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

pub struct TokenProvider {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl TokenProvider {
    pub fn new(
        http: reqwest::Client,
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Exchanges the client credentials for a bearer token. A single attempt is made.
    #[tracing::instrument(name = "oauth token", skip(self), fields(http.response.status_code))]
    pub async fn get_access_token(&self) -> Result<String, ResearchError> {
        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(ACCEPT, "*/*")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await
            .map_err(|e| ResearchError::TokenRequest(e.to_string()))?;

        let status = response.status();
        tracing::Span::current().record("http.response.status_code", status.as_u16());

        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ResearchError::Authentication {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ResearchError::TokenRequest(e.to_string()))?;

        token
            .access_token
            .ok_or_else(|| ResearchError::TokenRequest("response has no access_token".into()))
    }
}
