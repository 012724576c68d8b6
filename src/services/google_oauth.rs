// src/services/google_oauth.rs

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info};

pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

#[derive(Error, Debug)]
pub enum OAuthError {
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error("{0}")]
    Rejected(String),
    #[error("Missing access_token in token response")]
    MissingAccessToken,
}

#[derive(Deserialize, Debug)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

/// Client credentials plus refresh token for one Google Calendar tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleRefreshCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

/// Exchanges a refresh token for a fresh access token. Stateless; nothing is cached.
pub async fn refresh_access_token(
    client: &Client,
    token_url: &str,
    credentials: &GoogleRefreshCredentials,
) -> Result<String, OAuthError> {
    let params = [
        ("client_id", credentials.client_id.as_str()),
        ("client_secret", credentials.client_secret.as_str()),
        ("refresh_token", credentials.refresh_token.as_str()),
        ("grant_type", "refresh_token"),
    ];

    info!("Refreshing Google access token");
    let response = client.post(token_url).form(&params).send().await?;
    let status = response.status();
    let body: TokenResponse = response.json().await?;

    if !status.is_success() {
        let message = body
            .error
            .unwrap_or_else(|| "Failed to refresh token".to_string());
        error!(status = %status, error = %message, "Token refresh rejected");
        return Err(OAuthError::Rejected(message));
    }

    body.access_token.ok_or(OAuthError::MissingAccessToken)
}
