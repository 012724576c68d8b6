//! Google service-account authentication for the client table.
//!
//! Mints a short-lived access token by signing an RS256 JWT assertion with the
//! service account's private key and exchanging it at the token endpoint.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

#[derive(Error, Debug)]
pub enum ServiceAccountError {
    #[error("Failed to read service account key at {path}: {message}")]
    KeyFile { path: String, message: String },
    #[error("Invalid service account key: {0}")]
    InvalidKey(String),
    #[error("Failed to sign assertion: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Token endpoint rejected assertion: {0}")]
    Rejected(String),
}

/// The subset of a downloaded service-account JSON key we need.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self, ServiceAccountError> {
        let contents = fs::read_to_string(path).map_err(|e| ServiceAccountError::KeyFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, ServiceAccountError> {
        serde_json::from_str(json).map_err(|e| ServiceAccountError::InvalidKey(e.to_string()))
    }

    pub fn token_uri(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

pub struct ServiceAccountAuth {
    key: ServiceAccountKey,
    scope: String,
}

impl ServiceAccountAuth {
    pub fn new(key: ServiceAccountKey) -> Self {
        Self {
            key,
            scope: SHEETS_SCOPE.to_string(),
        }
    }

    fn assertion(&self) -> Result<String, ServiceAccountError> {
        let now = Utc::now();
        let claims = AssertionClaims {
            iss: self.key.client_email.clone(),
            scope: self.scope.clone(),
            aud: self.key.token_uri().to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(ASSERTION_LIFETIME_SECS)).timestamp(),
        };
        let encoding_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())?;
        Ok(encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)?)
    }

    /// Exchanges a freshly signed assertion for an access token.
    pub async fn access_token(&self, client: &Client) -> Result<String, ServiceAccountError> {
        let assertion = self.assertion()?;
        debug!(client_email = %self.key.client_email, "Requesting service account token");

        let response = client
            .post(self.key.token_uri())
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body: TokenResponse = response.json().await?;
        if !status.is_success() {
            let message = body
                .error_description
                .or(body.error)
                .unwrap_or_else(|| format!("HTTP {status}"));
            return Err(ServiceAccountError::Rejected(message));
        }

        body.access_token
            .ok_or_else(|| ServiceAccountError::Rejected("Missing access_token in response".to_string()))
    }
}
