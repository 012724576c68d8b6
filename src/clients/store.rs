use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error};

use super::service_account::{ServiceAccountAuth, ServiceAccountError};

/// Cell range read on every lookup; matches the sheet's used area.
const TABLE_RANGE: &str = "A1:Z1000";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Backing store authentication failed: {0}")]
    Auth(#[from] ServiceAccountError),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Backing store returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Source of the client table: header row first, then one row per client.
#[async_trait]
pub trait ClientStore: Send + Sync {
    async fn fetch_rows(&self) -> Result<Vec<Vec<String>>, StoreError>;
}

/// Reads the client table from a Google spreadsheet.
pub struct SheetsClientStore {
    client: Client,
    base_url: String,
    spreadsheet_id: String,
    sheet_name: String,
    auth: ServiceAccountAuth,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

impl SheetsClientStore {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
        auth: ServiceAccountAuth,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: sheet_name.into(),
            auth,
        }
    }

    fn values_url(&self) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}!{}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(&self.spreadsheet_id),
            urlencoding::encode(&self.sheet_name),
            TABLE_RANGE
        )
    }
}

#[async_trait]
impl ClientStore for SheetsClientStore {
    async fn fetch_rows(&self) -> Result<Vec<Vec<String>>, StoreError> {
        let token = self.auth.access_token(&self.client).await?;
        let url = self.values_url();
        debug!(spreadsheet_id = %self.spreadsheet_id, sheet = %self.sheet_name, "Reading client table");

        let response = self.client.get(&url).bearer_auth(token).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(status = %status, "Client table read failed");
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let range: ValueRange = response.json().await?;
        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect())
    }
}

// Unformatted reads can yield numbers or booleans; the resolver compares text.
fn cell_to_string(cell: serde_json::Value) -> String {
    match cell {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Fixed in-memory table, for tests and local runs without a spreadsheet.
#[derive(Debug, Clone, Default)]
pub struct StaticClientStore {
    rows: Vec<Vec<String>>,
}

impl StaticClientStore {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn from_strs(rows: &[&[&str]]) -> Self {
        Self::new(
            rows.iter()
                .map(|row| row.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }
}

#[async_trait]
impl ClientStore for StaticClientStore {
    async fn fetch_rows(&self) -> Result<Vec<Vec<String>>, StoreError> {
        Ok(self.rows.clone())
    }
}
