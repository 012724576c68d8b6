use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error};

use super::models::ActionPayload;
use super::{DispatchError, ProviderContext};
use crate::clients::ClientConfig;

pub mod airtable;
pub mod google_calendar;
pub mod google_sheets;
pub mod hubspot;
pub mod pipedrive;

/// A downstream system a booking can be forwarded to.
/// Each implementation owns its credential lookup and request shape.
#[async_trait]
pub trait ProviderHandler: Send + Sync {
    /// Registry key: the normalized CRM type (see `normalize_crm_type`).
    fn key(&self) -> &'static str;

    /// Label reported back in the result envelope.
    fn display_name(&self) -> &'static str;

    /// Forwards one booking and returns the provider's JSON response.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Shared HTTP client and injected settings.
    /// * `config` - The resolved client the booking belongs to.
    /// * `payload` - The booking as received.
    async fn book(
        &self,
        ctx: &ProviderContext,
        config: &ClientConfig,
        payload: &ActionPayload,
    ) -> Result<Value, DispatchError>;
}

/// Every provider the relay ships with.
pub fn builtin() -> Vec<Arc<dyn ProviderHandler>> {
    vec![
        Arc::new(google_sheets::GoogleSheetsProvider),
        Arc::new(hubspot::HubSpotProvider),
        Arc::new(pipedrive::PipedriveProvider),
        Arc::new(airtable::AirtableProvider),
        Arc::new(google_calendar::GoogleCalendarProvider),
    ]
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// Sends the request and decodes a JSON body. Non-2xx, transport and decode failures
/// all become `DispatchError::Provider` carrying the upstream message as is.
pub(crate) async fn send_json(
    provider: &str,
    request: RequestBuilder,
) -> Result<Value, DispatchError> {
    let response = request.send().await.map_err(|e| {
        error!(provider, error = %e, "Provider request failed");
        DispatchError::Provider(e.to_string())
    })?;

    let status = response.status();
    let body = response.text().await.map_err(|e| {
        error!(provider, status = %status, error = %e, "Failed to read provider response");
        DispatchError::Provider(e.to_string())
    })?;

    if !status.is_success() {
        let message = upstream_message(&body);
        error!(provider, status = %status, error = %message, "Provider returned an error");
        return Err(DispatchError::Provider(message));
    }

    debug!(provider, status = %status, "Provider call succeeded");
    if body.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(&body).map_err(|e| {
        error!(provider, status = %status, error = %e, "Provider returned invalid JSON");
        DispatchError::Provider(e.to_string())
    })
}

// Providers disagree on where the message lives; fall back to the raw body.
fn upstream_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.to_string();
    };
    let candidates = [
        value.pointer("/error/message"),
        value.get("message"),
        value.get("error"),
    ];
    candidates
        .into_iter()
        .flatten()
        .find_map(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}
