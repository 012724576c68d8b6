use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::clients::{ClientConfig, non_empty};
use crate::dispatch::DispatchError;
use crate::dispatch::models::{Action, ActionPayload, ActionRequest, ResultEnvelope};
use crate::web::{AppError, AppState};

// --- Request Structs ---

/// Body of `POST /crm-action`. `phone_number` selects resolver mode; otherwise the
/// caller supplies the CRM type and credentials directly.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CrmActionRequest {
    pub action: String,
    pub payload: Option<ActionPayload>,
    pub phone_number: Option<String>,
    pub crm_type: Option<String>,
    pub crm_api_key: Option<String>,
    pub calendar_id: Option<String>,
    pub client_id: Option<String>,
    pub company: Option<String>,
    pub hubspot_api_key: Option<String>,
    pub pipedrive_api_token: Option<String>,
    pub airtable_api_key: Option<String>,
    pub airtable_base_id: Option<String>,
    pub google_calendar_client_id: Option<String>,
    pub google_calendar_client_secret: Option<String>,
    pub google_calendar_refresh_token: Option<String>,
}

impl CrmActionRequest {
    fn resolver_key(&self) -> Option<String> {
        self.phone_number.as_deref().and_then(non_empty)
    }

    fn direct_config(&self) -> Result<ClientConfig, DispatchError> {
        let crm_type = self
            .crm_type
            .as_deref()
            .and_then(non_empty)
            .ok_or_else(|| DispatchError::Validation("Missing crmType".to_string()))?;
        let opt = |v: &Option<String>| v.as_deref().and_then(non_empty);

        Ok(ClientConfig {
            client_key: String::new(),
            client_id: self.client_id.clone().unwrap_or_default(),
            company_name: self.company.clone().unwrap_or_default(),
            calendar_id: self.calendar_id.clone().unwrap_or_default(),
            crm_type,
            crm_api_key: self.crm_api_key.clone().unwrap_or_default(),
            hubspot_api_key: opt(&self.hubspot_api_key),
            pipedrive_api_token: opt(&self.pipedrive_api_token),
            airtable_api_key: opt(&self.airtable_api_key),
            airtable_base_id: opt(&self.airtable_base_id),
            google_calendar_client_id: opt(&self.google_calendar_client_id),
            google_calendar_client_secret: opt(&self.google_calendar_client_secret),
            google_calendar_refresh_token: opt(&self.google_calendar_refresh_token),
            ..Default::default()
        })
    }
}

// --- Route Handlers ---

async fn crm_action_handler(
    State(app_state): State<Arc<AppState>>,
    body: Result<Json<CrmActionRequest>, JsonRejection>,
) -> Result<Json<ResultEnvelope>, AppError> {
    let request_id = Uuid::new_v4();
    let span = info_span!("crm_action", %request_id);
    handle_crm_action(app_state, body).instrument(span).await
}

async fn handle_crm_action(
    app_state: Arc<AppState>,
    body: Result<Json<CrmActionRequest>, JsonRejection>,
) -> Result<Json<ResultEnvelope>, AppError> {
    let Json(body) = body?;
    let action: Action = body
        .action
        .parse()
        .map_err(|e: DispatchError| AppError::from(e).with_action(&body.action))?;

    let config = match body.resolver_key() {
        Some(key) => {
            let resolver = app_state.resolver.as_ref().ok_or_else(|| {
                AppError::from(DispatchError::Store(
                    "Client lookup is not configured".to_string(),
                ))
                .with_action(action.as_str())
            })?;
            let record = resolver
                .resolve(&key)
                .await
                .map_err(|e| AppError::from(e).with_action(action.as_str()))?;
            info!(row = record.row_number, "Client resolved");
            record.to_config()
        }
        None => body
            .direct_config()
            .map_err(|e| AppError::from(e).with_action(action.as_str()))?,
    };

    let request = ActionRequest::new(action, body.payload);
    match app_state.dispatch.dispatch(&config, &request).await {
        Ok(envelope) => {
            info!(%action, crm_type = %config.crm_type, "CRM action completed");
            Ok(Json(envelope))
        }
        Err(e) => {
            warn!(%action, crm_type = %config.crm_type, error = %e, "CRM action failed");
            Err(AppError::from(e)
                .with_action(action.as_str())
                .with_client(&config.crm_type, &config.company_name))
        }
    }
}

pub fn crm_action_router() -> Router<Arc<AppState>> {
    Router::new().route("/crm-action", post(crm_action_handler))
}
