//! Dispatch core: picks the downstream integration for a client, resolves its
//! credentials and forwards the booking.

use chrono::NaiveDate;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::clients::{ClientConfig, ResolveError};
use crate::server::config::{DEFAULT_BOOKINGS_SHEET, DEFAULT_TIME_ZONE, Endpoints};

pub mod availability;
pub mod credentials;
pub mod models;
pub mod providers;

use availability::{AvailabilityEngine, FixedSlotAvailability};
use models::{Action, ActionPayload, ActionRequest, ResultEnvelope};
use providers::ProviderHandler;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("{0}")]
    Validation(String),
    #[error("No client found with key: {0}")]
    NotFound(String),
    #[error("No data found in client table")]
    EmptyStore,
    #[error("Action '{0}' is not supported. Use 'check_availability' or 'book_appointment'")]
    UnsupportedAction(String),
    #[error("CRM type '{0}' is not supported for booking appointments")]
    UnsupportedProvider(String),
    #[error("{0}")]
    Credential(String),
    #[error("{0}")]
    Provider(String),
    #[error("{0}")]
    Store(String),
}

impl DispatchError {
    /// Stable tag reported in the `error` field of a failure envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::Validation(_) => "ValidationError",
            DispatchError::NotFound(_) => "NotFound",
            DispatchError::EmptyStore => "EmptyStore",
            DispatchError::UnsupportedAction(_) => "UnsupportedAction",
            DispatchError::UnsupportedProvider(_) => "UnsupportedProvider",
            DispatchError::Credential(_) => "CredentialError",
            DispatchError::Provider(_) => "ProviderError",
            DispatchError::Store(_) => "StoreError",
        }
    }
}

impl From<ResolveError> for DispatchError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::EmptyKey => DispatchError::Validation(err.to_string()),
            ResolveError::EmptyStore => DispatchError::EmptyStore,
            ResolveError::NotFound(key) => DispatchError::NotFound(key),
            ResolveError::KeyColumnMissing(_) | ResolveError::Store(_) => {
                DispatchError::Store(err.to_string())
            }
        }
    }
}

/// Injected settings the provider handlers read. Holds no per-client data.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub endpoints: Endpoints,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub default_time_zone: String,
    pub bookings_sheet_name: String,
    /// Spreadsheet used for Google Sheets bookings when a client has no calendar id.
    pub fallback_spreadsheet_id: Option<String>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            google_client_id: None,
            google_client_secret: None,
            default_time_zone: DEFAULT_TIME_ZONE.to_string(),
            bookings_sheet_name: DEFAULT_BOOKINGS_SHEET.to_string(),
            fallback_spreadsheet_id: None,
        }
    }
}

/// What a handler gets to work with besides the client and payload.
pub struct ProviderContext {
    pub client: Client,
    pub settings: ProviderSettings,
}

/// Strips all whitespace and lowercases, so "Google Calendar" and "googlecalendar" match.
pub fn normalize_crm_type(crm_type: &str) -> String {
    crm_type
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

pub struct DispatchCore {
    providers: HashMap<&'static str, Arc<dyn ProviderHandler>>,
    availability: Arc<dyn AvailabilityEngine>,
    context: ProviderContext,
}

impl DispatchCore {
    /// A core with every built-in provider registered and the fixed-slot availability stub.
    pub fn new(client: Client, settings: ProviderSettings) -> Self {
        let mut core = Self {
            providers: HashMap::new(),
            availability: Arc::new(FixedSlotAvailability),
            context: ProviderContext { client, settings },
        };
        for handler in providers::builtin() {
            core.register(handler);
        }
        core
    }

    pub fn register(&mut self, handler: Arc<dyn ProviderHandler>) {
        self.providers.insert(handler.key(), handler);
    }

    pub fn with_availability(mut self, engine: Arc<dyn AvailabilityEngine>) -> Self {
        self.availability = engine;
        self
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.providers.values().map(|p| p.display_name()).collect();
        names.sort_unstable();
        names
    }

    pub async fn dispatch(
        &self,
        config: &ClientConfig,
        request: &ActionRequest,
    ) -> Result<ResultEnvelope, DispatchError> {
        match request.action {
            Action::CheckAvailability => self.check_availability(config, request.payload.as_ref()).await,
            Action::BookAppointment => {
                let payload = request.payload.as_ref().ok_or_else(|| {
                    DispatchError::Validation(
                        "Missing payload for book_appointment action".to_string(),
                    )
                })?;
                self.book_appointment(config, payload).await
            }
        }
    }

    async fn check_availability(
        &self,
        config: &ClientConfig,
        payload: Option<&ActionPayload>,
    ) -> Result<ResultEnvelope, DispatchError> {
        let raw_date = payload
            .and_then(|p| p.date.as_deref())
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or_else(|| DispatchError::Validation("Missing date in payload".to_string()))?;
        let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").map_err(|e| {
            DispatchError::Validation(format!("Invalid date '{raw_date}', expected YYYY-MM-DD: {e}"))
        })?;

        let slots = self.availability.available_slots(date, config).await;
        debug!(%date, slots = slots.len(), "Availability computed");

        let message = format!(
            "Found {} available slots for {} on {}",
            slots.len(),
            config.company_name,
            raw_date
        );
        let result = serde_json::json!({
            "date": raw_date,
            "availableSlots": slots,
            "client": {
                "companyName": config.company_name,
                "crmType": config.crm_type,
                "phoneNumber": config.client_key,
                "services": config.services,
                "openingHours": config.opening_hours,
                "bookingRules": config.booking_rules,
            },
        });

        Ok(ResultEnvelope::success(
            Action::CheckAvailability,
            config.crm_type.clone(),
            config.company_name.clone(),
            result,
        )
        .with_message(message))
    }

    async fn book_appointment(
        &self,
        config: &ClientConfig,
        payload: &ActionPayload,
    ) -> Result<ResultEnvelope, DispatchError> {
        let key = normalize_crm_type(&config.crm_type);
        let handler = self
            .providers
            .get(key.as_str())
            .ok_or_else(|| DispatchError::UnsupportedProvider(config.crm_type.clone()))?;

        info!(
            provider = handler.display_name(),
            company = %config.company_name,
            "Dispatching booking"
        );
        let result = handler.book(&self.context, config, payload).await?;

        Ok(ResultEnvelope::success(
            Action::BookAppointment,
            handler.display_name(),
            config.company_name.clone(),
            result,
        ))
    }
}
