use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod resolver;
pub mod service_account;
pub mod store;

pub use resolver::{ClientResolver, ResolveError};
pub use store::{ClientStore, SheetsClientStore, StaticClientStore, StoreError};

// Column labels of the client table.
pub const COL_CLIENT_ID: &str = "Client ID";
pub const COL_COMPANY_NAME: &str = "Company Name";
pub const COL_CRM_CONNECTED: &str = "CRM Connected";
pub const COL_CALENDAR_ID: &str = "Calendar ID";
pub const COL_SERVICES: &str = "Services";
pub const COL_OPENING_HOURS: &str = "Opening Hours";
pub const COL_BOOKING_RULES: &str = "Booking Rules";
pub const COL_CRM_API_KEY: &str = "CRM API Key / OAuth Token";
pub const COL_HUBSPOT_API_KEY: &str = "HubSpot API Key";
pub const COL_PIPEDRIVE_API_TOKEN: &str = "Pipedrive API Token";
pub const COL_AIRTABLE_API_KEY: &str = "Airtable API Key";
pub const COL_AIRTABLE_BASE_ID: &str = "Airtable Base ID";
pub const COL_GCAL_CLIENT_ID: &str = "Google Calendar Client ID";
pub const COL_GCAL_CLIENT_SECRET: &str = "Google Calendar Client Secret";
pub const COL_GCAL_REFRESH_TOKEN: &str = "Google Calendar Refresh Token";

/// CRM label used when a row leaves `CRM Connected` blank.
pub const DEFAULT_CRM_TYPE: &str = "Google Sheets";

/// Per-tenant configuration consumed by the dispatch core.
///
/// Optional credential fields are `None` when the backing cell is blank, so the
/// fallback to `crm_api_key` can be expressed with `Option` combinators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub client_key: String,
    pub client_id: String,
    pub company_name: String,
    pub calendar_id: String,
    /// Raw label as stored (e.g. "Google Calendar"); normalized at dispatch time.
    pub crm_type: String,
    pub crm_api_key: String,
    pub hubspot_api_key: Option<String>,
    pub pipedrive_api_token: Option<String>,
    pub airtable_api_key: Option<String>,
    pub airtable_base_id: Option<String>,
    pub google_calendar_client_id: Option<String>,
    pub google_calendar_client_secret: Option<String>,
    pub google_calendar_refresh_token: Option<String>,
    pub services: String,
    pub opening_hours: String,
    pub booking_rules: String,
}

/// A row of the client table keyed by header label.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientRecord {
    pub key: String,
    /// 1-based sheet row number (the header is row 1).
    pub row_number: usize,
    pub fields: HashMap<String, String>,
}

impl ClientRecord {
    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map(String::as_str).unwrap_or_default()
    }

    fn optional(&self, column: &str) -> Option<String> {
        non_empty(self.get(column))
    }

    pub fn to_config(&self) -> ClientConfig {
        let crm_type = match self.get(COL_CRM_CONNECTED).trim() {
            "" => DEFAULT_CRM_TYPE.to_string(),
            label => label.to_string(),
        };

        ClientConfig {
            client_key: self.key.clone(),
            client_id: self.get(COL_CLIENT_ID).to_string(),
            company_name: self.get(COL_COMPANY_NAME).to_string(),
            calendar_id: self.get(COL_CALENDAR_ID).to_string(),
            crm_type,
            crm_api_key: self.get(COL_CRM_API_KEY).to_string(),
            hubspot_api_key: self.optional(COL_HUBSPOT_API_KEY),
            pipedrive_api_token: self.optional(COL_PIPEDRIVE_API_TOKEN),
            airtable_api_key: self.optional(COL_AIRTABLE_API_KEY),
            airtable_base_id: self.optional(COL_AIRTABLE_BASE_ID),
            google_calendar_client_id: self.optional(COL_GCAL_CLIENT_ID),
            google_calendar_client_secret: self.optional(COL_GCAL_CLIENT_SECRET),
            google_calendar_refresh_token: self.optional(COL_GCAL_REFRESH_TOKEN),
            services: self.get(COL_SERVICES).to_string(),
            opening_hours: self.get(COL_OPENING_HOURS).to_string(),
            booking_rules: self.get(COL_BOOKING_RULES).to_string(),
        }
    }
}

pub(crate) fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
