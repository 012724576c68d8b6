//! Credential resolution per provider.
//!
//! Provider-specific fields win; otherwise the generic `crm_api_key` is used.
//! Google Calendar additionally accepts `crm_api_key` holding a JSON object with
//! `client_id`, `client_secret` and `refresh_token`.

use serde::Deserialize;

use super::{DispatchError, ProviderSettings};
use crate::clients::{ClientConfig, non_empty};
use crate::services::google_oauth::GoogleRefreshCredentials;

fn override_or_generic(
    specific: Option<&String>,
    generic: &str,
    what: &str,
) -> Result<String, DispatchError> {
    specific
        .and_then(|s| non_empty(s))
        .or_else(|| non_empty(generic))
        .ok_or_else(|| DispatchError::Credential(format!("Missing {what}")))
}

pub fn hubspot_api_key(config: &ClientConfig) -> Result<String, DispatchError> {
    override_or_generic(
        config.hubspot_api_key.as_ref(),
        &config.crm_api_key,
        "HubSpot API key",
    )
}

pub fn pipedrive_api_token(config: &ClientConfig) -> Result<String, DispatchError> {
    override_or_generic(
        config.pipedrive_api_token.as_ref(),
        &config.crm_api_key,
        "Pipedrive API token",
    )
}

pub struct AirtableCredentials {
    pub api_key: String,
    pub base_id: String,
}

pub fn airtable_credentials(config: &ClientConfig) -> Result<AirtableCredentials, DispatchError> {
    let api_key = override_or_generic(
        config.airtable_api_key.as_ref(),
        &config.crm_api_key,
        "Airtable API key",
    )?;
    let base_id = config
        .airtable_base_id
        .as_deref()
        .and_then(non_empty)
        .ok_or_else(|| DispatchError::Credential("Missing Airtable base id".to_string()))?;
    Ok(AirtableCredentials { api_key, base_id })
}

pub struct SheetsTarget {
    pub access_token: String,
    pub spreadsheet_id: String,
}

pub fn sheets_target(
    config: &ClientConfig,
    settings: &ProviderSettings,
) -> Result<SheetsTarget, DispatchError> {
    let access_token = non_empty(&config.crm_api_key)
        .ok_or_else(|| DispatchError::Credential("Missing Google Sheets access token".to_string()))?;
    let spreadsheet_id = non_empty(&config.calendar_id)
        .or_else(|| settings.fallback_spreadsheet_id.as_deref().and_then(non_empty))
        .ok_or_else(|| DispatchError::Credential("Missing spreadsheet id".to_string()))?;
    Ok(SheetsTarget {
        access_token,
        spreadsheet_id,
    })
}

#[derive(Debug, Default, Deserialize)]
struct EmbeddedGoogleCredentials {
    client_id: Option<String>,
    client_secret: Option<String>,
    refresh_token: Option<String>,
}

/// Resolves the refresh-token triple for Google Calendar.
///
/// 1. All three override columns set: use them, `crm_api_key` is not read.
/// 2. Otherwise a non-blank `crm_api_key` must be a JSON credential object;
///    malformed JSON is a credential error.
/// 3. Each field then falls back override -> embedded JSON -> injected client
///    id/secret (refresh token has no injected fallback).
pub fn google_calendar_credentials(
    config: &ClientConfig,
    settings: &ProviderSettings,
) -> Result<GoogleRefreshCredentials, DispatchError> {
    let overrides = (
        config.google_calendar_client_id.as_deref().and_then(non_empty),
        config.google_calendar_client_secret.as_deref().and_then(non_empty),
        config.google_calendar_refresh_token.as_deref().and_then(non_empty),
    );
    if let (Some(client_id), Some(client_secret), Some(refresh_token)) = overrides.clone() {
        return Ok(GoogleRefreshCredentials {
            client_id,
            client_secret,
            refresh_token,
        });
    }

    let embedded = match non_empty(&config.crm_api_key) {
        Some(raw) => serde_json::from_str::<EmbeddedGoogleCredentials>(&raw).map_err(|_| {
            DispatchError::Credential("Invalid Google Calendar credentials format".to_string())
        })?,
        None => EmbeddedGoogleCredentials::default(),
    };

    let (client_id, client_secret, refresh_token) = overrides;
    let client_id = client_id
        .or_else(|| embedded.client_id.as_deref().and_then(non_empty))
        .or_else(|| settings.google_client_id.as_deref().and_then(non_empty))
        .ok_or_else(|| DispatchError::Credential("Missing Google client id".to_string()))?;
    let client_secret = client_secret
        .or_else(|| embedded.client_secret.as_deref().and_then(non_empty))
        .or_else(|| settings.google_client_secret.as_deref().and_then(non_empty))
        .ok_or_else(|| DispatchError::Credential("Missing Google client secret".to_string()))?;
    let refresh_token = refresh_token
        .or_else(|| embedded.refresh_token.as_deref().and_then(non_empty))
        .ok_or_else(|| DispatchError::Credential("Missing Google refresh token".to_string()))?;

    Ok(GoogleRefreshCredentials {
        client_id,
        client_secret,
        refresh_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClientConfig {
        ClientConfig {
            crm_api_key: "generic-key".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_specific_key_wins_over_generic() {
        let mut c = config();
        c.hubspot_api_key = Some("hs-key".to_string());
        c.pipedrive_api_token = Some("pd-token".to_string());
        assert_eq!(hubspot_api_key(&c).unwrap(), "hs-key");
        assert_eq!(pipedrive_api_token(&c).unwrap(), "pd-token");
    }

    #[test]
    fn test_generic_key_used_when_specific_absent() {
        let c = config();
        assert_eq!(hubspot_api_key(&c).unwrap(), "generic-key");
        assert_eq!(pipedrive_api_token(&c).unwrap(), "generic-key");
    }

    #[test]
    fn test_missing_key_is_credential_error() {
        let c = ClientConfig::default();
        assert!(matches!(hubspot_api_key(&c), Err(DispatchError::Credential(_))));
    }

    #[test]
    fn test_airtable_requires_base_id() {
        let mut c = config();
        assert!(matches!(airtable_credentials(&c), Err(DispatchError::Credential(_))));
        c.airtable_base_id = Some("appXYZ".to_string());
        let creds = airtable_credentials(&c).unwrap();
        assert_eq!(creds.api_key, "generic-key");
        assert_eq!(creds.base_id, "appXYZ");
    }

    #[test]
    fn test_sheets_target_falls_back_to_configured_spreadsheet() {
        let c = config();
        let settings = ProviderSettings {
            fallback_spreadsheet_id: Some("backing-sheet".to_string()),
            ..Default::default()
        };
        assert_eq!(sheets_target(&c, &settings).unwrap().spreadsheet_id, "backing-sheet");

        let mut c = config();
        c.calendar_id = "client-sheet".to_string();
        assert_eq!(sheets_target(&c, &settings).unwrap().spreadsheet_id, "client-sheet");

        assert!(sheets_target(&config(), &ProviderSettings::default()).is_err());
    }

    #[test]
    fn test_google_overrides_skip_json_parsing() {
        let c = ClientConfig {
            crm_api_key: "{not json".to_string(),
            google_calendar_client_id: Some("cid".to_string()),
            google_calendar_client_secret: Some("secret".to_string()),
            google_calendar_refresh_token: Some("refresh".to_string()),
            ..Default::default()
        };
        let creds = google_calendar_credentials(&c, &ProviderSettings::default()).unwrap();
        assert_eq!(creds.client_id, "cid");
        assert_eq!(creds.refresh_token, "refresh");
    }

    #[test]
    fn test_google_credentials_from_embedded_json() {
        let c = ClientConfig {
            crm_api_key: r#"{"client_id":"cid","client_secret":"secret","refresh_token":"1//rt"}"#
                .to_string(),
            ..Default::default()
        };
        let creds = google_calendar_credentials(&c, &ProviderSettings::default()).unwrap();
        assert_eq!(
            creds,
            GoogleRefreshCredentials {
                client_id: "cid".to_string(),
                client_secret: "secret".to_string(),
                refresh_token: "1//rt".to_string(),
            }
        );
    }

    #[test]
    fn test_malformed_google_json_is_credential_error() {
        let c = ClientConfig {
            crm_api_key: "{\"client_id\": ".to_string(),
            ..Default::default()
        };
        let err = google_calendar_credentials(&c, &ProviderSettings::default()).unwrap_err();
        assert_eq!(err.kind(), "CredentialError");
    }

    #[test]
    fn test_partial_google_fields_use_injected_client() {
        let settings = ProviderSettings {
            google_client_id: Some("injected-id".to_string()),
            google_client_secret: Some("injected-secret".to_string()),
            ..Default::default()
        };
        let c = ClientConfig {
            crm_api_key: r#"{"refresh_token":"1//rt"}"#.to_string(),
            ..Default::default()
        };
        let creds = google_calendar_credentials(&c, &settings).unwrap();
        assert_eq!(creds.client_id, "injected-id");
        assert_eq!(creds.client_secret, "injected-secret");

        let c = ClientConfig {
            google_calendar_refresh_token: Some("1//override".to_string()),
            ..Default::default()
        };
        let creds = google_calendar_credentials(&c, &settings).unwrap();
        assert_eq!(creds.refresh_token, "1//override");
        assert_eq!(creds.client_id, "injected-id");
    }

    #[test]
    fn test_google_without_refresh_token_fails() {
        let settings = ProviderSettings {
            google_client_id: Some("injected-id".to_string()),
            google_client_secret: Some("injected-secret".to_string()),
            ..Default::default()
        };
        let err = google_calendar_credentials(&ClientConfig::default(), &settings).unwrap_err();
        assert!(matches!(err, DispatchError::Credential(ref m) if m.contains("refresh token")));
    }
}
