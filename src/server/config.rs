use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

use crate::dispatch::ProviderSettings;

pub const DEFAULT_TIME_ZONE: &str = "Europe/Stockholm";
pub const DEFAULT_BOOKINGS_SHEET: &str = "Bookings";

/// Base URLs of every outbound integration. Overridable so tests can point at a mock server.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Endpoints {
    pub sheets_base_url: String,
    pub hubspot_base_url: String,
    pub pipedrive_base_url: String,
    pub airtable_base_url: String,
    pub calendar_base_url: String,
    pub google_token_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            sheets_base_url: "https://sheets.googleapis.com".to_string(),
            hubspot_base_url: "https://api.hubapi.com".to_string(),
            pipedrive_base_url: "https://api.pipedrive.com".to_string(),
            airtable_base_url: "https://api.airtable.com".to_string(),
            calendar_base_url: "https://www.googleapis.com".to_string(),
            google_token_url: crate::services::google_oauth::GOOGLE_TOKEN_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Points every integration at the same host.
    pub fn all(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            sheets_base_url: base.to_string(),
            hubspot_base_url: base.to_string(),
            pipedrive_base_url: base.to_string(),
            airtable_base_url: base.to_string(),
            calendar_base_url: base.to_string(),
            google_token_url: format!("{base}/token"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub listen_addr: String,
    pub log_dir: String,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    /// Spreadsheet holding the client table.
    pub backing_store_id: Option<String>,
    pub sheet_range_name: String,
    pub default_time_zone: String,
    pub key_column_token: String,
    pub bookings_sheet_name: String,
    pub service_account_key_path: Option<String>,
    pub endpoints: Endpoints,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialRelayConfig {
    listen_addr: Option<String>,
    log_dir: Option<String>,
    google_client_id: Option<String>,
    google_client_secret: Option<String>,
    backing_store_id: Option<String>,
    sheet_range_name: Option<String>,
    default_time_zone: Option<String>,
    key_column_token: Option<String>,
    bookings_sheet_name: Option<String>,
    service_account_key_path: Option<String>,
    #[serde(default)]
    endpoints: Endpoints,
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn default_sheet_range_name() -> String {
    "Sheet1".to_string()
}

fn default_key_column_token() -> String {
    "twilio".to_string()
}

impl RelayConfig {
    /// File, then `.env`, then process environment. Environment wins.
    pub fn load(config_path: Option<&str>) -> Result<Self, String> {
        dotenv::dotenv().ok();
        let file_config = read_file_config(config_path)?;
        Ok(Self::merge(file_config, |key| env::var(key).ok()))
    }

    /// Parses TOML config text and layers the given variable lookup on top.
    pub fn from_toml_with_env<F>(contents: &str, lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file_config: PartialRelayConfig =
            toml::from_str(contents).map_err(|e| format!("Failed to parse TOML config: {e}"))?;
        Ok(Self::merge(file_config, lookup))
    }

    fn merge<F>(file: PartialRelayConfig, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let listen_addr = var("LISTEN_ADDR")
            .or_else(|| var("PORT").map(|port| format!("0.0.0.0:{port}")))
            .or(file.listen_addr)
            .unwrap_or_else(default_listen_addr);

        let mut endpoints = file.endpoints;
        let overrides = [
            ("SHEETS_BASE_URL", &mut endpoints.sheets_base_url),
            ("HUBSPOT_BASE_URL", &mut endpoints.hubspot_base_url),
            ("PIPEDRIVE_BASE_URL", &mut endpoints.pipedrive_base_url),
            ("AIRTABLE_BASE_URL", &mut endpoints.airtable_base_url),
            ("CALENDAR_BASE_URL", &mut endpoints.calendar_base_url),
            ("GOOGLE_TOKEN_URL", &mut endpoints.google_token_url),
        ];
        for (key, slot) in overrides {
            if let Some(value) = var(key) {
                *slot = value;
            }
        }

        RelayConfig {
            listen_addr,
            log_dir: var("LOG_DIR")
                .or(file.log_dir)
                .unwrap_or_else(default_log_dir),
            google_client_id: var("GOOGLE_CLIENT_ID").or(file.google_client_id),
            google_client_secret: var("GOOGLE_CLIENT_SECRET").or(file.google_client_secret),
            backing_store_id: var("BACKING_STORE_ID").or(file.backing_store_id),
            sheet_range_name: var("SHEET_RANGE_NAME")
                .or(file.sheet_range_name)
                .unwrap_or_else(default_sheet_range_name),
            default_time_zone: var("DEFAULT_TIME_ZONE")
                .or(file.default_time_zone)
                .unwrap_or_else(|| DEFAULT_TIME_ZONE.to_string()),
            key_column_token: var("KEY_COLUMN_TOKEN")
                .or(file.key_column_token)
                .unwrap_or_else(default_key_column_token),
            bookings_sheet_name: var("BOOKINGS_SHEET_NAME")
                .or(file.bookings_sheet_name)
                .unwrap_or_else(|| DEFAULT_BOOKINGS_SHEET.to_string()),
            service_account_key_path: var("SERVICE_ACCOUNT_KEY_PATH")
                .or(file.service_account_key_path),
            endpoints,
        }
    }

    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            endpoints: self.endpoints.clone(),
            google_client_id: self.google_client_id.clone(),
            google_client_secret: self.google_client_secret.clone(),
            default_time_zone: self.default_time_zone.clone(),
            bookings_sheet_name: self.bookings_sheet_name.clone(),
            fallback_spreadsheet_id: self.backing_store_id.clone(),
        }
    }
}

fn read_file_config(config_path: Option<&str>) -> Result<PartialRelayConfig, String> {
    let Some(path_str) = config_path else {
        return Ok(PartialRelayConfig::default());
    };
    let path = Path::new(path_str);
    if !path.exists() {
        return Ok(PartialRelayConfig::default());
    }
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file at {path:?}: {e}"))?;
    toml::from_str(&contents)
        .map_err(|e| format!("Failed to parse TOML from config file at {path:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = RelayConfig::from_toml_with_env("", env_of(&[])).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:3000");
        assert_eq!(config.log_dir, "logs");
        assert_eq!(config.sheet_range_name, "Sheet1");
        assert_eq!(config.default_time_zone, "Europe/Stockholm");
        assert_eq!(config.key_column_token, "twilio");
        assert_eq!(config.bookings_sheet_name, "Bookings");
        assert!(config.google_client_id.is_none());
        assert!(config.backing_store_id.is_none());
        assert_eq!(config.endpoints, Endpoints::default());
    }

    #[test]
    fn test_env_overrides_file() {
        let toml = r#"
            google_client_id = "file-id"
            backing_store_id = "file-sheet"
            default_time_zone = "Europe/Oslo"

            [endpoints]
            hubspot_base_url = "http://hubspot.local"
        "#;
        let config = RelayConfig::from_toml_with_env(
            toml,
            env_of(&[
                ("GOOGLE_CLIENT_ID", "env-id"),
                ("PIPEDRIVE_BASE_URL", "http://pipedrive.local"),
            ]),
        )
        .unwrap();
        assert_eq!(config.google_client_id.as_deref(), Some("env-id"));
        assert_eq!(config.backing_store_id.as_deref(), Some("file-sheet"));
        assert_eq!(config.default_time_zone, "Europe/Oslo");
        assert_eq!(config.endpoints.hubspot_base_url, "http://hubspot.local");
        assert_eq!(config.endpoints.pipedrive_base_url, "http://pipedrive.local");
        assert_eq!(config.endpoints.airtable_base_url, "https://api.airtable.com");
    }

    #[test]
    fn test_port_sets_listen_addr() {
        let config = RelayConfig::from_toml_with_env("", env_of(&[("PORT", "8080")])).unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8080");

        let config = RelayConfig::from_toml_with_env(
            "",
            env_of(&[("PORT", "8080"), ("LISTEN_ADDR", "127.0.0.1:9000")]),
        )
        .unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:9000");
    }

    #[test]
    fn test_blank_env_value_is_ignored() {
        let config = RelayConfig::from_toml_with_env(
            r#"google_client_secret = "from-file""#,
            env_of(&[("GOOGLE_CLIENT_SECRET", "  ")]),
        )
        .unwrap();
        assert_eq!(config.google_client_secret.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        assert!(RelayConfig::from_toml_with_env("listen_addr = ", env_of(&[])).is_err());
    }

    #[test]
    fn test_provider_settings_carry_backing_store_as_fallback() {
        let config = RelayConfig::from_toml_with_env(
            r#"backing_store_id = "sheet-1""#,
            env_of(&[]),
        )
        .unwrap();
        let settings = config.provider_settings();
        assert_eq!(settings.fallback_spreadsheet_id.as_deref(), Some("sheet-1"));
        assert_eq!(settings.bookings_sheet_name, "Bookings");
    }

    #[test]
    fn test_file_config_is_read_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        std::fs::write(&path, "sheet_range_name = \"Clients\"\n").unwrap();

        let file = read_file_config(path.to_str()).unwrap();
        assert_eq!(file.sheet_range_name.as_deref(), Some("Clients"));

        let missing = dir.path().join("absent.toml");
        assert!(read_file_config(missing.to_str()).unwrap().sheet_range_name.is_none());
        assert!(read_file_config(None).unwrap().listen_addr.is_none());
    }

    #[test]
    fn test_endpoints_all_share_host() {
        let endpoints = Endpoints::all("http://127.0.0.1:9999/");
        assert_eq!(endpoints.hubspot_base_url, "http://127.0.0.1:9999");
        assert_eq!(endpoints.google_token_url, "http://127.0.0.1:9999/token");
    }
}
