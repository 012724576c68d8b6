use reqwest::Client;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::clients::service_account::{ServiceAccountAuth, ServiceAccountKey};
use crate::clients::{ClientResolver, ClientStore, SheetsClientStore};
use crate::dispatch::DispatchCore;
use crate::server::config::RelayConfig;
use crate::web::AppState;

/// Builds the client table store, or `None` when the relay runs in direct mode only.
///
/// Both a backing store id and a service account key are needed; a configured key
/// path that cannot be read is a startup error.
pub fn build_client_store(
    config: &RelayConfig,
    client: &Client,
) -> Result<Option<Arc<dyn ClientStore>>, String> {
    let (Some(store_id), Some(key_path)) = (
        config.backing_store_id.as_deref(),
        config.service_account_key_path.as_deref(),
    ) else {
        if config.backing_store_id.is_some() {
            warn!("backing_store_id is set but service_account_key_path is not; client lookup disabled");
        }
        return Ok(None);
    };

    let key = ServiceAccountKey::from_file(Path::new(key_path)).map_err(|e| e.to_string())?;
    info!(
        client_email = %key.client_email,
        sheet = %config.sheet_range_name,
        "Client table backed by Google Sheets"
    );
    let store = SheetsClientStore::new(
        client.clone(),
        config.endpoints.sheets_base_url.clone(),
        store_id,
        config.sheet_range_name.clone(),
        ServiceAccountAuth::new(key),
    );
    Ok(Some(Arc::new(store)))
}

/// Wires the dispatch core and optional resolver around one shared HTTP client.
pub fn build_app_state(
    config: &RelayConfig,
    client: Client,
    store: Option<Arc<dyn ClientStore>>,
) -> AppState {
    let dispatch = DispatchCore::new(client, config.provider_settings());
    info!(providers = ?dispatch.provider_names(), "Dispatch core ready");

    let resolver = store
        .map(|store| Arc::new(ClientResolver::new(store, config.key_column_token.clone())));

    AppState {
        dispatch: Arc::new(dispatch),
        resolver,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(toml: &str) -> RelayConfig {
        RelayConfig::from_toml_with_env(toml, |_| None).unwrap()
    }

    #[test]
    fn test_no_store_without_backing_id() {
        let store = build_client_store(&config(""), &Client::new()).unwrap();
        assert!(store.is_none());
    }

    #[test]
    fn test_missing_key_file_is_startup_error() {
        let config = config(
            r#"
            backing_store_id = "sheet-1"
            service_account_key_path = "/nonexistent/service-account.json"
            "#,
        );
        assert!(build_client_store(&config, &Client::new()).is_err());
    }

    #[test]
    fn test_store_built_from_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("service-account.json");
        std::fs::write(
            &key_path,
            r#"{"client_email":"relay@project.iam.gserviceaccount.com","private_key":"pem"}"#,
        )
        .unwrap();

        let config = config(&format!(
            "backing_store_id = \"sheet-1\"\nservice_account_key_path = {:?}\n",
            key_path.display().to_string()
        ));
        assert!(build_client_store(&config, &Client::new()).unwrap().is_some());
    }

    #[test]
    fn test_app_state_without_store_has_no_resolver() {
        let state = build_app_state(&config(""), Client::new(), None);
        assert!(state.resolver.is_none());
        assert_eq!(state.dispatch.provider_names().len(), 5);
    }
}
