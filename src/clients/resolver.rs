use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use super::store::{ClientStore, StoreError};
use super::ClientRecord;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Client key must not be empty")]
    EmptyKey,
    #[error("No data found in client table")]
    EmptyStore,
    #[error("No client found with key: {0}")]
    NotFound(String),
    #[error("Client table has no phone or '{0}' column")]
    KeyColumnMissing(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Looks clients up by phone number or id.
///
/// Every call re-reads the whole table; there is no cache.
pub struct ClientResolver {
    store: Arc<dyn ClientStore>,
    key_column_token: String,
}

impl ClientResolver {
    pub fn new(store: Arc<dyn ClientStore>, key_column_token: impl Into<String>) -> Self {
        Self {
            store,
            key_column_token: key_column_token.into().to_lowercase(),
        }
    }

    pub async fn resolve(&self, client_key: &str) -> Result<ClientRecord, ResolveError> {
        if client_key.trim().is_empty() {
            return Err(ResolveError::EmptyKey);
        }

        let rows = self.store.fetch_rows().await?;
        let Some((headers, data_rows)) = rows.split_first() else {
            return Err(ResolveError::EmptyStore);
        };
        if data_rows.is_empty() {
            return Err(ResolveError::EmptyStore);
        }

        let key_index = self
            .key_column_index(headers)
            .ok_or_else(|| ResolveError::KeyColumnMissing(self.key_column_token.clone()))?;
        debug!(column = %headers[key_index], "Resolved key column");

        let (offset, row) = data_rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.get(key_index).map(String::as_str) == Some(client_key))
            .ok_or_else(|| ResolveError::NotFound(client_key.to_string()))?;

        let fields: HashMap<String, String> = headers
            .iter()
            .enumerate()
            .map(|(i, header)| (header.clone(), row.get(i).cloned().unwrap_or_default()))
            .collect();

        // +2: one for the header row, one for 1-based numbering.
        let row_number = offset + 2;
        info!(row = row_number, "Client record found");

        Ok(ClientRecord {
            key: client_key.to_string(),
            row_number,
            fields,
        })
    }

    fn key_column_index(&self, headers: &[String]) -> Option<usize> {
        headers.iter().position(|header| {
            let label = header.to_lowercase();
            label.contains("phone")
                || (!self.key_column_token.is_empty() && label.contains(&self.key_column_token))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::StaticClientStore;

    fn resolver(rows: &[&[&str]]) -> ClientResolver {
        ClientResolver::new(Arc::new(StaticClientStore::from_strs(rows)), "twilio")
    }

    #[tokio::test]
    async fn test_resolve_maps_full_row_to_headers() {
        let resolver = resolver(&[
            &["Client Phone", "Company Name", "CRM Connected"],
            &["+46711111111", "First AB", "HubSpot"],
            &["+46700000000", "Salon Nova", "Pipedrive"],
        ]);

        let record = resolver.resolve("+46700000000").await.unwrap();
        assert_eq!(record.row_number, 3);
        assert_eq!(record.get("Client Phone"), "+46700000000");
        assert_eq!(record.get("Company Name"), "Salon Nova");
        assert_eq!(record.get("CRM Connected"), "Pipedrive");
        assert_eq!(record.fields.len(), 3);
    }

    #[tokio::test]
    async fn test_resolve_unknown_key_is_not_found() {
        let resolver = resolver(&[&["Client Phone"], &["+46711111111"]]);
        let err = resolver.resolve("+46799999999").await.unwrap_err();
        assert!(matches!(err, ResolveError::NotFound(ref k) if k == "+46799999999"));
    }

    #[tokio::test]
    async fn test_resolve_empty_table() {
        let err = resolver(&[]).resolve("+46700000000").await.unwrap_err();
        assert!(matches!(err, ResolveError::EmptyStore));

        let err = resolver(&[&["Client Phone"]]).resolve("+46700000000").await.unwrap_err();
        assert!(matches!(err, ResolveError::EmptyStore));
    }

    #[tokio::test]
    async fn test_key_column_found_by_configured_token() {
        let resolver = resolver(&[
            &["Client ID", "Company Name", "TWILIO Number"],
            &["c-1", "Salon Nova", "+46700000000"],
        ]);
        let record = resolver.resolve("+46700000000").await.unwrap();
        assert_eq!(record.get("Client ID"), "c-1");
    }

    #[tokio::test]
    async fn test_short_rows_pad_with_empty_cells() {
        let resolver = resolver(&[
            &["Client Phone", "Company Name", "Services"],
            &["+46700000000"],
        ]);
        let record = resolver.resolve("+46700000000").await.unwrap();
        assert_eq!(record.get("Services"), "");
        assert_eq!(record.fields.len(), 3);
    }

    #[tokio::test]
    async fn test_missing_key_column() {
        let resolver = resolver(&[&["Client ID", "Company Name"], &["c-1", "Salon Nova"]]);
        let err = resolver.resolve("c-1").await.unwrap_err();
        assert!(matches!(err, ResolveError::KeyColumnMissing(_)));
    }

    #[tokio::test]
    async fn test_empty_key_rejected() {
        let err = resolver(&[&["Client Phone"], &["+4670"]]).resolve("  ").await.unwrap_err();
        assert!(matches!(err, ResolveError::EmptyKey));
    }
}
