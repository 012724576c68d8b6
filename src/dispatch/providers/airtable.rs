use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::{ProviderHandler, join_url, send_json};
use crate::clients::ClientConfig;
use crate::dispatch::credentials;
use crate::dispatch::models::ActionPayload;
use crate::dispatch::{DispatchError, ProviderContext};

const CONTACTS_TABLE: &str = "Contacts";

/// Appends a record to the client's Airtable `Contacts` table.
pub struct AirtableProvider;

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ContactFields<'a> {
    name: &'a str,
    email: &'a str,
    phone: &'a str,
}

#[derive(Serialize)]
struct CreateRecord<'a> {
    fields: ContactFields<'a>,
}

#[async_trait]
impl ProviderHandler for AirtableProvider {
    fn key(&self) -> &'static str {
        "airtable"
    }

    fn display_name(&self) -> &'static str {
        "Airtable"
    }

    async fn book(
        &self,
        ctx: &ProviderContext,
        config: &ClientConfig,
        payload: &ActionPayload,
    ) -> Result<Value, DispatchError> {
        let creds = credentials::airtable_credentials(config)?;
        let url = join_url(
            &ctx.settings.endpoints.airtable_base_url,
            &format!("/v0/{}/{}", urlencoding::encode(&creds.base_id), CONTACTS_TABLE),
        );

        let body = CreateRecord {
            fields: ContactFields {
                name: payload.name(),
                email: payload.email(),
                phone: payload.phone(),
            },
        };
        let request = ctx.client.post(url).bearer_auth(creds.api_key).json(&body);
        send_json(self.display_name(), request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_are_pascal_case() {
        let body = CreateRecord {
            fields: ContactFields {
                name: "Anna",
                email: "anna@example.com",
                phone: "+46700000000",
            },
        };
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            serde_json::json!({
                "fields": { "Name": "Anna", "Email": "anna@example.com", "Phone": "+46700000000" }
            })
        );
    }
}
