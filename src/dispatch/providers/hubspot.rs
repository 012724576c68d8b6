use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::{ProviderHandler, join_url, send_json};
use crate::clients::ClientConfig;
use crate::dispatch::credentials;
use crate::dispatch::models::ActionPayload;
use crate::dispatch::{DispatchError, ProviderContext};

const CONTACTS_PATH: &str = "/crm/v3/objects/contacts";

/// Creates a HubSpot contact for each booking.
pub struct HubSpotProvider;

#[derive(Serialize)]
struct ContactProperties<'a> {
    firstname: &'a str,
    email: &'a str,
    phone: &'a str,
}

#[derive(Serialize)]
struct CreateContact<'a> {
    properties: ContactProperties<'a>,
}

fn contact_body(payload: &ActionPayload) -> CreateContact<'_> {
    CreateContact {
        properties: ContactProperties {
            firstname: payload.name(),
            email: payload.email(),
            phone: payload.phone(),
        },
    }
}

#[async_trait]
impl ProviderHandler for HubSpotProvider {
    fn key(&self) -> &'static str {
        "hubspot"
    }

    fn display_name(&self) -> &'static str {
        "HubSpot"
    }

    async fn book(
        &self,
        ctx: &ProviderContext,
        config: &ClientConfig,
        payload: &ActionPayload,
    ) -> Result<Value, DispatchError> {
        let api_key = credentials::hubspot_api_key(config)?;
        let url = join_url(&ctx.settings.endpoints.hubspot_base_url, CONTACTS_PATH);

        let request = ctx
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(&contact_body(payload));
        send_json(self.display_name(), request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_body_shape() {
        let payload = ActionPayload {
            name: Some("Anna".to_string()),
            email: Some("anna@example.com".to_string()),
            phone: Some("+46700000000".to_string()),
            service: Some("Haircut".to_string()),
            ..Default::default()
        };
        let body = serde_json::to_value(contact_body(&payload)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "properties": {
                    "firstname": "Anna",
                    "email": "anna@example.com",
                    "phone": "+46700000000"
                }
            })
        );
    }
}
