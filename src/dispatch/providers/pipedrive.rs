use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::{ProviderHandler, join_url, send_json};
use crate::clients::ClientConfig;
use crate::dispatch::credentials;
use crate::dispatch::models::ActionPayload;
use crate::dispatch::{DispatchError, ProviderContext};

const PERSONS_PATH: &str = "/v1/persons";

/// Creates a Pipedrive person for each booking. Auth goes in the `api_token` query parameter.
pub struct PipedriveProvider;

#[derive(Serialize)]
struct CreatePerson<'a> {
    name: &'a str,
    email: &'a str,
    phone: &'a str,
}

#[async_trait]
impl ProviderHandler for PipedriveProvider {
    fn key(&self) -> &'static str {
        "pipedrive"
    }

    fn display_name(&self) -> &'static str {
        "Pipedrive"
    }

    async fn book(
        &self,
        ctx: &ProviderContext,
        config: &ClientConfig,
        payload: &ActionPayload,
    ) -> Result<Value, DispatchError> {
        let api_token = credentials::pipedrive_api_token(config)?;
        let url = join_url(&ctx.settings.endpoints.pipedrive_base_url, PERSONS_PATH);

        let body = CreatePerson {
            name: payload.name(),
            email: payload.email(),
            phone: payload.phone(),
        };
        let request = ctx
            .client
            .post(url)
            .query(&[("api_token", api_token.as_str())])
            .json(&body);
        send_json(self.display_name(), request).await
    }
}
