use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::{ProviderHandler, join_url, send_json};
use crate::clients::ClientConfig;
use crate::dispatch::credentials;
use crate::dispatch::models::ActionPayload;
use crate::dispatch::{DispatchError, ProviderContext};

/// Appends the booking as one row of the client's bookings sheet.
pub struct GoogleSheetsProvider;

#[derive(Serialize)]
struct AppendValues<'a> {
    values: [[&'a str; 6]; 1],
}

fn booking_row(payload: &ActionPayload) -> AppendValues<'_> {
    AppendValues {
        values: [[
            payload.name(),
            payload.email(),
            payload.phone(),
            payload.service(),
            payload.start_time(),
            payload.end_time(),
        ]],
    }
}

fn append_path(spreadsheet_id: &str, sheet_name: &str) -> String {
    format!(
        "/v4/spreadsheets/{}/values/{}!A1:append",
        urlencoding::encode(spreadsheet_id),
        urlencoding::encode(sheet_name)
    )
}

#[async_trait]
impl ProviderHandler for GoogleSheetsProvider {
    fn key(&self) -> &'static str {
        "googlesheets"
    }

    fn display_name(&self) -> &'static str {
        "Google Sheets"
    }

    async fn book(
        &self,
        ctx: &ProviderContext,
        config: &ClientConfig,
        payload: &ActionPayload,
    ) -> Result<Value, DispatchError> {
        let target = credentials::sheets_target(config, &ctx.settings)?;
        let url = join_url(
            &ctx.settings.endpoints.sheets_base_url,
            &append_path(&target.spreadsheet_id, &ctx.settings.bookings_sheet_name),
        );

        let request = ctx
            .client
            .post(url)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .bearer_auth(target.access_token)
            .json(&booking_row(payload));
        send_json(self.display_name(), request).await
    }
}
