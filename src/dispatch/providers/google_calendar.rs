use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use super::{ProviderHandler, join_url, send_json};
use crate::clients::{ClientConfig, non_empty};
use crate::dispatch::credentials;
use crate::dispatch::models::ActionPayload;
use crate::dispatch::{DispatchError, ProviderContext};
use crate::services::google_oauth::refresh_access_token;

/// Inserts an event into the client's calendar after refreshing an access token.
pub struct GoogleCalendarProvider;

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
struct EventTime<'a> {
    date_time: &'a str,
    time_zone: &'a str,
}

#[derive(Serialize, Debug, PartialEq)]
struct CalendarEvent<'a> {
    summary: String,
    description: String,
    start: EventTime<'a>,
    end: EventTime<'a>,
}

fn calendar_event<'a>(payload: &'a ActionPayload, time_zone: &'a str) -> CalendarEvent<'a> {
    CalendarEvent {
        summary: format!("{} Appointment", payload.service()),
        description: format!(
            "Booking for {}, phone: {}, email: {}",
            payload.name(),
            payload.phone(),
            payload.email()
        ),
        start: EventTime {
            date_time: payload.start_time(),
            time_zone,
        },
        end: EventTime {
            date_time: payload.end_time(),
            time_zone,
        },
    }
}

#[async_trait]
impl ProviderHandler for GoogleCalendarProvider {
    fn key(&self) -> &'static str {
        "googlecalendar"
    }

    fn display_name(&self) -> &'static str {
        "Google Calendar"
    }

    async fn book(
        &self,
        ctx: &ProviderContext,
        config: &ClientConfig,
        payload: &ActionPayload,
    ) -> Result<Value, DispatchError> {
        if payload.start_time().trim().is_empty() || payload.end_time().trim().is_empty() {
            return Err(DispatchError::Validation(
                "startTime and endTime are required for Google Calendar bookings".to_string(),
            ));
        }
        let calendar_id = non_empty(&config.calendar_id).ok_or_else(|| {
            DispatchError::Credential("Missing calendar id for Google Calendar".to_string())
        })?;
        let creds = credentials::google_calendar_credentials(config, &ctx.settings)?;

        let endpoints = &ctx.settings.endpoints;
        let access_token = refresh_access_token(&ctx.client, &endpoints.google_token_url, &creds)
            .await
            .map_err(|e| {
                warn!(error = %e, "Google token refresh failed");
                DispatchError::Provider(e.to_string())
            })?;

        let url = join_url(
            &endpoints.calendar_base_url,
            &format!(
                "/calendar/v3/calendars/{}/events",
                urlencoding::encode(&calendar_id)
            ),
        );
        let event = calendar_event(payload, &ctx.settings.default_time_zone);
        let request = ctx.client.post(url).bearer_auth(access_token).json(&event);
        send_json(self.display_name(), request).await
    }
}
