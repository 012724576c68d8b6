use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::DispatchError;

/// The two operations a caller can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    CheckAvailability,
    BookAppointment,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CheckAvailability => "check_availability",
            Action::BookAppointment => "book_appointment",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "check_availability" => Ok(Action::CheckAvailability),
            "book_appointment" => Ok(Action::BookAppointment),
            other => Err(DispatchError::UnsupportedAction(other.to_string())),
        }
    }
}

/// Booking details as sent by the voice agent or form.
/// `start_time`/`end_time` are ISO-8601 datetimes and are passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionPayload {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub service: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub date: Option<String>,
}

impl ActionPayload {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    pub fn email(&self) -> &str {
        self.email.as_deref().unwrap_or_default()
    }

    pub fn phone(&self) -> &str {
        self.phone.as_deref().unwrap_or_default()
    }

    pub fn service(&self) -> &str {
        self.service.as_deref().unwrap_or_default()
    }

    pub fn start_time(&self) -> &str {
        self.start_time.as_deref().unwrap_or_default()
    }

    pub fn end_time(&self) -> &str {
        self.end_time.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    pub action: Action,
    pub payload: Option<ActionPayload>,
}

impl ActionRequest {
    pub fn new(action: Action, payload: Option<ActionPayload>) -> Self {
        Self { action, payload }
    }
}

/// One candidate time-of-day returned by an availability check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub time: String,
    pub available: bool,
    pub service: String,
}

/// Uniform response for every dispatch, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crm_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ResultEnvelope {
    pub fn success(
        action: Action,
        crm_type: impl Into<String>,
        company: impl Into<String>,
        result: serde_json::Value,
    ) -> Self {
        Self {
            success: true,
            action: Some(action.to_string()),
            crm_type: Some(crm_type.into()),
            company: Some(company.into()),
            result: Some(result),
            error: None,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Builds the `{success:false, error, message}` body for a failed dispatch.
    pub fn failure(err: &DispatchError) -> Self {
        Self {
            success: false,
            action: None,
            crm_type: None,
            company: None,
            result: None,
            error: Some(err.kind().to_string()),
            message: Some(err.to_string()),
        }
    }

    pub fn with_context(
        mut self,
        action: Option<&str>,
        crm_type: Option<&str>,
        company: Option<&str>,
    ) -> Self {
        self.action = action.map(str::to_string);
        self.crm_type = crm_type.map(str::to_string);
        self.company = company.filter(|c| !c.is_empty()).map(str::to_string);
        self
    }
}
