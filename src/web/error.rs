use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::clients::ResolveError;
use crate::dispatch::DispatchError;
use crate::dispatch::models::ResultEnvelope;

/// A failed `/crm-action` call plus whatever was known about it when it failed.
#[derive(Error, Debug)]
#[error("{source}")]
pub struct AppError {
    source: DispatchError,
    action: Option<String>,
    crm_type: Option<String>,
    company: Option<String>,
}

impl AppError {
    pub fn with_action(mut self, action: &str) -> Self {
        self.action = Some(action.to_string());
        self
    }

    pub fn with_client(mut self, crm_type: &str, company: &str) -> Self {
        self.crm_type = Some(crm_type.to_string());
        self.company = Some(company.to_string());
        self
    }

    pub fn kind(&self) -> &'static str {
        self.source.kind()
    }

    pub fn status(&self) -> StatusCode {
        match self.source {
            DispatchError::Validation(_)
            | DispatchError::EmptyStore
            | DispatchError::UnsupportedAction(_)
            | DispatchError::UnsupportedProvider(_)
            | DispatchError::Credential(_) => StatusCode::BAD_REQUEST,
            DispatchError::NotFound(_) => StatusCode::NOT_FOUND,
            DispatchError::Provider(_) | DispatchError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let envelope = ResultEnvelope::failure(&self.source).with_context(
            self.action.as_deref(),
            self.crm_type.as_deref(),
            self.company.as_deref(),
        );
        (status, Json(envelope)).into_response()
    }
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        AppError {
            source: err,
            action: None,
            crm_type: None,
            company: None,
        }
    }
}

impl From<ResolveError> for AppError {
    fn from(err: ResolveError) -> Self {
        DispatchError::from(err).into()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        DispatchError::Validation(format!("Invalid request body: {}", rejection.body_text())).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (DispatchError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (DispatchError::NotFound("+46".into()), StatusCode::NOT_FOUND),
            (DispatchError::EmptyStore, StatusCode::BAD_REQUEST),
            (DispatchError::UnsupportedAction("x".into()), StatusCode::BAD_REQUEST),
            (DispatchError::UnsupportedProvider("Zoho".into()), StatusCode::BAD_REQUEST),
            (DispatchError::Credential("x".into()), StatusCode::BAD_REQUEST),
            (DispatchError::Provider("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (DispatchError::Store("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(AppError::from(err).status(), expected);
        }
    }

    #[test]
    fn test_context_is_kept() {
        let err = AppError::from(DispatchError::UnsupportedProvider("Zoho".into()))
            .with_action("book_appointment")
            .with_client("Zoho", "Salon Nova");
        assert_eq!(err.kind(), "UnsupportedProvider");
        assert_eq!(err.action.as_deref(), Some("book_appointment"));
        assert_eq!(err.company.as_deref(), Some("Salon Nova"));
    }
}
