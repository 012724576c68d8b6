use axum::{Json, Router, http::Method, routing::get};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::clients::ClientResolver;
use crate::dispatch::DispatchCore;
use crate::web::routes::crm_action_routes;

pub mod error;
pub mod routes;

pub use error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub dispatch: Arc<DispatchCore>,
    /// `None` when no backing store is configured; resolver-mode requests then fail.
    pub resolver: Option<Arc<ClientResolver>>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
}

async fn health_check_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        message: "CRM relay is running",
    })
}

pub fn create_axum_router(app_state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check_handler))
        .merge(crm_action_routes::crm_action_router())
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
