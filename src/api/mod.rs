pub mod dto;
pub mod errors;
pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::{config::CommandDelivery, store::Store};
use handlers::ApiDoc;

/// Shared by every handler; cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub command_delivery: CommandDelivery,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, command_delivery: CommandDelivery) -> Self {
        Self {
            store,
            command_delivery,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .route(
            "/api/blinds",
            get(handlers::list_readings).post(handlers::submit_reading),
        )
        .route("/api/blinds/control", post(handlers::submit_command))
        .route("/api/blinds/command", get(handlers::poll_command))
        .with_state(state)
        .split_for_parts();

    router
        .route("/health", get(handlers::health))
        .route(
            "/api-docs/openapi.json",
            get(move || async move { axum::Json(api) }),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
