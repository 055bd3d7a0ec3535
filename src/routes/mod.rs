use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    auth::IdentityProvider,
    db::Store,
    middleware::request_id::{make_span_with_request_id, request_id_middleware},
    services::{Catalog, ReviewLedger},
};

pub mod extract;
pub mod platforms;
pub mod reviews;
pub mod titles;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub ledger: Arc<ReviewLedger>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    /// Wires both services to the same store
    pub fn new(store: Arc<dyn Store>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            catalog: Arc::new(Catalog::new(store.clone())),
            ledger: Arc::new(ReviewLedger::new(store)),
            identity,
        }
    }
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Stream platforms
        .route("/stream", get(platforms::list).post(platforms::create))
        .route(
            "/stream/:id",
            get(platforms::get).put(platforms::update).delete(platforms::delete),
        )
        // Titles
        .route("/watch", get(titles::list).post(titles::create))
        .route(
            "/watch/:id",
            get(titles::get).put(titles::update).delete(titles::delete),
        )
        // Reviews
        .route(
            "/watch/:id/reviews",
            get(reviews::list_for_title).post(reviews::create),
        )
        .route(
            "/reviews/:id",
            get(reviews::get)
                .put(reviews::update)
                .patch(reviews::update)
                .delete(reviews::delete),
        )
        .route("/user/reviews", get(reviews::list_for_user))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
