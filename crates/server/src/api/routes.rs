use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{analysis, handlers, middleware::metrics_middleware, ocr, operations, ws};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Analysis
        .route("/analyze", post(analysis::analyze))
        .route("/analyze/batch", post(analysis::analyze_batch))
        // OCR
        .route("/ocr", post(ocr::detect_text))
        // Progress
        .route("/operations", get(operations::list_operations))
        .route("/operations", delete(operations::clear_finished))
        .route("/operations/{id}", get(operations::get_operation))
        .route("/ws", get(ws::ws_handler))
        .with_state(Arc::clone(&state));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
