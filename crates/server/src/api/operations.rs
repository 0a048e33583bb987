//! Tracked operation API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use deepbrief_core::progress::OperationSnapshot;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ListOperationsResponse {
    pub operations: Vec<OperationSnapshot>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct ClearOperationsResponse {
    pub removed: usize,
}

#[derive(Debug, Serialize)]
pub struct OperationErrorResponse {
    pub error: String,
}

/// List all tracked operations, oldest first.
pub async fn list_operations(State(state): State<Arc<AppState>>) -> Json<ListOperationsResponse> {
    let operations = state.tracker().operations();
    Json(ListOperationsResponse {
        total: operations.len(),
        operations,
    })
}

/// Get one operation by id.
pub async fn get_operation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OperationSnapshot>, (StatusCode, Json<OperationErrorResponse>)> {
    state.tracker().snapshot(&id).map(Json).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(OperationErrorResponse {
                error: format!("Operation not found: {}", id),
            }),
        )
    })
}

/// Forget completed and failed operations.
pub async fn clear_finished(State(state): State<Arc<AppState>>) -> Json<ClearOperationsResponse> {
    Json(ClearOperationsResponse {
        removed: state.tracker().clear_finished(),
    })
}
