use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use taskforge_engine::jobs::JobStore;

use crate::app::errors;

/// Job counts grouped by status. Statuses with zero jobs are absent.
pub async fn stats(Extension(store): Extension<Arc<dyn JobStore>>) -> axum::response::Response {
    match store.counts_by_status().await {
        Ok(counts) => (StatusCode::OK, Json(counts)).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}
