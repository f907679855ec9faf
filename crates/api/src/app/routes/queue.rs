//! Worker-facing endpoints: claim the next job, report its outcome.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;

use taskforge_core::JobId;
use taskforge_engine::jobs::{JobStore, RetryPolicy};

use crate::app::{dto, errors};

/// Atomically claim the highest-priority eligible job.
///
/// An empty queue is a 404 with a message body, not an error envelope;
/// workers poll this endpoint and treat 404 as "sleep and retry".
pub async fn process_next(
    Extension(store): Extension<Arc<dyn JobStore>>,
) -> axum::response::Response {
    match store.claim_next(Utc::now()).await {
        Ok(Some(job)) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "job_id": job.id.to_string(),
                "type": job.job_type.as_str(),
                "payload": job.payload,
            })),
        )
            .into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"message": "no pending jobs found"})),
        )
            .into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn complete_job(
    Extension(store): Extension<Arc<dyn JobStore>>,
    Path(id): Path<String>,
    Json(body): Json<dto::CompleteJobRequest>,
) -> axum::response::Response {
    let id: JobId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::engine_error_to_response(e),
    };

    match store.complete(id, body.result, Utc::now()).await {
        Ok(job) => (StatusCode::OK, Json(job)).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn fail_job(
    Extension(store): Extension<Arc<dyn JobStore>>,
    Path(id): Path<String>,
    Json(body): Json<dto::FailJobRequest>,
) -> axum::response::Response {
    let id: JobId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::engine_error_to_response(e),
    };

    match store
        .fail(id, body.error, &RetryPolicy::default(), Utc::now())
        .await
    {
        Ok(job) => (StatusCode::OK, Json(job)).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}
