use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;

use taskforge_core::JobId;
use taskforge_engine::jobs::{
    validate_payload, validate_priority, Job, JobStore, JobType, DEFAULT_PRIORITY,
};

use crate::app::{dto, errors};

pub async fn create_job(
    Extension(store): Extension<Arc<dyn JobStore>>,
    Json(body): Json<dto::CreateJobRequest>,
) -> axum::response::Response {
    let job_type: JobType = match body.job_type.parse() {
        Ok(t) => t,
        Err(e) => return errors::engine_error_to_response(e),
    };

    let priority = body.priority.unwrap_or(DEFAULT_PRIORITY);
    if let Err(e) = validate_priority(priority) {
        return errors::engine_error_to_response(e);
    }
    if let Err(e) = validate_payload(job_type, &body.payload) {
        return errors::engine_error_to_response(e);
    }

    let mut job = Job::new(job_type, body.payload, priority);
    if let Some(at) = body.scheduled_for {
        job = job.scheduled_for(at);
    }

    match store.insert(job).await {
        Ok(job) => (StatusCode::CREATED, Json(job)).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn list_jobs(
    Extension(store): Extension<Arc<dyn JobStore>>,
    Query(query): Query<dto::ListJobsQuery>,
) -> axum::response::Response {
    let (filter, page, sort) = match query.into_list_args() {
        Ok(args) => args,
        Err(e) => return errors::engine_error_to_response(e),
    };

    match store.list(&filter, page, sort).await {
        Ok(jobs) => (StatusCode::OK, Json(jobs)).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn get_job(
    Extension(store): Extension<Arc<dyn JobStore>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: JobId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::engine_error_to_response(e),
    };

    match store.get(id).await {
        Ok(Some(job)) => (StatusCode::OK, Json(job)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "job not found"),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn update_priority(
    Extension(store): Extension<Arc<dyn JobStore>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdatePriorityRequest>,
) -> axum::response::Response {
    let id: JobId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::engine_error_to_response(e),
    };
    if let Err(e) = validate_priority(body.priority) {
        return errors::engine_error_to_response(e);
    }

    match store.update_priority(id, body.priority, Utc::now()).await {
        Ok(job) => (StatusCode::OK, Json(job)).into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}

pub async fn cancel_job(
    Extension(store): Extension<Arc<dyn JobStore>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: JobId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::engine_error_to_response(e),
    };

    match store.cancel(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::engine_error_to_response(e),
    }
}
