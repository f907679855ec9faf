use axum::{
    routing::{get, post},
    Router,
};

pub mod jobs;
pub mod queue;
pub mod stats;
pub mod system;

/// Router for all job-queue endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/jobs", post(jobs::create_job).get(jobs::list_jobs))
        .route(
            "/jobs/:id",
            get(jobs::get_job)
                .patch(jobs::update_priority)
                .delete(jobs::cancel_job),
        )
        .route("/stats", get(stats::stats))
        .route("/process", post(queue::process_next))
        .route("/complete/:id", post(queue::complete_job))
        .route("/fail/:id", post(queue::fail_job))
}
