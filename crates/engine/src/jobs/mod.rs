//! Background job lifecycle engine.
//!
//! ## Design
//!
//! - Jobs carry an opaque JSON payload; the engine never executes them
//! - Priority 1-5, higher priorities claimed first, FIFO within a priority
//! - Bounded retry: failures re-queue until the attempt cap, then stick
//! - Claiming is atomic so concurrent workers never share a job
//!
//! ## Components
//!
//! - `Job`: Core job record with payload, status, and retry bookkeeping
//! - `JobStore`: Persistence for jobs (in-memory or Postgres)
//! - `JobFilter` / `Pagination` / `Sort`: List-query building blocks
//! - `validate_payload`: Per-type payload shape checks at ingestion

pub mod payload;
pub mod postgres;
pub mod query;
pub mod store;
pub mod types;

pub use payload::validate_payload;
pub use postgres::PostgresJobStore;
pub use query::{JobFilter, Pagination, Sort, SortKey, SortOrder};
pub use store::{InMemoryJobStore, JobStore, StatusCount};
pub use types::{
    Job, JobStatus, JobType, RetryPolicy, validate_priority, DEFAULT_PRIORITY, PRIORITY_MAX,
    PRIORITY_MIN,
};
