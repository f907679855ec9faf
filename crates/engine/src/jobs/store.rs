//! Job storage: the `JobStore` trait and the in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use taskforge_core::{EngineError, EngineResult, JobId};

use super::query::{JobFilter, Pagination, Sort};
use super::types::{Job, JobStatus, RetryPolicy};

/// Per-status job count, as returned by `counts_by_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: JobStatus,
    pub count: u64,
}

/// Job store abstraction.
///
/// Every mutation is atomic at single-job granularity. The state guards live
/// behind this trait so callers cannot create illegal transitions: complete
/// and fail require Processing (a miss is NotFound), priority changes and
/// cancellation require Pending (a miss on a known job is Conflict).
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a new job.
    async fn insert(&self, job: Job) -> EngineResult<Job>;

    /// Get a job by ID.
    async fn get(&self, id: JobId) -> EngineResult<Option<Job>>;

    /// List jobs matching `filter`, paginated and sorted.
    async fn list(
        &self,
        filter: &JobFilter,
        page: Pagination,
        sort: Sort,
    ) -> EngineResult<Vec<Job>>;

    /// Atomically claim the next eligible pending job.
    ///
    /// Eligible: status Pending and `scheduled_for` unset or due. Ordering:
    /// priority descending, then created_at ascending. Returns None when
    /// nothing is claimable; concurrent callers never receive the same job.
    async fn claim_next(&self, now: DateTime<Utc>) -> EngineResult<Option<Job>>;

    /// Record a successful outcome for a processing job.
    async fn complete(
        &self,
        id: JobId,
        result: serde_json::Value,
        now: DateTime<Utc>,
    ) -> EngineResult<Job>;

    /// Record a failed attempt for a processing job, applying the retry policy.
    async fn fail(
        &self,
        id: JobId,
        error: String,
        policy: &RetryPolicy,
        now: DateTime<Utc>,
    ) -> EngineResult<Job>;

    /// Change the priority of a pending job.
    async fn update_priority(
        &self,
        id: JobId,
        priority: u8,
        now: DateTime<Utc>,
    ) -> EngineResult<Job>;

    /// Delete a pending job.
    async fn cancel(&self, id: JobId) -> EngineResult<()>;

    /// Per-status counts from a single consistent snapshot. Statuses with no
    /// jobs are absent from the result.
    async fn counts_by_status(&self) -> EngineResult<Vec<StatusCount>>;
}

/// In-memory job store for tests/dev.
///
/// The write lock makes each conditional transition indivisible, which is
/// all the claim protocol needs on a single process.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert(&self, job: Job) -> EngineResult<Job> {
        let mut jobs = self.jobs.write().unwrap();
        if jobs.contains_key(&job.id) {
            return Err(EngineError::conflict(format!("job already exists: {}", job.id)));
        }
        jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn get(&self, id: JobId) -> EngineResult<Option<Job>> {
        let jobs = self.jobs.read().unwrap();
        Ok(jobs.get(&id).cloned())
    }

    async fn list(
        &self,
        filter: &JobFilter,
        page: Pagination,
        sort: Sort,
    ) -> EngineResult<Vec<Job>> {
        let jobs = self.jobs.read().unwrap();
        let mut result: Vec<_> = jobs.values().filter(|j| filter.matches(j)).cloned().collect();
        result.sort_by(|a, b| sort.compare(a, b));
        Ok(result
            .into_iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn claim_next(&self, now: DateTime<Utc>) -> EngineResult<Option<Job>> {
        let mut jobs = self.jobs.write().unwrap();

        // Highest priority wins; FIFO by created_at within a band.
        let best = jobs
            .values()
            .filter(|j| j.status == JobStatus::Pending && j.is_ready(now))
            .max_by(|a, b| {
                a.priority
                    .cmp(&b.priority)
                    .then_with(|| b.created_at.cmp(&a.created_at))
                    .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
            })
            .map(|j| j.id);

        let Some(id) = best else {
            return Ok(None);
        };

        let job = jobs.get_mut(&id).ok_or_else(EngineError::not_found)?;
        job.claim(now)?;
        Ok(Some(job.clone()))
    }

    async fn complete(
        &self,
        id: JobId,
        result: serde_json::Value,
        now: DateTime<Utc>,
    ) -> EngineResult<Job> {
        let mut jobs = self.jobs.write().unwrap();
        let job = jobs.get_mut(&id).ok_or_else(EngineError::not_found)?;
        job.complete(result, now)?;
        Ok(job.clone())
    }

    async fn fail(
        &self,
        id: JobId,
        error: String,
        policy: &RetryPolicy,
        now: DateTime<Utc>,
    ) -> EngineResult<Job> {
        let mut jobs = self.jobs.write().unwrap();
        let job = jobs.get_mut(&id).ok_or_else(EngineError::not_found)?;
        job.fail_attempt(error, policy, now)?;
        Ok(job.clone())
    }

    async fn update_priority(
        &self,
        id: JobId,
        priority: u8,
        now: DateTime<Utc>,
    ) -> EngineResult<Job> {
        let mut jobs = self.jobs.write().unwrap();
        let job = jobs.get_mut(&id).ok_or_else(EngineError::not_found)?;
        if job.status != JobStatus::Pending {
            return Err(EngineError::conflict(
                "priority can only be changed while pending",
            ));
        }
        job.priority = priority;
        job.updated_at = now;
        Ok(job.clone())
    }

    async fn cancel(&self, id: JobId) -> EngineResult<()> {
        let mut jobs = self.jobs.write().unwrap();
        match jobs.get(&id) {
            None => Err(EngineError::not_found()),
            Some(job) if job.status != JobStatus::Pending => {
                Err(EngineError::conflict("only pending jobs can be cancelled"))
            }
            Some(_) => {
                jobs.remove(&id);
                Ok(())
            }
        }
    }

    async fn counts_by_status(&self) -> EngineResult<Vec<StatusCount>> {
        let jobs = self.jobs.read().unwrap();

        let mut pending = 0u64;
        let mut processing = 0u64;
        let mut completed = 0u64;
        let mut failed = 0u64;
        for job in jobs.values() {
            match job.status {
                JobStatus::Pending => pending += 1,
                JobStatus::Processing => processing += 1,
                JobStatus::Completed => completed += 1,
                JobStatus::Failed => failed += 1,
            }
        }

        let counts = [
            (JobStatus::Pending, pending),
            (JobStatus::Processing, processing),
            (JobStatus::Completed, completed),
            (JobStatus::Failed, failed),
        ];
        Ok(counts
            .into_iter()
            .filter(|(_, count)| *count > 0)
            .map(|(status, count)| StatusCount { status, count })
            .collect())
    }
}
