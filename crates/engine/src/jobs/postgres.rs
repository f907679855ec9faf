//! Postgres-backed job store.
//!
//! All lifecycle transitions are single conditional UPDATE statements, so
//! the database is the arbiter of the state machine. The claim path uses
//! `FOR UPDATE SKIP LOCKED` to hand concurrent workers distinct rows without
//! blocking.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `EngineError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | EngineError | Scenario |
//! |------------|----------------------|-------------|----------|
//! | Database (unique violation) | `23505` | `Conflict` | Duplicate job id on insert |
//! | Database (other) | Any other | `Unavailable` | Other database errors |
//! | PoolClosed / network / other | N/A | `Unavailable` | Transient store failure, caller may retry |

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;

use taskforge_core::{EngineError, EngineResult, JobId};

use super::query::{JobFilter, Pagination, Sort};
use super::store::{JobStore, StatusCount};
use super::types::{Job, JobStatus, JobType, RetryPolicy};

const JOB_COLUMNS: &str = "id, job_type, status, priority, payload, result, error, attempts, scheduled_for, created_at, updated_at, completed_at";

/// Postgres-backed job store.
///
/// Uses the SQLx connection pool, which is thread-safe; the store can be
/// shared freely across handlers and workers.
#[derive(Debug, Clone)]
pub struct PostgresJobStore {
    pool: Arc<PgPool>,
}

impl PostgresJobStore {
    /// Create a new PostgresJobStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create the jobs table and claim index if they do not exist.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> EngineResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id UUID PRIMARY KEY,
                job_type TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                priority SMALLINT NOT NULL DEFAULT 3,
                payload JSONB NOT NULL,
                result JSONB,
                error TEXT,
                attempts INTEGER NOT NULL DEFAULT 0,
                scheduled_for TIMESTAMPTZ,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                completed_at TIMESTAMPTZ
            )
            "#,
        )
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_jobs_table", e))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_jobs_claim ON jobs (status, priority DESC, created_at ASC)",
        )
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_claim_index", e))?;

        Ok(())
    }

    async fn fetch_job(&self, id: JobId) -> EngineResult<Option<Job>> {
        let row = sqlx::query(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_job", e))?;

        row.map(|row| decode_job(&row)).transpose()
    }
}

#[async_trait]
impl JobStore for PostgresJobStore {
    #[instrument(skip(self, job), fields(job_id = %job.id), err)]
    async fn insert(&self, job: Job) -> EngineResult<Job> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO jobs (
                id, job_type, status, priority, payload, result, error,
                attempts, scheduled_for, created_at, updated_at, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(job.id.as_uuid())
        .bind(job.job_type.as_str())
        .bind(job.status.as_str())
        .bind(job.priority as i16)
        .bind(&job.payload)
        .bind(&job.result)
        .bind(&job.error)
        .bind(job.attempts as i32)
        .bind(job.scheduled_for)
        .bind(job.created_at)
        .bind(job.updated_at)
        .bind(job.completed_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_job", e))?;

        decode_job(&row)
    }

    async fn get(&self, id: JobId) -> EngineResult<Option<Job>> {
        self.fetch_job(id).await
    }

    async fn list(
        &self,
        filter: &JobFilter,
        page: Pagination,
        sort: Sort,
    ) -> EngineResult<Vec<Job>> {
        let statuses: Vec<String> = filter.statuses.iter().map(|s| s.as_str().to_string()).collect();
        let types: Vec<String> = filter.types.iter().map(|t| t.as_str().to_string()).collect();
        let search = filter.search.as_ref().map(|s| format!("%{s}%"));

        // Sort columns come from a closed enum, never from caller input.
        let rows = sqlx::query(&format!(
            r#"
            SELECT {JOB_COLUMNS}
            FROM jobs
            WHERE (cardinality($1::text[]) = 0 OR status = ANY($1))
                AND (cardinality($2::text[]) = 0 OR job_type = ANY($2))
                AND ($3::text IS NULL OR payload::text ILIKE $3 OR error ILIKE $3)
                AND ($4::timestamptz IS NULL OR created_at >= $4)
                AND ($5::timestamptz IS NULL OR created_at <= $5)
            ORDER BY {} {}
            LIMIT $6 OFFSET $7
            "#,
            sort.key.as_column(),
            sort.order.as_sql(),
        ))
        .bind(&statuses)
        .bind(&types)
        .bind(search)
        .bind(filter.created_after)
        .bind(filter.created_before)
        .bind(page.limit as i64)
        .bind(page.offset as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_jobs", e))?;

        rows.iter().map(decode_job).collect()
    }

    #[instrument(skip(self), err)]
    async fn claim_next(&self, now: DateTime<Utc>) -> EngineResult<Option<Job>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE jobs
            SET status = 'processing', attempts = attempts + 1, updated_at = $1
            WHERE id = (
                SELECT id FROM jobs
                WHERE status = 'pending'
                    AND (scheduled_for IS NULL OR scheduled_for <= $1)
                ORDER BY priority DESC, created_at ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(now)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("claim_next", e))?;

        row.map(|row| decode_job(&row)).transpose()
    }

    #[instrument(skip(self, result), fields(job_id = %id), err)]
    async fn complete(
        &self,
        id: JobId,
        result: serde_json::Value,
        now: DateTime<Utc>,
    ) -> EngineResult<Job> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE jobs
            SET status = 'completed', result = $2, completed_at = $3, updated_at = $3
            WHERE id = $1 AND status = 'processing'
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(&result)
        .bind(now)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("complete_job", e))?;

        // A miss is either an unknown id or a job not in processing; both are NotFound.
        match row {
            Some(row) => decode_job(&row),
            None => Err(EngineError::not_found()),
        }
    }

    #[instrument(skip(self, error, policy), fields(job_id = %id), err)]
    async fn fail(
        &self,
        id: JobId,
        error: String,
        policy: &RetryPolicy,
        now: DateTime<Utc>,
    ) -> EngineResult<Job> {
        // attempts was already counted at claim time, so the CASE compares
        // against the attempt that just failed.
        let row = sqlx::query(&format!(
            r#"
            UPDATE jobs
            SET status = CASE WHEN attempts < $3 THEN 'pending' ELSE 'failed' END,
                error = $2,
                updated_at = $4
            WHERE id = $1 AND status = 'processing'
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(&error)
        .bind(policy.max_attempts as i32)
        .bind(now)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("fail_job", e))?;

        match row {
            Some(row) => decode_job(&row),
            None => Err(EngineError::not_found()),
        }
    }

    #[instrument(skip(self), fields(job_id = %id), err)]
    async fn update_priority(
        &self,
        id: JobId,
        priority: u8,
        now: DateTime<Utc>,
    ) -> EngineResult<Job> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE jobs
            SET priority = $2, updated_at = $3
            WHERE id = $1 AND status = 'pending'
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(priority as i16)
        .bind(now)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_priority", e))?;

        if let Some(row) = row {
            return decode_job(&row);
        }

        // Disambiguate with a point read: known job in the wrong state is a
        // conflict, anything else is not found.
        match self.fetch_job(id).await? {
            Some(_) => Err(EngineError::conflict(
                "priority can only be changed while pending",
            )),
            None => Err(EngineError::not_found()),
        }
    }

    #[instrument(skip(self), fields(job_id = %id), err)]
    async fn cancel(&self, id: JobId) -> EngineResult<()> {
        let deleted = sqlx::query("DELETE FROM jobs WHERE id = $1 AND status = 'pending'")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("cancel_job", e))?;

        if deleted.rows_affected() > 0 {
            return Ok(());
        }

        match self.fetch_job(id).await? {
            Some(_) => Err(EngineError::conflict("only pending jobs can be cancelled")),
            None => Err(EngineError::not_found()),
        }
    }

    async fn counts_by_status(&self) -> EngineResult<Vec<StatusCount>> {
        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS count FROM jobs GROUP BY status ORDER BY status",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("counts_by_status", e))?;

        let mut counts = Vec::with_capacity(rows.len());
        for row in rows {
            let status: String = row
                .try_get("status")
                .map_err(|e| EngineError::unavailable(format!("failed to read status: {e}")))?;
            let count: i64 = row
                .try_get("count")
                .map_err(|e| EngineError::unavailable(format!("failed to read count: {e}")))?;
            counts.push(StatusCount {
                status: JobStatus::from_str(&status)?,
                count: count as u64,
            });
        }
        Ok(counts)
    }
}

/// Map SQLx errors to EngineError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> EngineError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());

            if db_err.code().as_deref() == Some("23505") {
                // Unique violation (duplicate job id)
                EngineError::conflict(msg)
            } else {
                EngineError::unavailable(msg)
            }
        }
        sqlx::Error::PoolClosed => {
            EngineError::unavailable(format!("connection pool closed in {operation}"))
        }
        _ => EngineError::unavailable(format!("sqlx error in {operation}: {err}")),
    }
}

// SQLx row type

#[derive(Debug)]
struct JobRow {
    id: uuid::Uuid,
    job_type: String,
    status: String,
    priority: i16,
    payload: serde_json::Value,
    result: Option<serde_json::Value>,
    error: Option<String>,
    attempts: i32,
    scheduled_for: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for JobRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(JobRow {
            id: row.try_get("id")?,
            job_type: row.try_get("job_type")?,
            status: row.try_get("status")?,
            priority: row.try_get("priority")?,
            payload: row.try_get("payload")?,
            result: row.try_get("result")?,
            error: row.try_get("error")?,
            attempts: row.try_get("attempts")?,
            scheduled_for: row.try_get("scheduled_for")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            completed_at: row.try_get("completed_at")?,
        })
    }
}

impl TryFrom<JobRow> for Job {
    type Error = EngineError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(Job {
            id: JobId::from_uuid(row.id),
            job_type: JobType::from_str(&row.job_type)?,
            status: JobStatus::from_str(&row.status)?,
            priority: row.priority as u8,
            payload: row.payload,
            result: row.result,
            error: row.error,
            attempts: row.attempts as u32,
            scheduled_for: row.scheduled_for,
            created_at: row.created_at,
            updated_at: row.updated_at,
            completed_at: row.completed_at,
        })
    }
}

fn decode_job(row: &sqlx::postgres::PgRow) -> EngineResult<Job> {
    let job_row = JobRow::from_row(row)
        .map_err(|e| EngineError::unavailable(format!("failed to deserialize job row: {e}")))?;
    job_row.try_into()
}
