//! Core job types and policies.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use taskforge_core::{EngineError, EngineResult, JobId};

/// Lowest accepted priority.
pub const PRIORITY_MIN: u8 = 1;
/// Highest accepted priority (served first).
pub const PRIORITY_MAX: u8 = 5;
/// Priority assigned when the caller does not specify one.
pub const DEFAULT_PRIORITY: u8 = 3;

/// Job kind for routing to the appropriate external handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Email,
    Report,
    Notification,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Email => "email",
            JobType::Report => "report",
            JobType::Notification => "notification",
        }
    }
}

impl FromStr for JobType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(JobType::Email),
            "report" => Ok(JobType::Report),
            "notification" => Ok(JobType::Notification),
            other => Err(EngineError::validation(format!(
                "unknown job type '{other}', expected one of: email, report, notification"
            ))),
        }
    }
}

/// Job execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Queued, waiting to be claimed
    Pending,
    /// Claimed by a worker
    Processing,
    /// Completed successfully (terminal)
    Completed,
    /// Exhausted retries (terminal)
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl FromStr for JobStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(EngineError::validation(format!(
                "unknown status '{other}', expected one of: pending, processing, completed, failed"
            ))),
        }
    }
}

/// Retry policy configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts a job gets before it is failed permanently.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// Whether a job that just failed its `attempts`-th attempt may run again.
    pub fn should_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }
}

/// Validate a caller-supplied priority.
pub fn validate_priority(priority: u8) -> EngineResult<()> {
    if !(PRIORITY_MIN..=PRIORITY_MAX).contains(&priority) {
        return Err(EngineError::validation(format!(
            "priority must be between {PRIORITY_MIN} and {PRIORITY_MAX}, got {priority}"
        )));
    }
    Ok(())
}

/// A background job.
///
/// The engine never executes payloads; it only tracks lifecycle state.
/// `error` is a record of the most recent failure and is deliberately not
/// cleared by a retry or a later completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,
    /// Job kind for routing
    #[serde(rename = "type")]
    pub job_type: JobType,
    /// Current status
    pub status: JobStatus,
    /// Priority 1-5, higher claimed first
    pub priority: u8,
    /// JSON payload, opaque to the engine
    pub payload: serde_json::Value,
    /// Output reported on completion
    pub result: Option<serde_json::Value>,
    /// Most recent failure message
    pub error: Option<String>,
    /// Number of claims so far
    pub attempts: u32,
    /// Earliest claim time (immediately eligible when unset)
    pub scheduled_for: Option<DateTime<Utc>>,
    /// When the job was created
    pub created_at: DateTime<Utc>,
    /// When the job was last mutated
    pub updated_at: DateTime<Utc>,
    /// When the job completed successfully; never set for failed jobs
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a new pending job.
    pub fn new(job_type: JobType, payload: serde_json::Value, priority: u8) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            job_type,
            status: JobStatus::Pending,
            priority,
            payload,
            result: None,
            error: None,
            attempts: 0,
            scheduled_for: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Defer the first claim until `at`.
    pub fn scheduled_for(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_for = Some(at);
        self
    }

    /// Check if the job is eligible for claiming at `now` (schedule-wise).
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        match self.scheduled_for {
            Some(at) => at <= now,
            None => true,
        }
    }

    /// Pending -> Processing. Counts the attempt.
    pub fn claim(&mut self, now: DateTime<Utc>) -> EngineResult<()> {
        if self.status != JobStatus::Pending {
            return Err(EngineError::not_found());
        }
        self.status = JobStatus::Processing;
        self.attempts += 1;
        self.updated_at = now;
        Ok(())
    }

    /// Processing -> Completed. Records the result and stamps `completed_at`.
    pub fn complete(&mut self, result: serde_json::Value, now: DateTime<Utc>) -> EngineResult<()> {
        if self.status != JobStatus::Processing {
            return Err(EngineError::not_found());
        }
        self.status = JobStatus::Completed;
        self.result = Some(result);
        self.completed_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Processing -> Pending (retry) or Failed (retries exhausted).
    ///
    /// `attempts` was already counted at claim time, so the comparison in the
    /// policy covers the attempt that just failed.
    pub fn fail_attempt(
        &mut self,
        error: String,
        policy: &RetryPolicy,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        if self.status != JobStatus::Processing {
            return Err(EngineError::not_found());
        }
        self.error = Some(error);
        self.status = if policy.should_retry(self.attempts) {
            JobStatus::Pending
        } else {
            JobStatus::Failed
        };
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_job() -> Job {
        Job::new(JobType::Email, serde_json::json!({"to": "a@b.c"}), DEFAULT_PRIORITY)
    }

    #[test]
    fn claim_complete_lifecycle() {
        let mut job = test_job();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempts, 0);

        let now = Utc::now();
        job.claim(now).unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.attempts, 1);

        job.complete(serde_json::json!({"sent": true}), now).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.completed_at, Some(now));
        assert_eq!(job.result, Some(serde_json::json!({"sent": true})));
    }

    #[test]
    fn double_completion_is_rejected() {
        let mut job = test_job();
        let now = Utc::now();
        job.claim(now).unwrap();
        job.complete(serde_json::json!(null), now).unwrap();

        let err = job.complete(serde_json::json!(null), now).unwrap_err();
        assert_eq!(err, EngineError::NotFound);
    }

    #[test]
    fn claim_requires_pending() {
        let mut job = test_job();
        let now = Utc::now();
        job.claim(now).unwrap();
        assert_eq!(job.claim(now).unwrap_err(), EngineError::NotFound);
    }

    #[test]
    fn retries_walk_to_failed_at_max_attempts() {
        let mut job = test_job();
        let policy = RetryPolicy::default();
        let now = Utc::now();

        // Attempts 1 and 2 fail back to pending.
        for expected_attempts in 1..=2 {
            job.claim(now).unwrap();
            job.fail_attempt("boom".to_string(), &policy, now).unwrap();
            assert_eq!(job.status, JobStatus::Pending);
            assert_eq!(job.attempts, expected_attempts);
        }

        // Third failure is permanent.
        job.claim(now).unwrap();
        job.fail_attempt("boom".to_string(), &policy, now).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.attempts, 3);

        // A fourth report has no processing job to land on.
        let err = job.fail_attempt("again".to_string(), &policy, now).unwrap_err();
        assert_eq!(err, EngineError::NotFound);
    }

    #[test]
    fn failed_jobs_never_get_completed_at() {
        let mut job = test_job();
        let policy = RetryPolicy::new(1);
        let now = Utc::now();

        job.claim(now).unwrap();
        job.fail_attempt("boom".to_string(), &policy, now).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.completed_at.is_none());
        assert_eq!(job.error.as_deref(), Some("boom"));
    }

    #[test]
    fn error_survives_a_successful_retry() {
        let mut job = test_job();
        let policy = RetryPolicy::default();
        let now = Utc::now();

        job.claim(now).unwrap();
        job.fail_attempt("transient".to_string(), &policy, now).unwrap();
        job.claim(now).unwrap();
        job.complete(serde_json::json!({}), now).unwrap();

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.error.as_deref(), Some("transient"));
    }

    #[test]
    fn scheduled_job_is_not_ready_before_due_time() {
        let now = Utc::now();
        let job = test_job().scheduled_for(now + chrono::Duration::minutes(5));
        assert!(!job.is_ready(now));
        assert!(job.is_ready(now + chrono::Duration::minutes(5)));
    }

    #[test]
    fn priority_bounds_are_enforced() {
        assert!(validate_priority(0).is_err());
        assert!(validate_priority(6).is_err());
        for p in PRIORITY_MIN..=PRIORITY_MAX {
            assert!(validate_priority(p).is_ok());
        }
    }

    #[test]
    fn wire_forms_are_snake_case() {
        assert_eq!(serde_json::to_value(JobType::Email).unwrap(), "email");
        assert_eq!(serde_json::to_value(JobStatus::Processing).unwrap(), "processing");
        assert_eq!("report".parse::<JobType>().unwrap(), JobType::Report);
        assert!("bogus".parse::<JobStatus>().is_err());
    }
}
