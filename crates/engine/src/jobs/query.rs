//! Job list queries: filters, pagination, sorting.
//!
//! All listing is paginated by default.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{Job, JobStatus, JobType};

/// Pagination parameters for job listings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of jobs to return.
    pub limit: u32,
    /// Offset for pagination (0-based).
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 10,
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(10).min(100), // Cap at 100 for safety
            offset: offset.unwrap_or(0),
        }
    }
}

/// Filter criteria for job listings. Empty sets match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobFilter {
    /// Restrict to these statuses (empty = all).
    pub statuses: Vec<JobStatus>,
    /// Restrict to these job types (empty = all).
    pub types: Vec<JobType>,
    /// Case-insensitive substring match over the serialized payload and the
    /// error message.
    pub search: Option<String>,
    /// Jobs created at or after this time.
    pub created_after: Option<DateTime<Utc>>,
    /// Jobs created at or before this time.
    pub created_before: Option<DateTime<Utc>>,
}

impl JobFilter {
    pub fn matches(&self, job: &Job) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&job.status) {
            return false;
        }
        if !self.types.is_empty() && !self.types.contains(&job.job_type) {
            return false;
        }
        if let Some(after) = self.created_after {
            if job.created_at < after {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if job.created_at > before {
                return false;
            }
        }
        if let Some(needle) = &self.search {
            let needle = needle.to_lowercase();
            let in_payload = job.payload.to_string().to_lowercase().contains(&needle);
            let in_error = job
                .error
                .as_deref()
                .is_some_and(|e| e.to_lowercase().contains(&needle));
            if !in_payload && !in_error {
                return false;
            }
        }
        true
    }
}

/// Sortable job columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    CreatedAt,
    UpdatedAt,
    Priority,
    Attempts,
}

impl SortKey {
    /// Column name used in SQL ORDER BY clauses.
    pub fn as_column(&self) -> &'static str {
        match self {
            SortKey::CreatedAt => "created_at",
            SortKey::UpdatedAt => "updated_at",
            SortKey::Priority => "priority",
            SortKey::Attempts => "attempts",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Sort specification for job listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub key: SortKey,
    pub order: SortOrder,
}

impl Default for Sort {
    fn default() -> Self {
        // Newest first.
        Self {
            key: SortKey::CreatedAt,
            order: SortOrder::Desc,
        }
    }
}

impl Sort {
    pub fn compare(&self, a: &Job, b: &Job) -> Ordering {
        let ord = match self.key {
            SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            SortKey::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortKey::Priority => a.priority.cmp(&b.priority),
            SortKey::Attempts => a.attempts.cmp(&b.attempts),
        };
        match self.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::types::DEFAULT_PRIORITY;

    fn job_with_error(error: Option<&str>) -> Job {
        let mut job = Job::new(
            JobType::Email,
            serde_json::json!({"to": "ops@example.com", "subject": "Weekly", "body": "…"}),
            DEFAULT_PRIORITY,
        );
        job.error = error.map(str::to_string);
        job
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = JobFilter::default();
        assert!(filter.matches(&job_with_error(None)));
    }

    #[test]
    fn status_and_type_sets_restrict() {
        let job = job_with_error(None);

        let filter = JobFilter {
            statuses: vec![JobStatus::Completed],
            ..Default::default()
        };
        assert!(!filter.matches(&job));

        let filter = JobFilter {
            types: vec![JobType::Email, JobType::Report],
            ..Default::default()
        };
        assert!(filter.matches(&job));
    }

    #[test]
    fn search_is_case_insensitive_over_payload_and_error() {
        let job = job_with_error(Some("SMTP timeout"));

        let filter = JobFilter {
            search: Some("weekly".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&job));

        let filter = JobFilter {
            search: Some("smtp".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&job));

        let filter = JobFilter {
            search: Some("nowhere".to_string()),
            ..Default::default()
        };
        assert!(!filter.matches(&job));
    }

    #[test]
    fn pagination_caps_limit() {
        let page = Pagination::new(Some(1000), None);
        assert_eq!(page.limit, 100);
        assert_eq!(Pagination::default().limit, 10);
    }

    #[test]
    fn default_sort_is_created_at_desc() {
        let sort = Sort::default();
        assert_eq!(sort.key, SortKey::CreatedAt);
        assert_eq!(sort.order, SortOrder::Desc);

        let older = job_with_error(None);
        let mut newer = job_with_error(None);
        newer.created_at = older.created_at + chrono::Duration::seconds(1);
        assert_eq!(sort.compare(&newer, &older), Ordering::Less);
    }
}
