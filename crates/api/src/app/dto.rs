use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use taskforge_core::{EngineError, EngineResult};
use taskforge_engine::jobs::{JobFilter, Pagination, Sort, SortKey, SortOrder};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    #[serde(rename = "type")]
    pub job_type: String,
    pub priority: Option<u8>,
    pub payload: serde_json::Value,
    pub scheduled_for: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePriorityRequest {
    pub priority: u8,
}

#[derive(Debug, Deserialize)]
pub struct CompleteJobRequest {
    pub result: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct FailJobRequest {
    pub error: String,
}

// -------------------------
// List query parsing
// -------------------------

/// Wire-level query params for `GET /jobs`.
///
/// `status` and `type` accept comma-separated sets.
#[derive(Debug, Default, Deserialize)]
pub struct ListJobsQuery {
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub job_type: Option<String>,
    pub search: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl ListJobsQuery {
    pub fn into_list_args(self) -> EngineResult<(JobFilter, Pagination, Sort)> {
        let filter = JobFilter {
            statuses: parse_csv(self.status.as_deref())?,
            types: parse_csv(self.job_type.as_deref())?,
            search: self.search.filter(|s| !s.is_empty()),
            created_after: self.start_date,
            created_before: self.end_date,
        };

        let page = Pagination::new(self.limit, self.offset);

        let sort = Sort {
            key: match self.sort_by.as_deref() {
                None => Sort::default().key,
                Some(raw) => parse_sort_key(raw)?,
            },
            order: match self.sort_order.as_deref() {
                None => Sort::default().order,
                Some(raw) => parse_sort_order(raw)?,
            },
        };

        Ok((filter, page, sort))
    }
}

fn parse_csv<T>(raw: Option<&str>) -> EngineResult<Vec<T>>
where
    T: FromStr<Err = EngineError>,
{
    match raw {
        None => Ok(Vec::new()),
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(T::from_str)
            .collect(),
    }
}

fn parse_sort_key(s: &str) -> EngineResult<SortKey> {
    match s {
        "created_at" => Ok(SortKey::CreatedAt),
        "updated_at" => Ok(SortKey::UpdatedAt),
        "priority" => Ok(SortKey::Priority),
        "attempts" => Ok(SortKey::Attempts),
        _ => Err(EngineError::validation(
            "sort_by must be one of: created_at, updated_at, priority, attempts",
        )),
    }
}

fn parse_sort_order(s: &str) -> EngineResult<SortOrder> {
    match s {
        "asc" => Ok(SortOrder::Asc),
        "desc" => Ok(SortOrder::Desc),
        _ => Err(EngineError::validation("sort_order must be one of: asc, desc")),
    }
}
