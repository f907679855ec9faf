//! Payload shape validation, run once at the ingestion boundary.
//!
//! Payloads are opaque to the lifecycle engine; the shapes below are only
//! checked when a job is created.

use serde_json::Value;

use taskforge_core::{EngineError, EngineResult};

use super::types::JobType;

/// Validate a payload against the shape required by its job type.
pub fn validate_payload(job_type: JobType, payload: &Value) -> EngineResult<()> {
    let obj = payload
        .as_object()
        .ok_or_else(|| EngineError::validation("payload must be a JSON object"))?;

    match job_type {
        JobType::Email => {
            let to = require_string(obj, "to")?;
            if !to.contains('@') {
                return Err(EngineError::validation("payload.to must be an email address"));
            }
            require_string(obj, "subject")?;
            require_string(obj, "body")?;
        }
        JobType::Report => {
            require_string(obj, "report_type")?;
            let format = require_string(obj, "format")?;
            if format != "pdf" && format != "csv" {
                return Err(EngineError::validation(
                    "payload.format must be one of: pdf, csv",
                ));
            }
            if let Some(range) = obj.get("date_range") {
                let range = range.as_object().ok_or_else(|| {
                    EngineError::validation("payload.date_range must be an object")
                })?;
                require_string(range, "start")?;
                require_string(range, "end")?;
            }
        }
        JobType::Notification => {
            require_string(obj, "user_id")?;
            let channel = require_string(obj, "channel")?;
            if !matches!(channel, "push" | "sms" | "email") {
                return Err(EngineError::validation(
                    "payload.channel must be one of: push, sms, email",
                ));
            }
            require_string(obj, "message")?;
        }
    }

    Ok(())
}

fn require_string<'a>(
    obj: &'a serde_json::Map<String, Value>,
    field: &str,
) -> EngineResult<&'a str> {
    match obj.get(field).and_then(Value::as_str) {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(EngineError::validation(format!(
            "payload.{field} must be a non-empty string"
        ))),
    }
}
