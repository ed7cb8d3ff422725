//! Encoding and decoding of a [`Job`] to the flat string-keyed hash layout
//! Redis requires, plus the `job:{id}` key convention.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::RepositoryError;
use crate::model::{Job, JobStatus};

const JOB_KEY_PREFIX: &str = "job:";

/// The hash key a job's record lives under.
pub fn job_key(job_id: &str) -> String {
    format!("{JOB_KEY_PREFIX}{job_id}")
}

pub(crate) fn serialize_dt(dt: Option<DateTime<Utc>>) -> String {
    dt.map(|d| d.to_rfc3339()).unwrap_or_default()
}

fn deserialize_dt(s: &str) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    if s.is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(s)
        .map(|d| Some(d.with_timezone(&Utc)))
        .map_err(|e| RepositoryError::Malformed(format!("bad timestamp {s:?}: {e}")))
}

/// Encode a [`Job`] into the flat map written to `job:{id}`.
///
/// Absent timestamps, `result`, and `last_error` are encoded as the empty
/// string — the store has no way to represent field absence distinctly
/// from an unset field.
pub fn encode(job: &Job) -> HashMap<String, String> {
    let mut m = HashMap::with_capacity(8);
    m.insert("status".to_string(), job.status.as_str().to_string());
    m.insert(
        "payload".to_string(),
        serde_json::to_string(&job.payload).expect("Value always serializes"),
    );
    m.insert(
        "result".to_string(),
        job.result
            .as_ref()
            .map(|r| serde_json::to_string(r).expect("Value always serializes"))
            .unwrap_or_default(),
    );
    m.insert(
        "last_error".to_string(),
        job.last_error.clone().unwrap_or_default(),
    );
    m.insert("attempts".to_string(), job.attempts.to_string());
    m.insert("created_at".to_string(), serialize_dt(Some(job.created_at)));
    m.insert("updated_at".to_string(), serialize_dt(Some(job.updated_at)));
    m.insert("started_at".to_string(), serialize_dt(job.started_at));
    m
}

/// Decode a job's flat map back into a [`Job`]. `job_id` is supplied by
/// the caller since it is carried in the key, not a hash field.
///
/// Round-trips exactly: `decode(job_id, encode(job)) == Ok(job)` for any
/// well-formed job produced by [`encode`].
pub fn decode(job_id: &str, fields: &HashMap<String, String>) -> Result<Job, RepositoryError> {
    let get = |k: &str| -> Result<&String, RepositoryError> {
        fields
            .get(k)
            .ok_or_else(|| RepositoryError::Malformed(format!("missing field {k:?}")))
    };

    let status = JobStatus::parse(get("status")?)
        .ok_or_else(|| RepositoryError::Malformed(format!("bad status {:?}", get("status")?)))?;

    let payload: Value = serde_json::from_str(get("payload")?)
        .map_err(|e| RepositoryError::Malformed(format!("bad payload json: {e}")))?;

    let result_raw = get("result")?;
    let result = if result_raw.is_empty() {
        None
    } else {
        Some(
            serde_json::from_str(result_raw)
                .map_err(|e| RepositoryError::Malformed(format!("bad result json: {e}")))?,
        )
    };

    let last_error_raw = get("last_error")?;
    let last_error = if last_error_raw.is_empty() {
        None
    } else {
        Some(last_error_raw.clone())
    };

    let attempts: u32 = get("attempts")?
        .parse()
        .map_err(|e| RepositoryError::Malformed(format!("bad attempts: {e}")))?;

    let created_at = deserialize_dt(get("created_at")?)?
        .ok_or_else(|| RepositoryError::Malformed("created_at must not be empty".to_string()))?;
    let updated_at = deserialize_dt(get("updated_at")?)?
        .ok_or_else(|| RepositoryError::Malformed("updated_at must not be empty".to_string()))?;
    let started_at = deserialize_dt(get("started_at")?)?;

    Ok(Job {
        job_id: job_id.to_string(),
        status,
        payload,
        result,
        last_error,
        attempts,
        created_at,
        updated_at,
        started_at,
    })
}
