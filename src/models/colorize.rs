use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::JobStatus;

/// Parsed form of a colorization request (after splitting the
/// comma-separated reference id field).
#[derive(Debug, Deserialize, Validate)]
pub struct ColorizeRequest {
    #[garde(length(min = 1))]
    pub reference_ids: Vec<Uuid>,
}

/// Response after accepting a colorization request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ColorizeResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub message: String,
}

/// Response for a job status poll.
#[derive(Debug, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}
