use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

/// Status of a colorization job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Completed and Failed are terminal; no transition leaves them.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// A colorization job, tracking one request from submission to terminal
/// outcome. Owned exclusively by the [`JobTracker`]; holds images by id
/// only, never their bytes.
///
/// [`JobTracker`]: crate::services::tracker::JobTracker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorizeJob {
    pub id: Uuid,
    pub status: JobStatus,
    /// Stored filename of the uploaded infrared image (under uploads/).
    pub infrared_filename: String,
    /// Public URL of the uploaded infrared image.
    pub infrared_image_url: String,
    /// Selected reference image ids; always non-empty.
    pub reference_ids: Vec<Uuid>,
    /// Opaque provider handle, present once submission succeeded.
    pub prediction_id: Option<String>,
    /// Set if and only if status is Completed.
    pub result_url: Option<String>,
    /// Set if and only if status is Failed.
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ColorizeJob {
    pub fn new(
        infrared_filename: String,
        infrared_image_url: String,
        reference_ids: Vec<Uuid>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Pending,
            infrared_filename,
            infrared_image_url,
            reference_ids,
            prediction_id: None,
            result_url: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }
}
