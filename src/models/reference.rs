use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A reference color image used as a style exemplar for colorization.
/// Immutable after creation; deleted explicitly by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceImage {
    pub id: Uuid,
    /// Original filename as uploaded by the user.
    pub filename: String,
    pub content_type: String,
    /// Public URL under /data/references/.
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// Response body for GET /api/references.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReferenceImageList {
    pub references: Vec<ReferenceImage>,
}
