use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::models::reference::ReferenceImage;

/// File extension for a validated upload content type.
pub fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "jpg",
    }
}

/// MIME type for a stored image file, derived from its extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

/// An uploaded infrared image persisted under the uploads namespace.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub id: Uuid,
    pub stored_filename: String,
    pub path: PathBuf,
    pub url: String,
}

/// File-backed store for reference, upload, and result images.
///
/// Images live under three directories addressed by generated id;
/// reference metadata is persisted to `references.json` and mirrored in
/// memory behind a `RwLock`. Fresh ids per upload mean concurrent writes
/// never touch the same file.
pub struct ImageStore {
    references_dir: PathBuf,
    uploads_dir: PathBuf,
    results_dir: PathBuf,
    meta_path: PathBuf,
    references: RwLock<HashMap<Uuid, ReferenceImage>>,
}

impl ImageStore {
    /// Open the store rooted at the config's data directory, creating the
    /// namespace directories and loading any existing reference metadata.
    pub async fn open(config: &AppConfig) -> Result<Self, StorageError> {
        config.ensure_directories()?;

        let meta_path = config.data_dir.join("references.json");
        let references = if meta_path.exists() {
            let content = tokio::fs::read_to_string(&meta_path).await?;
            if content.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            HashMap::new()
        };

        Ok(Self {
            references_dir: config.references_dir(),
            uploads_dir: config.uploads_dir(),
            results_dir: config.results_dir(),
            meta_path,
            references: RwLock::new(references),
        })
    }

    /// Save a reference color image and record its metadata.
    pub async fn save_reference(
        &self,
        filename: &str,
        content_type: &str,
        content: &[u8],
    ) -> Result<ReferenceImage, StorageError> {
        let id = Uuid::new_v4();
        let stored_filename = format!("{}.{}", id, extension_for(content_type));
        let path = self.references_dir.join(&stored_filename);

        tokio::fs::write(&path, content).await?;

        let reference = ReferenceImage {
            id,
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            url: format!("/data/references/{stored_filename}"),
            created_at: Utc::now(),
        };

        let mut references = self.references.write().await;
        references.insert(id, reference.clone());
        self.persist_meta(&references).await?;

        tracing::debug!(reference_id = %id, filename, "Saved reference image");
        Ok(reference)
    }

    /// All reference images, oldest first.
    pub async fn list_references(&self) -> Vec<ReferenceImage> {
        let references = self.references.read().await;
        let mut list: Vec<_> = references.values().cloned().collect();
        list.sort_by_key(|r| r.created_at);
        list
    }

    pub async fn get_reference(&self, id: Uuid) -> Option<ReferenceImage> {
        self.references.read().await.get(&id).cloned()
    }

    /// Delete a reference image and its metadata entry.
    pub async fn delete_reference(&self, id: Uuid) -> Result<(), StorageError> {
        let mut references = self.references.write().await;
        let reference = references
            .remove(&id)
            .ok_or(StorageError::ReferenceNotFound(id))?;

        let path = self.reference_path(&reference);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            // Metadata without a file is stale state; removing the entry
            // alone is the right outcome.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(reference_id = %id, "Reference file already missing");
            }
            Err(e) => return Err(e.into()),
        }

        self.persist_meta(&references).await?;
        tracing::debug!(reference_id = %id, "Deleted reference image");
        Ok(())
    }

    /// Filesystem path of a reference image's bytes.
    pub fn reference_path(&self, reference: &ReferenceImage) -> PathBuf {
        let stored = reference.url.rsplit('/').next().unwrap_or_default();
        self.references_dir.join(stored)
    }

    /// Save an uploaded infrared image under a fresh id.
    pub async fn save_upload(
        &self,
        content_type: &str,
        content: &[u8],
    ) -> Result<StoredUpload, StorageError> {
        let id = Uuid::new_v4();
        let stored_filename = format!("{}.{}", id, extension_for(content_type));
        let path = self.uploads_dir.join(&stored_filename);

        tokio::fs::write(&path, content).await?;

        Ok(StoredUpload {
            id,
            url: format!("/data/uploads/{stored_filename}"),
            path,
            stored_filename,
        })
    }

    /// Save a colorization result image, keyed by job id. Returns the
    /// public URL of the stored result.
    pub async fn save_result(&self, job_id: Uuid, content: &[u8]) -> Result<String, StorageError> {
        let stored_filename = format!("{job_id}.png");
        let path = self.results_dir.join(&stored_filename);

        tokio::fs::write(&path, content).await?;

        Ok(format!("/data/results/{stored_filename}"))
    }

    /// Filesystem path of a stored result by its public URL.
    pub fn result_path(&self, result_url: &str) -> PathBuf {
        let stored = result_url.rsplit('/').next().unwrap_or_default();
        self.results_dir.join(stored)
    }

    async fn persist_meta(
        &self,
        references: &HashMap<Uuid, ReferenceImage>,
    ) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(references)?;
        tokio::fs::write(&self.meta_path, json).await?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode reference metadata: {0}")]
    Meta(#[from] serde_json::Error),

    #[error("Reference image not found: {0}")]
    ReferenceNotFound(Uuid),
}
