use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::job::{ColorizeJob, JobStatus};
use crate::services::replicate::{ImageInput, InferenceClient, ProviderState};
use crate::services::storage::{mime_for_path, ImageStore, StoredUpload};

/// Tracks colorization jobs from submission to terminal outcome.
///
/// Jobs live in memory only; they are not required to survive a restart.
/// Each job record is replaced wholesale (`Arc` swap) on every transition,
/// so concurrent status reads never observe a half-written record. After
/// creation, a job's record is mutated only by its own background task.
pub struct JobTracker {
    jobs: RwLock<HashMap<Uuid, Arc<ColorizeJob>>>,
    store: Arc<ImageStore>,
    client: Arc<dyn InferenceClient>,
    poll_interval: Duration,
    poll_timeout: Duration,
}

impl JobTracker {
    pub fn new(
        store: Arc<ImageStore>,
        client: Arc<dyn InferenceClient>,
        poll_interval: Duration,
        poll_timeout: Duration,
    ) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            store,
            client,
            poll_interval,
            poll_timeout,
        }
    }

    /// Accept a colorization request and start its background completion
    /// task. Returns the new job id immediately; the provider is never
    /// contacted on this path.
    ///
    /// Callers validate the reference ids against the store before
    /// submitting; the background task still copes with files that
    /// disappear in between.
    pub async fn submit(self: &Arc<Self>, upload: StoredUpload, reference_ids: Vec<Uuid>) -> Uuid {
        let job = ColorizeJob::new(upload.stored_filename, upload.url, reference_ids);
        let job_id = job.id;

        self.jobs.write().await.insert(job_id, Arc::new(job));
        metrics::counter!("colorize_jobs_total").increment(1);

        let tracker = Arc::clone(self);
        tokio::spawn(async move {
            tracker.run(job_id, upload.path).await;
        });

        tracing::info!(%job_id, "Colorization job accepted");
        job_id
    }

    /// Current immutable snapshot of a job, if it exists. Never blocks on
    /// provider work.
    pub async fn get(&self, job_id: Uuid) -> Option<Arc<ColorizeJob>> {
        self.jobs.read().await.get(&job_id).cloned()
    }

    /// Background completion protocol for one job: provider submission,
    /// status polling until a terminal state or the wall-clock timeout,
    /// then result download and storage.
    async fn run(self: Arc<Self>, job_id: Uuid, infrared_path: PathBuf) {
        let started = Instant::now();

        let references = match self.load_reference_inputs(job_id).await {
            Ok(refs) => refs,
            Err(message) => {
                self.fail(job_id, message).await;
                return;
            }
        };

        let infrared = match tokio::fs::read(&infrared_path).await {
            Ok(bytes) => ImageInput {
                content_type: mime_for_path(&infrared_path).to_string(),
                bytes,
            },
            Err(e) => {
                self.fail(job_id, format!("failed to read uploaded image: {e}"))
                    .await;
                return;
            }
        };

        let prediction_id = match self.client.submit(&references, &infrared).await {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(%job_id, error = %e, "Provider submission failed");
                self.fail(job_id, e.to_string()).await;
                return;
            }
        };

        self.update(job_id, |job| {
            job.prediction_id = Some(prediction_id.clone());
            job.status = JobStatus::Processing;
        })
        .await;
        tracing::info!(%job_id, %prediction_id, "Provider accepted job, polling for completion");

        let deadline = Instant::now() + self.poll_timeout;
        loop {
            match self.client.poll(&prediction_id).await {
                Ok(prediction) => match prediction.state {
                    ProviderState::Succeeded => {
                        self.finish(job_id, started, prediction.output_url).await;
                        return;
                    }
                    ProviderState::Failed => {
                        self.fail(
                            job_id,
                            prediction
                                .error
                                .unwrap_or_else(|| "colorization failed".to_string()),
                        )
                        .await;
                        return;
                    }
                    ProviderState::Canceled => {
                        self.fail(job_id, "colorization was canceled by the provider".to_string())
                            .await;
                        return;
                    }
                    ProviderState::Starting | ProviderState::Processing => {}
                },
                // Transient communication failures are retried until the
                // deadline.
                Err(e) => {
                    tracing::warn!(%job_id, error = %e, "Provider status poll failed, retrying");
                }
            }

            if Instant::now() >= deadline {
                self.fail(
                    job_id,
                    format!(
                        "colorization timed out after {}s",
                        self.poll_timeout.as_secs()
                    ),
                )
                .await;
                return;
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Download the provider output, persist it as a result image, and
    /// complete the job.
    async fn finish(&self, job_id: Uuid, started: Instant, output_url: Option<String>) {
        let Some(output_url) = output_url else {
            self.fail(job_id, "provider reported success without an output".to_string())
                .await;
            return;
        };

        let bytes = match self.client.download(&output_url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.fail(job_id, format!("failed to download result: {e}"))
                    .await;
                return;
            }
        };

        let result_url = match self.store.save_result(job_id, &bytes).await {
            Ok(url) => url,
            Err(e) => {
                self.fail(job_id, format!("failed to save result: {e}")).await;
                return;
            }
        };

        self.update(job_id, |job| {
            job.result_url = Some(result_url.clone());
            job.status = JobStatus::Completed;
        })
        .await;

        metrics::counter!("colorize_jobs_completed").increment(1);
        metrics::histogram!("colorize_processing_seconds").record(started.elapsed().as_secs_f64());
        tracing::info!(%job_id, "Colorization completed");
    }

    async fn fail(&self, job_id: Uuid, message: String) {
        tracing::warn!(%job_id, error = %message, "Colorization failed");
        self.update(job_id, |job| {
            job.error_message = Some(message.clone());
            job.status = JobStatus::Failed;
        })
        .await;
        metrics::counter!("colorize_jobs_failed").increment(1);
    }

    /// Apply a transition by replacing the job's record atomically.
    /// Transitions out of a terminal state are ignored.
    async fn update<F>(&self, job_id: Uuid, apply: F)
    where
        F: FnOnce(&mut ColorizeJob),
    {
        let mut jobs = self.jobs.write().await;
        let Some(current) = jobs.get(&job_id) else {
            tracing::error!(%job_id, "Transition for unknown job dropped");
            return;
        };
        if current.status.is_terminal() {
            tracing::warn!(%job_id, status = %current.status, "Ignoring transition out of terminal state");
            return;
        }

        let mut next = (**current).clone();
        apply(&mut next);
        next.updated_at = Utc::now();
        jobs.insert(job_id, Arc::new(next));
    }

    /// Resolve the job's reference ids to image bytes for the provider,
    /// preserving the user's selection order.
    async fn load_reference_inputs(&self, job_id: Uuid) -> Result<Vec<ImageInput>, String> {
        let job = self
            .get(job_id)
            .await
            .ok_or_else(|| "job record missing".to_string())?;

        let mut inputs = Vec::with_capacity(job.reference_ids.len());
        for reference_id in &job.reference_ids {
            let reference = self
                .store
                .get_reference(*reference_id)
                .await
                .ok_or_else(|| format!("reference image not found: {reference_id}"))?;
            let path = self.store.reference_path(&reference);
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| format!("failed to read reference image {reference_id}: {e}"))?;
            inputs.push(ImageInput {
                bytes,
                content_type: reference.content_type,
            });
        }
        Ok(inputs)
    }
}
