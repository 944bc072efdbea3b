use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::{storage::ImageStore, tracker::JobTracker};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<ImageStore>,
    pub tracker: Arc<JobTracker>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<ImageStore>, tracker: Arc<JobTracker>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            tracker,
        }
    }
}
