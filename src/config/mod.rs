use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Replicate API token. Required; startup fails without it.
    pub replicate_api_token: String,

    /// Root directory for stored images (references, uploads, results).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Seconds between provider status polls for an in-flight job.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Maximum wall-clock seconds to wait on the provider before a job is
    /// marked failed.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_poll_interval_secs() -> u64 {
    2
}

fn default_poll_timeout_secs() -> u64 {
    300
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Directory for reference color images.
    pub fn references_dir(&self) -> PathBuf {
        self.data_dir.join("references")
    }

    /// Directory for uploaded infrared images.
    pub fn uploads_dir(&self) -> PathBuf {
        self.data_dir.join("uploads")
    }

    /// Directory for colorized result images.
    pub fn results_dir(&self) -> PathBuf {
        self.data_dir.join("results")
    }

    /// Create the data directories if they don't exist.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for dir in [
            self.references_dir(),
            self.uploads_dir(),
            self.results_dir(),
        ] {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }

    /// Build a config rooted at an explicit data directory, with defaults
    /// for everything else.
    pub fn for_data_dir(data_dir: impl AsRef<Path>, replicate_api_token: &str) -> Self {
        Self {
            bind_addr: default_bind_addr(),
            replicate_api_token: replicate_api_token.to_string(),
            data_dir: data_dir.as_ref().to_path_buf(),
            poll_interval_secs: default_poll_interval_secs(),
            poll_timeout_secs: default_poll_timeout_secs(),
        }
    }
}
