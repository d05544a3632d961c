// src/config.rs

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::warehouse::{DatasetId, TableId};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Which backend pulls the dataset from the data portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DownloadVia {
    /// Shell out to the `kaggle` command-line tool.
    Cli,
    /// Talk to the Kaggle REST API directly.
    Http,
}

/// Everything the flows need to know about where data lives.
///
/// Every field has a default, so an empty YAML document (or no file at all)
/// yields a runnable configuration.
/// Unknown keys are rejected so a misspelt key cannot silently fall back
/// to its default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
    /// Geographic location for newly created datasets.
    pub location: String,
    pub bucket: String,
    /// Object key of the CSV inside the bucket.
    pub source_path: String,
    /// Local root that storage downloads are mirrored into.
    pub staging_dir: PathBuf,
    /// Local directory the portal download unpacks into.
    pub download_dir: PathBuf,
    pub file_name: String,
    /// `<owner>/<dataset>` slug on the portal.
    pub kaggle_dataset: String,
    pub download_via: DownloadVia,
    /// Rows per streaming-insert request.
    pub load_chunk_rows: usize,
    pub query_limit: usize,
    pub task_retries: u32,
    pub retry_backoff_ms: u64,
    /// Waits for a newly created table to accept streamed rows.
    pub table_ready_retries: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            project_id: "dtc-de-ab".into(),
            dataset_id: "e_commerce_shipping_data".into(),
            table_id: "shipping_data".into(),
            location: "EU".into(),
            bucket: "e-commerce-shipping-data".into(),
            source_path: "e-commerce_data/data/Train.csv".into(),
            staging_dir: PathBuf::from("data"),
            download_dir: PathBuf::from("e-commerce_data/data"),
            file_name: "Train.csv".into(),
            kaggle_dataset: "prachi13/customer-analytics".into(),
            download_via: DownloadVia::Cli,
            load_chunk_rows: 500,
            query_limit: 10,
            task_retries: 0,
            retry_backoff_ms: 1_000,
            table_ready_retries: 6,
        }
    }
}

impl PipelineConfig {
    /// Load from a YAML file, or fall back to defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let cfg = match path {
            None => Self::default(),
            Some(p) => {
                let raw = std::fs::read_to_string(p).map_err(|source| ConfigError::Read {
                    path: p.to_path_buf(),
                    source,
                })?;
                Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
                    path: p.to_path_buf(),
                    source,
                })?
            }
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        // an empty document deserializes to unit, not to a map
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("project_id", &self.project_id),
            ("dataset_id", &self.dataset_id),
            ("table_id", &self.table_id),
            ("bucket", &self.bucket),
            ("source_path", &self.source_path),
            ("file_name", &self.file_name),
            ("kaggle_dataset", &self.kaggle_dataset),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{name} must not be empty")));
            }
        }
        if self.load_chunk_rows == 0 {
            return Err(ConfigError::Invalid("load_chunk_rows must be > 0".into()));
        }
        Ok(())
    }

    pub fn dataset(&self) -> DatasetId {
        DatasetId::new(&self.project_id, &self.dataset_id)
    }

    pub fn table(&self) -> TableId {
        TableId::new(self.dataset(), &self.table_id)
    }

    /// Where the portal download is expected to land.
    pub fn local_csv_path(&self) -> PathBuf {
        self.download_dir.join(&self.file_name)
    }
}
