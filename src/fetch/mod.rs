// src/fetch/mod.rs

pub mod kaggle;

pub use kaggle::{KaggleCli, KaggleCredentials, KaggleHttp};

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{info, instrument};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    #[error("unpacking archive")]
    Archive(#[from] zip::result::ZipError),

    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),

    #[error("portal credentials: {0}")]
    Credentials(String),

    #[error("`{tool}` is not installed or not on PATH")]
    ToolMissing { tool: String },

    #[error("`{tool}` exited with {status}: {stderr}")]
    Command {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("download finished but {0} is still missing")]
    MissingAfterDownload(PathBuf),
}

/// Somewhere a named dataset can be downloaded and unpacked from.
#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Download `dataset` and unpack its files into `dest_dir`.
    async fn download(&self, dataset: &str, dest_dir: &Path) -> Result<(), FetchError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    AlreadyPresent(PathBuf),
    Downloaded(PathBuf),
}

impl FetchOutcome {
    pub fn path(&self) -> &Path {
        match self {
            FetchOutcome::AlreadyPresent(p) | FetchOutcome::Downloaded(p) => p,
        }
    }
}

/// Make sure `download_dir/file_name` exists locally, downloading `dataset`
/// from `source` only when it does not.
#[instrument(level = "info", skip(source))]
pub async fn fetch_from_portal<S: DatasetSource + ?Sized>(
    source: &S,
    dataset: &str,
    download_dir: &Path,
    file_name: &str,
) -> Result<FetchOutcome, FetchError> {
    let target = download_dir.join(file_name);
    if fs::try_exists(&target).await? {
        info!(path = %target.display(), "File Already exist");
        return Ok(FetchOutcome::AlreadyPresent(target));
    }

    fs::create_dir_all(download_dir).await?;
    source.download(dataset, download_dir).await?;

    if !fs::try_exists(&target).await? {
        return Err(FetchError::MissingAfterDownload(target));
    }
    info!(path = %target.display(), "Downloaded File");
    Ok(FetchOutcome::Downloaded(target))
}
