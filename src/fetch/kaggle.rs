// src/fetch/kaggle.rs

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::{
    env,
    io::Cursor,
    path::{Path, PathBuf},
};
use tokio::process::Command;
use tracing::{debug, info, instrument};
use url::Url;
use zip::ZipArchive;

use super::{DatasetSource, FetchError};

const KAGGLE_API: &str = "https://www.kaggle.com/api/v1/";

/// Downloads through the `kaggle` command-line tool.
pub struct KaggleCli {
    program: String,
}

impl Default for KaggleCli {
    fn default() -> Self {
        Self::with_program("kaggle")
    }
}

impl KaggleCli {
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl DatasetSource for KaggleCli {
    #[instrument(level = "debug", skip(self))]
    async fn download(&self, dataset: &str, dest_dir: &Path) -> Result<(), FetchError> {
        let output = Command::new(&self.program)
            .args(["datasets", "download", "-d", dataset, "--unzip", "-o", "-p"])
            .arg(dest_dir)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => FetchError::ToolMissing {
                    tool: self.program.clone(),
                },
                _ => FetchError::Io(e),
            })?;

        if !output.status.success() {
            return Err(FetchError::Command {
                tool: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        debug!(stdout = %String::from_utf8_lossy(&output.stdout).trim(), "kaggle finished");
        Ok(())
    }
}

/// API token, as found in `~/.kaggle/kaggle.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct KaggleCredentials {
    pub username: String,
    pub key: String,
}

impl KaggleCredentials {
    /// `KAGGLE_USERNAME`/`KAGGLE_KEY`, falling back to `$KAGGLE_CONFIG_DIR/kaggle.json`
    /// or `~/.kaggle/kaggle.json`.
    pub fn discover() -> Result<Self, FetchError> {
        if let (Ok(username), Ok(key)) = (env::var("KAGGLE_USERNAME"), env::var("KAGGLE_KEY")) {
            return Ok(Self { username, key });
        }
        let dir = env::var_os("KAGGLE_CONFIG_DIR")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|h| PathBuf::from(h).join(".kaggle")))
            .ok_or_else(|| FetchError::Credentials("cannot locate kaggle.json".into()))?;
        Self::from_file(dir.join("kaggle.json"))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FetchError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| FetchError::Credentials(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| FetchError::Credentials(format!("{}: {}", path.display(), e)))
    }
}

/// Downloads the dataset archive from the Kaggle REST API and unpacks it.
pub struct KaggleHttp {
    client: Client,
    credentials: KaggleCredentials,
    base: Url,
}

impl KaggleHttp {
    pub fn new(client: Client, credentials: KaggleCredentials) -> Result<Self, FetchError> {
        Ok(Self {
            client,
            credentials,
            base: Url::parse(KAGGLE_API)?,
        })
    }

    pub fn download_url(&self, dataset: &str) -> Result<Url, FetchError> {
        Ok(self.base.join(&format!("datasets/download/{dataset}"))?)
    }
}

#[async_trait]
impl DatasetSource for KaggleHttp {
    #[instrument(level = "debug", skip(self))]
    async fn download(&self, dataset: &str, dest_dir: &Path) -> Result<(), FetchError> {
        let url = self.download_url(dataset)?;
        let bytes = self
            .client
            .get(url.as_str())
            .basic_auth(&self.credentials.username, Some(&self.credentials.key))
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        info!(%url, bytes = bytes.len(), "downloaded archive");

        let dest = dest_dir.to_path_buf();
        tokio::task::spawn_blocking(move || unpack_archive(&bytes, &dest)).await??;
        Ok(())
    }
}

/// Extract every entry of a ZIP archive held in memory into `dest_dir`.
pub fn unpack_archive(bytes: &[u8], dest_dir: &Path) -> Result<usize, FetchError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let entries = archive.len();
    archive.extract(dest_dir)?;
    debug!(entries, dest = %dest_dir.display(), "archive unpacked");
    Ok(entries)
}
