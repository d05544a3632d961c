// src/storage/mod.rs

pub mod gcs;

pub use gcs::GcsBucket;

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, instrument};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("gs://{bucket}/{key} not found")]
    NotFound { bucket: String, key: String },

    #[error("file i/o on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no object key can be derived from {0}")]
    InvalidPath(PathBuf),

    #[error("request for gs://{bucket}/{key} failed")]
    Remote {
        bucket: String,
        key: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Bucket-style object storage used as the staging area.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Bucket name, for log lines.
    fn name(&self) -> &str;

    async fn put_object(&self, key: &str, data: Vec<u8>) -> Result<(), StorageError>;

    /// Keys of every object whose name starts with `prefix`.
    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, StorageError>;
}

/// Mirror a local path as an object key: `/`-joined normal components,
/// with `.`, `..` and any root dropped.
pub fn object_key(path: &Path) -> Result<String, StorageError> {
    let parts: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        return Err(StorageError::InvalidPath(path.to_path_buf()));
    }
    Ok(parts.join("/"))
}

/// Local destination of `key` under `root`; never escapes `root`.
fn local_path_for(root: &Path, key: &str) -> PathBuf {
    Path::new(key)
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s),
            _ => None,
        })
        .fold(root.to_path_buf(), |acc, part| acc.join(part))
}

/// Upload the file at `local_path` under its mirrored key and return that key.
#[instrument(level = "info", skip(store), fields(bucket = store.name(), file = %local_path.display()))]
pub async fn upload<S: BlobStore + ?Sized>(
    store: &S,
    local_path: &Path,
) -> Result<String, StorageError> {
    let key = object_key(local_path)?;
    let data = fs::read(local_path).await.map_err(io_error(local_path))?;
    let len = data.len();

    store.put_object(&key, data).await?;
    info!(object = %key, bytes = len, "Uploaded to gs://{}/{}", store.name(), key);
    Ok(key)
}

/// Download every object under `remote_path` into `local_root`, keeping
/// relative keys, and return the local path corresponding to `remote_path`.
#[instrument(level = "info", skip(store, local_root), fields(bucket = store.name()))]
pub async fn fetch_from_storage<S: BlobStore + ?Sized>(
    store: &S,
    remote_path: &str,
    local_root: &Path,
) -> Result<PathBuf, StorageError> {
    let prefix = remote_path.trim_end_matches('/');
    let dir_prefix = format!("{prefix}/");
    let keys: Vec<String> = store
        .list_objects(prefix)
        .await?
        .into_iter()
        .filter(|k| k.as_str() == prefix || k.starts_with(&dir_prefix))
        .collect();

    if keys.is_empty() {
        return Err(StorageError::NotFound {
            bucket: store.name().to_string(),
            key: remote_path.to_string(),
        });
    }

    for key in &keys {
        // directory placeholder objects
        if key.ends_with('/') {
            continue;
        }
        let dest = local_path_for(local_root, key);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await.map_err(io_error(parent))?;
        }
        let data = store.get_object(key).await?;
        fs::write(&dest, &data).await.map_err(io_error(&dest))?;
        debug!(object = %key, dest = %dest.display(), bytes = data.len(), "downloaded");
    }

    let local = local_path_for(local_root, prefix);
    info!(objects = keys.len(), local = %local.display(), "fetched from gs://{}/{}", store.name(), prefix);
    Ok(local)
}
