// src/flow/csv_to_gcs.rs

use anyhow::{Context, Result};
use tracing::instrument;

use super::{Flow, TaskPolicy};
use crate::config::PipelineConfig;
use crate::fetch::{fetch_from_portal, DatasetSource};
use crate::storage::{upload, BlobStore};

/// Flow "CSV to GCS": pull the dataset from the portal (unless already
/// present) and upload the CSV to the bucket. Returns the object key.
#[instrument(level = "info", skip_all, fields(bucket = store.name()))]
pub async fn csv_to_gcs<S, B>(cfg: &PipelineConfig, source: &S, store: &B) -> Result<String>
where
    S: DatasetSource + ?Sized,
    B: BlobStore + ?Sized,
{
    let flow = Flow::start("CSV to GCS", TaskPolicy::from_config(cfg));

    let result = async {
        let fetched = flow
            .task("extract_data", || {
                fetch_from_portal(source, &cfg.kaggle_dataset, &cfg.download_dir, &cfg.file_name)
            })
            .await
            .context("extracting dataset from portal")?;

        let key = flow
            .task("write_gcp", || upload(store, fetched.path()))
            .await
            .with_context(|| format!("uploading {}", fetched.path().display()))?;
        Ok::<_, anyhow::Error>(key)
    }
    .await;

    flow.finish(&result);
    result
}
