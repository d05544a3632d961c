// src/flow/elt_to_bq.rs

use anyhow::{Context, Result};
use std::{future::ready, path::PathBuf};
use tracing::instrument;

use super::{Flow, TaskPolicy};
use crate::config::PipelineConfig;
use crate::process::{read_csv, rename_columns};
use crate::schema::SHIPPING_SCHEMA;
use crate::storage::{fetch_from_storage, BlobStore};
use crate::warehouse::{append, LoadOptions, Provisioner, TableId, Warehouse};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EltReport {
    pub local_path: PathBuf,
    pub table: TableId,
    pub rows_appended: usize,
}

/// Flow "elt to bq": stage the CSV from the bucket, rename columns, make
/// sure dataset and table exist, then append the rows.
///
/// Provisioning is idempotent; the append is not, so a re-run loads the
/// rows a second time. The append task is never re-run; the loader itself
/// only waits out a table that is not yet visible to inserts.
#[instrument(level = "info", skip_all, fields(bucket = store.name(), table = %cfg.table()))]
pub async fn elt_to_bigquery<B, W>(cfg: &PipelineConfig, store: &B, warehouse: &W) -> Result<EltReport>
where
    B: BlobStore + ?Sized,
    W: Warehouse + ?Sized,
{
    let flow = Flow::start("elt to bq", TaskPolicy::from_config(cfg));

    let result = async {
        let local_path = flow
            .task("extract_gcs", || {
                fetch_from_storage(store, &cfg.source_path, &cfg.staging_dir)
            })
            .await
            .context("staging CSV from object storage")?;

        let batch = flow
            .task("turn_into_df", || ready(read_csv(&local_path)))
            .await
            .context("parsing staged CSV")?;

        let renamed = flow
            .task("rename_columns", || ready(rename_columns(&batch)))
            .await
            .context("renaming columns")?;

        let provisioner = Provisioner::new(warehouse, cfg.location.as_str());
        let dataset_id = cfg.dataset();
        let dataset = flow
            .task("create_dataset", || provisioner.ensure_dataset(&dataset_id))
            .await
            .context("provisioning dataset")?;
        let table = flow
            .task("create_table", || {
                provisioner.ensure_table(&dataset, &cfg.table_id, &SHIPPING_SCHEMA)
            })
            .await
            .context("provisioning table")?;

        let load_opts = LoadOptions::from_config(cfg);
        let rows_appended = flow
            .task_with("write_bq", TaskPolicy::once(), || {
                append(warehouse, &table, &SHIPPING_SCHEMA, &renamed, &load_opts)
            })
            .await
            .with_context(|| format!("appending rows to {}", table.id()))?;

        Ok::<_, anyhow::Error>(EltReport {
            local_path,
            table: table.id().clone(),
            rows_appended,
        })
    }
    .await;

    flow.finish(&result);
    result
}
