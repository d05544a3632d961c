// src/flow/query.rs

use anyhow::{Context, Result};
use tracing::info;

use super::{Flow, TaskPolicy};
use crate::config::PipelineConfig;
use crate::warehouse::{sample_column, Warehouse};

const SAMPLE_COLUMN: &str = "Warehouse_block";

/// Read back a sample of the loaded table.
pub async fn query_bigquery<W: Warehouse + ?Sized>(
    cfg: &PipelineConfig,
    warehouse: &W,
) -> Result<Vec<String>> {
    let flow = Flow::start("query bq", TaskPolicy::from_config(cfg));
    let table = cfg.table();

    let result = flow
        .task("query_bq", || {
            sample_column(warehouse, &table, SAMPLE_COLUMN, cfg.query_limit)
        })
        .await
        .with_context(|| format!("querying {table}"));

    if let Ok(values) = &result {
        for (i, v) in values.iter().enumerate() {
            info!(row = i, "{SAMPLE_COLUMN} = {v}");
        }
    }
    flow.finish(&result);
    result
}
