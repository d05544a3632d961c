// src/warehouse/load.rs

use arrow::record_batch::RecordBatch;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument, warn};

use super::{Table, Warehouse, WarehouseError};
use crate::config::PipelineConfig;
use crate::process::{conform_to_schema, to_json_rows, ConvertError};
use crate::schema::FieldSpec;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error("appending to {table} failed after {appended} rows")]
    Insert {
        table: String,
        appended: usize,
        #[source]
        source: WarehouseError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Rows per insert request.
    pub chunk_rows: usize,
    /// How many times a first insert answered with "not found" is repeated.
    /// A table created moments ago can take a while to accept streamed rows.
    pub table_ready_retries: u32,
    pub table_ready_backoff: Duration,
}

impl LoadOptions {
    pub fn from_config(cfg: &PipelineConfig) -> Self {
        Self {
            chunk_rows: cfg.load_chunk_rows,
            table_ready_retries: cfg.table_ready_retries,
            table_ready_backoff: Duration::from_millis(cfg.retry_backoff_ms),
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.table_ready_backoff
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// Append every row of `batch` to `table`, `opts.chunk_rows` rows per request.
///
/// Rows already in the table are never modified; loading the same batch
/// twice stores it twice. Returns the number of rows appended.
///
/// Only a "not found" answer before any row has landed is waited out; every
/// other failure is returned with the count of rows already appended.
#[instrument(level = "info", skip_all, fields(table = %table.id(), rows = batch.num_rows()))]
pub async fn append<W: Warehouse + ?Sized>(
    warehouse: &W,
    table: &Table,
    schema: &[FieldSpec],
    batch: &RecordBatch,
    opts: &LoadOptions,
) -> Result<usize, LoadError> {
    let start = Instant::now();
    let conformed = conform_to_schema(batch, schema)?;
    let rows = to_json_rows(&conformed);

    let mut appended = 0;
    for chunk in rows.chunks(opts.chunk_rows.max(1)) {
        let mut waited = 0;
        loop {
            match warehouse.insert_rows(table.id(), chunk.to_vec()).await {
                Ok(()) => break,
                Err(e) if e.is_not_found() && appended == 0 && waited < opts.table_ready_retries => {
                    waited += 1;
                    let delay = opts.backoff(waited);
                    warn!(attempt = waited, delay_ms = delay.as_millis() as u64, "{} not accepting rows yet", table.id());
                    sleep(delay).await;
                }
                Err(source) => {
                    return Err(LoadError::Insert {
                        table: table.id().to_string(),
                        appended,
                        source,
                    })
                }
            }
        }
        appended += chunk.len();
        debug!(appended, "chunk inserted");
    }

    info!(appended, elapsed = ?start.elapsed(), "appended rows to {}", table.id());
    Ok(appended)
}
