// src/process/rename.rs

use arrow::{
    datatypes::{Field, Schema},
    error::ArrowError,
    record_batch::RecordBatch,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Source columns whose names the warehouse rejects, and their replacements.
pub const WAREHOUSE_RENAMES: [(&str, &str); 2] = [
    ("ID", "Warehouse_ID"),
    ("Reached.on.Time_Y.N", "Reached_on_Time_Y_N"),
];

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("column '{0}' not found")]
    MissingColumn(String),

    #[error("renaming to '{0}' would duplicate an existing column")]
    DuplicateColumn(String),

    #[error(transparent)]
    Arrow(#[from] ArrowError),
}

/// Rename the two source columns to warehouse-safe names.
pub fn rename_columns(batch: &RecordBatch) -> Result<RecordBatch, TransformError> {
    rename_with(batch, &WAREHOUSE_RENAMES)
}

/// Apply `(from, to)` renames; data and every other column are left as-is.
pub fn rename_with(
    batch: &RecordBatch,
    renames: &[(&str, &str)],
) -> Result<RecordBatch, TransformError> {
    let schema = batch.schema();
    let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();

    for &(from, to) in renames {
        let idx = schema
            .index_of(from)
            .map_err(|_| TransformError::MissingColumn(from.to_string()))?;
        if fields.iter().any(|f| f.name() == to) {
            return Err(TransformError::DuplicateColumn(to.to_string()));
        }
        fields[idx] = fields[idx].clone().with_name(to);
        debug!(from, to, "renamed column");
    }

    let renamed = Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone()));
    Ok(RecordBatch::try_new(renamed, batch.columns().to_vec())?)
}
