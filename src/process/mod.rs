// src/process/mod.rs

pub mod convert;
pub mod rename;

pub use convert::{conform_to_schema, to_json_rows, ConvertError};
pub use rename::{rename_columns, TransformError};

use arrow::{
    compute::concat_batches,
    csv::{reader::Format, ReaderBuilder},
    error::ArrowError,
    record_batch::RecordBatch,
};
use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use tracing::{debug, instrument};

/// Rows sampled when inferring column types from the CSV.
const INFER_ROWS: usize = 1_000;
const READ_BATCH_ROWS: usize = 8_192;

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("opening {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ArrowError,
    },
}

/// Parse a headered CSV file into one in-memory `RecordBatch`.
///
/// Column types are inferred from the first rows: whole numbers become
/// Int64, anything unparseable stays Utf8.
#[instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn read_csv(path: impl AsRef<Path>) -> Result<RecordBatch, CsvError> {
    let path = path.as_ref();
    let open = || {
        File::open(path).map_err(|source| CsvError::Open {
            path: path.to_path_buf(),
            source,
        })
    };
    let parse_err = |source| CsvError::Parse {
        path: path.to_path_buf(),
        source,
    };

    let (schema, sampled) = Format::default()
        .with_header(true)
        .infer_schema(BufReader::new(open()?), Some(INFER_ROWS))
        .map_err(parse_err)?;
    let schema = Arc::new(schema);
    debug!(columns = schema.fields().len(), sampled, "inferred CSV schema");

    let reader = ReaderBuilder::new(schema.clone())
        .with_header(true)
        .with_batch_size(READ_BATCH_ROWS)
        .build(open()?)
        .map_err(parse_err)?;
    let batches = reader.collect::<Result<Vec<_>, _>>().map_err(parse_err)?;

    let batch = concat_batches(&schema, &batches).map_err(parse_err)?;
    debug!(rows = batch.num_rows(), "CSV loaded");
    Ok(batch)
}
