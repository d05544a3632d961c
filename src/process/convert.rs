// src/process/convert.rs

use arrow::{
    array::{Array, ArrayRef, AsArray},
    compute::{cast_with_options, CastOptions},
    datatypes::{DataType, Int64Type},
    error::ArrowError,
    record_batch::RecordBatch,
    util::display::array_value_to_string,
};
use serde_json::Value;
use std::collections::BTreeSet;
use thiserror::Error;

use crate::schema::{build_arrow_schema, map_to_arrow_type, FieldSpec};
use crate::warehouse::JsonRow;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("columns do not match table schema (missing: {missing:?}, unexpected: {unexpected:?})")]
    ColumnMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("column '{column}' cannot be cast to {target}")]
    Cast {
        column: String,
        target: DataType,
        #[source]
        source: ArrowError,
    },

    #[error("column '{column}' is REQUIRED but row {row} is null")]
    NullInRequired { column: String, row: usize },

    #[error(transparent)]
    Arrow(#[from] ArrowError),
}

/// Reorder and cast `batch` to exactly the columns of `fields`.
///
/// The batch must carry the same column set as the schema; extra or missing
/// columns are an error rather than being dropped or padded.
pub fn conform_to_schema(
    batch: &RecordBatch,
    fields: &[FieldSpec],
) -> Result<RecordBatch, ConvertError> {
    let schema = batch.schema();
    let have: BTreeSet<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    let want: BTreeSet<&str> = fields.iter().map(|f| f.name).collect();
    if have != want {
        return Err(ConvertError::ColumnMismatch {
            missing: want.difference(&have).map(|s| s.to_string()).collect(),
            unexpected: have.difference(&want).map(|s| s.to_string()).collect(),
        });
    }

    let strict = CastOptions {
        safe: false,
        ..Default::default()
    };

    let mut out = Vec::with_capacity(fields.len());
    for field in fields {
        let col = batch
            .column_by_name(field.name)
            .ok_or_else(|| ConvertError::ColumnMismatch {
                missing: vec![field.name.to_string()],
                unexpected: vec![],
            })?;
        let target = map_to_arrow_type(field.ty);
        let cast: ArrayRef =
            cast_with_options(col, &target, &strict).map_err(|source| ConvertError::Cast {
                column: field.name.to_string(),
                target: target.clone(),
                source,
            })?;

        if field.required && cast.null_count() > 0 {
            let row = (0..cast.len()).find(|&i| cast.is_null(i)).unwrap_or(0);
            return Err(ConvertError::NullInRequired {
                column: field.name.to_string(),
                row,
            });
        }
        out.push(cast);
    }

    Ok(RecordBatch::try_new(build_arrow_schema(fields), out)?)
}

fn cell(col: &ArrayRef, row: usize) -> Value {
    if col.is_null(row) {
        return Value::Null;
    }
    match col.data_type() {
        DataType::Int64 => Value::from(col.as_primitive::<Int64Type>().value(row)),
        DataType::Utf8 => Value::from(col.as_string::<i32>().value(row)),
        _ => array_value_to_string(col, row)
            .map(Value::from)
            .unwrap_or(Value::Null),
    }
}

/// Encode each row as a `{column: value}` JSON object.
pub fn to_json_rows(batch: &RecordBatch) -> Vec<JsonRow> {
    let schema = batch.schema();
    (0..batch.num_rows())
        .map(|row| {
            schema
                .fields()
                .iter()
                .zip(batch.columns())
                .map(|(field, col)| (field.name().clone(), cell(col, row)))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldType, SHIPPING_SCHEMA};
    use arrow::array::{Int64Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use std::sync::Arc;

    const TWO_FIELDS: [FieldSpec; 2] = [
        FieldSpec::required("Warehouse_ID", FieldType::Integer),
        FieldSpec::required("Gender", FieldType::String),
    ];

    fn batch(fields: Vec<Field>, cols: Vec<ArrayRef>) -> RecordBatch {
        RecordBatch::try_new(Arc::new(Schema::new(fields)), cols).unwrap()
    }

    #[test]
    fn reorders_and_casts_to_schema() {
        let input = batch(
            vec![
                Field::new("Gender", DataType::Utf8, true),
                Field::new("Warehouse_ID", DataType::Utf8, true),
            ],
            vec![
                Arc::new(StringArray::from(vec!["F", "M"])),
                Arc::new(StringArray::from(vec!["1", "2"])),
            ],
        );

        let out = conform_to_schema(&input, &TWO_FIELDS).unwrap();
        assert_eq!(out.schema().field(0).name(), "Warehouse_ID");
        assert_eq!(out.schema().field(0).data_type(), &DataType::Int64);

        let rows = to_json_rows(&out);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Warehouse_ID"], Value::from(1));
        assert_eq!(rows[1]["Gender"], Value::from("M"));
    }

    #[test]
    fn column_set_mismatch_fails_instead_of_truncating() {
        let input = batch(
            vec![
                Field::new("Warehouse_ID", DataType::Int64, false),
                Field::new("Gender", DataType::Utf8, false),
                Field::new("Extra", DataType::Utf8, false),
            ],
            vec![
                Arc::new(Int64Array::from(vec![1])),
                Arc::new(StringArray::from(vec!["F"])),
                Arc::new(StringArray::from(vec!["x"])),
            ],
        );

        let err = conform_to_schema(&input, &TWO_FIELDS).unwrap_err();
        match err {
            ConvertError::ColumnMismatch {
                missing,
                unexpected,
            } => {
                assert!(missing.is_empty());
                assert_eq!(unexpected, vec!["Extra".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = conform_to_schema(&input, &SHIPPING_SCHEMA).unwrap_err();
        assert!(matches!(err, ConvertError::ColumnMismatch { .. }));
    }

    #[test]
    fn unparseable_integer_is_a_cast_error() {
        let input = batch(
            vec![
                Field::new("Warehouse_ID", DataType::Utf8, true),
                Field::new("Gender", DataType::Utf8, true),
            ],
            vec![
                Arc::new(StringArray::from(vec!["abc"])),
                Arc::new(StringArray::from(vec!["F"])),
            ],
        );
        let err = conform_to_schema(&input, &TWO_FIELDS).unwrap_err();
        assert!(matches!(err, ConvertError::Cast { column, .. } if column == "Warehouse_ID"));
    }

    #[test]
    fn null_in_required_column_is_rejected() {
        let input = batch(
            vec![
                Field::new("Warehouse_ID", DataType::Int64, true),
                Field::new("Gender", DataType::Utf8, true),
            ],
            vec![
                Arc::new(Int64Array::from(vec![Some(1), None])),
                Arc::new(StringArray::from(vec!["F", "M"])),
            ],
        );
        let err = conform_to_schema(&input, &TWO_FIELDS).unwrap_err();
        assert!(matches!(err, ConvertError::NullInRequired { row: 1, .. }));
    }
}
