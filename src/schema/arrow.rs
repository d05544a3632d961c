// src/schema/arrow.rs

use arrow::datatypes::{DataType, Field as ArrowField, Schema as ArrowSchema};
use std::sync::Arc;

use super::types::{FieldSpec, FieldType};

/// Map a warehouse column type onto the Arrow type rows are cast to before loading.
///
/// - INTEGER → Int64
/// - STRING  → Utf8
pub fn map_to_arrow_type(ty: FieldType) -> DataType {
    match ty {
        FieldType::Integer => DataType::Int64,
        FieldType::String => DataType::Utf8,
    }
}

/// Build an ArrowSchema (inside an Arc) from a slice of `FieldSpec`s.
pub fn build_arrow_schema(fields: &[FieldSpec]) -> Arc<ArrowSchema> {
    let fields: Vec<ArrowField> = fields
        .iter()
        .map(|f| ArrowField::new(f.name, map_to_arrow_type(f.ty), !f.required))
        .collect();

    Arc::new(ArrowSchema::new(fields))
}
