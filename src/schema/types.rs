// src/schema/types.rs

use std::fmt;

/// Column types the warehouse table uses.
#[derive(Debug, PartialEq, Clone, Copy, Eq, Hash)]
pub enum FieldType {
    Integer,
    String,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Integer => f.write_str("INTEGER"),
            FieldType::String => f.write_str("STRING"),
        }
    }
}

/// A single column definition of the warehouse table.
#[derive(Debug, PartialEq, Clone, Copy, Eq, Hash)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
    pub required: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            required: true,
        }
    }
}
