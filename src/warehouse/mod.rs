// src/warehouse/mod.rs

pub mod bigquery;
pub mod load;
pub mod provision;
pub mod query;

pub use bigquery::BigQueryWarehouse;
pub use load::{append, LoadError, LoadOptions};
pub use provision::{ProvisionError, Provisioner};
pub use query::sample_column;

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

use crate::schema::FieldSpec;

/// A row as sent to the streaming-insert endpoint.
pub type JsonRow = serde_json::Map<String, serde_json::Value>;

/// `<project>.<dataset>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DatasetId {
    pub project: String,
    pub dataset: String,
}

impl DatasetId {
    pub fn new(project: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            dataset: dataset.into(),
        }
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.project, self.dataset)
    }
}

/// `<project>.<dataset>.<table>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableId {
    pub dataset: DatasetId,
    pub table: String,
}

impl TableId {
    pub fn new(dataset: DatasetId, table: impl Into<String>) -> Self {
        Self {
            dataset,
            table: table.into(),
        }
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.dataset, self.table)
    }
}

/// A dataset known to exist in the warehouse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dataset {
    pub id: DatasetId,
    pub location: String,
}

/// A table known to exist in the warehouse.
///
/// Only constructed inside this crate by [`Warehouse`] lookups and creations,
/// so holding one means the destination of a load has been provisioned.
///
/// ```compile_fail
/// use shipping_elt::warehouse::{DatasetId, Table, TableId};
///
/// let id = TableId::new(DatasetId::new("dtc-de-ab", "e_commerce_shipping_data"), "shipping_data");
/// let forged = Table { id };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    id: TableId,
}

impl Table {
    pub(crate) fn new(id: TableId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> &TableId {
        &self.id
    }
}

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("{resource}: warehouse returned {code}: {message}")]
    Api {
        resource: String,
        code: u16,
        message: String,
    },

    #[error("{resource}: client call failed")]
    Client {
        resource: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{table}: {rejected} rows rejected, first error: {first}")]
    RowsRejected {
        table: String,
        rejected: usize,
        first: String,
    },
}

impl WarehouseError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, WarehouseError::NotFound { .. })
    }
}

/// Control- and data-plane calls the pipeline makes against the warehouse.
#[async_trait]
pub trait Warehouse: Send + Sync {
    async fn get_dataset(&self, id: &DatasetId) -> Result<Dataset, WarehouseError>;

    async fn create_dataset(&self, id: &DatasetId, location: &str)
        -> Result<Dataset, WarehouseError>;

    async fn get_table(&self, id: &TableId) -> Result<Table, WarehouseError>;

    async fn create_table(
        &self,
        id: &TableId,
        schema: &[FieldSpec],
    ) -> Result<Table, WarehouseError>;

    /// Append rows; existing rows are never touched.
    async fn insert_rows(&self, id: &TableId, rows: Vec<JsonRow>) -> Result<(), WarehouseError>;

    /// Run `sql` and return the first column of every result row as a string.
    async fn query_strings(&self, project: &str, sql: &str) -> Result<Vec<String>, WarehouseError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_handle_exposes_its_id() {
        let id = TableId::new(DatasetId::new("dtc-de-ab", "e_commerce_shipping_data"), "shipping_data");
        let table = Table::new(id.clone());
        assert_eq!(table.id(), &id);
    }

    #[test]
    fn identifiers_render_fully_qualified() {
        let ds = DatasetId::new("dtc-de-ab", "e_commerce_shipping_data");
        assert_eq!(ds.to_string(), "dtc-de-ab.e_commerce_shipping_data");

        let tbl = TableId::new(ds, "shipping_data");
        assert_eq!(
            tbl.to_string(),
            "dtc-de-ab.e_commerce_shipping_data.shipping_data"
        );
    }

    #[test]
    fn not_found_is_distinguished() {
        let nf = WarehouseError::NotFound {
            resource: "p.d".into(),
        };
        let api = WarehouseError::Api {
            resource: "p.d".into(),
            code: 403,
            message: "denied".into(),
        };
        assert!(nf.is_not_found());
        assert!(!api.is_not_found());
    }
}
