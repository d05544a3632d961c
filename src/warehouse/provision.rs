// src/warehouse/provision.rs

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{info, instrument};

use super::{Dataset, DatasetId, Table, TableId, Warehouse, WarehouseError};
use crate::schema::FieldSpec;

static PROJECT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9-]{4,28}[a-z0-9]$").expect("project regex"));
static DATASET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]{1,1024}$").expect("dataset regex"));
static TABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,1024}$").expect("table regex"));

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("malformed {kind} identifier '{value}'")]
    InvalidIdentifier { kind: &'static str, value: String },

    #[error("looking up {resource}")]
    Lookup {
        resource: String,
        #[source]
        source: WarehouseError,
    },

    #[error("creating {resource}")]
    Create {
        resource: String,
        #[source]
        source: WarehouseError,
    },
}

fn check(kind: &'static str, re: &Regex, value: &str) -> Result<(), ProvisionError> {
    if re.is_match(value) {
        Ok(())
    } else {
        Err(ProvisionError::InvalidIdentifier {
            kind,
            value: value.to_string(),
        })
    }
}

/// Creates datasets and tables on first use and leaves existing ones alone.
pub struct Provisioner<'a, W: Warehouse + ?Sized> {
    warehouse: &'a W,
    location: String,
}

impl<'a, W: Warehouse + ?Sized> Provisioner<'a, W> {
    pub fn new(warehouse: &'a W, location: impl Into<String>) -> Self {
        Self {
            warehouse,
            location: location.into(),
        }
    }

    /// Return the dataset `id`, creating it in the configured location if absent.
    #[instrument(level = "debug", skip(self), fields(dataset = %id))]
    pub async fn ensure_dataset(&self, id: &DatasetId) -> Result<Dataset, ProvisionError> {
        check("project", &PROJECT_RE, &id.project)?;
        check("dataset", &DATASET_RE, &id.dataset)?;

        match self.warehouse.get_dataset(id).await {
            Ok(existing) => {
                info!("{} this dataset already exist", existing.id);
                Ok(existing)
            }
            Err(WarehouseError::NotFound { .. }) => {
                let created = self
                    .warehouse
                    .create_dataset(id, &self.location)
                    .await
                    .map_err(|source| ProvisionError::Create {
                        resource: id.to_string(),
                        source,
                    })?;
                info!(location = %created.location, "Created dataset {}", created.id);
                Ok(created)
            }
            Err(source) => Err(ProvisionError::Lookup {
                resource: id.to_string(),
                source,
            }),
        }
    }

    /// Return `dataset.<table>`, creating it with `schema` if absent.
    ///
    /// Taking the [`Dataset`] handle ties table creation to a dataset that is
    /// known to exist.
    #[instrument(level = "debug", skip(self, dataset, schema), fields(dataset = %dataset.id))]
    pub async fn ensure_table(
        &self,
        dataset: &Dataset,
        table: &str,
        schema: &[FieldSpec],
    ) -> Result<Table, ProvisionError> {
        check("table", &TABLE_RE, table)?;
        let id = TableId::new(dataset.id.clone(), table);

        match self.warehouse.get_table(&id).await {
            Ok(existing) => {
                info!("{} this table already exist", existing.id());
                Ok(existing)
            }
            Err(WarehouseError::NotFound { .. }) => {
                let created = self
                    .warehouse
                    .create_table(&id, schema)
                    .await
                    .map_err(|source| ProvisionError::Create {
                        resource: id.to_string(),
                        source,
                    })?;
                info!(fields = schema.len(), "Created table {}", created.id());
                Ok(created)
            }
            Err(source) => Err(ProvisionError::Lookup {
                resource: id.to_string(),
                source,
            }),
        }
    }
}
