// src/warehouse/bigquery.rs

use async_trait::async_trait;
use google_cloud_bigquery::{
    client::{Client, ClientConfig},
    http::{
        dataset::{Dataset as BqDataset, DatasetReference},
        error::Error as HttpError,
        job::query::QueryRequest,
        table::{
            Table as BqTable, TableFieldMode, TableFieldSchema, TableFieldType, TableReference,
            TableSchema,
        },
        tabledata::insert_all::{InsertAllRequest, Row},
    },
    query::row::Row as QueryRow,
};
use tracing::{debug, info, instrument};

use super::{Dataset, DatasetId, JsonRow, Table, TableId, Warehouse, WarehouseError};
use crate::schema::{FieldSpec, FieldType};

/// BigQuery-backed [`Warehouse`], authenticated with Application Default Credentials.
pub struct BigQueryWarehouse {
    client: Client,
}

fn client_error<E>(resource: impl Into<String>, err: E) -> WarehouseError
where
    E: std::error::Error + Send + Sync + 'static,
{
    WarehouseError::Client {
        resource: resource.into(),
        source: Box::new(err),
    }
}

/// 404 becomes `NotFound` so the provisioner can create on absence.
fn map_http_error(resource: impl Into<String>, err: HttpError) -> WarehouseError {
    let resource = resource.into();
    match err {
        HttpError::Response(resp) if resp.code == 404 => WarehouseError::NotFound { resource },
        HttpError::Response(resp) => WarehouseError::Api {
            resource,
            code: resp.code,
            message: resp.message,
        },
        other => client_error(resource, other),
    }
}

fn to_bq_field(field: &FieldSpec) -> TableFieldSchema {
    TableFieldSchema {
        name: field.name.to_string(),
        data_type: match field.ty {
            FieldType::Integer => TableFieldType::Integer,
            FieldType::String => TableFieldType::String,
        },
        mode: Some(if field.required {
            TableFieldMode::Required
        } else {
            TableFieldMode::Nullable
        }),
        ..Default::default()
    }
}

impl BigQueryWarehouse {
    pub async fn connect() -> Result<Self, WarehouseError> {
        let (config, project) = ClientConfig::new_with_auth()
            .await
            .map_err(|e| client_error("bigquery auth", e))?;
        let client = Client::new(config)
            .await
            .map_err(|e| client_error("bigquery client", e))?;
        info!(credentials_project = ?project, "BigQuery client ready");
        Ok(Self { client })
    }
}

#[async_trait]
impl Warehouse for BigQueryWarehouse {
    #[instrument(level = "debug", skip(self), fields(dataset = %id))]
    async fn get_dataset(&self, id: &DatasetId) -> Result<Dataset, WarehouseError> {
        let ds = self
            .client
            .dataset()
            .get(&id.project, &id.dataset)
            .await
            .map_err(|e| map_http_error(id.to_string(), e))?;
        Ok(Dataset {
            id: id.clone(),
            location: ds.location,
        })
    }

    #[instrument(level = "debug", skip(self), fields(dataset = %id))]
    async fn create_dataset(
        &self,
        id: &DatasetId,
        location: &str,
    ) -> Result<Dataset, WarehouseError> {
        let metadata = BqDataset {
            dataset_reference: DatasetReference {
                project_id: id.project.clone(),
                dataset_id: id.dataset.clone(),
            },
            location: location.to_string(),
            ..Default::default()
        };
        let ds = self
            .client
            .dataset()
            .create(&metadata)
            .await
            .map_err(|e| map_http_error(id.to_string(), e))?;
        Ok(Dataset {
            id: id.clone(),
            location: ds.location,
        })
    }

    #[instrument(level = "debug", skip(self), fields(table = %id))]
    async fn get_table(&self, id: &TableId) -> Result<Table, WarehouseError> {
        self.client
            .table()
            .get(&id.dataset.project, &id.dataset.dataset, &id.table)
            .await
            .map_err(|e| map_http_error(id.to_string(), e))?;
        Ok(Table::new(id.clone()))
    }

    #[instrument(level = "debug", skip(self, schema), fields(table = %id))]
    async fn create_table(
        &self,
        id: &TableId,
        schema: &[FieldSpec],
    ) -> Result<Table, WarehouseError> {
        let metadata = BqTable {
            table_reference: TableReference {
                project_id: id.dataset.project.clone(),
                dataset_id: id.dataset.dataset.clone(),
                table_id: id.table.clone(),
            },
            schema: Some(TableSchema {
                fields: schema.iter().map(to_bq_field).collect(),
            }),
            ..Default::default()
        };
        self.client
            .table()
            .create(&metadata)
            .await
            .map_err(|e| map_http_error(id.to_string(), e))?;
        Ok(Table::new(id.clone()))
    }

    #[instrument(level = "debug", skip(self, rows), fields(table = %id, rows = rows.len()))]
    async fn insert_rows(&self, id: &TableId, rows: Vec<JsonRow>) -> Result<(), WarehouseError> {
        let request = InsertAllRequest {
            rows: rows
                .into_iter()
                .map(|json| Row {
                    insert_id: None,
                    json,
                })
                .collect(),
            ..Default::default()
        };
        let resp = self
            .client
            .tabledata()
            .insert(&id.dataset.project, &id.dataset.dataset, &id.table, &request)
            .await
            .map_err(|e| map_http_error(id.to_string(), e))?;

        match resp.insert_errors {
            Some(errors) if !errors.is_empty() => Err(WarehouseError::RowsRejected {
                table: id.to_string(),
                rejected: errors.len(),
                first: format!("{:?}", errors[0]),
            }),
            _ => Ok(()),
        }
    }

    #[instrument(level = "debug", skip(self, sql))]
    async fn query_strings(&self, project: &str, sql: &str) -> Result<Vec<String>, WarehouseError> {
        let request = QueryRequest {
            query: sql.to_string(),
            use_legacy_sql: false,
            ..Default::default()
        };
        let mut rows = self
            .client
            .query::<QueryRow>(project, request)
            .await
            .map_err(|e| client_error("query", e))?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| client_error("query", e))? {
            out.push(
                row.column::<String>(0)
                    .map_err(|e| client_error("query", e))?,
            );
        }
        debug!(rows = out.len(), "query drained");
        Ok(out)
    }
}
