// src/warehouse/query.rs

use tracing::info;

use super::{TableId, Warehouse, WarehouseError};

/// Build the read query for one column of `table`.
pub fn sample_sql(table: &TableId, column: &str, limit: usize) -> String {
    format!("SELECT {column}\nFROM `{table}`\nLIMIT {limit};")
}

/// Read up to `limit` values of `column` from `table`.
pub async fn sample_column<W: Warehouse + ?Sized>(
    warehouse: &W,
    table: &TableId,
    column: &str,
    limit: usize,
) -> Result<Vec<String>, WarehouseError> {
    let sql = sample_sql(table, column, limit);
    let values = warehouse
        .query_strings(&table.dataset.project, &sql)
        .await?;
    info!(
        rows = values.len(),
        "Query has been made for {}.{}", table.dataset.dataset, table.table
    );
    Ok(values)
}
