//! In-memory stand-ins for the cloud services, shared by the unit tests.

use async_trait::async_trait;
use std::{
    collections::HashMap,
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use crate::fetch::{DatasetSource, FetchError};
use crate::schema::FieldSpec;
use crate::storage::{BlobStore, StorageError};
use crate::warehouse::{
    Dataset, DatasetId, JsonRow, Table, TableId, Warehouse, WarehouseError,
};

#[derive(Default)]
pub struct MemoryWarehouse {
    datasets: Mutex<HashMap<DatasetId, Dataset>>,
    tables: Mutex<HashMap<TableId, Vec<FieldSpec>>>,
    rows: Mutex<HashMap<TableId, Vec<JsonRow>>>,
    lookup_error: Mutex<Option<u16>>,
    dataset_create_error: Mutex<Option<u16>>,
    table_create_error: Mutex<Option<u16>>,
    /// Inserts still answered with "not found" before the table accepts rows.
    unready_inserts: AtomicUsize,
    /// `(successful inserts allowed, code)` before every insert fails.
    insert_error: Mutex<Option<(usize, u16)>>,
    accepted_inserts: AtomicUsize,
    query_result: Mutex<Vec<String>>,
    pub queries: Mutex<Vec<String>>,
    pub lookups: AtomicUsize,
    pub dataset_creates: AtomicUsize,
    pub table_creates: AtomicUsize,
    pub insert_calls: AtomicUsize,
}

impl MemoryWarehouse {
    pub fn fail_lookups_with(&self, code: u16) {
        *self.lookup_error.lock().unwrap() = Some(code);
    }

    pub fn fail_dataset_creates_with(&self, code: u16) {
        *self.dataset_create_error.lock().unwrap() = Some(code);
    }

    pub fn fail_table_creates_with(&self, code: u16) {
        *self.table_create_error.lock().unwrap() = Some(code);
    }

    /// The next `attempts` inserts answer "not found", like a freshly created
    /// table the streaming endpoint cannot see yet.
    pub fn table_visible_after(&self, attempts: usize) {
        self.unready_inserts.store(attempts, Ordering::SeqCst);
    }

    /// Accept `chunks` more inserts, then fail every one with `code`.
    pub fn fail_inserts_after(&self, chunks: usize, code: u16) {
        let accepted = self.accepted_inserts.load(Ordering::SeqCst);
        *self.insert_error.lock().unwrap() = Some((accepted + chunks, code));
    }

    pub fn set_query_result(&self, values: &[&str]) {
        *self.query_result.lock().unwrap() = values.iter().map(|v| v.to_string()).collect();
    }

    pub fn table_schema(&self, id: &TableId) -> Option<Vec<FieldSpec>> {
        self.tables.lock().unwrap().get(id).cloned()
    }

    pub fn rows(&self, id: &TableId) -> Vec<JsonRow> {
        self.rows.lock().unwrap().get(id).cloned().unwrap_or_default()
    }

    fn lookup_failure(&self, resource: String) -> Option<WarehouseError> {
        let code = *self.lookup_error.lock().unwrap();
        code.map(|code| simulated(resource, code))
    }
}

fn simulated(resource: String, code: u16) -> WarehouseError {
    if code == 404 {
        WarehouseError::NotFound { resource }
    } else {
        WarehouseError::Api {
            resource,
            code,
            message: "simulated".into(),
        }
    }
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    async fn get_dataset(&self, id: &DatasetId) -> Result<Dataset, WarehouseError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.lookup_failure(id.to_string()) {
            return Err(err);
        }
        self.datasets
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| WarehouseError::NotFound {
                resource: id.to_string(),
            })
    }

    async fn create_dataset(
        &self,
        id: &DatasetId,
        location: &str,
    ) -> Result<Dataset, WarehouseError> {
        self.dataset_creates.fetch_add(1, Ordering::SeqCst);
        let failure = *self.dataset_create_error.lock().unwrap();
        if let Some(code) = failure {
            return Err(simulated(id.to_string(), code));
        }
        let ds = Dataset {
            id: id.clone(),
            location: location.to_string(),
        };
        self.datasets.lock().unwrap().insert(id.clone(), ds.clone());
        Ok(ds)
    }

    async fn get_table(&self, id: &TableId) -> Result<Table, WarehouseError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.lookup_failure(id.to_string()) {
            return Err(err);
        }
        if self.tables.lock().unwrap().contains_key(id) {
            Ok(Table::new(id.clone()))
        } else {
            Err(WarehouseError::NotFound {
                resource: id.to_string(),
            })
        }
    }

    async fn create_table(
        &self,
        id: &TableId,
        schema: &[FieldSpec],
    ) -> Result<Table, WarehouseError> {
        if !self.datasets.lock().unwrap().contains_key(&id.dataset) {
            return Err(WarehouseError::NotFound {
                resource: id.dataset.to_string(),
            });
        }
        self.table_creates.fetch_add(1, Ordering::SeqCst);
        let failure = *self.table_create_error.lock().unwrap();
        if let Some(code) = failure {
            return Err(simulated(id.to_string(), code));
        }
        self.tables
            .lock()
            .unwrap()
            .insert(id.clone(), schema.to_vec());
        Ok(Table::new(id.clone()))
    }

    async fn insert_rows(&self, id: &TableId, rows: Vec<JsonRow>) -> Result<(), WarehouseError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        if !self.tables.lock().unwrap().contains_key(id) {
            return Err(WarehouseError::NotFound {
                resource: id.to_string(),
            });
        }
        if self
            .unready_inserts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(WarehouseError::NotFound {
                resource: id.to_string(),
            });
        }
        let failure = *self.insert_error.lock().unwrap();
        if let Some((allowed, code)) = failure {
            if self.accepted_inserts.load(Ordering::SeqCst) >= allowed {
                return Err(simulated(id.to_string(), code));
            }
        }
        self.accepted_inserts.fetch_add(1, Ordering::SeqCst);
        self.rows
            .lock()
            .unwrap()
            .entry(id.clone())
            .or_default()
            .extend(rows);
        Ok(())
    }

    async fn query_strings(&self, _project: &str, sql: &str) -> Result<Vec<String>, WarehouseError> {
        self.queries.lock().unwrap().push(sql.to_string());
        Ok(self.query_result.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct MemoryBucket {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    pub uploads: AtomicUsize,
}

impl MemoryBucket {
    pub fn put(&self, key: &str, data: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), data.to_vec());
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl BlobStore for MemoryBucket {
    fn name(&self) -> &str {
        "memory"
    }

    async fn put_object(&self, key: &str, data: Vec<u8>) -> Result<(), StorageError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.get(key).ok_or_else(|| StorageError::NotFound {
            bucket: "memory".into(),
            key: key.to_string(),
        })
    }
}

/// Writes a fixed payload into the download directory, like a portal unzip would.
pub struct FakeSource {
    file_name: String,
    contents: Option<String>,
    pub downloads: AtomicUsize,
}

impl FakeSource {
    pub fn new(file_name: &str, contents: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            contents: Some(contents.to_string()),
            downloads: AtomicUsize::new(0),
        }
    }

    /// A source whose download reports success but writes nothing.
    pub fn silent(file_name: &str) -> Self {
        Self {
            file_name: file_name.to_string(),
            contents: None,
            downloads: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl DatasetSource for FakeSource {
    async fn download(&self, _dataset: &str, dest_dir: &Path) -> Result<(), FetchError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        if let Some(contents) = &self.contents {
            tokio::fs::create_dir_all(dest_dir).await?;
            tokio::fs::write(dest_dir.join(&self.file_name), contents).await?;
        }
        Ok(())
    }
}

pub const SAMPLE_CSV: &str = "\
ID,Warehouse_block,Mode_of_Shipment,Customer_care_calls,Customer_rating,Cost_of_the_Product,Prior_purchases,Product_importance,Gender,Discount_offered,Weight_in_gms,Reached.on.Time_Y.N
1,D,Flight,4,2,177,3,low,F,44,1233,1
2,F,Flight,4,5,216,2,low,M,59,3088,1
3,A,Flight,2,2,183,4,low,M,48,3374,1
4,B,Ship,3,3,176,4,medium,M,10,1177,0
";
