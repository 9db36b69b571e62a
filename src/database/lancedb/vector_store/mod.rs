
use super::{Collection, EmbeddingRecord};
use crate::{AdvisorError, config::Config};
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, Int64Array, RecordBatchIterator, StringArray,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection, DistanceType,
    query::{ExecutableQuery, QueryBase},
};
use itertools::Itertools;
use std::sync::Arc;
use tracing::{debug, info};

/// Vector database store using LanceDB, one table per collection, cosine
/// distance metric throughout.
pub struct VectorStore {
    connection: Connection,
    vector_dimension: usize,
}

/// One nearest-neighbor hit from a collection search
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub item_id: i64,
    pub name: String,
    pub payload: String,
    /// Cosine similarity, `1 - distance`, in [-1, 1]
    pub similarity: f32,
    pub distance: f32,
}

impl VectorStore {
    /// Open (or create) the vector database under the configured base
    /// directory.
    ///
    /// The vector dimension is fixed by configuration. An existing table
    /// with a different dimension is a configuration error, not something
    /// to recover from at runtime.
    #[inline]
    pub async fn new(config: &Config) -> Result<Self, AdvisorError> {
        let db_path = config.vector_database_path();
        debug!("Initializing LanceDB at path: {:?}", db_path);

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AdvisorError::Store(format!("Failed to create vector database directory: {}", e))
            })?;
        }

        let uri = format!("file://{}", db_path.display());

        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| AdvisorError::Store(format!("Failed to connect to LanceDB: {}", e)))?;

        let store = Self {
            connection,
            vector_dimension: config.ollama.embedding_dimension as usize,
        };

        for collection in Collection::ALL {
            store.initialize_table(collection).await?;
        }

        info!("Vector store initialized successfully");
        Ok(store)
    }

    /// Ensure a collection's table exists and carries the configured
    /// vector dimension.
    async fn initialize_table(&self, collection: Collection) -> Result<(), AdvisorError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| AdvisorError::Store(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&collection.table_name().to_string()) {
            let existing = self.detect_vector_dimension(collection).await?;
            if existing != self.vector_dimension {
                return Err(AdvisorError::Config(format!(
                    "Vector dimension mismatch for collection '{}': table has {}, config says {}",
                    collection, existing, self.vector_dimension
                )));
            }
            return Ok(());
        }

        debug!(
            "Creating vector table '{}' with dimension {}",
            collection, self.vector_dimension
        );

        let schema = self.create_schema();
        self.connection
            .create_empty_table(collection.table_name(), schema)
            .execute()
            .await
            .map_err(|e| {
                AdvisorError::Store(format!("Failed to create table '{}': {}", collection, e))
            })?;

        Ok(())
    }

    /// Read the vector dimension recorded in an existing table schema
    async fn detect_vector_dimension(&self, collection: Collection) -> Result<usize, AdvisorError> {
        let table = self
            .connection
            .open_table(collection.table_name())
            .execute()
            .await
            .map_err(|e| AdvisorError::Store(format!("Failed to open table: {}", e)))?;

        let schema = table
            .schema()
            .await
            .map_err(|e| AdvisorError::Store(format!("Failed to get table schema: {}", e)))?;

        for field in schema.fields() {
            if field.name() == "vector" {
                if let DataType::FixedSizeList(_, size) = field.data_type() {
                    return Ok(*size as usize);
                }
            }
        }

        Err(AdvisorError::Store(format!(
            "Could not find vector column in collection '{}'",
            collection
        )))
    }

    fn create_schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    self.vector_dimension as i32,
                ),
                false,
            ),
            Field::new("item_id", DataType::Int64, false),
            Field::new("name", DataType::Utf8, false),
            Field::new("payload", DataType::Utf8, false),
            Field::new("created_at", DataType::Utf8, false),
        ]))
    }

    /// Insert or replace embeddings in a collection. Existing records with
    /// the same ids are removed first so re-ingestion never duplicates.
    #[inline]
    pub async fn upsert_embeddings(
        &self,
        collection: Collection,
        records: Vec<EmbeddingRecord>,
    ) -> Result<(), AdvisorError> {
        if records.is_empty() {
            debug!("No embeddings to store for '{}'", collection);
            return Ok(());
        }

        for record in &records {
            if record.vector.len() != self.vector_dimension {
                return Err(AdvisorError::Config(format!(
                    "Embedding for item '{}' has dimension {}, store is configured for {}",
                    record.id,
                    record.vector.len(),
                    self.vector_dimension
                )));
            }
        }

        debug!(
            "Storing batch of {} embeddings into '{}'",
            records.len(),
            collection
        );

        let table = self
            .connection
            .open_table(collection.table_name())
            .execute()
            .await
            .map_err(|e| AdvisorError::Store(format!("Failed to open table: {}", e)))?;

        let id_list = records.iter().map(|r| format!("'{}'", r.id)).join(", ");
        table
            .delete(&format!("id IN ({})", id_list))
            .await
            .map_err(|e| {
                AdvisorError::Store(format!("Failed to clear existing embeddings: {}", e))
            })?;

        let record_batch = self.create_record_batch(&records)?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| AdvisorError::Store(format!("Failed to insert embeddings: {}", e)))?;

        info!(
            "Stored {} embeddings in collection '{}'",
            records.len(),
            collection
        );
        Ok(())
    }

    fn create_record_batch(&self, records: &[EmbeddingRecord]) -> Result<RecordBatch, AdvisorError> {
        let len = records.len();

        let mut ids = Vec::with_capacity(len);
        let mut item_ids = Vec::with_capacity(len);
        let mut names = Vec::with_capacity(len);
        let mut payloads = Vec::with_capacity(len);
        let mut created_ats = Vec::with_capacity(len);
        let mut flat_values = Vec::with_capacity(len * self.vector_dimension);

        for record in records {
            ids.push(record.id.as_str());
            item_ids.push(record.metadata.item_id);
            names.push(record.metadata.name.as_str());
            payloads.push(record.metadata.payload.as_str());
            created_ats.push(record.metadata.created_at.as_str());
            flat_values.extend_from_slice(&record.vector);
        }

        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array = FixedSizeListArray::try_new(
            field,
            self.vector_dimension as i32,
            Arc::new(values_array),
            None,
        )
        .map_err(|e| AdvisorError::Store(format!("Failed to create vector array: {}", e)))?;

        let arrays: Vec<Arc<dyn arrow::array::Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(Int64Array::from(item_ids)),
            Arc::new(StringArray::from(names)),
            Arc::new(StringArray::from(payloads)),
            Arc::new(StringArray::from(created_ats)),
        ];

        RecordBatch::try_new(self.create_schema(), arrays)
            .map_err(|e| AdvisorError::Store(format!("Failed to create record batch: {}", e)))
    }

    /// Nearest-neighbor search within one collection by cosine distance.
    ///
    /// Results come back ordered by ascending distance; similarity is
    /// reported as `1 - distance`.
    #[inline]
    pub async fn search(
        &self,
        collection: Collection,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchHit>, AdvisorError> {
        if query_vector.len() != self.vector_dimension {
            return Err(AdvisorError::Config(format!(
                "Query vector has dimension {}, store is configured for {}",
                query_vector.len(),
                self.vector_dimension
            )));
        }

        debug!(
            "Searching '{}' for {} nearest neighbors",
            collection, limit
        );

        let table = self
            .connection
            .open_table(collection.table_name())
            .execute()
            .await
            .map_err(|e| AdvisorError::Store(format!("Failed to open table: {}", e)))?;

        let results = table
            .vector_search(query_vector)
            .map_err(|e| AdvisorError::Store(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .distance_type(DistanceType::Cosine)
            .limit(limit)
            .execute()
            .await
            .map_err(|e| AdvisorError::Store(format!("Failed to execute search: {}", e)))?;

        self.parse_search_results_stream(results).await
    }

    async fn parse_search_results_stream(
        &self,
        mut results: lancedb::arrow::SendableRecordBatchStream,
    ) -> Result<Vec<SearchHit>, AdvisorError> {
        let mut hits = Vec::new();

        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| AdvisorError::Store(format!("Failed to read result stream: {}", e)))?
        {
            hits.extend(parse_search_batch(&batch)?);
        }

        debug!("Parsed {} search hits from stream", hits.len());
        Ok(hits)
    }

    /// Total number of embeddings stored for a collection
    #[inline]
    pub async fn count_embeddings(&self, collection: Collection) -> Result<u64, AdvisorError> {
        let table = self
            .connection
            .open_table(collection.table_name())
            .execute()
            .await
            .map_err(|e| AdvisorError::Store(format!("Failed to open table: {}", e)))?;

        let count = table
            .count_rows(None)
            .await
            .map_err(|e| AdvisorError::Store(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }

    /// Drop and recreate a collection's table. Used by `ingest --rebuild`.
    #[inline]
    pub async fn reset_collection(&self, collection: Collection) -> Result<(), AdvisorError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| AdvisorError::Store(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&collection.table_name().to_string()) {
            info!("Dropping vector table '{}'", collection);
            self.connection
                .drop_table(collection.table_name())
                .await
                .map_err(|e| AdvisorError::Store(format!("Failed to drop table: {}", e)))?;
        }

        self.initialize_table(collection).await
    }
}

/// Parse a single record batch from search results
fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchHit>, AdvisorError> {
    let num_rows = batch.num_rows();
    let mut hits = Vec::with_capacity(num_rows);

    let item_ids = batch
        .column_by_name("item_id")
        .ok_or_else(|| AdvisorError::Store("Missing item_id column".to_string()))?
        .as_any()
        .downcast_ref::<Int64Array>()
        .ok_or_else(|| AdvisorError::Store("Invalid item_id column type".to_string()))?;

    let names = batch
        .column_by_name("name")
        .ok_or_else(|| AdvisorError::Store("Missing name column".to_string()))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| AdvisorError::Store("Invalid name column type".to_string()))?;

    let payloads = batch
        .column_by_name("payload")
        .ok_or_else(|| AdvisorError::Store("Missing payload column".to_string()))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| AdvisorError::Store("Invalid payload column type".to_string()))?;

    let distances = batch
        .column_by_name("_distance")
        .map(|col| col.as_any().downcast_ref::<Float32Array>());

    for row in 0..num_rows {
        let distance = distances
            .flatten()
            .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

        hits.push(SearchHit {
            item_id: item_ids.value(row),
            name: names.value(row).to_string(),
            payload: payloads.value(row).to_string(),
            similarity: 1.0 - distance,
            distance,
        });
    }

    Ok(hits)
}
