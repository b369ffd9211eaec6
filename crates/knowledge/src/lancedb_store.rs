//! LanceDB-backed vector store.
//!
//! One table per collection with the columns `id`, `text`, `embedding` and
//! `metadata` (a JSON object string). The table is created by the first
//! successful add, taking its vector length from the first embedding.

use std::path::Path;
use std::sync::Arc;

use arrow_array::{
    Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use qa_core::{AppError, AppResult};
use tokio::sync::RwLock;

use crate::embeddings::EmbeddingProvider;
use crate::types::{Metadata, RetrievalResult};
use crate::vector_store::{validate_batch, VectorStore};

const ID_COLUMN: &str = "id";
const TEXT_COLUMN: &str = "text";
const EMBEDDING_COLUMN: &str = "embedding";
const METADATA_COLUMN: &str = "metadata";
const DISTANCE_COLUMN: &str = "_distance";

/// Persistent chunk store backed by a LanceDB table.
pub struct LanceDbStore {
    conn: Connection,
    table_name: String,
    embedder: Arc<dyn EmbeddingProvider>,

    /// `None` until the first add creates the table
    table: RwLock<Option<Table>>,
}

impl LanceDbStore {
    /// Open (or prepare) the collection `table_name` under `dir`.
    pub async fn open(
        dir: &Path,
        table_name: &str,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> AppResult<Self> {
        std::fs::create_dir_all(dir).map_err(|e| {
            AppError::Store(format!("Failed to create store directory {:?}: {}", dir, e))
        })?;

        let uri = dir.to_string_lossy().to_string();
        let conn = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| AppError::Store(format!("Failed to connect to LanceDB: {}", e)))?;

        let table_names = conn
            .table_names()
            .execute()
            .await
            .map_err(|e| AppError::Store(format!("Failed to list tables: {}", e)))?;

        let table = if table_names.iter().any(|name| name == table_name) {
            let table = conn
                .open_table(table_name)
                .execute()
                .await
                .map_err(|e| AppError::Store(format!("Failed to open table: {}", e)))?;
            Some(table)
        } else {
            None
        };

        tracing::info!(
            dir = %dir.display(),
            collection = table_name,
            exists = table.is_some(),
            embedder = embedder.provider_name(),
            "Opened vector store"
        );

        Ok(Self {
            conn,
            table_name: table_name.to_string(),
            embedder,
            table: RwLock::new(table),
        })
    }

    async fn current_table(&self) -> Option<Table> {
        self.table.read().await.clone()
    }

    fn schema(dimensions: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new(ID_COLUMN, DataType::Utf8, false),
            Field::new(TEXT_COLUMN, DataType::Utf8, false),
            Field::new(
                EMBEDDING_COLUMN,
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    dimensions as i32,
                ),
                false,
            ),
            Field::new(METADATA_COLUMN, DataType::Utf8, false),
        ]))
    }

    fn build_batch(
        ids: &[String],
        texts: &[String],
        metadatas: Option<&[Metadata]>,
        embeddings: Vec<Vec<f32>>,
        dimensions: usize,
    ) -> AppResult<RecordBatch> {
        let metadata_json = (0..ids.len())
            .map(|i| match metadatas {
                Some(metadatas) => serde_json::to_string(&metadatas[i]),
                None => Ok("{}".to_string()),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let values = Float32Array::from(embeddings.into_iter().flatten().collect::<Vec<f32>>());
        let embedding_array = FixedSizeListArray::try_new(
            Arc::new(Field::new("item", DataType::Float32, true)),
            dimensions as i32,
            Arc::new(values),
            None,
        )
        .map_err(|e| AppError::Store(format!("Failed to build embedding column: {}", e)))?;

        RecordBatch::try_new(
            Self::schema(dimensions),
            vec![
                Arc::new(StringArray::from(ids.to_vec())),
                Arc::new(StringArray::from(texts.to_vec())),
                Arc::new(embedding_array),
                Arc::new(StringArray::from(metadata_json)),
            ],
        )
        .map_err(|e| AppError::Store(format!("Failed to create RecordBatch: {}", e)))
    }

    async fn table_dimensions(table: &Table) -> AppResult<Option<usize>> {
        let schema = table
            .schema()
            .await
            .map_err(|e| AppError::Store(format!("Failed to read schema: {}", e)))?;

        Ok(schema
            .field_with_name(EMBEDDING_COLUMN)
            .ok()
            .and_then(|field| match field.data_type() {
                DataType::FixedSizeList(_, size) => Some(*size as usize),
                _ => None,
            }))
    }

    async fn existing_ids(table: &Table, ids: &[String]) -> AppResult<Vec<String>> {
        let list = ids
            .iter()
            .map(|id| format!("'{}'", id.replace('\'', "''")))
            .collect::<Vec<_>>()
            .join(", ");

        let mut stream = table
            .query()
            .only_if(format!("{} IN ({})", ID_COLUMN, list))
            .execute()
            .await
            .map_err(|e| AppError::Store(format!("Failed to query ids: {}", e)))?;

        let mut found = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| AppError::Store(format!("Failed to read ids: {}", e)))?
        {
            let column = string_column(&batch, ID_COLUMN)?;
            found.extend((0..batch.num_rows()).map(|i| column.value(i).to_string()));
        }

        Ok(found)
    }

    async fn ensure_new_ids(table: &Table, ids: &[String]) -> AppResult<()> {
        let existing = Self::existing_ids(table, ids).await?;
        if existing.is_empty() {
            Ok(())
        } else {
            Err(AppError::Conflict(format!(
                "ids already exist: {}",
                existing.join(", ")
            )))
        }
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> AppResult<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| AppError::Store(format!("Missing or invalid '{}' column", name)))
}

fn batch_to_results(batch: &RecordBatch) -> AppResult<Vec<RetrievalResult>> {
    let ids = string_column(batch, ID_COLUMN)?;
    let texts = string_column(batch, TEXT_COLUMN)?;
    let metadatas = string_column(batch, METADATA_COLUMN)?;
    let distances = batch
        .column_by_name(DISTANCE_COLUMN)
        .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
        .ok_or_else(|| AppError::Store("Missing '_distance' column".to_string()))?;

    (0..batch.num_rows())
        .map(|i| {
            let metadata: Metadata = serde_json::from_str(metadatas.value(i))
                .map_err(|e| AppError::Store(format!("Failed to parse metadata: {}", e)))?;

            Ok(RetrievalResult {
                id: ids.value(i).to_string(),
                document: texts.value(i).to_string(),
                metadata,
                distance: distances.value(i),
            })
        })
        .collect()
}

#[async_trait::async_trait]
impl VectorStore for LanceDbStore {
    async fn add(
        &self,
        ids: &[String],
        texts: &[String],
        metadatas: Option<&[Metadata]>,
    ) -> AppResult<usize> {
        validate_batch(ids, texts, metadatas)?;
        if ids.is_empty() {
            return Ok(0);
        }

        // Known ids fail before the embedding call.
        if let Some(table) = self.current_table().await {
            Self::ensure_new_ids(&table, ids).await?;
        }

        let embeddings = self.embedder.embed_batch(texts).await?;
        if embeddings.len() != texts.len() {
            return Err(AppError::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        // Locked only for the final id check and the write.
        let mut guard = self.table.write().await;

        let expected_dimensions = match guard.as_ref() {
            Some(table) => {
                Self::ensure_new_ids(table, ids).await?;
                Self::table_dimensions(table).await?
            }
            None => None,
        };

        let dimensions = expected_dimensions.unwrap_or_else(|| embeddings[0].len());
        if dimensions == 0 || embeddings.iter().any(|e| e.len() != dimensions) {
            return Err(AppError::Store(format!(
                "Embedding dimension mismatch: expected {}",
                dimensions
            )));
        }

        let batch = Self::build_batch(ids, texts, metadatas, embeddings, dimensions)?;
        let schema = batch.schema();
        let rows = RecordBatchIterator::new(vec![Ok(batch)], schema);

        match guard.as_ref() {
            Some(table) => {
                table
                    .add(rows)
                    .execute()
                    .await
                    .map_err(|e| AppError::Store(format!("Failed to add chunks: {}", e)))?;
            }
            None => {
                let table = self
                    .conn
                    .create_table(&self.table_name, rows)
                    .execute()
                    .await
                    .map_err(|e| AppError::Store(format!("Failed to create table: {}", e)))?;
                tracing::info!(collection = %self.table_name, dimensions, "Created collection");
                *guard = Some(table);
            }
        }
        drop(guard);

        tracing::debug!(count = ids.len(), "Inserted chunks");
        Ok(ids.len())
    }

    async fn search(&self, query: &str, k: usize) -> AppResult<Vec<RetrievalResult>> {
        if k == 0 {
            return Err(AppError::Validation("k must be at least 1".to_string()));
        }

        let Some(table) = self.current_table().await else {
            return Ok(Vec::new());
        };

        let rows = table
            .count_rows(None)
            .await
            .map_err(|e| AppError::Store(format!("Failed to count rows: {}", e)))?;
        if rows == 0 {
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed(query).await?;
        if let Some(dimensions) = Self::table_dimensions(&table).await? {
            if vector.len() != dimensions {
                return Err(AppError::Store(format!(
                    "Query embedding dimension mismatch: expected {}, got {}",
                    dimensions,
                    vector.len()
                )));
            }
        }

        let mut stream = table
            .query()
            .nearest_to(vector)
            .map_err(|e| AppError::Store(format!("Failed to create query: {}", e)))?
            .column(EMBEDDING_COLUMN)
            .distance_type(DistanceType::Cosine)
            .limit(k)
            .execute()
            .await
            .map_err(|e| AppError::Store(format!("Failed to execute search: {}", e)))?;

        let mut results = Vec::new();
        while let Some(batch) = stream
            .try_next()
            .await
            .map_err(|e| AppError::Store(format!("Failed to collect results: {}", e)))?
        {
            results.extend(batch_to_results(&batch)?);
        }

        results.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        results.truncate(k);

        tracing::debug!(k, returned = results.len(), "Vector search complete");
        Ok(results)
    }

    async fn count(&self) -> AppResult<usize> {
        match self.current_table().await {
            Some(table) => table
                .count_rows(None)
                .await
                .map_err(|e| AppError::Store(format!("Failed to count rows: {}", e))),
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockProvider;
    use serde_json::json;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    async fn store(dir: &TempDir) -> LanceDbStore {
        LanceDbStore::open(dir.path(), "qa_docs", Arc::new(MockProvider::new(64)))
            .await
            .unwrap()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    /// Mock embedder that stalls on multi-text batches.
    #[derive(Debug)]
    struct SlowBatchProvider {
        inner: MockProvider,
        delay: Duration,
    }

    #[async_trait::async_trait]
    impl EmbeddingProvider for SlowBatchProvider {
        fn provider_name(&self) -> &str {
            "slow-mock"
        }

        fn model_name(&self) -> &str {
            "slow-mock"
        }

        async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
            if texts.len() > 1 {
                tokio::time::sleep(self.delay).await;
            }
            self.inner.embed_batch(texts).await
        }
    }

    #[tokio::test]
    async fn test_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.search("anything", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_and_search() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        let texts = strings(&[
            "Platform AI offers hosted model inference",
            "Token AI pricing is billed per thousand tokens",
            "The weather in the mountains is cold",
        ]);
        let metadatas = vec![
            json!({"source": "url", "chunk": 0}).as_object().cloned().unwrap(),
            json!({"source": "url", "chunk": 1}).as_object().cloned().unwrap(),
            json!({"source": "url", "chunk": 2}).as_object().cloned().unwrap(),
        ];

        let added = store
            .add(&strings(&["a", "b", "c"]), &texts, Some(&metadatas))
            .await
            .unwrap();
        assert_eq!(added, 3);
        assert_eq!(store.count().await.unwrap(), 3);

        let results = store.search(&texts[1], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "b");
        assert_eq!(results[0].document, texts[1]);
        assert_eq!(results[0].metadata["chunk"], json!(1));
        assert!(results[0].distance <= results[1].distance);
        assert!(results[0].distance.abs() < 1e-4);
    }

    #[tokio::test]
    async fn test_k_larger_than_collection() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        store
            .add(&strings(&["a", "b"]), &strings(&["one", "two"]), None)
            .await
            .unwrap();

        let results = store.search("one", 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].metadata, Metadata::new());
    }

    #[tokio::test]
    async fn test_zero_k_rejected() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        assert!(matches!(
            store.search("q", 0).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_duplicate_ids_rejected() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;
        store
            .add(&strings(&["a"]), &strings(&["first"]), None)
            .await
            .unwrap();

        let result = store
            .add(&strings(&["b", "a"]), &strings(&["second", "again"]), None)
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mismatch_inserts_nothing() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).await;

        let result = store
            .add(&strings(&["a", "b"]), &strings(&["only one"]), None)
            .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reopen_keeps_rows() {
        let dir = TempDir::new().unwrap();
        {
            let store = store(&dir).await;
            store
                .add(
                    &strings(&["a", "b"]),
                    &strings(&["rust ownership rules", "mountain weather report"]),
                    None,
                )
                .await
                .unwrap();
        }

        let store = store(&dir).await;
        assert_eq!(store.count().await.unwrap(), 2);
        let results = store.search("mountain weather report", 1).await.unwrap();
        assert_eq!(results[0].id, "b");
    }

    #[tokio::test]
    async fn test_search_not_blocked_by_embedding_add() {
        let dir = TempDir::new().unwrap();
        let embedder = Arc::new(SlowBatchProvider {
            inner: MockProvider::new(64),
            delay: Duration::from_secs(3),
        });
        let store = Arc::new(LanceDbStore::open(dir.path(), "qa_docs", embedder).await.unwrap());

        store
            .add(&strings(&["seed"]), &strings(&["seed text"]), None)
            .await
            .unwrap();

        let writer = store.clone();
        let add = tokio::spawn(async move {
            writer
                .add(&strings(&["a", "b"]), &strings(&["first", "second"]), None)
                .await
        });
        tokio::time::sleep(Duration::from_millis(200)).await;

        let started = Instant::now();
        let results = store.search("seed text", 1).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(results[0].id, "seed");

        assert_eq!(add.await.unwrap().unwrap(), 2);
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_adds_insert_once() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(store(&dir).await);

        let first = store.clone();
        let second = store.clone();
        let (a, b) = tokio::join!(
            async move { first.add(&strings(&["x"]), &strings(&["shared text"]), None).await },
            async move { second.add(&strings(&["x"]), &strings(&["shared text"]), None).await },
        );

        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
