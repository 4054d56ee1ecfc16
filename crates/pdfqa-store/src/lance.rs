//! LanceDB-backed document store.
//!
//! One row per document, keyed by `id`. Writes upsert with `merge_insert`, so
//! re-uploading a filename replaces the previous row. Every call opens the
//! table afresh, which always reads the latest committed version.

use anyhow::{anyhow, bail, Context, Result};
use arrow_array::builder::{ListBuilder, StringBuilder};
use arrow_array::{Array, ListArray, RecordBatch, RecordBatchIterator, StringArray, TimestampMillisecondArray};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{connect, Connection, Table};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use pdfqa_core::traits::DocumentStore;
use pdfqa_core::types::Document;

use crate::schema::build_documents_schema;

pub struct LanceDocumentStore {
    db: Connection,
    table_name: String,
    delete_page_size: usize,
}

impl LanceDocumentStore {
    pub async fn open(db_path: &Path, table_name: &str, delete_page_size: usize) -> Result<Self> {
        let db = connect(db_path.to_string_lossy().as_ref()).execute().await?;
        let store = Self { db, table_name: table_name.to_string(), delete_page_size: delete_page_size.max(1) };
        store.ensure_table().await?;
        info!(path = %db_path.display(), table = table_name, "document store opened");
        Ok(store)
    }

    async fn ensure_table(&self) -> Result<()> {
        let names = self.db.table_names().execute().await?;
        if names.contains(&self.table_name) {
            return Ok(());
        }
        let schema = build_documents_schema();
        let iter = RecordBatchIterator::new(Vec::<std::result::Result<RecordBatch, arrow_schema::ArrowError>>::new(), schema);
        self.db.create_table(&self.table_name, Box::new(iter)).execute().await?;
        Ok(())
    }

    async fn table(&self) -> Result<Table> {
        Ok(self.db.open_table(&self.table_name).execute().await?)
    }

    async fn page_of_ids(&self, table: &Table) -> Result<Vec<String>> {
        let mut stream = table
            .query()
            .select(Select::columns(&["id"]))
            .limit(self.delete_page_size)
            .execute()
            .await?;
        let mut ids = Vec::new();
        while let Some(batch) = stream.try_next().await? {
            let col = string_column(&batch, "id")?;
            ids.extend((0..batch.num_rows()).map(|i| col.value(i).to_string()));
        }
        Ok(ids)
    }
}

fn documents_to_record_batch(docs: &[Document]) -> Result<RecordBatch> {
    let mut ids = Vec::with_capacity(docs.len());
    let mut texts = Vec::with_capacity(docs.len());
    let mut ingested = Vec::with_capacity(docs.len());
    let mut chunks = ListBuilder::new(StringBuilder::new());
    for doc in docs {
        ids.push(doc.id.clone());
        texts.push(doc.raw_text.clone());
        ingested.push(doc.ingested_at.timestamp_millis());
        for chunk in &doc.chunks {
            chunks.values().append_value(chunk);
        }
        chunks.append(true);
    }
    Ok(RecordBatch::try_new(
        build_documents_schema(),
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(texts)),
            Arc::new(chunks.finish()),
            Arc::new(TimestampMillisecondArray::from(ingested)),
        ],
    )?)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| anyhow!("missing {name} column"))
}

fn record_batch_to_documents(batch: &RecordBatch) -> Result<Vec<Document>> {
    let id_col = string_column(batch, "id")?;
    let text_col = string_column(batch, "raw_text")?;
    let chunk_col = batch
        .column_by_name("chunks")
        .and_then(|c| c.as_any().downcast_ref::<ListArray>())
        .ok_or_else(|| anyhow!("missing chunks column"))?;
    let ts_col = batch
        .column_by_name("ingested_at")
        .and_then(|c| c.as_any().downcast_ref::<TimestampMillisecondArray>())
        .ok_or_else(|| anyhow!("missing ingested_at column"))?;

    let mut docs = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let chunks = if chunk_col.is_null(i) {
            Vec::new()
        } else {
            let list = chunk_col.value(i);
            let values = list
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| anyhow!("chunks items are not strings"))?;
            values.iter().flatten().map(str::to_string).collect()
        };
        let ingested_at = DateTime::<Utc>::from_timestamp_millis(ts_col.value(i)).unwrap_or_default();
        docs.push(Document { id: id_col.value(i).to_string(), raw_text: text_col.value(i).to_string(), chunks, ingested_at });
    }
    Ok(docs)
}

#[async_trait]
impl DocumentStore for LanceDocumentStore {
    async fn put(&self, document: Document) -> Result<()> {
        let batch = documents_to_record_batch(std::slice::from_ref(&document))?;
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        let table = self.table().await?;
        // Upsert: id is unique
        let mut mi = table.merge_insert(&["id"]);
        mi.when_matched_update_all(None).when_not_matched_insert_all();
        let _ = mi.execute(reader).await.with_context(|| format!("writing document {}", document.id))?;
        debug!(doc_id = %document.id, chunks = document.chunks.len(), "document written");
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<Document>> {
        let table = self.table().await?;
        let mut stream = table.query().execute().await?;
        let mut docs = Vec::new();
        while let Some(batch) = stream.try_next().await? {
            docs.extend(record_batch_to_documents(&batch)?);
        }
        Ok(docs)
    }

    async fn delete_all(&self) -> Result<usize> {
        let table = self.table().await?;
        let mut deleted = 0usize;
        let mut page = 0usize;
        loop {
            let ids = self.page_of_ids(&table).await.with_context(|| format!("listing delete page {page}"))?;
            if ids.is_empty() {
                break;
            }
            let before = table.count_rows(None).await?;
            let filter = format!(
                "id IN ({})",
                ids.iter().map(|id| format!("'{}'", id.replace('\'', "''"))).collect::<Vec<_>>().join(",")
            );
            table.delete(&filter).await.with_context(|| format!("deleting page {page} ({} ids)", ids.len()))?;
            let after = table.count_rows(None).await?;
            if after >= before {
                bail!("delete page {page} removed nothing; aborting after {deleted} documents");
            }
            deleted += before - after;
            page += 1;
            debug!(page, removed = before - after, "delete page committed");
        }
        Ok(deleted)
    }
}
