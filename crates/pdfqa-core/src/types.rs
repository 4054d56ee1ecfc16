//! Domain types shared by the store, the vector index and the pipelines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type DocumentId = String;

/// An ingested PDF.
///
/// - `id`: the uploaded filename; unique, re-uploading the same name overwrites
/// - `raw_text`: the full extracted text
/// - `chunks`: ordered, overlapping windows over `raw_text`
/// - `ingested_at`: when the document was persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub raw_text: String,
    pub chunks: Vec<String>,
    pub ingested_at: DateTime<Utc>,
}

impl Document {
    pub fn new(id: impl Into<DocumentId>, raw_text: String, chunks: Vec<String>) -> Self {
        Self { id: id.into(), raw_text, chunks, ingested_at: Utc::now() }
    }
}

/// A chunk as seen by the vector index: its text plus the position it came from.
///
/// Chunks have no identity of their own; `doc_id` + `chunk_index` only
/// locate them inside the parent document's list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub doc_id: DocumentId,
    pub chunk_index: usize,
    pub text: String,
}

/// A retrieval result. `score` is cosine similarity; higher is better.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub chunk: IndexedChunk,
    pub score: f32,
}
