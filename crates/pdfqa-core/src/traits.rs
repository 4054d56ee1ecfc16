use std::path::Path;

use async_trait::async_trait;

use crate::types::Document;

/// Converts text to fixed-dimension vectors. Implementations are pure over
/// immutable weights and are shared across worker threads without locking.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Persistent document storage. A successful `put`/`delete_all` must be
/// visible to the next `get_all`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert or overwrite by `document.id`.
    async fn put(&self, document: Document) -> anyhow::Result<()>;
    async fn get_all(&self) -> anyhow::Result<Vec<Document>>;
    /// Remove every document, paging internally. Returns the number removed.
    async fn delete_all(&self) -> anyhow::Result<usize>;
}

/// Blocking text extraction from a file on disk.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> anyhow::Result<String>;
}

/// Hosted language model.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}
