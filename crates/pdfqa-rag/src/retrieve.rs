use anyhow::anyhow;
use std::sync::Arc;

use pdfqa_core::types::RetrievedChunk;
use pdfqa_core::{Error, Result};
use pdfqa_vector::VectorIndexCache;

/// Top-k nearest-neighbour lookup against the current index snapshot.
pub struct Retriever {
    cache: Arc<VectorIndexCache>,
}

impl Retriever {
    pub fn new(cache: Arc<VectorIndexCache>) -> Self { Self { cache } }

    /// Chunks ordered by descending similarity to `query`. Returns fewer than
    /// `k` when the corpus is smaller.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        let pool = self.cache.pool().clone();
        let embedder = Arc::clone(self.cache.embedder());
        let text = vec![query.to_string()];
        let query_vec = pool
            .run("embed_query", move || embedder.embed_batch(&text))
            .await?
            .map_err(Error::Embedding)?
            .pop()
            .ok_or_else(|| Error::Embedding(anyhow!("embedder returned no vector for the query")))?;

        let snapshot = self.cache.ensure_ready().await?;
        pool.run("nn_search", move || snapshot.search(&query_vec, k)).await?.map_err(Error::Embedding)
    }
}
