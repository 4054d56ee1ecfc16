//! Retrieval-augmented question answering over uploaded PDFs.

pub mod extract;
pub mod generate;
pub mod ingest;
pub mod prompt;
pub mod query;
pub mod retrieve;

use std::sync::Arc;

use tracing::info;

use pdfqa_core::config::Settings;
use pdfqa_core::offload::WorkerPool;
use pdfqa_core::traits::{DocumentStore, Embedder, Generator, TextExtractor};
use pdfqa_core::{Error, Result};
use pdfqa_store::LanceDocumentStore;
use pdfqa_vector::VectorIndexCache;

pub use extract::PdfExtractor;
pub use generate::GeminiGenerator;
pub use ingest::{IngestOutcome, IngestionPipeline};
pub use prompt::build_prompt;
pub use query::{Answer, QueryPipeline};
pub use retrieve::Retriever;

/// The process-wide pieces shared by every request: one embedder, one
/// worker pool, one index cache.
pub struct Services {
    pub cache: Arc<VectorIndexCache>,
    pub ingest: Arc<IngestionPipeline>,
    pub pool: WorkerPool,
    top_k: usize,
}

impl Services {
    pub fn new(settings: &Settings, store: Arc<dyn DocumentStore>, embedder: Arc<dyn Embedder>, extractor: Arc<dyn TextExtractor>) -> Result<Self> {
        let chunker = settings.chunker()?;
        let pool = WorkerPool::new(settings.workers.max_blocking)?;
        let cache = Arc::new(VectorIndexCache::new(Arc::clone(&store), embedder, chunker, pool.clone()));
        let ingest = Arc::new(IngestionPipeline::new(store, extractor, chunker, Arc::clone(&cache), pool.clone(), settings.upload_dir()));
        Ok(Self { cache, ingest, pool, top_k: settings.retrieval.top_k })
    }

    /// Open the LanceDB store and load the embedding model named by `settings`.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let uri = settings.store_uri()?;
        let store = LanceDocumentStore::open(&uri, &settings.store.table, settings.store.delete_page_size)
            .await
            .map_err(Error::Store)?;
        let embedding = settings.embedding.clone();
        let embedder = tokio::task::spawn_blocking(move || pdfqa_embed::load_embedder(&embedding))
            .await
            .map_err(|e| Error::Worker(format!("load_embedder: {e}")))?
            .map_err(Error::Embedding)?;
        info!(dim = embedder.dim(), workers = settings.workers.max_blocking, "services ready");
        Self::new(settings, Arc::new(store), embedder, Arc::new(PdfExtractor))
    }

    pub fn query(&self, generator: Arc<dyn Generator>) -> QueryPipeline {
        QueryPipeline::new(Arc::clone(&self.cache), generator, self.top_k)
    }
}
