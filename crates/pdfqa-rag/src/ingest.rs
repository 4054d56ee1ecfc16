//! Upload → extract → chunk → persist → invalidate.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use pdfqa_core::chunker::Chunker;
use pdfqa_core::offload::WorkerPool;
use pdfqa_core::traits::{DocumentStore, TextExtractor};
use pdfqa_core::types::{Document, DocumentId};
use pdfqa_core::{Error, Result};
use pdfqa_vector::VectorIndexCache;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    pub doc_id: DocumentId,
    pub chunks: usize,
    pub chars: usize,
}

pub struct IngestionPipeline {
    store: Arc<dyn DocumentStore>,
    extractor: Arc<dyn TextExtractor>,
    chunker: Chunker,
    cache: Arc<VectorIndexCache>,
    pool: WorkerPool,
    upload_dir: PathBuf,
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        extractor: Arc<dyn TextExtractor>,
        chunker: Chunker,
        cache: Arc<VectorIndexCache>,
        pool: WorkerPool,
        upload_dir: PathBuf,
    ) -> Self {
        Self { store, extractor, chunker, cache, pool, upload_dir }
    }

    /// Store `bytes` under the final path component of `filename`, replacing
    /// any earlier upload with the same name. The staged copy on disk is
    /// removed whether or not ingestion succeeds.
    pub async fn ingest(&self, filename: &str, bytes: Vec<u8>) -> Result<IngestOutcome> {
        let doc_id = document_id(filename)?;
        let started = Instant::now();

        let upload_dir = self.upload_dir.clone();
        let extractor = Arc::clone(&self.extractor);
        let chunker = self.chunker;
        let (text, chunks) = self
            .pool
            .run("extract_upload", move || stage_and_extract(&upload_dir, &bytes, extractor.as_ref(), &chunker))
            .await??;
        let outcome = IngestOutcome { doc_id: doc_id.clone(), chunks: chunks.len(), chars: text.chars().count() };

        self.store.put(Document::new(doc_id, text, chunks)).await.map_err(Error::Store)?;
        self.cache.invalidate();
        info!(
            doc_id = %outcome.doc_id,
            chunks = outcome.chunks,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "document ingested"
        );
        Ok(outcome)
    }

    /// Delete every stored document. Returns how many were removed.
    pub async fn purge(&self) -> Result<usize> {
        let result = self.store.delete_all().await.map_err(Error::Store);
        // Pages committed before a failure are gone either way.
        self.cache.invalidate();
        let deleted = result?;
        info!(deleted, "corpus purged");
        Ok(deleted)
    }
}

fn stage_and_extract(dir: &Path, bytes: &[u8], extractor: &dyn TextExtractor, chunker: &Chunker) -> Result<(String, Vec<String>)> {
    std::fs::create_dir_all(dir)?;
    let mut staged = tempfile::Builder::new().prefix("upload-").suffix(".pdf").tempfile_in(dir)?;
    staged.write_all(bytes)?;
    staged.flush()?;
    debug!(path = %staged.path().display(), bytes = bytes.len(), "upload staged");

    let text = extractor.extract(staged.path()).map_err(|e| Error::Extraction(format!("{e:#}")))?;
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::NoExtractableText);
    }
    let chunks = chunker.split(text);
    Ok((text.to_string(), chunks))
}

/// Final path component of a client-supplied filename.
fn document_id(filename: &str) -> Result<DocumentId> {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if name.is_empty() || name == "." || name == ".." {
        return Err(Error::InvalidUpload(format!("unusable filename {filename:?}")));
    }
    Ok(name.to_string())
}
