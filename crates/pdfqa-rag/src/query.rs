use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use pdfqa_core::traits::Generator;
use pdfqa_core::types::RetrievedChunk;
use pdfqa_core::{Error, Result};
use pdfqa_vector::VectorIndexCache;

use crate::prompt::build_prompt;
use crate::retrieve::Retriever;

#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<RetrievedChunk>,
}

pub struct QueryPipeline {
    cache: Arc<VectorIndexCache>,
    retriever: Retriever,
    generator: Arc<dyn Generator>,
    top_k: usize,
}

impl QueryPipeline {
    pub fn new(cache: Arc<VectorIndexCache>, generator: Arc<dyn Generator>, top_k: usize) -> Self {
        Self { retriever: Retriever::new(Arc::clone(&cache)), cache, generator, top_k }
    }

    /// Answer `question` from the corpus. `Error::EmptyCorpus` when nothing
    /// has been ingested.
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let started = Instant::now();
        self.cache.ensure_ready().await?;
        let sources = self.retriever.retrieve(question, self.top_k).await?;
        let prompt = build_prompt(question, &sources);
        let text = self.generator.generate(&prompt).await.map_err(Error::Generation)?;
        info!(chunks = sources.len(), elapsed_ms = started.elapsed().as_millis() as u64, "question answered");
        Ok(Answer { text, sources })
    }
}
