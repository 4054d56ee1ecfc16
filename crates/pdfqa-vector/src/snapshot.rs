use anyhow::{ensure, Result};
use std::cmp::Ordering;

use pdfqa_core::types::{IndexedChunk, RetrievedChunk};

/// Exhaustive inner-product index over L2-normalised vectors (cosine).
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dim: usize,
    vectors: Vec<f32>,
}

impl FlatIndex {
    pub fn new(dim: usize) -> Self { Self { dim, vectors: Vec::new() } }

    pub fn dim(&self) -> usize { self.dim }
    pub fn len(&self) -> usize { if self.dim == 0 { 0 } else { self.vectors.len() / self.dim } }
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn add(&mut self, vector: &[f32]) -> Result<()> {
        ensure!(vector.len() == self.dim, "vector has dim {}, index expects {}", vector.len(), self.dim);
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-12);
        self.vectors.extend(vector.iter().map(|x| x / norm));
        Ok(())
    }

    /// Top-`k` rows by cosine similarity, best first; ties keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        ensure!(query.len() == self.dim, "query has dim {}, index expects {}", query.len(), self.dim);
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }
        let qnorm = query.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-12);
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(i, row)| (i, row.iter().zip(query).map(|(a, b)| a * b).sum::<f32>() / qnorm))
            .collect();
        let by_score = |a: &(usize, f32), b: &(usize, f32)| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0));
        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, by_score);
            scored.truncate(k);
        }
        scored.sort_by(by_score);
        Ok(scored)
    }
}

/// Every chunk of the corpus at build time, paired with its embedding.
/// Immutable once built; replaced wholesale, never patched.
#[derive(Debug)]
pub struct VectorIndexSnapshot {
    chunks: Vec<IndexedChunk>,
    index: FlatIndex,
    documents: usize,
}

impl VectorIndexSnapshot {
    pub fn build(chunks: Vec<IndexedChunk>, embeddings: Vec<Vec<f32>>, dim: usize) -> Result<Self> {
        ensure!(
            chunks.len() == embeddings.len(),
            "{} chunks but {} embeddings",
            chunks.len(),
            embeddings.len()
        );
        let mut index = FlatIndex::new(dim);
        for e in &embeddings {
            index.add(e)?;
        }
        let mut doc_ids: Vec<&str> = chunks.iter().map(|c| c.doc_id.as_str()).collect();
        doc_ids.sort_unstable();
        doc_ids.dedup();
        let documents = doc_ids.len();
        Ok(Self { chunks, index, documents })
    }

    pub fn len(&self) -> usize { self.chunks.len() }
    pub fn is_empty(&self) -> bool { self.chunks.is_empty() }
    pub fn documents(&self) -> usize { self.documents }
    pub fn chunks(&self) -> &[IndexedChunk] { &self.chunks }

    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        Ok(self
            .index
            .search(query, k)?
            .into_iter()
            .map(|(i, score)| RetrievedChunk { chunk: self.chunks[i].clone(), score })
            .collect())
    }
}
