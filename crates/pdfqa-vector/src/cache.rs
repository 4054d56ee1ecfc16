//! Lazily built, process-wide vector index over the whole corpus.
//!
//! States: `Empty` (nothing published), `Building` (one build in flight),
//! `Ready` (a snapshot is published). Writers call [`VectorIndexCache::invalidate`]
//! after every committed change; the next reader rebuilds. The slot lock is
//! never held across an await. A build that started before an invalidation is
//! discarded on completion instead of being published.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tracing::{debug, info, warn};

use pdfqa_core::chunker::Chunker;
use pdfqa_core::offload::WorkerPool;
use pdfqa_core::traits::{DocumentStore, Embedder};
use pdfqa_core::types::{Document, IndexedChunk};
use pdfqa_core::{Error, Result};

use crate::snapshot::VectorIndexSnapshot;

const MAX_BUILD_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Empty,
    Building,
    Ready,
}

impl CacheState {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheState::Empty => "empty",
            CacheState::Building => "building",
            CacheState::Ready => "ready",
        }
    }
}

impl fmt::Display for CacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

struct Slot {
    state: CacheState,
    snapshot: Option<Arc<VectorIndexSnapshot>>,
    generation: u64,
}

pub struct VectorIndexCache {
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn Embedder>,
    chunker: Chunker,
    pool: WorkerPool,
    slot: Mutex<Slot>,
    build_lock: tokio::sync::Mutex<()>,
    builds: AtomicUsize,
}

impl VectorIndexCache {
    pub fn new(store: Arc<dyn DocumentStore>, embedder: Arc<dyn Embedder>, chunker: Chunker, pool: WorkerPool) -> Self {
        Self {
            store,
            embedder,
            chunker,
            pool,
            slot: Mutex::new(Slot { state: CacheState::Empty, snapshot: None, generation: 0 }),
            build_lock: tokio::sync::Mutex::new(()),
            builds: AtomicUsize::new(0),
        }
    }

    // Nothing panics while the slot is held, so a poisoned lock still guards consistent data.
    fn lock_slot(&self) -> MutexGuard<'_, Slot> { self.slot.lock().unwrap_or_else(PoisonError::into_inner) }

    pub fn state(&self) -> CacheState { self.lock_slot().state }

    /// Bumped by every `invalidate`.
    pub fn generation(&self) -> u64 { self.lock_slot().generation }

    /// Number of index builds started since construction.
    pub fn builds(&self) -> usize { self.builds.load(Ordering::SeqCst) }

    pub fn current(&self) -> Option<Arc<VectorIndexSnapshot>> { self.lock_slot().snapshot.clone() }

    pub fn embedder(&self) -> &Arc<dyn Embedder> { &self.embedder }
    pub fn pool(&self) -> &WorkerPool { &self.pool }

    /// Drop any published snapshot. Cheap; never waits for an in-flight build.
    pub fn invalidate(&self) {
        let mut slot = self.lock_slot();
        slot.state = CacheState::Empty;
        slot.snapshot = None;
        slot.generation += 1;
        debug!(generation = slot.generation, "vector index invalidated");
    }

    /// Return the published snapshot, building it first if needed. Concurrent
    /// callers share a single build. Fails with `EmptyCorpus` when the store
    /// holds no chunks.
    pub async fn ensure_ready(&self) -> Result<Arc<VectorIndexSnapshot>> {
        if let Some(snapshot) = self.current() {
            return Ok(snapshot);
        }
        let _guard = self.build_lock.lock().await;
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            let generation = {
                let mut slot = self.lock_slot();
                if let Some(snapshot) = &slot.snapshot {
                    return Ok(Arc::clone(snapshot));
                }
                slot.state = CacheState::Building;
                slot.generation
            };

            let mut reset = ResetOnCancel { cache: self, generation, armed: true };
            let built = self.build().await;
            reset.armed = false;

            let mut slot = self.lock_slot();
            let current = slot.generation == generation;
            match built {
                Err(e) => {
                    if current {
                        slot.state = CacheState::Empty;
                    }
                    return Err(e);
                }
                Ok(snapshot) => {
                    let snapshot = Arc::new(snapshot);
                    if current {
                        slot.state = CacheState::Ready;
                        slot.snapshot = Some(Arc::clone(&snapshot));
                        return Ok(snapshot);
                    }
                    if attempt >= MAX_BUILD_ATTEMPTS {
                        warn!(attempt, "corpus kept changing during index builds; serving unpublished snapshot");
                        return Ok(snapshot);
                    }
                    debug!(attempt, "corpus changed during index build; discarding");
                }
            }
        }
    }

    async fn build(&self) -> Result<VectorIndexSnapshot> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        let started = Instant::now();
        let documents = self.store.get_all().await.map_err(Error::Store)?;

        let chunker = self.chunker;
        let chunks = self.pool.run("flatten_corpus", move || flatten(documents, &chunker)).await?;
        if chunks.is_empty() {
            return Err(Error::EmptyCorpus);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embedder = Arc::clone(&self.embedder);
        let embeddings = self.pool.run("embed_corpus", move || embedder.embed_batch(&texts)).await?.map_err(Error::Embedding)?;

        let dim = self.embedder.dim();
        let snapshot = self
            .pool
            .run("build_index", move || VectorIndexSnapshot::build(chunks, embeddings, dim))
            .await?
            .map_err(Error::Embedding)?;
        info!(
            chunks = snapshot.len(),
            documents = snapshot.documents(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "vector index built"
        );
        Ok(snapshot)
    }
}

/// Returns the slot to `Empty` when a build's future is dropped before it
/// completes, unless the slot has moved on since the build started.
struct ResetOnCancel<'a> {
    cache: &'a VectorIndexCache,
    generation: u64,
    armed: bool,
}

impl Drop for ResetOnCancel<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut slot = self.cache.lock_slot();
        if slot.generation == self.generation && slot.state == CacheState::Building {
            slot.state = CacheState::Empty;
            debug!(generation = self.generation, "vector index build cancelled");
        }
    }
}

/// One entry per stored chunk, in document then chunk order. Rows persisted
/// without chunks are split from their raw text.
fn flatten(documents: Vec<Document>, chunker: &Chunker) -> Vec<IndexedChunk> {
    let mut out = Vec::new();
    for doc in documents {
        let chunks = if doc.chunks.is_empty() { chunker.split(&doc.raw_text) } else { doc.chunks };
        out.extend(
            chunks
                .into_iter()
                .enumerate()
                .map(|(chunk_index, text)| IndexedChunk { doc_id: doc.id.clone(), chunk_index, text }),
        );
    }
    out
}
