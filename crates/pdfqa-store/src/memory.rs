use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use pdfqa_core::traits::DocumentStore;
use pdfqa_core::types::Document;

/// In-process store with the same contract as the LanceDB one, including
/// page-at-a-time bulk deletion.
pub struct MemoryDocumentStore {
    docs: RwLock<BTreeMap<String, Document>>,
    delete_page_size: usize,
    delete_pages: AtomicUsize,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self { Self::new(500) }
}

impl MemoryDocumentStore {
    pub fn new(delete_page_size: usize) -> Self {
        Self { docs: RwLock::new(BTreeMap::new()), delete_page_size: delete_page_size.max(1), delete_pages: AtomicUsize::new(0) }
    }

    // Every writer leaves the map whole, so a poisoned lock still reports the real count.
    pub fn len(&self) -> usize { self.docs.read().unwrap_or_else(PoisonError::into_inner).len() }
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Number of delete pages issued over the store's lifetime.
    pub fn delete_pages(&self) -> usize { self.delete_pages.load(Ordering::SeqCst) }
}

fn poisoned<T>(_: T) -> anyhow::Error { anyhow::anyhow!("document map lock poisoned") }

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn put(&self, document: Document) -> Result<()> {
        self.docs.write().map_err(poisoned)?.insert(document.id.clone(), document);
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<Document>> {
        Ok(self.docs.read().map_err(poisoned)?.values().cloned().collect())
    }

    async fn delete_all(&self) -> Result<usize> {
        let mut deleted = 0usize;
        loop {
            let mut docs = self.docs.write().map_err(poisoned)?;
            let page: Vec<String> = docs.keys().take(self.delete_page_size).cloned().collect();
            if page.is_empty() {
                break;
            }
            for id in &page {
                docs.remove(id);
            }
            deleted += page.len();
            self.delete_pages.fetch_add(1, Ordering::SeqCst);
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, chunks: &[&str]) -> Document {
        Document::new(id, chunks.concat(), chunks.iter().map(|c| (*c).to_string()).collect())
    }

    #[tokio::test]
    async fn put_overwrites_by_id() {
        let store = MemoryDocumentStore::default();
        store.put(doc("a.pdf", &["old"])).await.expect("put");
        store.put(doc("a.pdf", &["new", "er"])).await.expect("put");
        let all = store.get_all().await.expect("get_all");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].chunks, vec!["new".to_string(), "er".to_string()]);
    }

    #[tokio::test]
    async fn delete_all_pages_through_large_corpora() {
        let store = MemoryDocumentStore::new(500);
        for i in 0..1200 {
            store.put(doc(&format!("doc-{i:04}.pdf"), &["x"])).await.expect("put");
        }
        let deleted = store.delete_all().await.expect("delete_all");
        assert_eq!(deleted, 1200);
        assert_eq!(store.delete_pages(), 3);
        assert!(store.get_all().await.expect("get_all").is_empty());
    }

    #[tokio::test]
    async fn len_survives_a_poisoned_lock() {
        let store = MemoryDocumentStore::default();
        store.put(doc("a.pdf", &["text"])).await.expect("put");
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _held = store.docs.write().expect("lock");
            panic!("writer died");
        }));
        assert!(store.docs.is_poisoned());
        assert_eq!(store.len(), 1);
        assert!(!store.is_empty());
    }
}
