use pdfqa_core::traits::DocumentStore;
use pdfqa_core::types::Document;
use pdfqa_store::LanceDocumentStore;
use tempfile::TempDir;

fn doc(id: &str, chunks: &[&str]) -> Document {
    Document::new(id, chunks.concat(), chunks.iter().map(|c| (*c).to_string()).collect())
}

#[tokio::test]
async fn lance_store_round_trips_and_overwrites() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    let store = LanceDocumentStore::open(tmp.path(), "pdf_documents", 500).await?;
    assert!(store.get_all().await?.is_empty());

    store.put(doc("sky.pdf", &["The sky is blue. ", "Grass is green."])).await?;
    store.put(doc("o'brien.pdf", &["quotes in ids"])).await?;
    let mut all = store.get_all().await?;
    all.sort_by(|a, b| a.id.cmp(&b.id));
    assert_eq!(all.len(), 2);
    assert_eq!(all[1].id, "sky.pdf");
    assert_eq!(all[1].chunks, vec!["The sky is blue. ".to_string(), "Grass is green.".to_string()]);
    assert_eq!(all[1].raw_text, "The sky is blue. Grass is green.");

    // Re-upload under the same id replaces the chunk list.
    store.put(doc("sky.pdf", &["The sky is grey."])).await?;
    let all = store.get_all().await?;
    assert_eq!(all.len(), 2);
    let sky = all.iter().find(|d| d.id == "sky.pdf").expect("sky.pdf");
    assert_eq!(sky.chunks, vec!["The sky is grey.".to_string()]);
    Ok(())
}

#[tokio::test]
async fn lance_store_delete_all_pages() -> anyhow::Result<()> {
    let tmp = TempDir::new()?;
    // Small page size so the corpus needs several pages.
    let store = LanceDocumentStore::open(tmp.path(), "pdf_documents", 5).await?;
    for i in 0..12 {
        store.put(doc(&format!("doc-{i:02}.pdf"), &["chunk"])).await?;
    }
    assert_eq!(store.get_all().await?.len(), 12);

    let deleted = store.delete_all().await?;
    assert_eq!(deleted, 12);
    assert!(store.get_all().await?.is_empty(), "deletion visible to the next read");

    // Idempotent on an empty table.
    assert_eq!(store.delete_all().await?, 0);
    Ok(())
}
