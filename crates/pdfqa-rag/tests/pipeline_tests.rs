use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;

use pdfqa_core::config::Settings;
use pdfqa_core::traits::{Generator, TextExtractor};
use pdfqa_core::Error;
use pdfqa_embed::FakeEmbedder;
use pdfqa_rag::{QueryPipeline, Services};
use pdfqa_store::MemoryDocumentStore;
use pdfqa_vector::CacheState;

/// Treats the uploaded bytes as the PDF's text layer. `%PDF-broken` fails.
struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, path: &Path) -> anyhow::Result<String> {
        let text = std::fs::read_to_string(path)?;
        if text.starts_with("%PDF-broken") {
            return Err(anyhow!("invalid xref table"));
        }
        Ok(text)
    }
}

#[derive(Default)]
struct RecordingGenerator {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl Generator for RecordingGenerator {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        self.prompts.lock().map_err(|_| anyhow!("poisoned"))?.push(prompt.to_string());
        Ok("The sky is blue.".to_string())
    }
}

struct Harness {
    services: Services,
    store: Arc<MemoryDocumentStore>,
    generator: Arc<RecordingGenerator>,
    query: QueryPipeline,
    uploads: tempfile::TempDir,
}

fn harness() -> Harness {
    let uploads = tempfile::tempdir().expect("tmp");
    let mut settings = Settings::default();
    settings.ingest.upload_dir = Some(uploads.path().to_string_lossy().to_string());
    let store = Arc::new(MemoryDocumentStore::default());
    let services = Services::new(&settings, store.clone(), Arc::new(FakeEmbedder::new(256)), Arc::new(PlainTextExtractor)).expect("services");
    let generator = Arc::new(RecordingGenerator::default());
    let query = services.query(generator.clone());
    Harness { services, store, generator, query, uploads }
}

fn leftover_files(dir: &Path) -> usize { std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0) }

#[tokio::test]
async fn upload_then_ask_uses_the_uploaded_text() {
    let h = harness();
    let text = "The sky is blue. Grass is green.";
    let outcome = h.services.ingest.ingest("sky.pdf", text.as_bytes().to_vec()).await.expect("ingest");
    assert_eq!(outcome.doc_id, "sky.pdf");
    assert_eq!(outcome.chunks, 1);

    let answer = h.query.ask("What color is the sky?").await.expect("answer");
    assert_eq!(answer.text, "The sky is blue.");
    assert_eq!(answer.sources[0].chunk.text, text);

    let prompts = h.generator.prompts.lock().expect("lock");
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains(text));
    assert!(prompts[0].contains("Question: What color is the sky?"));
    assert_eq!(leftover_files(h.uploads.path()), 0);
}

#[tokio::test]
async fn asking_an_empty_corpus_reports_no_documents() {
    let h = harness();
    let err = h.query.ask("anything?").await.expect_err("empty");
    assert!(matches!(err, Error::EmptyCorpus));
    assert!(h.generator.prompts.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn text_less_upload_is_rejected_and_cleaned_up() {
    let h = harness();
    let err = h.services.ingest.ingest("scan.pdf", b"  \n\t ".to_vec()).await.expect_err("image only");
    assert!(matches!(err, Error::NoExtractableText));
    assert_eq!(err.to_string(), "No extractable text found in PDF. Try OCR.");
    assert!(h.store.is_empty());
    assert_eq!(leftover_files(h.uploads.path()), 0);
}

#[tokio::test]
async fn unreadable_upload_is_a_client_error_and_cleaned_up() {
    let h = harness();
    let err = h.services.ingest.ingest("bad.pdf", b"%PDF-broken".to_vec()).await.expect_err("corrupt");
    assert!(matches!(err, Error::Extraction(ref m) if m.contains("invalid xref")));
    assert_eq!(leftover_files(h.uploads.path()), 0);
}

#[tokio::test]
async fn reupload_overwrites_and_invalidates() {
    let h = harness();
    h.services.ingest.ingest("notes.pdf", b"Grass is green.".to_vec()).await.expect("first");
    h.query.ask("What color is grass?").await.expect("answer");
    assert_eq!(h.services.cache.state(), CacheState::Ready);
    let generation = h.services.cache.generation();

    h.services.ingest.ingest("notes.pdf", b"The sky is blue.".to_vec()).await.expect("second");
    assert_eq!(h.services.cache.state(), CacheState::Empty);
    assert_eq!(h.services.cache.generation(), generation + 1);
    assert_eq!(h.store.len(), 1);

    let answer = h.query.ask("What color is the sky?").await.expect("answer");
    let texts: Vec<&str> = answer.sources.iter().map(|s| s.chunk.text.as_str()).collect();
    assert_eq!(texts, vec!["The sky is blue."]);
}

#[tokio::test]
async fn purge_removes_everything_in_pages() {
    let h = harness();
    for i in 0..1200 {
        h.services.ingest.ingest(&format!("doc-{i:04}.pdf"), format!("fact {i}").into_bytes()).await.expect("ingest");
    }
    h.query.ask("fact 7?").await.expect("answer");

    let deleted = h.services.ingest.purge().await.expect("purge");
    assert_eq!(deleted, 1200);
    assert_eq!(h.store.delete_pages(), 3);
    assert_eq!(h.services.cache.state(), CacheState::Empty);
    assert!(matches!(h.query.ask("fact 7?").await, Err(Error::EmptyCorpus)));

    assert_eq!(h.services.ingest.purge().await.expect("idempotent"), 0);
}

#[tokio::test]
async fn answers_draw_on_at_most_top_k_chunks() {
    let h = harness();
    for (name, text) in [
        ("a.pdf", "The sky is blue."),
        ("b.pdf", "Grass is green."),
        ("c.pdf", "Snow is white."),
        ("d.pdf", "Coal is black."),
        ("e.pdf", "Blood is red."),
    ] {
        h.services.ingest.ingest(name, text.as_bytes().to_vec()).await.expect("ingest");
    }
    let answer = h.query.ask("What color is the sky?").await.expect("answer");
    assert_eq!(answer.sources.len(), 4);
    assert_eq!(answer.sources[0].chunk.doc_id, "a.pdf");
}
