use pdfqa_core::config::EmbeddingSettings;
use pdfqa_embed::load_embedder;

#[test]
fn fake_embedder_shapes_and_determinism() {
    // Avoid loading model weights.
    let settings = EmbeddingSettings { use_fake: true, fake_dim: 384, ..EmbeddingSettings::default() };

    let embedder = load_embedder(&settings).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 384, "embedding dim follows settings");
    assert_eq!(embedder.dim(), 384);

    // Norm approximately 1.0
    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    // Deterministic for same input
    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn fake_embedder_returns_one_vector_per_text() {
    let settings = EmbeddingSettings { use_fake: true, fake_dim: 32, ..EmbeddingSettings::default() };
    let embedder = load_embedder(&settings).expect("embedder");
    let texts: Vec<String> = (0..7).map(|i| format!("chunk number {i}")).collect();
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    assert_eq!(embs.len(), texts.len());
    assert!(embs.iter().all(|v| v.len() == 32));
}
