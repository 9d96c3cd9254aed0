use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use shadow_core::traits::Embedder;
use shadow_core::{Chunk, ClearanceLevel, DocType, Error, ScoredChunk, SecurityLevel};
use shadow_embed::FakeEmbedder;
use shadow_retrieval::{
    cosine_similarity, embed_chunks, filter_by_clearance, hash_content, restrict_to_source, CosineRetriever, EmbeddingCache,
    Retriever,
};

fn chunk(id: &str, text: &str, doc_type: DocType, level: u8) -> Chunk {
    Chunk {
        id: id.to_string(),
        text: text.to_string(),
        source: match doc_type {
            DocType::Classified => "Secret Info Manual".into(),
            DocType::Framework => "Response Framework".into(),
        },
        section: "Unknown".into(),
        doc_type,
        security_level: SecurityLevel::new(level),
        ordinal: 0,
    }
}

fn scored(id: &str, doc_type: DocType, level: u8, score: f32) -> ScoredChunk {
    ScoredChunk::new(chunk(id, id, doc_type, level), score)
}

/// Always embeds to the same vector.
struct ConstEmbedder(Vec<f32>);

impl Embedder for ConstEmbedder {
    fn id(&self) -> &str { "const" }
    fn dim(&self) -> usize { self.0.len() }
    fn max_len(&self) -> usize { 64 }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> { Ok(texts.iter().map(|_| self.0.clone()).collect()) }
}

struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn id(&self) -> &str { "failing" }
    fn dim(&self) -> usize { 3 }
    fn max_len(&self) -> usize { 64 }
    fn embed_batch(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> { anyhow::bail!("model offline") }
}

/// Counts how many texts it was asked to embed.
struct CountingEmbedder {
    inner: FakeEmbedder,
    calls: AtomicUsize,
}

impl Embedder for CountingEmbedder {
    fn id(&self) -> &str { self.inner.id() }
    fn dim(&self) -> usize { self.inner.dim() }
    fn max_len(&self) -> usize { self.inner.max_len() }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(texts.len(), Ordering::SeqCst);
        self.inner.embed_batch(texts)
    }
}

/// Returns one vector fewer than requested.
struct ShortEmbedder;

impl Embedder for ShortEmbedder {
    fn id(&self) -> &str { "short" }
    fn dim(&self) -> usize { 2 }
    fn max_len(&self) -> usize { 64 }
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().skip(1).map(|_| vec![1.0, 0.0]).collect())
    }
}

#[test]
fn cosine_bounds_and_zero_vectors() {
    assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
    assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]), 0.0);
    assert_eq!(cosine_similarity(&[], &[]), 0.0);
    assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
    assert_eq!(cosine_similarity(&[f32::NAN, 1.0], &[1.0, 1.0]), 0.0);

    let a = [0.3, -2.5, 7.0, 1e-3];
    let b = [5.0, 0.1, -0.7, 42.0];
    let s = cosine_similarity(&a, &b);
    assert!((-1.0..=1.0).contains(&s));
    // parallel vectors of very different magnitude stay within bounds
    assert!(cosine_similarity(&[1e20, 1e20], &[1e-20, 1e-20]) <= 1.0);
}

#[test]
fn search_orders_bounds_and_thresholds() {
    let chunks: Vec<Chunk> = (0..6).map(|i| chunk(&format!("m:{i}"), &format!("t{i}"), DocType::Classified, 1)).collect();
    let embeddings = vec![
        vec![1.0, 0.0],  // 1.0
        vec![0.0, 1.0],  // 0.0
        vec![1.0, 1.0],  // ~0.707
        vec![1.0, 0.1],  // ~0.995
        vec![-1.0, 0.0], // -1.0
        vec![1.0, 0.5],  // ~0.894
    ];
    let retriever = CosineRetriever::new(Arc::new(ConstEmbedder(vec![1.0, 0.0])), 3, 0.2);
    let hits = retriever.search("q", &chunks, &embeddings).unwrap();
    let ids: Vec<&str> = hits.iter().map(|h| h.chunk.id.as_str()).collect();
    assert_eq!(ids, vec!["m:0", "m:3", "m:5"]);
    assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));

    let strict = CosineRetriever::new(Arc::new(ConstEmbedder(vec![1.0, 0.0])), 10, 0.8);
    let hits = strict.search("q", &chunks, &embeddings).unwrap();
    assert_eq!(hits.len(), 3);
    assert!(hits.iter().all(|h| h.score >= 0.8));
}

#[test]
fn malformed_embeddings_score_zero() {
    let chunks = vec![
        chunk("m:0", "a", DocType::Classified, 1),
        chunk("m:1", "b", DocType::Classified, 1),
        chunk("m:2", "c", DocType::Classified, 1),
    ];
    let embeddings = vec![vec![], vec![1.0], vec![1.0, 0.0]];
    let retriever = CosineRetriever::new(Arc::new(ConstEmbedder(vec![1.0, 0.0])), 5, -1.0);
    let hits = retriever.search("q", &chunks, &embeddings).unwrap();
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].chunk.id, "m:2");
    assert_eq!(hits[1].score, 0.0);
    assert_eq!(hits[2].score, 0.0);
}

#[test]
fn query_embedding_failure_yields_no_results() {
    let chunks = vec![chunk("m:0", "a", DocType::Classified, 1)];
    let retriever = CosineRetriever::new(Arc::new(FailingEmbedder), 5, 0.2);
    assert!(retriever.search("q", &chunks, &[vec![1.0, 0.0, 0.0]]).unwrap().is_empty());

    let retriever = CosineRetriever::new(Arc::new(ConstEmbedder(vec![1.0])), 5, 0.2);
    assert!(retriever.search("q", &[], &[]).unwrap().is_empty());
}

#[test]
fn misaligned_index_is_an_error() {
    let chunks = vec![chunk("m:0", "a", DocType::Classified, 1)];
    let retriever = CosineRetriever::new(Arc::new(ConstEmbedder(vec![1.0])), 5, 0.2);
    assert!(retriever.search("q", &chunks, &[]).is_err());
}

#[test]
fn fake_embedder_retrieves_overlapping_text() {
    let embedder = Arc::new(FakeEmbedder::new(256));
    let chunks = vec![
        chunk("m:0", "Safehouse locations are rotated every month.", DocType::Classified, 1),
        chunk("m:1", "Dead drops use chalk marks on lamp posts.", DocType::Classified, 1),
    ];
    let embeddings = embedder.embed_batch(&chunks.iter().map(|c| c.text.clone()).collect::<Vec<_>>()).unwrap();
    let retriever = CosineRetriever::new(embedder, 5, 0.2);
    let hits = retriever.search("safehouse locations rotated", &chunks, &embeddings).unwrap();
    assert_eq!(hits.first().map(|h| h.chunk.id.as_str()), Some("m:0"));
}

#[test]
fn source_filter_keeps_manual_content_only() {
    let hits = vec![
        scored("m:0", DocType::Classified, 1, 0.9),
        scored("f:0", DocType::Framework, 0, 0.8),
        scored("m:1", DocType::Classified, 2, 0.7),
    ];
    let kept = restrict_to_source(hits, DocType::Classified);
    let ids: Vec<&str> = kept.iter().map(|h| h.chunk.id.as_str()).collect();
    assert_eq!(ids, vec!["m:0", "m:1"]);
}

#[test]
fn clearance_filter_is_sound() {
    let hits: Vec<ScoredChunk> = (0..=3).map(|lvl| scored(&format!("m:{lvl}"), DocType::Classified, lvl, 0.5)).collect();
    for clearance in ClearanceLevel::ALL {
        let (accessible, any_denied) = filter_by_clearance(hits.clone(), clearance);
        for h in &hits {
            let present = accessible.iter().any(|a| a.chunk.id == h.chunk.id);
            assert_eq!(present, h.chunk.security_level.value() <= clearance.value());
        }
        assert_eq!(any_denied, accessible.len() < hits.len());
    }
}

#[test]
fn clearance_filter_signals_denial() {
    let (accessible, any_denied) = filter_by_clearance(vec![scored("m:0", DocType::Classified, 3, 0.9)], ClearanceLevel::Low);
    assert!(accessible.is_empty());
    assert!(any_denied);

    let (accessible, any_denied) = filter_by_clearance(Vec::new(), ClearanceLevel::Low);
    assert!(accessible.is_empty());
    assert!(!any_denied);
}

#[test]
fn missing_security_level_fails_closed() {
    let json = r#"{"id":"m:0","text":"x","source":"Secret Info Manual","section":"Unknown","doc_type":"classified","ordinal":0}"#;
    let c: Chunk = serde_json::from_str(json).unwrap();
    let (accessible, _) = filter_by_clearance(vec![ScoredChunk::new(c.clone(), 0.5)], ClearanceLevel::Low);
    assert_eq!(accessible.len(), 1);
    assert_eq!(c.security_level, SecurityLevel::new(1));
}

#[test]
fn embed_chunks_batches_and_reuses_cache() {
    let embedder = CountingEmbedder { inner: FakeEmbedder::new(64), calls: AtomicUsize::new(0) };
    let cache = EmbeddingCache::new();
    let chunks: Vec<Chunk> = (0..5).map(|i| chunk(&format!("m:{i}"), &format!("paragraph {i}"), DocType::Classified, 1)).collect();

    let (vectors, stats) = embed_chunks(&chunks, &embedder, &cache, 2, false).unwrap();
    assert_eq!(vectors.len(), 5);
    assert!(vectors.iter().all(|v| v.len() == 64));
    assert_eq!((stats.embedded, stats.cached), (5, 0));
    assert_eq!(cache.len(), 5);

    let mut changed = chunks.clone();
    changed[3].text = "paragraph three rewritten".into();
    let (again, stats) = embed_chunks(&changed, &embedder, &cache, 2, false).unwrap();
    assert_eq!((stats.embedded, stats.cached), (1, 4));
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 6);
    assert_eq!(again[0], vectors[0]);
    assert_ne!(again[3], vectors[3]);
}

#[test]
fn embed_chunks_reports_failures() {
    let cache = EmbeddingCache::new();
    let chunks = vec![chunk("m:0", "a", DocType::Classified, 1), chunk("m:1", "b", DocType::Classified, 1)];
    assert!(matches!(embed_chunks(&chunks, &FailingEmbedder, &cache, 4, false), Err(Error::Embedding(_))));
    assert!(matches!(
        embed_chunks(&chunks, &ShortEmbedder, &cache, 4, false),
        Err(Error::EmbeddingMismatch { chunks: 2, embeddings: 1 })
    ));
    assert!(cache.is_empty());
}

#[test]
fn content_hash_is_stable() {
    assert_eq!(hash_content("abc"), hash_content("abc"));
    assert_ne!(hash_content("abc"), hash_content("abd"));
    assert_eq!(hash_content("abc").len(), 64);
}
