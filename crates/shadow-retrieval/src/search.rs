//! Sequential-scan cosine retrieval over an in-memory chunk set.
use anyhow::{bail, Result};
use std::sync::Arc;

use shadow_core::traits::Embedder;
use shadow_core::{Chunk, ScoredChunk};

/// Cosine similarity clamped to [-1, 1]. Zero-norm, empty, mismatched or
/// non-finite inputs score exactly 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() { return 0.0; }
    let (mut dot, mut na, mut nb) = (0f64, 0f64, 0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 { return 0.0; }
    let sim = dot / (na.sqrt() * nb.sqrt());
    if !sim.is_finite() { return 0.0; }
    sim.clamp(-1.0, 1.0) as f32
}

pub trait Retriever: Send + Sync {
    /// Scores `chunks` (index-aligned with `embeddings`) against `query`.
    /// Results are descending by score, at most `top_k` long, each at or above
    /// the threshold.
    fn search(&self, query: &str, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<Vec<ScoredChunk>>;
}

pub struct CosineRetriever {
    embedder: Arc<dyn Embedder>,
    top_k: usize,
    threshold: f32,
}

impl CosineRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, top_k: usize, threshold: f32) -> Self { Self { embedder, top_k, threshold } }
}

/// Ranks `(index, score)` pairs: descending, ties keep corpus order.
pub fn rank(scores: Vec<(usize, f32)>, top_k: usize, threshold: f32) -> Vec<(usize, f32)> {
    let mut scores = scores;
    scores.sort_by(|a, b| b.1.total_cmp(&a.1));
    scores.into_iter().filter(|(_, s)| *s >= threshold).take(top_k).collect()
}

impl Retriever for CosineRetriever {
    fn search(&self, query: &str, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<Vec<ScoredChunk>> {
        if chunks.len() != embeddings.len() {
            bail!("index misaligned: {} chunks vs {} embeddings", chunks.len(), embeddings.len());
        }
        if embeddings.is_empty() {
            tracing::warn!("no chunk embeddings available; nothing to search");
            return Ok(Vec::new());
        }
        let query_vec = match self.embedder.embed(query) {
            Ok(v) if !v.is_empty() => v,
            Ok(_) => {
                tracing::warn!("query embedding is empty");
                return Ok(Vec::new());
            }
            Err(e) => {
                tracing::warn!(error = %e, "query embedding failed; treating as no matches");
                return Ok(Vec::new());
            }
        };

        let scores = embeddings
            .iter()
            .enumerate()
            .map(|(i, emb)| {
                if emb.len() != query_vec.len() {
                    tracing::debug!(chunk = %chunks[i].id, len = emb.len(), "malformed embedding scored as 0");
                }
                (i, cosine_similarity(&query_vec, emb))
            })
            .collect();

        let ranked = rank(scores, self.top_k, self.threshold);
        tracing::info!(hits = ranked.len(), top_k = self.top_k, threshold = self.threshold, "retrieval finished");
        Ok(ranked.into_iter().map(|(i, s)| ScoredChunk::new(chunks[i].clone(), s)).collect())
    }
}
