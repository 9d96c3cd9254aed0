//! Immutable index snapshot and the builder that produces it.
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use shadow_core::traits::{DocumentLoader, Embedder};
use shadow_core::{Chunk, ChunkClassifier, DocType, Error, Result, SecurityLevel};
use shadow_retrieval::{embed_chunks, EmbeddingCache};
use shadow_rules::{parse_rules, Rule};

/// Everything a query needs, built once and shared read-only.
/// `embeddings[i]` belongs to `chunks[i]`.
#[derive(Debug, Clone)]
pub struct ShadowIndex {
    pub chunks: Vec<Chunk>,
    pub embeddings: Vec<Vec<f32>>,
    pub rules: Vec<Rule>,
    pub embedder_id: String,
    pub built_at: DateTime<Utc>,
}

impl ShadowIndex {
    pub fn chunks_per_source(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for c in &self.chunks { *counts.entry(c.source.clone()).or_insert(0) += 1; }
        counts
    }

    pub fn chunks_per_level(&self) -> BTreeMap<SecurityLevel, usize> {
        let mut counts = BTreeMap::new();
        for c in &self.chunks { *counts.entry(c.security_level).or_insert(0) += 1; }
        counts
    }
}

pub struct IndexBuilder {
    classifier: ChunkClassifier,
    batch_size: usize,
    show_progress: bool,
}

impl IndexBuilder {
    pub fn new(classifier: ChunkClassifier, batch_size: usize, show_progress: bool) -> Self {
        Self { classifier, batch_size, show_progress }
    }

    /// Load → classify → parse rules → embed. Any failure leaves nothing behind.
    pub fn build(
        &self,
        loader: &dyn DocumentLoader,
        embedder: &dyn Embedder,
        cache: &EmbeddingCache,
        now: DateTime<Utc>,
    ) -> Result<ShadowIndex> {
        let documents = loader.load()?;
        let chunks = self.classifier.classify_all(&documents)?;
        tracing::info!(documents = documents.len(), chunks = chunks.len(), "documents classified");

        let rules: Vec<Rule> = documents
            .iter()
            .filter(|d| d.doc_type == DocType::Framework)
            .flat_map(|d| parse_rules(&d.content))
            .collect();
        if rules.is_empty() {
            tracing::warn!("no framework rules parsed; rule-based responses disabled");
        }

        let (embeddings, _stats) = embed_chunks(&chunks, embedder, cache, self.batch_size, self.show_progress)?;
        if embeddings.len() != chunks.len() {
            return Err(Error::EmbeddingMismatch { chunks: chunks.len(), embeddings: embeddings.len() });
        }

        Ok(ShadowIndex { chunks, embeddings, rules, embedder_id: embedder.id().to_string(), built_at: now })
    }
}
