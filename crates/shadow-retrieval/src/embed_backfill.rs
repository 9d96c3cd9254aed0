//! Batched corpus embedding with a write-through cache.
//!
//! For each batch we consult the cache, embed the misses, write them back and
//! fill the index-aligned output. Any embedder failure or count/shape problem
//! aborts the whole pass.
use indicatif::{ProgressBar, ProgressStyle};

use shadow_core::traits::Embedder;
use shadow_core::{Chunk, Error, Result};

use crate::cache::{hash_content, CacheEntry, EmbeddingCache};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackfillStats {
    pub embedded: usize,
    pub cached: usize,
}

fn progress_bar(len: usize, show: bool) -> ProgressBar {
    if !show { return ProgressBar::hidden(); }
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Returns one vector per chunk, same order, plus hit/miss counts.
pub fn embed_chunks(
    chunks: &[Chunk],
    embedder: &dyn Embedder,
    cache: &EmbeddingCache,
    batch_size: usize,
    show_progress: bool,
) -> Result<(Vec<Vec<f32>>, BackfillStats)> {
    let batch_size = batch_size.max(1);
    let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());
    let mut stats = BackfillStats { embedded: 0, cached: 0 };
    let pb = progress_bar(chunks.len(), show_progress);

    for batch in chunks.chunks(batch_size) {
        let hashes: Vec<String> = batch.iter().map(|c| hash_content(&c.text)).collect();
        let hits = cache.get_many(embedder.id(), &hashes);

        let mut texts = Vec::new();
        let mut miss_indices = Vec::new();
        for (idx, (chunk, h)) in batch.iter().zip(&hashes).enumerate() {
            if !hits.contains_key(h) {
                texts.push(chunk.text.clone());
                miss_indices.push(idx);
            }
        }

        let mut out: Vec<Vec<f32>> = hashes.iter().map(|h| hits.get(h).cloned().unwrap_or_default()).collect();
        if !texts.is_empty() {
            let embs = embedder.embed_batch(&texts).map_err(|e| Error::Embedding(e.to_string()))?;
            if embs.len() != texts.len() {
                return Err(Error::EmbeddingMismatch { chunks: texts.len(), embeddings: embs.len() });
            }
            let mut new_entries = Vec::with_capacity(embs.len());
            for (v, &i) in embs.into_iter().zip(&miss_indices) {
                if v.len() != embedder.dim() {
                    return Err(Error::Embedding(format!("dim mismatch: got {} expected {}", v.len(), embedder.dim())));
                }
                new_entries.push(CacheEntry {
                    content_hash: hashes[i].clone(),
                    embedder_id: embedder.id().to_string(),
                    vector: v.clone(),
                });
                out[i] = v;
            }
            cache.put_many(new_entries);
        }

        stats.embedded += miss_indices.len();
        stats.cached += batch.len() - miss_indices.len();
        vectors.extend(out);
        pb.inc(batch.len() as u64);
    }
    pb.finish_and_clear();

    tracing::info!(embedded = stats.embedded, cached = stats.cached, embedder = embedder.id(), "chunk embeddings ready");
    Ok((vectors, stats))
}
