//! In-memory embedding cache keyed by `(content_hash, embedder_id)`.
//!
//! Consulted before calling the embedder and written through on misses, so a
//! forced re-initialization only re-embeds chunks whose text changed.
use std::collections::HashMap;
use std::sync::Mutex;

pub fn hash_content(s: &str) -> String { blake3::hash(s.as_bytes()).to_hex().to_string() }

#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub content_hash: String,
    pub embedder_id: String,
    pub vector: Vec<f32>,
}

#[derive(Debug, Default)]
pub struct EmbeddingCache {
    entries: Mutex<HashMap<(String, String), Vec<f32>>>,
}

impl EmbeddingCache {
    pub fn new() -> Self { Self::default() }

    pub fn get_many(&self, embedder_id: &str, hashes: &[String]) -> HashMap<String, Vec<f32>> {
        let Ok(entries) = self.entries.lock() else { return HashMap::new() };
        hashes
            .iter()
            .filter_map(|h| entries.get(&(h.clone(), embedder_id.to_string())).map(|v| (h.clone(), v.clone())))
            .collect()
    }

    pub fn put_many(&self, new_entries: Vec<CacheEntry>) {
        if new_entries.is_empty() { return; }
        if let Ok(mut entries) = self.entries.lock() {
            for e in new_entries {
                entries.insert((e.content_hash, e.embedder_id), e.vector);
            }
        }
    }

    pub fn len(&self) -> usize { self.entries.lock().map(|e| e.len()).unwrap_or(0) }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}
