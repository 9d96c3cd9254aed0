use crate::error::Result;
use crate::types::Document;

/// Black-box text → fixed-length vector service.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the model (e.g. `fake:d1024`); keys the embedding cache.
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    /// Index-aligned with `texts`: same length, same order.
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector for query"))
    }
}

/// Supplies the classified manual and the response framework.
pub trait DocumentLoader: Send + Sync {
    fn load(&self) -> Result<Vec<Document>>;
}
