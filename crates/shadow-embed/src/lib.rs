//! shadow-embed
//!
//! Embedding service implementations behind `shadow_core::traits::Embedder`:
//! a local BGE-M3 (XLM-RoBERTa) model run through candle, and a deterministic
//! hash-based `FakeEmbedder` for tests and development
//! (`APP_USE_FAKE_EMBEDDINGS=1`).
use anyhow::Result;

use shadow_core::traits::Embedder;

pub mod fake;
pub mod model;
pub mod pool;
pub mod tokenize;

pub use fake::FakeEmbedder;
pub use model::{EmbeddingModel, MODEL_DIM};
pub use pool::{masked_mean_l2, pooled_rows};
pub use tokenize::EncodedBatch;

pub fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

/// The fake embedder when `APP_USE_FAKE_EMBEDDINGS` is set, the BGE-M3 model otherwise.
pub fn get_default_embedder() -> Result<Box<dyn Embedder>> {
    if use_fake_embeddings() {
        tracing::info!("using FakeEmbedder");
        return Ok(Box::new(FakeEmbedder::new(MODEL_DIM)));
    }
    Ok(Box::new(EmbeddingModel::new()?))
}
