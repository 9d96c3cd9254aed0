//! shadow-retrieval
//!
//! Embedding similarity search over the classified chunk set, the
//! source-scope and clearance filters applied to its results, and the
//! cached batch embedding used when the index is built.
#![forbid(unsafe_code)]

pub mod cache;
pub mod embed_backfill;
pub mod filter;
pub mod search;

pub use cache::{hash_content, EmbeddingCache};
pub use embed_backfill::{embed_chunks, BackfillStats};
pub use filter::{filter_by_clearance, restrict_to_source};
pub use search::{cosine_similarity, CosineRetriever, Retriever};
