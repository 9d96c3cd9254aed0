use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No chunks were produced from any document")]
    EmptyCorpus,

    #[error("Chunk/embedding count mismatch: {chunks} chunks vs {embeddings} embeddings")]
    EmbeddingMismatch { chunks: usize, embeddings: usize },

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Invalid clearance level: {0}")]
    InvalidClearance(String),

    #[error("Initialization failed recently; retry in {remaining_secs}s")]
    InitCooldown { remaining_secs: i64 },

    #[error("Operation failed: {0}")]
    Operation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
