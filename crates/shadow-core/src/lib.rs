//! shadow-core
//!
//! Domain types, configuration, document loading and the ingestion-time
//! chunk classifier shared by the retrieval and engine crates.
#![forbid(unsafe_code)]

pub mod classifier;
pub mod clock;
pub mod config;
pub mod error;
pub mod loader;
pub mod traits;
pub mod types;

pub use classifier::{ChunkClassifier, ClassifierRules};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{Error, Result};
pub use types::{Chunk, ClearanceLevel, DocType, Document, ScoredChunk, SecurityLevel};
