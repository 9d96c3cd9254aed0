//! shadow-engine
//!
//! Index snapshot and builder, the Response Composer and the Query
//! Orchestrator exposed to the CLI as `QueryEngine::process`.
#![forbid(unsafe_code)]

pub mod compose;
pub mod engine;
pub mod index;

pub use compose::{compose_standard, compose_styled, Composed, LOW_CONFIDENCE_BODY};
pub use engine::{QueryEngine, QueryEngineBuilder, QueryResponse, QueryStatus};
pub use index::{IndexBuilder, ShadowIndex};
