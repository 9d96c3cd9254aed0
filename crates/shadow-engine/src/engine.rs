//! Query Orchestrator.
//!
//! `QueryEngine` owns the index snapshot and sequences a query through
//! rule check → retrieval → source filter → clearance filter → composition.
//! The snapshot sits behind an `RwLock<Option<Arc<_>>>`: initialization builds
//! a complete `ShadowIndex` off to the side and publishes it in one write, so
//! readers never observe a half-built chunk/embedding pair.
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, OnceLock, RwLock};

use shadow_core::config::{RetrievalSettings, Settings};
use shadow_core::loader::FsDocumentLoader;
use shadow_core::traits::{DocumentLoader, Embedder};
use shadow_core::{ChunkClassifier, ClearanceLevel, Clock, DocType, Error, Result, SystemClock};
use shadow_retrieval::{filter_by_clearance, restrict_to_source, CosineRetriever, EmbeddingCache, Retriever};
use shadow_rules::{dispatch, match_rule, Rule, RuleOutcome};

use crate::compose::{compose_standard, compose_styled, Composed};
use crate::index::{IndexBuilder, ShadowIndex};

pub const MSG_EMPTY_QUERY: &str = "Please enter a valid query.";
pub const MSG_INIT_FAILED: &str = "System initialization failed. Check logs or document files.";
pub const MSG_INIT_COOLDOWN: &str = "System initialization failed recently. Please wait a few minutes and try again.";
pub const MSG_NO_RESULTS: &str = "No information found matching your query.";
pub const MSG_NO_MANUAL_CONTENT: &str = "No specific information found in the Secret Information Manual matching your query.";
pub const MSG_ACCESS_DENIED: &str = "Access Denied: Required clearance level not met for retrieved information.";
pub const MSG_NONE_ACCESSIBLE: &str = "No information accessible at your clearance level was found for this query.";
pub const MSG_RETRIEVAL_ERROR: &str = "An error occurred during information retrieval.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    Success,
    AccessDenied,
    NoResults,
    Error,
}

impl QueryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryStatus::Success => "success",
            QueryStatus::AccessDenied => "access_denied",
            QueryStatus::NoResults => "no_results",
            QueryStatus::Error => "error",
        }
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryResponse {
    pub body: String,
    pub explanation: String,
    pub status: QueryStatus,
}

impl QueryResponse {
    fn new(body: impl Into<String>, explanation: impl Into<String>, status: QueryStatus) -> Self {
        Self { body: body.into(), explanation: explanation.into(), status }
    }

    fn terminal(explanation: &str, status: QueryStatus) -> Self { Self::new("", explanation, status) }

    fn success(composed: Composed) -> Self { Self::new(composed.body, composed.explanation, QueryStatus::Success) }
}

#[derive(Default)]
struct EngineState {
    index: Option<Arc<ShadowIndex>>,
    last_attempt: Option<DateTime<Utc>>,
}

pub struct QueryEngine {
    loader: Arc<dyn DocumentLoader>,
    // Resolved on first initialization so a missing model surfaces as an init failure.
    embedder: OnceLock<Arc<dyn Embedder>>,
    retriever: OnceLock<Arc<dyn Retriever>>,
    clock: Arc<dyn Clock>,
    builder: IndexBuilder,
    cache: EmbeddingCache,
    retrieval: RetrievalSettings,
    assembly_threshold: f32,
    low_confidence_as_no_results: bool,
    cooldown: Duration,
    state: RwLock<EngineState>,
    init_lock: Mutex<()>,
}

pub struct QueryEngineBuilder {
    settings: Settings,
    loader: Option<Arc<dyn DocumentLoader>>,
    embedder: Option<Arc<dyn Embedder>>,
    retriever: Option<Arc<dyn Retriever>>,
    clock: Option<Arc<dyn Clock>>,
}

impl QueryEngineBuilder {
    pub fn loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self { self.loader = Some(loader); self }
    /// Defaults to `shadow_embed::get_default_embedder()`, loaded at first initialization.
    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self { self.embedder = Some(embedder); self }
    /// Defaults to a `CosineRetriever` over the engine's embedder.
    pub fn retriever(mut self, retriever: Arc<dyn Retriever>) -> Self { self.retriever = Some(retriever); self }
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self { self.clock = Some(clock); self }

    /// Validates settings. Loader defaults to the configured document files.
    pub fn build(self) -> anyhow::Result<QueryEngine> {
        let settings = self.settings;
        settings.validate()?;
        let classifier = ChunkClassifier::from_settings(&settings.chunking, &settings.classifier)?;
        let loader = match self.loader {
            Some(l) => l,
            None => Arc::new(FsDocumentLoader::from_settings(&settings.data)),
        };
        let embedder = OnceLock::new();
        if let Some(e) = self.embedder { let _ = embedder.set(e); }
        let retriever = OnceLock::new();
        if let Some(r) = self.retriever { let _ = retriever.set(r); }
        let cooldown_secs = i64::try_from(settings.engine.init_cooldown_secs).unwrap_or(i64::MAX);
        Ok(QueryEngine {
            loader,
            embedder,
            retriever,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            builder: IndexBuilder::new(classifier, settings.engine.embed_batch_size, settings.engine.show_progress),
            cache: EmbeddingCache::new(),
            retrieval: settings.retrieval,
            assembly_threshold: settings.response.assembly_threshold,
            low_confidence_as_no_results: settings.response.low_confidence_as_no_results,
            cooldown: Duration::try_seconds(cooldown_secs).unwrap_or(Duration::MAX),
            state: RwLock::new(EngineState::default()),
            init_lock: Mutex::new(()),
        })
    }
}

impl QueryEngine {
    pub fn builder(settings: Settings) -> QueryEngineBuilder {
        QueryEngineBuilder { settings, loader: None, embedder: None, retriever: None, clock: None }
    }

    /// Current snapshot, if initialized.
    pub fn index(&self) -> Option<Arc<ShadowIndex>> { self.state.read().ok().and_then(|s| s.index.clone()) }

    pub fn is_initialized(&self) -> bool { self.index().is_some() }

    /// Builds and publishes the index. Without `force` an existing snapshot is
    /// returned as is, and a failure inside the cooldown window is reported as
    /// `Error::InitCooldown` without another attempt. Both checks run under the
    /// init lock, so callers queued behind a failing build do not rebuild.
    /// A failure clears the snapshot and arms the cooldown.
    pub fn initialize(&self, force: bool) -> Result<Arc<ShadowIndex>> {
        let _guard = self.init_lock.lock().map_err(|_| Error::Operation("initialization lock poisoned".into()))?;
        if !force {
            if let Some(index) = self.index() { return Ok(index); }
            if let Some(remaining) = self.cooldown_remaining() {
                tracing::warn!(remaining_secs = remaining.num_seconds(), "initialization failed recently; not retrying yet");
                return Err(Error::InitCooldown { remaining_secs: remaining.num_seconds() });
            }
        }
        let now = self.clock.now();
        {
            let mut state = self.state.write().map_err(|_| Error::Operation("engine state poisoned".into()))?;
            state.last_attempt = Some(now);
        }
        tracing::info!(force, "initializing index");

        let built = catch_unwind(AssertUnwindSafe(|| {
            let embedder = self.resolve_embedder()?;
            self.builder.build(self.loader.as_ref(), embedder.as_ref(), &self.cache, now)
        }))
        .unwrap_or_else(|_| Err(Error::Operation("panic during index build".into())));

        let mut state = self.state.write().map_err(|_| Error::Operation("engine state poisoned".into()))?;
        match built {
            Ok(index) => {
                let index = Arc::new(index);
                tracing::info!(chunks = index.chunks.len(), rules = index.rules.len(), embedder = %index.embedder_id, "index ready");
                state.index = Some(index.clone());
                Ok(index)
            }
            Err(e) => {
                tracing::error!(error = %e, "initialization failed");
                state.index = None;
                Err(e)
            }
        }
    }

    /// Time left before a failed initialization may be retried.
    fn cooldown_remaining(&self) -> Option<Duration> {
        let last = self.state.read().ok().and_then(|s| s.last_attempt)?;
        let remaining = self.cooldown.checked_sub(&(self.clock.now() - last)).unwrap_or(Duration::MAX);
        (remaining > Duration::zero()).then_some(remaining)
    }

    // Caller holds `init_lock`.
    fn resolve_embedder(&self) -> Result<Arc<dyn Embedder>> {
        let embedder = match self.embedder.get() {
            Some(embedder) => embedder.clone(),
            None => {
                let loaded: Arc<dyn Embedder> =
                    Arc::from(shadow_embed::get_default_embedder().map_err(|e| Error::Embedding(format!("{e:#}")))?);
                let _ = self.embedder.set(loaded.clone());
                loaded
            }
        };
        if self.retriever.get().is_none() {
            let retriever = CosineRetriever::new(embedder.clone(), self.retrieval.top_k, self.retrieval.threshold);
            let _ = self.retriever.set(Arc::new(retriever));
        }
        Ok(embedder)
    }

    fn ready_index(&self) -> std::result::Result<Arc<ShadowIndex>, QueryResponse> {
        if let Some(index) = self.index() { return Ok(index); }
        self.initialize(false).map_err(|e| match e {
            Error::InitCooldown { .. } => QueryResponse::terminal(MSG_INIT_COOLDOWN, QueryStatus::Error),
            _ => QueryResponse::terminal(MSG_INIT_FAILED, QueryStatus::Error),
        })
    }

    pub fn process(&self, query: &str, clearance: ClearanceLevel) -> QueryResponse {
        let query = query.trim();
        if query.is_empty() {
            return QueryResponse::terminal(MSG_EMPTY_QUERY, QueryStatus::Error);
        }
        let index = match self.ready_index() {
            Ok(index) => index,
            Err(response) => return response,
        };
        tracing::info!(clearance = clearance.value(), "processing query");

        let pending_style = match match_rule(&index.rules, query, clearance) {
            None => None,
            Some(rule) => match dispatch(rule, self.clock.now()) {
                RuleOutcome::Respond { body, explanation } => {
                    return QueryResponse::new(body, explanation, QueryStatus::Success);
                }
                RuleOutcome::PendingStyle(rule) => Some(rule),
                RuleOutcome::FallThrough => None,
            },
        };

        match catch_unwind(AssertUnwindSafe(|| self.retrieve_and_compose(query, clearance, &index, pending_style))) {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::error!(error = ?e, "retrieval pipeline failed");
                QueryResponse::terminal(MSG_RETRIEVAL_ERROR, QueryStatus::Error)
            }
            Err(_) => {
                tracing::error!("retrieval pipeline panicked");
                QueryResponse::terminal(MSG_RETRIEVAL_ERROR, QueryStatus::Error)
            }
        }
    }

    fn retrieve_and_compose(
        &self,
        query: &str,
        clearance: ClearanceLevel,
        index: &ShadowIndex,
        style: Option<&Rule>,
    ) -> anyhow::Result<QueryResponse> {
        // With a pending style rule every empty stage still yields the rule's apology.
        let empty = |explanation: &str, status: QueryStatus| match style {
            Some(rule) => QueryResponse::success(compose_styled(rule, &[], self.assembly_threshold)),
            None => QueryResponse::terminal(explanation, status),
        };

        let retriever = self.retriever.get().ok_or_else(|| anyhow::anyhow!("retriever not resolved"))?;
        let hits = retriever.search(query, &index.chunks, &index.embeddings)?;
        if hits.is_empty() {
            tracing::info!("retrieval returned nothing");
            return Ok(empty(MSG_NO_RESULTS, QueryStatus::NoResults));
        }

        let manual = restrict_to_source(hits, DocType::Classified);
        if manual.is_empty() {
            tracing::warn!("no retrieved chunk came from the classified manual");
            return Ok(empty(MSG_NO_MANUAL_CONTENT, QueryStatus::NoResults));
        }

        let (accessible, any_denied) = filter_by_clearance(manual, clearance);
        if accessible.is_empty() {
            return Ok(if any_denied {
                tracing::warn!("relevant content requires higher clearance");
                empty(MSG_ACCESS_DENIED, QueryStatus::AccessDenied)
            } else {
                empty(MSG_NONE_ACCESSIBLE, QueryStatus::NoResults)
            });
        }

        if let Some(rule) = style {
            return Ok(QueryResponse::success(compose_styled(rule, &accessible, self.assembly_threshold)));
        }
        let composed = compose_standard(&accessible, self.assembly_threshold);
        if composed.low_confidence && self.low_confidence_as_no_results {
            return Ok(QueryResponse::new(composed.body, composed.explanation, QueryStatus::NoResults));
        }
        Ok(QueryResponse::success(composed))
    }
}
