//! Post-retrieval shaping: which scored chunks may become an answer.
use shadow_core::{ClearanceLevel, DocType, ScoredChunk};

/// Keeps only chunks drawn from documents of `doc_type`. Retrieval sees the
/// whole corpus; answers come from the classified manual alone.
pub fn restrict_to_source(chunks: Vec<ScoredChunk>, doc_type: DocType) -> Vec<ScoredChunk> {
    let before = chunks.len();
    let kept: Vec<ScoredChunk> = chunks.into_iter().filter(|c| c.chunk.doc_type == doc_type).collect();
    tracing::debug!(before, after = kept.len(), source = %doc_type, "source-scope filter");
    kept
}

/// Splits `chunks` by clearance. Returns the accessible ones (order kept) and
/// whether any chunk was withheld. Never fails; interpreting an empty result
/// is left to the caller.
pub fn filter_by_clearance(chunks: Vec<ScoredChunk>, clearance: ClearanceLevel) -> (Vec<ScoredChunk>, bool) {
    let mut any_denied = false;
    let accessible: Vec<ScoredChunk> = chunks
        .into_iter()
        .filter(|c| {
            let ok = clearance.permits(c.chunk.security_level);
            if !ok {
                any_denied = true;
                tracing::debug!(chunk = %c.chunk.id, level = c.chunk.security_level.value(), "withheld by clearance");
            }
            ok
        })
        .collect();
    tracing::info!(accessible = accessible.len(), any_denied, clearance = clearance.value(), "clearance filter");
    (accessible, any_denied)
}
