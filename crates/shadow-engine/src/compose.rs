//! Response Composer: turns accessible chunks into an answer body and an
//! explanation, either in the standard layout or following a style rule.
use regex::Regex;
use std::fmt::Write as _;
use std::sync::OnceLock;

use shadow_core::ScoredChunk;
use shadow_rules::{Rule, StyleInstruction};

pub const LOW_CONFIDENCE_BODY: &str = "Based on the available information and relevance thresholds, I cannot provide a specific answer. Relevant sections might exist but require higher relevance scores or clearance.";
pub const SECTION_SEPARATOR: &str = "\n\n---\n\n";

const EXPLAINED_SOURCES: usize = 5;
const STYLE_SOURCES: usize = 3;
const SNIPPET_CHARS: usize = 200;

fn analogy_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(like|similar to|imagine)\b").expect("static regex"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composed {
    pub body: String,
    pub explanation: String,
    /// Nothing cleared the assembly threshold; the body is the disclaimer.
    pub low_confidence: bool,
}

fn by_score(chunks: &[ScoredChunk]) -> Vec<&ScoredChunk> {
    let mut sorted: Vec<&ScoredChunk> = chunks.iter().collect();
    sorted.sort_by(|a, b| b.score.total_cmp(&a.score));
    sorted
}

pub fn compose_standard(chunks: &[ScoredChunk], assembly_threshold: f32) -> Composed {
    if chunks.is_empty() {
        tracing::warn!("standard composer called without chunks");
        return Composed {
            body: "No relevant information could be accessed or retrieved.".into(),
            explanation: "No information sources could be identified or accessed for this query.".into(),
            low_confidence: true,
        };
    }
    let sorted = by_score(chunks);
    let parts: Vec<&str> = sorted
        .iter()
        .filter(|c| c.score >= assembly_threshold)
        .map(|c| c.chunk.text.as_str())
        .collect();

    let mut explanation = String::from("Information retrieval process details:");
    for (i, c) in sorted.iter().take(EXPLAINED_SOURCES).enumerate() {
        let _ = write!(explanation, "\n{}. {} (Retrieved Relevance: {})", i + 1, c.chunk.context(), c.relevance_percent());
    }

    if parts.is_empty() {
        tracing::warn!(best = sorted[0].score, assembly_threshold, "no chunk met the assembly threshold");
        let _ = write!(
            explanation,
            "\n\nNote: No retrieved sections met the required response relevance threshold ({:.0}%).",
            assembly_threshold * 100.0
        );
        return Composed { body: LOW_CONFIDENCE_BODY.to_string(), explanation, low_confidence: true };
    }
    tracing::debug!(quoted = parts.len(), "standard response assembled");
    Composed { body: parts.join(SECTION_SEPARATOR), explanation, low_confidence: false }
}

fn first_sentence(text: &str) -> &str { text.split('.').next().unwrap_or_default().trim() }

fn snippet(text: &str) -> String {
    let mut s: String = text.chars().take(SNIPPET_CHARS).collect();
    s.push_str("...");
    s
}

/// Applies `rule`'s style to `chunks`. An empty slice yields the rule-referencing
/// apology; an unrecognized style falls back to the standard layout.
pub fn compose_styled(rule: &Rule, chunks: &[ScoredChunk], assembly_threshold: f32) -> Composed {
    let prefix = format!("Response generated following style guidelines from rule {}. ", rule.number);

    if chunks.is_empty() {
        tracing::warn!(rule = rule.number, "style rule matched but no accessible chunks");
        return Composed {
            body: format!(
                "Framework rule {} applies, but no specific information could be retrieved or accessed at your clearance level.",
                rule.number
            ),
            explanation: format!(
                "Framework rule {} ('{}') was matched, but retrieval yielded no accessible content chunks.",
                rule.number, rule.trigger_value
            ),
            low_confidence: false,
        };
    }

    let sorted = by_score(chunks);
    let texts = |n: usize| sorted.iter().take(n).map(|c| c.chunk.text.as_str());
    let best = sorted[0].chunk.text.as_str();

    let style = rule.style();
    tracing::info!(rule = rule.number, ?style, chunks = sorted.len(), "applying style guide");
    let (body, detail) = match &style {
        StyleInstruction::StepByStep => (
            texts(3).enumerate().map(|(i, t)| format!("Step {}: {t}", i + 1)).collect::<Vec<_>>().join("\n\n"),
            "Formatted as step-by-step instructions using retrieved information.",
        ),
        StyleInstruction::DirectTacticalSteps => (
            texts(2).collect::<Vec<_>>().join(SECTION_SEPARATOR),
            "Provided direct tactical steps based on retrieved information.",
        ),
        StyleInstruction::ScenarioOptions => (
            texts(3).enumerate().map(|(i, t)| format!("Option {}:\n{t}", i + 1)).collect::<Vec<_>>().join(SECTION_SEPARATOR),
            "Formatted as scenario-based options using retrieved information.",
        ),
        StyleInstruction::Checklist => (
            format!(
                "Checklist:\n{}",
                texts(5).map(|t| format!("- [ ] {}", first_sentence(t))).collect::<Vec<_>>().join("\n")
            ),
            "Formatted as a checklist based on retrieved information.",
        ),
        StyleInstruction::Analogy => {
            let analogies: Vec<&str> =
                sorted.iter().map(|c| c.chunk.text.as_str()).filter(|t| analogy_re().is_match(t)).take(2).collect();
            if analogies.is_empty() {
                (best.to_string(), "Attempted to explain using analogies; providing most relevant retrieved information.")
            } else {
                (analogies.join("\n\n"), "Explained using analogies found in retrieved information.")
            }
        }
        StyleInstruction::IndirectPhrasing => (snippet(best), "Used indirect phrasing by providing a relevant snippet."),
        StyleInstruction::Cryptic => (
            best.to_string(),
            "Provided potentially relevant information cryptically (showing most relevant chunk).",
        ),
        StyleInstruction::Unrecognized(raw) => {
            tracing::warn!(rule = rule.number, style = %raw, "unrecognized style; using standard layout");
            let standard = compose_standard(chunks, assembly_threshold);
            return Composed {
                body: standard.body,
                explanation: format!(
                    "{prefix}Used standard response format as style '{}' was not recognized. {}",
                    rule.response_value, standard.explanation
                ),
                low_confidence: standard.low_confidence,
            };
        }
    };

    let mut explanation = format!("{prefix}{detail}\n\nSources considered:\n");
    for (i, c) in sorted.iter().take(STYLE_SOURCES).enumerate() {
        let _ = writeln!(explanation, "{}. {} (Relevance: {})", i + 1, c.chunk.context(), c.relevance_percent());
    }
    Composed { body, explanation, low_confidence: false }
}
