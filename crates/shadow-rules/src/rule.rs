//! Framework directives as closed sum types.
use serde::Serialize;
use std::fmt;

use shadow_core::ClearanceLevel;

fn normalise(raw: &str) -> String { raw.trim().to_ascii_lowercase().replace(['-', ' '], "_") }

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TriggerType {
    Keyword,
    AccessLevel,
    TimeSensitiveTopic,
    StartsWith,
    Unrecognized(String),
}

impl From<&str> for TriggerType {
    fn from(raw: &str) -> Self {
        match normalise(raw).as_str() {
            "keyword" => TriggerType::Keyword,
            "access_level" => TriggerType::AccessLevel,
            "time_sensitive_topic" => TriggerType::TimeSensitiveTopic,
            "starts_with" => TriggerType::StartsWith,
            _ => TriggerType::Unrecognized(raw.trim().to_string()),
        }
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerType::Keyword => f.write_str("keyword"),
            TriggerType::AccessLevel => f.write_str("access_level"),
            TriggerType::TimeSensitiveTopic => f.write_str("time_sensitive_topic"),
            TriggerType::StartsWith => f.write_str("starts_with"),
            TriggerType::Unrecognized(raw) => write!(f, "unrecognized({raw})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ResponseType {
    DirectQuote,
    AccessDenied,
    TimeBased,
    StyleGuide,
    Unrecognized(String),
}

impl From<&str> for ResponseType {
    fn from(raw: &str) -> Self {
        match normalise(raw).as_str() {
            "direct_quote" => ResponseType::DirectQuote,
            "access_denied" => ResponseType::AccessDenied,
            "time_based" => ResponseType::TimeBased,
            "style_guide" => ResponseType::StyleGuide,
            _ => ResponseType::Unrecognized(raw.trim().to_string()),
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseType::DirectQuote => f.write_str("direct_quote"),
            ResponseType::AccessDenied => f.write_str("access_denied"),
            ResponseType::TimeBased => f.write_str("time_based"),
            ResponseType::StyleGuide => f.write_str("style_guide"),
            ResponseType::Unrecognized(raw) => write!(f, "unrecognized({raw})"),
        }
    }
}

/// Formatting requested by a `style_guide` rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StyleInstruction {
    StepByStep,
    DirectTacticalSteps,
    ScenarioOptions,
    Checklist,
    Analogy,
    IndirectPhrasing,
    Cryptic,
    Unrecognized(String),
}

/// Checked in order; the first keyword contained in the instruction wins.
const STYLE_KEYWORDS: &[(&str, StyleInstruction)] = &[
    ("step-by-step", StyleInstruction::StepByStep),
    ("direct tactical steps", StyleInstruction::DirectTacticalSteps),
    ("scenario-based options", StyleInstruction::ScenarioOptions),
    ("structured checklist", StyleInstruction::Checklist),
    ("analogy", StyleInstruction::Analogy),
    ("metaphor", StyleInstruction::Analogy),
    ("codewords", StyleInstruction::IndirectPhrasing),
    ("indirect phrasing", StyleInstruction::IndirectPhrasing),
    ("cryptic", StyleInstruction::Cryptic),
    ("parable", StyleInstruction::Cryptic),
];

impl StyleInstruction {
    pub fn parse(instruction: &str) -> Self {
        let lowered = instruction.to_lowercase();
        STYLE_KEYWORDS
            .iter()
            .find(|(keyword, _)| lowered.contains(keyword))
            .map(|(_, style)| style.clone())
            .unwrap_or_else(|| StyleInstruction::Unrecognized(instruction.trim().to_string()))
    }
}

/// A parsed framework directive. `number` is for ordering and reporting only;
/// precedence comes from position in the parsed sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub number: u32,
    pub trigger_type: TriggerType,
    pub trigger_value: String,
    pub response_type: ResponseType,
    pub response_value: String,
    /// Requesters below this clearance never match the rule.
    pub min_clearance: Option<ClearanceLevel>,
}

impl Rule {
    /// Topic part of a composite `topic|time-spec` trigger (the whole value otherwise).
    pub fn topic(&self) -> &str { self.trigger_value.split('|').next().unwrap_or_default().trim() }

    /// Time-spec part of a composite trigger.
    pub fn time_spec(&self) -> Option<&str> { self.trigger_value.split_once('|').map(|(_, spec)| spec.trim()) }

    pub fn style(&self) -> StyleInstruction { StyleInstruction::parse(&self.response_value) }
}
