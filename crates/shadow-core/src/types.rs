//! Domain types shared by the classifier, retriever and engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::Error;

pub type ChunkId = String;

/// Which of the two ingested documents a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    Classified,
    Framework,
}

impl DocType {
    /// Level a section carries when its header gives no signal.
    pub fn default_level(self) -> SecurityLevel {
        match self {
            DocType::Classified => SecurityLevel::new(1),
            DocType::Framework => SecurityLevel::UNRESTRICTED,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocType::Classified => "classified",
            DocType::Framework => "framework",
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Minimum clearance needed to read a chunk: 0 is unrestricted, 3 the highest tier.
///
/// The default is level 1, never 0, so a chunk whose level was lost fails closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct SecurityLevel(u8);

impl SecurityLevel {
    pub const UNRESTRICTED: Self = Self(0);
    pub const MAX: Self = Self(3);

    pub fn new(level: u8) -> Self { Self(level.min(Self::MAX.0)) }

    /// Level stated explicitly in a header ("Level 7"), clamped to 1..=3.
    pub fn explicit(level: u64) -> Self { Self(level.clamp(1, 3) as u8) }

    pub fn value(self) -> u8 { self.0 }

    pub fn label(self) -> &'static str {
        match self.0 {
            0 => "Unrestricted",
            1 => "Level 1 (Low)",
            2 => "Level 2 (Medium)",
            _ => "Level 3 (High)",
        }
    }
}

impl Default for SecurityLevel {
    fn default() -> Self { Self(1) }
}

impl From<u8> for SecurityLevel {
    fn from(level: u8) -> Self { Self::new(level) }
}

impl From<SecurityLevel> for u8 {
    fn from(level: SecurityLevel) -> Self { level.0 }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.label()) }
}

/// The requester's claimed access tier. Supplied by the caller, not verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ClearanceLevel {
    Low = 1,
    Medium = 2,
    High = 3,
    VeryHigh = 4,
    TopSecret = 5,
}

impl ClearanceLevel {
    pub const ALL: [ClearanceLevel; 5] = [
        ClearanceLevel::Low,
        ClearanceLevel::Medium,
        ClearanceLevel::High,
        ClearanceLevel::VeryHigh,
        ClearanceLevel::TopSecret,
    ];

    pub fn value(self) -> u8 { self as u8 }

    pub fn label(self) -> &'static str {
        match self {
            ClearanceLevel::Low => "Level 1 (Low)",
            ClearanceLevel::Medium => "Level 2 (Medium)",
            ClearanceLevel::High => "Level 3 (High)",
            ClearanceLevel::VeryHigh => "Level 4 (Very High)",
            ClearanceLevel::TopSecret => "Level 5 (Top Secret)",
        }
    }

    /// Map a UI label to a level. Anything unrecognised is treated as the lowest tier.
    pub fn from_label(label: &str) -> Self {
        match label.parse() {
            Ok(level) => level,
            Err(_) => {
                tracing::warn!(label, "unknown clearance label, defaulting to Level 1");
                ClearanceLevel::Low
            }
        }
    }

    pub fn permits(self, level: SecurityLevel) -> bool { level.value() <= self.value() }
}

impl FromStr for ClearanceLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(level) = Self::ALL.into_iter().find(|c| c.label().eq_ignore_ascii_case(trimmed)) {
            return Ok(level);
        }
        let short = trimmed.to_ascii_lowercase().replace(['_', ' '], "-");
        let level = match short.as_str() {
            "1" | "low" => ClearanceLevel::Low,
            "2" | "medium" => ClearanceLevel::Medium,
            "3" | "high" => ClearanceLevel::High,
            "4" | "very-high" => ClearanceLevel::VeryHigh,
            "5" | "top-secret" => ClearanceLevel::TopSecret,
            _ => return Err(Error::InvalidClearance(s.to_string())),
        };
        Ok(level)
    }
}

impl fmt::Display for ClearanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.label()) }
}

/// A raw document as handed over by the loader.
#[derive(Debug, Clone)]
pub struct Document {
    pub name: String,
    pub content: String,
    pub doc_type: DocType,
    pub path: PathBuf,
}

/// A bounded unit of document text with provenance and security metadata.
///
/// - `id`: `<document-slug>:<ordinal>`, stable across re-ingestion
/// - `source`: display name of the document
/// - `section`: title of the last header seen, or `"Unknown"`
/// - `security_level`: highest section level of any paragraph in the chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
    pub source: String,
    pub section: String,
    pub doc_type: DocType,
    #[serde(default)]
    pub security_level: SecurityLevel,
    pub ordinal: usize,
}

impl Chunk {
    /// One-line provenance used in explanations.
    pub fn context(&self) -> String {
        format!("Source: {} | Section: {} | Security: {}", self.source, self.section, self.security_level.label())
    }
}

/// A chunk annotated with its similarity to the current query. Lives for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

impl ScoredChunk {
    pub fn new(chunk: Chunk, score: f32) -> Self {
        let score = if score.is_nan() { 0.0 } else { score.clamp(-1.0, 1.0) };
        Self { chunk, score }
    }

    pub fn relevance_percent(&self) -> String { format!("{:.1}%", self.score * 100.0) }
}
