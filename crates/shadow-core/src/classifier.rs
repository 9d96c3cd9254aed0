//! Ingestion-time chunking and security tagging.
//!
//! A document is split into blank-line separated paragraphs. Header paragraphs
//! (`# Title`) only move the running section state `{title, level}` and never
//! reach chunk text. Every other paragraph is appended to a size-bounded buffer
//! that keeps the highest section level of anything it accumulated, so a lower
//! header arriving mid-buffer cannot relabel already collected text downwards.
use regex::{Regex, RegexBuilder};
use std::sync::OnceLock;

use crate::config::{ChunkingSettings, ClassifierSettings};
use crate::error::{Error, Result};
use crate::types::{Chunk, DocType, Document, SecurityLevel};

const PARAGRAPH_SEPARATOR: &str = "\n\n";
const UNKNOWN_SECTION: &str = "Unknown";

fn paragraph_split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n+").expect("static regex"))
}

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#+\s+(.+)$").expect("static regex"))
}

fn explicit_level_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        RegexBuilder::new(r"level\s+(\d+)").case_insensitive(true).build().expect("static regex")
    })
}

/// Trimmed, non-empty paragraphs in document order.
pub fn split_paragraphs(content: &str) -> Vec<&str> {
    paragraph_split_re().split(content).map(str::trim).filter(|p| !p.is_empty()).collect()
}

/// Section title if the paragraph is a header.
pub fn header_title(paragraph: &str) -> Option<&str> {
    header_re().captures(paragraph).and_then(|c| c.get(1)).map(|m| m.as_str().trim())
}

/// One keyword pattern and the level it implies.
#[derive(Debug, Clone)]
pub struct LevelPattern {
    pattern: Regex,
    level: SecurityLevel,
}

/// Ordered keyword → level table consulted for headers without an explicit level.
/// The first matching pattern wins.
#[derive(Debug, Clone)]
pub struct ClassifierRules {
    patterns: Vec<LevelPattern>,
}

impl ClassifierRules {
    /// Build from `(level, keyword fragments)` pairs. Fragments are joined into one
    /// word-bounded, case-insensitive alternation per level.
    pub fn new(entries: &[(SecurityLevel, Vec<String>)]) -> Result<Self> {
        let mut patterns = Vec::with_capacity(entries.len());
        for (level, keywords) in entries {
            if keywords.is_empty() { continue; }
            let source = format!(r"\b({})\b", keywords.join("|"));
            let pattern = RegexBuilder::new(&source)
                .case_insensitive(true)
                .build()
                .map_err(|e| Error::InvalidConfig(format!("classifier keywords for {level}: {e}")))?;
            patterns.push(LevelPattern { pattern, level: *level });
        }
        Ok(Self { patterns })
    }

    pub fn from_settings(settings: &ClassifierSettings) -> Result<Self> {
        Self::new(&[
            (SecurityLevel::new(3), settings.level3_keywords.clone()),
            (SecurityLevel::new(2), settings.level2_keywords.clone()),
        ])
    }

    pub fn keyword_level(&self, title: &str) -> Option<SecurityLevel> {
        self.patterns.iter().find(|p| p.pattern.is_match(title)).map(|p| p.level)
    }

    /// Level for a section header: explicit `level N` first, then keywords,
    /// then the document type's default.
    pub fn header_level(&self, title: &str, doc_type: DocType) -> SecurityLevel {
        if let Some(n) = explicit_level_re()
            .captures(title)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
        {
            return SecurityLevel::explicit(n);
        }
        self.keyword_level(title).unwrap_or_else(|| doc_type.default_level())
    }
}

impl Default for ClassifierRules {
    fn default() -> Self {
        // The compiled-in keyword lists are valid regex fragments.
        Self::from_settings(&ClassifierSettings::default()).expect("default classifier keywords compile")
    }
}

struct SectionState {
    title: String,
    level: SecurityLevel,
}

#[derive(Default)]
struct ChunkBuffer {
    text: String,
    chars: usize,
    level: SecurityLevel,
    section: String,
}

impl ChunkBuffer {
    fn is_empty(&self) -> bool { self.chars == 0 }

    fn push(&mut self, paragraph: &str, paragraph_chars: usize, section: &SectionState) {
        if self.is_empty() {
            self.level = section.level;
        } else {
            self.text.push_str(PARAGRAPH_SEPARATOR);
            self.chars += PARAGRAPH_SEPARATOR.len();
            self.level = self.level.max(section.level);
        }
        self.text.push_str(paragraph);
        self.chars += paragraph_chars;
        self.section = section.title.clone();
    }
}

pub struct ChunkClassifier {
    chunk_size: usize,
    rules: ClassifierRules,
}

impl ChunkClassifier {
    pub fn new(chunk_size: usize, rules: ClassifierRules) -> Self { Self { chunk_size, rules } }

    pub fn from_settings(chunking: &ChunkingSettings, classifier: &ClassifierSettings) -> Result<Self> {
        if chunking.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunking.chunk_size must be > 0".into()));
        }
        Ok(Self::new(chunking.chunk_size, ClassifierRules::from_settings(classifier)?))
    }

    /// Chunk every document. Fails only when no document produced any chunk.
    pub fn classify_all(&self, documents: &[Document]) -> Result<Vec<Chunk>> {
        let mut all_chunks = Vec::new();
        for document in documents {
            all_chunks.extend(self.classify(document));
        }
        tracing::info!(chunks = all_chunks.len(), documents = documents.len(), "chunking complete");
        if all_chunks.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        Ok(all_chunks)
    }

    /// Chunk one document. An empty document yields no chunks.
    pub fn classify(&self, document: &Document) -> Vec<Chunk> {
        let paragraphs = split_paragraphs(&document.content);
        tracing::info!(document = %document.name, doc_type = %document.doc_type, paragraphs = paragraphs.len(), "classifying document");
        if paragraphs.is_empty() {
            tracing::warn!(document = %document.name, "document has no paragraphs; no chunks produced");
            return Vec::new();
        }

        let mut emitter = Emitter::new(document);
        let mut section = SectionState { title: UNKNOWN_SECTION.to_string(), level: document.doc_type.default_level() };
        let mut buffer = ChunkBuffer::default();

        for (i, paragraph) in paragraphs.into_iter().enumerate() {
            if let Some(title) = header_title(paragraph) {
                section.level = self.rules.header_level(title, document.doc_type);
                section.title = title.to_string();
                tracing::debug!(paragraph = i, section = %section.title, level = section.level.value(), "section header");
                continue;
            }

            let paragraph_chars = paragraph.chars().count();
            if !buffer.is_empty() && buffer.chars + PARAGRAPH_SEPARATOR.len() + paragraph_chars > self.chunk_size {
                emitter.flush(std::mem::take(&mut buffer));
            }
            if buffer.is_empty() && paragraph_chars > self.chunk_size {
                tracing::warn!(paragraph = i, chars = paragraph_chars, limit = self.chunk_size, "paragraph exceeds chunk size; truncating");
                let truncated: String = paragraph.chars().take(self.chunk_size).collect();
                emitter.emit(truncated, section.level, section.title.clone());
                continue;
            }
            buffer.push(paragraph, paragraph_chars, &section);
        }
        if !buffer.is_empty() {
            emitter.flush(buffer);
        }
        emitter.finish()
    }
}

impl Default for ChunkClassifier {
    fn default() -> Self { Self::new(ChunkingSettings::default().chunk_size, ClassifierRules::default()) }
}

struct Emitter<'a> {
    document: &'a Document,
    slug: String,
    chunks: Vec<Chunk>,
}

impl<'a> Emitter<'a> {
    fn new(document: &'a Document) -> Self {
        Self { document, slug: slugify(&document.name), chunks: Vec::new() }
    }

    fn flush(&mut self, buffer: ChunkBuffer) {
        self.emit(buffer.text, buffer.level, buffer.section);
    }

    fn emit(&mut self, text: String, level: SecurityLevel, section: String) {
        let ordinal = self.chunks.len();
        let chunk = Chunk {
            id: format!("{}:{}", self.slug, ordinal),
            text,
            source: self.document.name.clone(),
            section,
            doc_type: self.document.doc_type,
            security_level: level,
            ordinal,
        };
        tracing::debug!(id = %chunk.id, level = level.value(), section = %chunk.section, "chunk created");
        self.chunks.push(chunk);
    }

    fn finish(self) -> Vec<Chunk> { self.chunks }
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}
