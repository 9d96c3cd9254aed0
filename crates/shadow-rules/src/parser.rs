//! Framework document → ordered `Vec<Rule>`.
//!
//! A rule opens at a `## Rule <n>` header (any number of `#`, anything after
//! the number) and is filled by `key: value` lines until the next header.
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use shadow_core::{ClearanceLevel, Error, Result};

use crate::rule::{ResponseType, Rule, TriggerType};

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\s*#+\s*rule\s+(\d+)\b").expect("static regex"))
}

fn field_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*[-*]?\s*([A-Za-z_ ]+?)\s*:\s*(.*?)\s*$").expect("static regex"))
}

#[derive(Default)]
struct Block {
    number: u32,
    trigger_type: Option<String>,
    trigger_value: String,
    response_type: Option<String>,
    response_value: String,
    min_clearance: Option<String>,
}

impl Block {
    fn open(number: u32) -> Self { Self { number, ..Default::default() } }

    fn set(&mut self, key: &str, value: String) {
        match key.to_ascii_lowercase().replace(' ', "_").as_str() {
            "trigger_type" => self.trigger_type = Some(value),
            "trigger_value" => self.trigger_value = value,
            "response_type" => self.response_type = Some(value),
            "response_value" => self.response_value = value,
            "min_clearance" => self.min_clearance = Some(value),
            other => tracing::debug!(rule = self.number, key = other, "ignoring unknown rule field"),
        }
    }

    fn finish(self) -> Option<Rule> {
        let (Some(trigger), Some(response)) = (self.trigger_type.as_deref(), self.response_type.as_deref()) else {
            tracing::warn!(rule = self.number, "rule block lacks a trigger or response type; skipped");
            return None;
        };
        let min_clearance = match self.min_clearance.as_deref().map(str::parse::<ClearanceLevel>) {
            None => None,
            Some(Ok(level)) => Some(level),
            Some(Err(e)) => {
                tracing::warn!(rule = self.number, error = %e, "unparseable min_clearance; rule skipped");
                return None;
            }
        };
        Some(Rule {
            number: self.number,
            trigger_type: TriggerType::from(trigger),
            trigger_value: self.trigger_value,
            response_type: ResponseType::from(response),
            response_value: self.response_value,
            min_clearance,
        })
    }
}

fn unquote(raw: &str) -> String {
    let t = raw.trim();
    t.strip_prefix('"').and_then(|s| s.strip_suffix('"')).unwrap_or(t).to_string()
}

/// Parses every rule block in document order. Text outside rule blocks is ignored.
pub fn parse_rules(text: &str) -> Vec<Rule> {
    let mut rules = Vec::new();
    let mut current: Option<Block> = None;
    for line in text.lines() {
        if let Some(caps) = header_re().captures(line) {
            if let Some(done) = current.take().and_then(Block::finish) { rules.push(done); }
            let number = caps[1].parse().unwrap_or(0);
            current = Some(Block::open(number));
            continue;
        }
        if line.trim_start().starts_with('#') {
            // a non-rule header closes the open block
            if let Some(done) = current.take().and_then(Block::finish) { rules.push(done); }
            continue;
        }
        let Some(block) = current.as_mut() else { continue };
        if let Some(caps) = field_re().captures(line) {
            block.set(&caps[1], unquote(&caps[2]));
        }
    }
    if let Some(done) = current.and_then(Block::finish) { rules.push(done); }
    tracing::info!(count = rules.len(), "parsed framework rules");
    rules
}

/// Reads and parses a framework file. A missing file is `NotFound`; a file
/// without rules yields an empty list.
pub fn parse_file(path: &Path) -> Result<Vec<Rule>> {
    if !path.exists() { return Err(Error::NotFound(path.display().to_string())); }
    let bytes = std::fs::read(path).map_err(|source| Error::Read { path: path.display().to_string(), source })?;
    Ok(parse_rules(&String::from_utf8_lossy(&bytes)))
}
