use regex::Regex;
use std::sync::OnceLock;

use shadow_core::ClearanceLevel;

use crate::rule::{Rule, TriggerType};

fn level_ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\blevel[\s-]*(\d+)\b").expect("static regex"))
}

/// First rule in document order whose trigger fires for `query` at `clearance`.
pub fn match_rule<'a>(rules: &'a [Rule], query: &str, clearance: ClearanceLevel) -> Option<&'a Rule> {
    let lowered = query.to_lowercase();
    let matched = rules.iter().find(|rule| {
        if rule.min_clearance.is_some_and(|min| clearance < min) {
            return false;
        }
        triggers(rule, &lowered, clearance)
    });
    if let Some(rule) = matched {
        tracing::debug!(rule = rule.number, trigger = %rule.trigger_type, "rule matched");
    }
    matched
}

fn triggers(rule: &Rule, lowered_query: &str, clearance: ClearanceLevel) -> bool {
    match &rule.trigger_type {
        TriggerType::Keyword => rule
            .trigger_value
            .split(',')
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .any(|p| lowered_query.contains(&p)),
        TriggerType::StartsWith => {
            let prefix = rule.trigger_value.trim().to_lowercase();
            !prefix.is_empty() && lowered_query.trim_start().starts_with(&prefix)
        }
        TriggerType::AccessLevel => {
            let Some(floor) = first_number(&rule.trigger_value) else {
                tracing::warn!(rule = rule.number, value = %rule.trigger_value, "access_level trigger without a level");
                return false;
            };
            level_ref_re()
                .captures_iter(lowered_query)
                .filter_map(|c| c[1].parse::<u32>().ok())
                .any(|n| n >= floor && n > u32::from(clearance.value()))
        }
        TriggerType::TimeSensitiveTopic => {
            let topic = rule.topic().to_lowercase();
            !topic.is_empty() && lowered_query.contains(&topic)
        }
        TriggerType::Unrecognized(raw) => {
            tracing::debug!(rule = rule.number, trigger = %raw, "unrecognized trigger type never matches");
            false
        }
    }
}

fn first_number(value: &str) -> Option<u32> {
    let start = value.find(|c: char| c.is_ascii_digit())?;
    let digits: String = value[start..].chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}
