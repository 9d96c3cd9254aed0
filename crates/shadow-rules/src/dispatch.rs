//! What a matched rule does to the query pipeline.
use chrono::{DateTime, Timelike, Utc};
use regex::Regex;
use std::sync::OnceLock;

use crate::rule::{ResponseType, Rule, TriggerType};

fn time_spec_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+)\s+(AM|PM)\s+UTC").expect("static regex"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome<'a> {
    /// Terminal answer; retrieval is skipped.
    Respond { body: String, explanation: String },
    /// Retrieval runs, then the rule's style is applied to the accessible chunks.
    PendingStyle(&'a Rule),
    /// Behave as if no rule had matched.
    FallThrough,
}

/// Parses `<hour> AM|PM UTC` into a 24-hour clock hour. Hours outside 1..=12 are rejected.
pub fn parse_trigger_hour(spec: &str) -> Option<u32> {
    let caps = time_spec_re().captures(spec)?;
    let hour: u32 = caps[1].parse().ok()?;
    if !(1..=12).contains(&hour) { return None; }
    let pm = caps[2].eq_ignore_ascii_case("PM");
    Some(match (pm, hour) {
        (false, 12) => 0,
        (false, h) => h,
        (true, 12) => 12,
        (true, h) => h + 12,
    })
}

/// True when `now` is strictly after the rule's trigger hour (UTC).
pub fn time_condition_met(rule: &Rule, now: DateTime<Utc>) -> bool {
    if rule.trigger_type != TriggerType::TimeSensitiveTopic {
        return false;
    }
    let Some(spec) = rule.time_spec() else {
        tracing::warn!(rule = rule.number, value = %rule.trigger_value, "time-sensitive trigger without a time spec");
        return false;
    };
    let Some(hour) = parse_trigger_hour(spec) else {
        tracing::warn!(rule = rule.number, spec, "could not parse trigger time");
        return false;
    };
    tracing::debug!(rule = rule.number, current_hour = now.hour(), trigger_hour = hour, "time condition");
    now.hour() > hour
}

pub fn dispatch(rule: &Rule, now: DateTime<Utc>) -> RuleOutcome<'_> {
    match &rule.response_type {
        ResponseType::DirectQuote | ResponseType::AccessDenied => {
            tracing::info!(rule = rule.number, "direct response from rule");
            RuleOutcome::Respond {
                body: rule.response_value.clone(),
                explanation: format!("Response generated based on framework rule {} ('{}').", rule.number, rule.trigger_value),
            }
        }
        ResponseType::TimeBased if time_condition_met(rule, now) => {
            tracing::info!(rule = rule.number, "time-based rule fired");
            RuleOutcome::Respond {
                body: format!(
                    "As per time-sensitive protocols (Rule {}): {} [{} UTC]",
                    rule.number,
                    rule.response_value,
                    now.format("%Y-%m-%d %H:%M")
                ),
                explanation: format!(
                    "Response generated based on time-sensitive framework rule {} for trigger '{}'.",
                    rule.number,
                    rule.topic()
                ),
            }
        }
        ResponseType::TimeBased => {
            tracing::info!(rule = rule.number, "time condition not met; falling through to retrieval");
            RuleOutcome::FallThrough
        }
        ResponseType::StyleGuide => {
            tracing::info!(rule = rule.number, "style rule pending until retrieval completes");
            RuleOutcome::PendingStyle(rule)
        }
        ResponseType::Unrecognized(raw) => {
            tracing::warn!(rule = rule.number, response_type = %raw, "unhandled response type; falling through");
            RuleOutcome::FallThrough
        }
    }
}
