//! shadow-rules
//!
//! Response-framework rules: parsing, first-match selection and dispatch of
//! a matched rule by response type.
#![forbid(unsafe_code)]

pub mod dispatch;
pub mod matcher;
pub mod parser;
pub mod rule;

pub use dispatch::{dispatch, parse_trigger_hour, time_condition_met, RuleOutcome};
pub use matcher::match_rule;
pub use parser::{parse_file, parse_rules};
pub use rule::{ResponseType, Rule, StyleInstruction, TriggerType};
