use shadow_core::{Chunk, DocType, ScoredChunk, SecurityLevel};
use shadow_engine::{compose_standard, compose_styled, LOW_CONFIDENCE_BODY};
use shadow_rules::{ResponseType, Rule, TriggerType};

fn hit(id: &str, text: &str, score: f32) -> ScoredChunk {
    ScoredChunk::new(
        Chunk {
            id: id.to_string(),
            text: text.to_string(),
            source: "Secret Info Manual".into(),
            section: "Field Ops".into(),
            doc_type: DocType::Classified,
            security_level: SecurityLevel::new(1),
            ordinal: 0,
        },
        score,
    )
}

fn style_rule(instruction: &str) -> Rule {
    Rule {
        number: 8,
        trigger_type: TriggerType::Keyword,
        trigger_value: "compromised".into(),
        response_type: ResponseType::StyleGuide,
        response_value: instruction.into(),
        min_clearance: None,
    }
}

fn three_hits() -> Vec<ScoredChunk> {
    vec![
        hit("m:1", "Second best. More detail here.", 0.5),
        hit("m:0", "Best match. Extra sentence.", 0.9),
        hit("m:2", "Third option. Trailing text.", 0.4),
    ]
}

#[test]
fn standard_quotes_chunks_above_assembly_threshold_in_score_order() {
    let hits = vec![hit("m:0", "low", 0.3), hit("m:1", "high", 0.8), hit("m:2", "mid", 0.5)];
    let out = compose_standard(&hits, 0.35);
    assert!(!out.low_confidence);
    assert_eq!(out.body, "high\n\n---\n\nmid");
    assert!(out.explanation.starts_with("Information retrieval process details:\n1. Source: Secret Info Manual | Section: Field Ops | Security: Level 1 (Low) (Retrieved Relevance: 80.0%)"));
    // sources below the assembly threshold are still explained
    assert!(out.explanation.contains("3. Source: Secret Info Manual | Section: Field Ops | Security: Level 1 (Low) (Retrieved Relevance: 30.0%)"));
    assert!(!out.explanation.contains("Note:"));
}

#[test]
fn standard_explains_at_most_five_sources() {
    let hits: Vec<ScoredChunk> = (0..7).map(|i| hit(&format!("m:{i}"), "t", 0.9 - i as f32 * 0.05)).collect();
    let out = compose_standard(&hits, 0.35);
    assert!(out.explanation.contains("\n5. "));
    assert!(!out.explanation.contains("\n6. "));
    assert_eq!(out.body.matches("---").count(), 6);
}

#[test]
fn standard_low_confidence_uses_disclaimer() {
    let out = compose_standard(&[hit("m:0", "faint", 0.25)], 0.35);
    assert!(out.low_confidence);
    assert_eq!(out.body, LOW_CONFIDENCE_BODY);
    assert!(out.explanation.ends_with("Note: No retrieved sections met the required response relevance threshold (35%)."));
}

#[test]
fn style_step_by_step_numbers_top_three() {
    let mut hits = three_hits();
    hits.push(hit("m:3", "Fourth.", 0.3));
    let out = compose_styled(&style_rule("Use step-by-step format"), &hits, 0.35);
    assert_eq!(
        out.body,
        "Step 1: Best match. Extra sentence.\n\nStep 2: Second best. More detail here.\n\nStep 3: Third option. Trailing text."
    );
    assert!(out.explanation.starts_with("Response generated following style guidelines from rule 8. Formatted as step-by-step"));
    assert!(out.explanation.contains("\n\nSources considered:\n1. "));
    assert!(out.explanation.contains("3. "));
    assert!(!out.explanation.contains("4. "));
}

#[test]
fn style_direct_tactical_uses_top_two() {
    let out = compose_styled(&style_rule("direct tactical steps only"), &three_hits(), 0.35);
    assert_eq!(out.body, "Best match. Extra sentence.\n\n---\n\nSecond best. More detail here.");
}

#[test]
fn style_scenario_options() {
    let out = compose_styled(&style_rule("scenario-based options"), &three_hits(), 0.35);
    assert!(out.body.starts_with("Option 1:\nBest match. Extra sentence.\n\n---\n\nOption 2:\n"));
    assert!(out.body.contains("Option 3:\nThird option."));
}

#[test]
fn style_checklist_takes_first_sentences() {
    let out = compose_styled(&style_rule("structured checklist"), &three_hits(), 0.35);
    assert_eq!(out.body, "Checklist:\n- [ ] Best match\n- [ ] Second best\n- [ ] Third option");
}

#[test]
fn style_analogy_prefers_comparative_chunks() {
    let hits = vec![
        hit("m:0", "Plain instructions.", 0.9),
        hit("m:1", "A dead drop is like a mailbox nobody owns.", 0.6),
        hit("m:2", "Imagine a river that carries messages.", 0.5),
        hit("m:3", "It is similar to a relay race.", 0.4),
    ];
    let out = compose_styled(&style_rule("explain with analogy"), &hits, 0.35);
    assert_eq!(out.body, "A dead drop is like a mailbox nobody owns.\n\nImagine a river that carries messages.");

    let out = compose_styled(&style_rule("use a metaphor"), &three_hits(), 0.35);
    assert_eq!(out.body, "Best match. Extra sentence.");
    assert!(out.explanation.contains("Attempted to explain using analogies"));
}

#[test]
fn style_indirect_phrasing_is_a_snippet() {
    let long = "x".repeat(250);
    let out = compose_styled(&style_rule("speak in codewords"), &[hit("m:0", &long, 0.9)], 0.35);
    assert_eq!(out.body.chars().count(), 203);
    assert!(out.body.ends_with("..."));
}

#[test]
fn style_cryptic_returns_best_chunk() {
    let out = compose_styled(&style_rule("answer as a parable"), &three_hits(), 0.35);
    assert_eq!(out.body, "Best match. Extra sentence.");
}

#[test]
fn unrecognized_style_falls_back_to_standard() {
    let out = compose_styled(&style_rule("interpretive dance"), &three_hits(), 0.35);
    assert_eq!(out.body, "Best match. Extra sentence.\n\n---\n\nSecond best. More detail here.\n\n---\n\nThird option. Trailing text.");
    assert!(out.explanation.starts_with(
        "Response generated following style guidelines from rule 8. Used standard response format as style 'interpretive dance' was not recognized. Information retrieval process details:"
    ));
}

#[test]
fn style_with_no_chunks_apologises() {
    let out = compose_styled(&style_rule("step-by-step"), &[], 0.35);
    assert_eq!(
        out.body,
        "Framework rule 8 applies, but no specific information could be retrieved or accessed at your clearance level."
    );
    assert!(out.explanation.contains("('compromised')"));
    assert!(!out.low_confidence);
}
