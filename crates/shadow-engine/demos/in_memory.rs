//! Runs a few queries against a tiny in-memory corpus with the fake embedder.
//!
//! `cargo run -p shadow-engine --example in_memory`
use std::sync::Arc;

use shadow_core::config::Settings;
use shadow_core::loader::InMemoryLoader;
use shadow_core::{ClearanceLevel, DocType};
use shadow_embed::FakeEmbedder;
use shadow_engine::QueryEngine;

const MANUAL: &str = "# Field Basics\n\nAgents check in every morning using the rotating phrase list.\n\n## Safehouse Network\n\nSafehouses rotate every month and are reached through the bakery entrance.\n\n## Project Eclipse\n\nEclipse assets are extracted only on direct order from the director.";

const FRAMEWORK: &str = "# Response Framework\n\n## Rule 1\ntrigger_type: keyword\ntrigger_value: omega echo\nresponse_type: direct_quote\nresponse_value: The sky is clear.\n\n## Rule 2\ntrigger_type: keyword\ntrigger_value: checklist\nresponse_type: style_guide\nresponse_value: Provide a structured checklist.";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("warn").init();

    let loader = InMemoryLoader::new()
        .with_document("Secret Info Manual", DocType::Classified, MANUAL)
        .with_document("Response Framework", DocType::Framework, FRAMEWORK);
    let engine = QueryEngine::builder(Settings::default())
        .loader(Arc::new(loader))
        .embedder(Arc::new(FakeEmbedder::new(256)))
        .build()?;

    let index = engine.initialize(true)?;
    println!("chunks={} rules={}", index.chunks.len(), index.rules.len());

    for (query, clearance) in [
        ("Omega Echo", ClearanceLevel::Low),
        ("How do safehouses rotate?", ClearanceLevel::Medium),
        ("Who can extract eclipse assets?", ClearanceLevel::Low),
        ("Give me a checklist for safehouses", ClearanceLevel::High),
    ] {
        let response = engine.process(query, clearance);
        println!("\n> {query} [{clearance}]\nstatus: {}\n{}\n--\n{}", response.status, response.body, response.explanation);
    }
    Ok(())
}
