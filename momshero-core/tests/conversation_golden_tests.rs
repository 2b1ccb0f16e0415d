//! Golden conversation transcripts.
//!
//! Each file in `fixtures/conversations/` is one conversation replayed against a fresh
//! assistant backed by the canned fake model:
//! ```json
//! {
//!   "description": "...",
//!   "steps": [{ "user": "2", "stage": "awaiting_choice", "reply_contains": ["🍳"] }],
//!   "model_calls": 2
//! }
//! ```

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use glob::glob;
use momshero_core::cache::DEFAULT_TTL;
use momshero_core::{
    ConversationInterface, ConversationOrchestrator, FakeModel, ModelGateway, ResponseCache,
    RetryPolicy, Stage,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Transcript {
    #[allow(dead_code)]
    description: String,
    steps: Vec<Step>,
    model_calls: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct Step {
    user: String,
    stage: Stage,
    #[serde(default)]
    reply_contains: Vec<String>,
}

fn load_transcripts() -> Vec<(String, Transcript)> {
    let pattern = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/conversations/*.json");

    let mut transcripts = Vec::new();
    for entry in glob(&pattern.to_string_lossy()).expect("Failed to read glob pattern") {
        let path = entry.expect("Failed to read directory entry");
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let content = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));
        let transcript: Transcript = serde_json::from_str(&content)
            .unwrap_or_else(|e| panic!("Failed to parse {}: {}", path.display(), e));
        transcripts.push((name, transcript));
    }

    transcripts.sort_by(|a, b| a.0.cmp(&b.0));
    transcripts
}

async fn replay(transcript: &Transcript) -> Vec<String> {
    let model = Arc::new(FakeModel::with_recipe_responses());
    let cache = Arc::new(ResponseCache::memory_only(DEFAULT_TTL));
    let gateway =
        ModelGateway::new(model.clone(), cache).with_retry_policy(RetryPolicy::immediate(3));
    let bot = ConversationOrchestrator::new(Arc::new(gateway));

    let mut failures = Vec::new();
    for (i, step) in transcript.steps.iter().enumerate() {
        let reply = bot.handle("golden", &step.user).await.as_text();
        let stage = bot.store().get_or_create("golden").await.stage;

        if stage != step.stage {
            failures.push(format!(
                "step {} ({:?}): expected stage {}, got {}",
                i + 1,
                step.user,
                step.stage,
                stage
            ));
        }
        for needle in &step.reply_contains {
            if !reply.contains(needle.as_str()) {
                failures.push(format!(
                    "step {} ({:?}): reply missing {:?}\n{}",
                    i + 1,
                    step.user,
                    needle,
                    reply
                ));
            }
        }
    }

    if let Some(expected) = transcript.model_calls {
        if model.call_count() != expected {
            failures.push(format!(
                "expected {} model calls, got {}",
                expected,
                model.call_count()
            ));
        }
    }
    failures
}

#[tokio::test]
async fn test_conversation_golden_files() {
    let transcripts = load_transcripts();
    assert!(!transcripts.is_empty(), "no conversation fixtures found");

    let mut msg = String::new();
    for (name, transcript) in &transcripts {
        let failures = replay(transcript).await;
        if !failures.is_empty() {
            msg.push_str(&format!("\n=== {} ===\n{}\n", name, failures.join("\n")));
        }
    }

    if !msg.is_empty() {
        panic!("{}", msg);
    }
}
