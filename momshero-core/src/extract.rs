//! Ingredient extraction: lexicon scan first, model fallback second.
//!
//! Lexicon data is loaded from `data/lexicon.json` at compile time.

use std::sync::{Arc, LazyLock};

use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::gateway::ModelGateway;
use crate::prompts::extraction::{render_extraction_prompt, NONE_TOKEN};
use crate::types::CallKind;

/// Shortest message (in characters) worth sending to the model.
pub const DEFAULT_MIN_LLM_CHARS: usize = 2;

#[derive(Debug, Default, Deserialize)]
struct LexiconData {
    ingredients: Vec<String>,
    #[serde(default)]
    cooking_keywords: Vec<String>,
}

static LEXICON: LazyLock<LexiconData> = LazyLock::new(|| {
    let json = include_str!("../data/lexicon.json");
    serde_json::from_str(json).unwrap_or_else(|e| {
        error!(error = %e, "Failed to parse lexicon.json");
        LexiconData::default()
    })
});

/// Known ingredient names, in lexicon order.
pub fn lexicon() -> &'static [String] {
    &LEXICON.ingredients
}

/// Words that mark a message as being about cooking.
pub fn cooking_keywords() -> &'static [String] {
    &LEXICON.cooking_keywords
}

/// Lexicon entries present in `text`, in lexicon order.
///
/// Longer entries claim their span first, so "蛋" inside "雞蛋" is not reported twice.
pub fn lexicon_matches(text: &str) -> Vec<String> {
    let haystack = text.to_lowercase();
    let entries = lexicon();

    let mut by_length: Vec<usize> = (0..entries.len()).collect();
    by_length.sort_by_key(|&i| std::cmp::Reverse(entries[i].chars().count()));

    let mut claimed: Vec<(usize, usize)> = Vec::new();
    let mut matched = vec![false; entries.len()];

    for i in by_length {
        let needle = entries[i].to_lowercase();
        if needle.is_empty() {
            continue;
        }
        for (start, found) in haystack.match_indices(needle.as_str()) {
            let end = start + found.len();
            if claimed.iter().any(|&(s, e)| start < e && s < end) {
                continue;
            }
            claimed.push((start, end));
            matched[i] = true;
        }
    }

    entries
        .iter()
        .zip(matched)
        .filter(|(_, hit)| *hit)
        .map(|(entry, _)| entry.clone())
        .collect()
}

/// Parse the model's answer to the extraction prompt.
pub fn parse_extraction_response(response: &str) -> Vec<String> {
    let response = response.trim();
    if response.is_empty() || response == NONE_TOKEN || response.eq_ignore_ascii_case("none") {
        return Vec::new();
    }

    let mut ingredients: Vec<String> = Vec::new();
    for token in response.split([',', '，', '、', '\n']) {
        let token = token.trim().trim_matches(['「', '」', '"', '\'', '。', '.']).trim();
        if token.chars().count() <= 1 || token == NONE_TOKEN {
            continue;
        }
        if !ingredients.iter().any(|existing| existing == token) {
            ingredients.push(token.to_string());
        }
    }
    ingredients
}

#[derive(Debug, Clone)]
pub struct IngredientExtractor {
    gateway: Arc<ModelGateway>,
    min_llm_chars: usize,
}

impl IngredientExtractor {
    pub fn new(gateway: Arc<ModelGateway>) -> Self {
        Self {
            gateway,
            min_llm_chars: DEFAULT_MIN_LLM_CHARS,
        }
    }

    pub fn with_min_llm_chars(mut self, min_llm_chars: usize) -> Self {
        self.min_llm_chars = min_llm_chars;
        self
    }

    /// Extract ingredient names from a message. Never fails; model errors yield no matches.
    pub async fn extract(&self, text: &str) -> Vec<String> {
        let text = text.trim();

        let found = lexicon_matches(text);
        if !found.is_empty() {
            debug!(count = found.len(), source = "lexicon", "Extracted ingredients");
            return found;
        }

        if text.chars().count() < self.min_llm_chars {
            return Vec::new();
        }

        let prompt = render_extraction_prompt(text);
        match self.gateway.text(&prompt, CallKind::Extraction).await {
            Ok(response) => {
                let found = parse_extraction_response(&response);
                debug!(count = found.len(), source = "model", "Extracted ingredients");
                found
            }
            Err(e) if e.is_quota() => {
                warn!(
                    quota = true,
                    error = %e,
                    "Ingredient extraction skipped, model quota exhausted"
                );
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "Ingredient extraction by model failed");
                Vec::new()
            }
        }
    }
}
