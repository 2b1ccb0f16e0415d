//! Model gateway: cache lookup, bounded retries, validation and parsing.

mod retry;

pub use retry::RetryPolicy;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::cache::{CacheKey, ResponseCache};
use crate::error::CallError;
use crate::llm::{ErrorClass, ErrorClassifier, LanguageModel, LlmError, SignatureClassifier};
use crate::monitor::UsageMonitor;
use crate::recipe_parser::{parse_recipe_detail, parse_recommendations, ParseError};
use crate::types::{CallKind, Recipe};

/// Prefixes of refusal or failure text that must never be cached.
pub const APOLOGY_MARKERS: &[&str] = &["抱歉", "Sorry", "I'm sorry"];

/// Validated output of one gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedOutput {
    Text(String),
    Recommendations(Vec<Recipe>),
    Detail(Recipe),
}

/// Parse raw (trimmed) model text according to what `kind` expects.
pub fn parse_output(kind: CallKind, raw: &str) -> Result<ParsedOutput, ParseError> {
    match kind {
        CallKind::Recommend => parse_recommendations(raw).map(ParsedOutput::Recommendations),
        CallKind::Detail => parse_recipe_detail(raw).map(ParsedOutput::Detail),
        CallKind::Substitution | CallKind::Extraction => Ok(ParsedOutput::Text(raw.to_string())),
    }
}

pub fn is_apology(text: &str) -> bool {
    let text = text.trim_start();
    APOLOGY_MARKERS.iter().any(|m| text.starts_with(m))
}

/// Why a single attempt failed.
#[derive(Debug)]
enum AttemptError {
    Model { class: ErrorClass, error: LlmError },
    Invalid(String),
}

#[derive(Debug)]
pub struct ModelGateway {
    model: Arc<dyn LanguageModel>,
    cache: Arc<ResponseCache>,
    classifier: Arc<dyn ErrorClassifier>,
    default_policy: RetryPolicy,
    policies: HashMap<CallKind, RetryPolicy>,
    monitor: Option<Arc<UsageMonitor>>,
}

impl ModelGateway {
    pub fn new(model: Arc<dyn LanguageModel>, cache: Arc<ResponseCache>) -> Self {
        Self {
            model,
            cache,
            classifier: Arc::new(SignatureClassifier::default()),
            default_policy: RetryPolicy::default(),
            policies: HashMap::new(),
            monitor: None,
        }
    }

    /// Policy for every call kind without an override.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    pub fn with_policy_for(mut self, kind: CallKind, policy: RetryPolicy) -> Self {
        self.policies.insert(kind, policy);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Report quota exhaustion to `monitor`.
    pub fn with_monitor(mut self, monitor: Arc<UsageMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn policy_for(&self, kind: CallKind) -> RetryPolicy {
        self.policies
            .get(&kind)
            .copied()
            .unwrap_or(self.default_policy)
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn model(&self) -> &Arc<dyn LanguageModel> {
        &self.model
    }

    pub fn monitor(&self) -> Option<&Arc<UsageMonitor>> {
        self.monitor.as_ref()
    }

    /// Run one logical call: cache, then at most `max_attempts` model invocations.
    pub async fn call(&self, prompt: &str, kind: CallKind) -> Result<ParsedOutput, CallError> {
        let key = CacheKey::new(kind, prompt);

        if let Some(cached) = self.cache.get(&key) {
            match parse_output(kind, &cached) {
                Ok(output) => return Ok(output),
                Err(e) => {
                    warn!(call_kind = %kind, prompt_hash = %key.hash(), error = %e,
                        "Cached response no longer parses, regenerating");
                }
            }
        }

        let policy = self.policy_for(kind);
        let prompt_hash = key.hash();
        let (result, attempts) = policy
            .run(
                move |attempt| self.attempt(prompt, kind, attempt, prompt_hash),
                |_| true,
            )
            .await;

        match result {
            Ok((raw, output)) => {
                if is_apology(&raw) {
                    debug!(call_kind = %kind, prompt_hash, "Not caching apology response");
                } else {
                    self.cache.set(&key, &raw);
                }
                Ok(output)
            }
            Err(AttemptError::Model {
                class: ErrorClass::Quota,
                error: e,
            }) => {
                warn!(call_kind = %kind, prompt_hash, attempts, quota = true, error = %e,
                    "Model quota exhausted");
                if let Some(monitor) = &self.monitor {
                    monitor.record_quota_error();
                }
                Err(CallError::QuotaExceeded {
                    kind,
                    attempts,
                    message: e.to_string(),
                })
            }
            Err(AttemptError::Model {
                class: ErrorClass::Other,
                error: e,
            }) => {
                error!(call_kind = %kind, prompt_hash, attempts, error = %e, "Model call failed");
                Err(CallError::Transient {
                    kind,
                    attempts,
                    message: e.to_string(),
                })
            }
            Err(AttemptError::Invalid(message)) => {
                error!(call_kind = %kind, prompt_hash, attempts, error = %message,
                    "Model response invalid");
                Err(CallError::Parse {
                    kind,
                    attempts,
                    message,
                })
            }
        }
    }

    async fn attempt(
        &self,
        prompt: &str,
        kind: CallKind,
        attempt: u32,
        prompt_hash: &str,
    ) -> Result<(String, ParsedOutput), AttemptError> {
        debug!(call_kind = %kind, attempt, prompt_hash, model = self.model.model_name(),
            "Calling language model");

        let raw = self.model.generate(prompt).await.map_err(|error| {
            let class = self.classifier.classify(&error);
            match class {
                ErrorClass::Quota => {
                    warn!(
                        call_kind = %kind,
                        attempt,
                        quota = true,
                        error = %error,
                        "Model quota hit"
                    )
                }
                ErrorClass::Other => {
                    warn!(call_kind = %kind, attempt, error = %error, "Model call error")
                }
            }
            AttemptError::Model { class, error }
        })?;

        let raw = raw.trim();
        let chars = raw.chars().count();
        let min = kind.min_response_chars();
        if chars < min {
            warn!(call_kind = %kind, attempt, chars, min, "Model response too short");
            return Err(AttemptError::Invalid(format!(
                "response too short ({chars} chars, need {min})"
            )));
        }

        let output = parse_output(kind, raw).map_err(|e| {
            warn!(call_kind = %kind, attempt, error = %e, "Model response did not parse");
            AttemptError::Invalid(e.to_string())
        })?;

        Ok((raw.to_string(), output))
    }

    pub async fn recommendations(&self, prompt: &str) -> Result<Vec<Recipe>, CallError> {
        match self.call(prompt, CallKind::Recommend).await? {
            ParsedOutput::Recommendations(recipes) => Ok(recipes),
            _ => Err(unexpected_output(CallKind::Recommend)),
        }
    }

    pub async fn detail(&self, prompt: &str) -> Result<Recipe, CallError> {
        match self.call(prompt, CallKind::Detail).await? {
            ParsedOutput::Detail(recipe) => Ok(recipe),
            _ => Err(unexpected_output(CallKind::Detail)),
        }
    }

    /// Call a free-text kind (substitution, extraction).
    pub async fn text(&self, prompt: &str, kind: CallKind) -> Result<String, CallError> {
        match self.call(prompt, kind).await? {
            ParsedOutput::Text(text) => Ok(text),
            _ => Err(unexpected_output(kind)),
        }
    }
}

fn unexpected_output(kind: CallKind) -> CallError {
    CallError::Parse {
        kind,
        attempts: 0,
        message: "unexpected output shape".to_string(),
    }
}
