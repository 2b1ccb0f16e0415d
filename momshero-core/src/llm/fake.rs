//! Fake language model for tests and offline runs.
//!
//! Responses are matched by prompt substring, so tests run without network access.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

use async_trait::async_trait;

use super::{LanguageModel, LlmError};

/// A scripted language model.
///
/// Lookup order for each call: queued results (FIFO), the permanent failure if one is set,
/// the first registered substring that the prompt contains (case-insensitive), then the
/// default response. Every call is counted and its prompt recorded.
#[derive(Debug, Default)]
pub struct FakeModel {
    responses: RwLock<Vec<(String, String)>>,
    queued: Mutex<VecDeque<Result<String, LlmError>>>,
    failure: Option<LlmError>,
    default_response: Option<String>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl FakeModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// A model that answers `response` to prompts containing `prompt_contains`.
    pub fn with_response(prompt_contains: &str, response: &str) -> Self {
        let model = Self::new();
        model.add_response(prompt_contains, response);
        model
    }

    /// A model whose every call fails with `error`.
    pub fn always_failing(error: LlmError) -> Self {
        Self {
            failure: Some(error),
            ..Self::default()
        }
    }

    /// Register a response for prompts containing a substring. Earlier registrations win.
    pub fn add_response(&self, prompt_contains: &str, response: &str) {
        self.responses
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((prompt_contains.to_lowercase(), response.to_string()));
    }

    /// Queue a one-shot result that is returned before any pattern matching.
    pub fn push_result(&self, result: Result<String, LlmError>) {
        self.queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(result);
    }

    pub fn with_default_response(mut self, response: &str) -> Self {
        self.default_response = Some(response.to_string());
        self
    }

    /// Number of `generate` invocations so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// A model with canned answers for every prompt the assistant sends.
    pub fn with_recipe_responses() -> Self {
        let model = Self::new();

        model.add_response(
            "推薦 3 道適合的料理",
            "根據你的食材，推薦以下料理：\n\n\
             1. 蔥花蛋炒飯\n   主要食材：雞蛋、白飯、蔥\n   預估烹飪時間：15分鐘\n   難度：簡單\n\n\
             2. 蔥油拌飯\n   主要食材：白飯、蔥、醬油\n   預估烹飪時間：10分鐘\n   難度：簡單\n\n\
             3. 雞蛋蔥餅\n   主要食材：雞蛋、蔥、麵粉\n   預估烹飪時間：20分鐘\n   難度：中等\n",
        );

        model.add_response(
            "詳細的食譜",
            r#"```json
{
  "name": "蔥花蛋炒飯",
  "ingredients": [
    {"name": "白飯", "amount": "2碗", "note": "隔夜飯最佳"},
    {"name": "雞蛋", "amount": "2顆"},
    {"name": "蔥", "amount": "2根", "note": "切花"}
  ],
  "time": "15分鐘",
  "difficulty": "簡單",
  "steps": ["雞蛋打散備用", "熱鍋下油炒蛋至半熟", "加入白飯拌炒均勻", "撒上蔥花並以鹽調味"],
  "tips": "大火快炒，飯粒才會粒粒分明",
  "nutrition": "富含蛋白質與碳水化合物"
}
```"#,
        );

        model.add_response(
            "替代方案建議",
            "🔄 替代方案建議：\n• 醬油 可以用 鹽加少許糖 替代，風味較淡但一樣好吃\n• 也可以直接省略，起鍋前再調整鹹度",
        );

        model.add_response("識別出食材名稱", "無");

        model
    }
}

#[async_trait]
impl LanguageModel for FakeModel {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.to_string());

        let queued = self
            .queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        if let Some(result) = queued {
            return result;
        }

        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        let prompt_lower = prompt.to_lowercase();
        let responses = self.responses.read().unwrap_or_else(PoisonError::into_inner);
        if let Some((_, response)) = responses
            .iter()
            .find(|(pattern, _)| prompt_lower.contains(pattern.as_str()))
        {
            return Ok(response.clone());
        }

        match &self.default_response {
            Some(response) => Ok(response.clone()),
            None => Err(LlmError::RequestFailed(format!(
                "FakeModel: no response configured for prompt: {}",
                prompt.chars().take(100).collect::<String>()
            ))),
        }
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }

    fn model_name(&self) -> &str {
        "fake-model"
    }
}
