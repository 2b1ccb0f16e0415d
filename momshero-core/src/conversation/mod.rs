//! The conversation state machine.
//!
//! One [`ConversationOrchestrator`] serves every user. Each message runs while holding that
//! user's session lock. Transitions are computed on a copy of the session, and the copy is
//! committed only when the turn succeeds, so a failed model call leaves the session as it was.

pub mod keywords;
pub mod messages;
mod reply;

pub use reply::{
    format_detail, MenuOption, PlainTextRenderer, Reply, ReplyRenderer, RichMenuRenderer,
};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::cache::ResponseCache;
use crate::config::{AssistantConfig, RendererKind};
use crate::error::CallError;
use crate::extract::IngredientExtractor;
use crate::gateway::ModelGateway;
use crate::llm::{create_model, LlmError};
use crate::monitor::{CallOutcome, UsageMonitor};
use crate::prompts::{render_detail_prompt, render_recommend_prompt, render_substitution_prompt};
use crate::session::{DialogueStateStore, Session, SessionUpdate, Stage, SubstitutionContext};
use crate::types::{CallKind, Recipe};

pub const DEFAULT_SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Entry point for a messaging transport.
#[async_trait]
pub trait ConversationInterface: Send + Sync {
    /// Handle one inbound message. Never fails; errors become canned replies.
    async fn handle(&self, user_id: &str, text: &str) -> Reply;
}

#[derive(Debug)]
pub struct ConversationOrchestrator {
    gateway: Arc<ModelGateway>,
    extractor: IngredientExtractor,
    store: Arc<DialogueStateStore>,
    monitor: Arc<UsageMonitor>,
    renderer: Arc<dyn ReplyRenderer>,
    session_idle_timeout: Duration,
}

impl ConversationOrchestrator {
    /// Turn outcomes go to the gateway's monitor when it has one.
    pub fn new(gateway: Arc<ModelGateway>) -> Self {
        let monitor = gateway.monitor().cloned().unwrap_or_default();
        Self {
            extractor: IngredientExtractor::new(gateway.clone()),
            gateway,
            store: Arc::new(DialogueStateStore::new()),
            monitor,
            renderer: Arc::new(PlainTextRenderer),
            session_idle_timeout: DEFAULT_SESSION_IDLE_TIMEOUT,
        }
    }

    /// Wire model, cache, gateway and renderer from configuration.
    pub fn from_config(config: &AssistantConfig) -> Result<Self, LlmError> {
        let model = create_model(config)?;
        let cache = Arc::new(ResponseCache::new(config.cache_dir.clone(), config.cache_ttl));
        let gateway = ModelGateway::new(model, cache)
            .with_retry_policy(config.retry)
            .with_monitor(Arc::new(UsageMonitor::new()));

        let renderer: Arc<dyn ReplyRenderer> = match config.renderer {
            RendererKind::Text => Arc::new(PlainTextRenderer),
            RendererKind::Menu => Arc::new(RichMenuRenderer),
        };

        Ok(Self::new(Arc::new(gateway))
            .with_renderer(renderer)
            .with_session_idle_timeout(config.session_idle_timeout))
    }

    pub fn with_store(mut self, store: Arc<DialogueStateStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_monitor(mut self, monitor: Arc<UsageMonitor>) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ReplyRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_extractor(mut self, extractor: IngredientExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_session_idle_timeout(mut self, timeout: Duration) -> Self {
        self.session_idle_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<DialogueStateStore> {
        &self.store
    }

    pub fn monitor(&self) -> &Arc<UsageMonitor> {
        &self.monitor
    }

    pub fn gateway(&self) -> &Arc<ModelGateway> {
        &self.gateway
    }

    /// Drop sessions idle longer than the configured timeout.
    pub fn evict_idle_sessions(&self) -> usize {
        self.store.evict_idle(self.session_idle_timeout)
    }

    fn message(&self, text: &str) -> Reply {
        self.renderer.message(text)
    }

    fn error_reply(&self, error: &CallError) -> Reply {
        if error.is_quota() {
            return self.message(messages::QUOTA_EXCEEDED);
        }
        self.message(match error.kind() {
            CallKind::Recommend => messages::RECOMMEND_ERROR,
            CallKind::Detail => messages::DETAIL_ERROR,
            CallKind::Substitution => messages::SUBSTITUTION_ERROR,
            CallKind::Extraction => messages::GENERIC_ERROR,
        })
    }

    async fn step(&self, session: &mut Session, text: &str) -> Result<Reply, CallError> {
        if keywords::is_reset(text) {
            *session = Session::default();
            return Ok(self.message(messages::RESET));
        }
        if keywords::is_help(text) {
            return Ok(self.message(messages::HELP));
        }

        match session.stage {
            Stage::Idle => self.on_idle(session, text).await,
            Stage::CollectingIngredients => self.on_collecting(session, text).await,
            Stage::AwaitingChoice => self.on_awaiting_choice(session, text).await,
            Stage::SubstitutionMode => self.on_substitution_mode(session, text).await,
        }
    }

    async fn on_idle(&self, session: &mut Session, text: &str) -> Result<Reply, CallError> {
        let ingredients = self.extractor.extract(text).await;
        if ingredients.is_empty() {
            let reply = if keywords::is_off_topic(text) {
                messages::OFF_TOPIC
            } else {
                messages::ONBOARDING
            };
            return Ok(self.message(reply));
        }
        self.recommend(session, ingredients, &[]).await
    }

    async fn on_collecting(&self, session: &mut Session, text: &str) -> Result<Reply, CallError> {
        let choice = keywords::parse_choice(text)
            .or_else(|| keywords::parse_named_choice(text, &session.recommendations));

        if let Some(choice) = choice {
            let summary = session.recommendation(choice).cloned();
            return match summary {
                Some(summary) => self.select(session, summary).await,
                None => Ok(self.message(messages::CHOICE_CLARIFICATION)),
            };
        }

        let ingredients = self.extractor.extract(text).await;
        if !ingredients.is_empty() {
            return self.recommend(session, ingredients, &[]).await;
        }
        Ok(self.message(messages::CHOICE_CLARIFICATION))
    }

    async fn on_awaiting_choice(
        &self,
        session: &mut Session,
        text: &str,
    ) -> Result<Reply, CallError> {
        if keywords::is_choose_again(text) {
            let shown: Vec<String> = session
                .recommendations
                .iter()
                .map(|r| r.name.clone())
                .collect();
            let ingredients = session.ingredients.clone();
            return self.recommend(session, ingredients, &shown).await;
        }

        if keywords::is_missing_intent(text) {
            if text == keywords::MISSING_PROMPT_TRIGGER {
                session.stage = Stage::SubstitutionMode;
                return Ok(self.message(messages::ASK_MISSING));
            }
            return self.substitute(session, text).await;
        }

        let ingredients = self.extractor.extract(text).await;
        if !ingredients.is_empty() {
            return self.recommend(session, ingredients, &[]).await;
        }
        Ok(self.message(messages::AWAITING_CHOICE_HINT))
    }

    async fn on_substitution_mode(
        &self,
        session: &mut Session,
        text: &str,
    ) -> Result<Reply, CallError> {
        if keywords::is_closing(text) {
            *session = Session::default();
            return Ok(self.message(messages::CLOSING));
        }
        self.substitute(session, text).await
    }

    /// Ask for recommendations and store them. `exclude` names dishes already shown.
    async fn recommend(
        &self,
        session: &mut Session,
        ingredients: Vec<String>,
        exclude: &[String],
    ) -> Result<Reply, CallError> {
        let prompt = render_recommend_prompt(&ingredients, exclude);
        let recipes = self.gateway.recommendations(&prompt).await?;
        let reply = self.renderer.recommendations(&ingredients, &recipes);

        session.apply(
            SessionUpdate::stage(Stage::CollectingIngredients)
                .with_ingredients(ingredients)
                .with_recommendations(recipes)
                .with_selected_recipe(None)
                .with_substitution_context(None),
        );
        Ok(reply)
    }

    async fn select(&self, session: &mut Session, summary: Recipe) -> Result<Reply, CallError> {
        let prompt = render_detail_prompt(&summary.name, &session.ingredients);
        let detail = self.gateway.detail(&prompt).await?.completed_from(&summary);
        let reply = self.renderer.recipe_detail(&detail);

        session.apply(
            SessionUpdate::stage(Stage::AwaitingChoice)
                .with_selected_recipe(Some(detail))
                .with_substitution_context(None),
        );
        Ok(reply)
    }

    async fn substitute(&self, session: &mut Session, text: &str) -> Result<Reply, CallError> {
        let Some(recipe) = session.selected_recipe.as_ref() else {
            return Ok(self.message(messages::CHOICE_CLARIFICATION));
        };
        let recipe_name = recipe.name.clone();
        let recipe_ingredients: Vec<String> = recipe
            .ingredients
            .iter()
            .map(|i| i.name().to_string())
            .collect();

        let prompt = render_substitution_prompt(&recipe_name, &recipe_ingredients, text);
        let advice = self.gateway.text(&prompt, CallKind::Substitution).await?;
        let reply = self.renderer.substitution(&recipe_name, &advice);

        session.apply(
            SessionUpdate::stage(Stage::SubstitutionMode).with_substitution_context(Some(
                SubstitutionContext {
                    recipe_name,
                    missing: text.to_string(),
                },
            )),
        );
        Ok(reply)
    }
}

#[async_trait]
impl ConversationInterface for ConversationOrchestrator {
    async fn handle(&self, user_id: &str, text: &str) -> Reply {
        let text = text.trim();
        let mut session = self.store.lock(user_id).await;
        let from = session.stage;

        let mut next = session.clone();
        let (reply, outcome) = match self.step(&mut next, text).await {
            Ok(reply) => {
                *session = next;
                (reply, CallOutcome::Success)
            }
            Err(e) if e.is_quota() => {
                warn!(user_id, call_kind = %e.kind(), quota = true, "Turn failed on model quota");
                (self.error_reply(&e), CallOutcome::QuotaExceeded)
            }
            Err(e) => {
                warn!(user_id, call_kind = %e.kind(), error = %e, "Turn failed");
                (self.error_reply(&e), CallOutcome::Failure)
            }
        };

        self.monitor.record_call(user_id, outcome);
        info!(user_id, from = %from, to = %session.stage, outcome = ?outcome, "Handled message");
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DEFAULT_TTL;
    use crate::gateway::RetryPolicy;
    use crate::llm::{FakeModel, LlmError};

    fn orchestrator(model: Arc<FakeModel>) -> ConversationOrchestrator {
        let gateway = ModelGateway::new(model, Arc::new(ResponseCache::memory_only(DEFAULT_TTL)))
            .with_retry_policy(RetryPolicy::immediate(3));
        ConversationOrchestrator::new(Arc::new(gateway))
    }

    #[tokio::test]
    async fn test_onboarding_without_ingredients() {
        let model = Arc::new(FakeModel::with_recipe_responses());
        let bot = orchestrator(model.clone());

        let reply = bot.handle("u1", "你好").await;
        assert_eq!(reply.as_text(), messages::ONBOARDING);
        assert_eq!(bot.store().get_or_create("u1").await.stage, Stage::Idle);
    }

    #[tokio::test]
    async fn test_off_topic_notice() {
        let model = Arc::new(FakeModel::with_recipe_responses());
        let bot = orchestrator(model);

        let reply = bot.handle("u1", "今天的股市行情看起來怎麼樣呢").await;
        assert_eq!(reply.as_text(), messages::OFF_TOPIC);
    }

    #[tokio::test]
    async fn test_help_keeps_state() {
        let model = Arc::new(FakeModel::with_recipe_responses());
        let bot = orchestrator(model);
        bot.handle("u1", "我有雞蛋、白飯、蔥").await;

        let reply = bot.handle("u1", "help").await;
        assert_eq!(reply.as_text(), messages::HELP);
        assert_eq!(
            bot.store().get_or_create("u1").await.stage,
            Stage::CollectingIngredients
        );
    }

    #[tokio::test]
    async fn test_ask_missing_without_model_call() {
        let model = Arc::new(FakeModel::with_recipe_responses());
        let bot = orchestrator(model.clone());
        bot.handle("u1", "我有雞蛋、白飯、蔥").await;
        bot.handle("u1", "1").await;
        let calls = model.call_count();

        let reply = bot.handle("u1", "我食材有缺").await;
        assert_eq!(reply.as_text(), messages::ASK_MISSING);
        assert_eq!(model.call_count(), calls);
        assert_eq!(
            bot.store().get_or_create("u1").await.stage,
            Stage::SubstitutionMode
        );
    }

    #[tokio::test]
    async fn test_detail_error_keeps_state() {
        let model = Arc::new(FakeModel::with_recipe_responses());
        let bot = orchestrator(model.clone());
        bot.handle("u1", "我有雞蛋、白飯、蔥").await;
        let before = bot.store().get_or_create("u1").await;

        for _ in 0..3 {
            model.push_result(Err(LlmError::RequestFailed("timeout".to_string())));
        }
        let reply = bot.handle("u1", "2").await;

        assert_eq!(reply.as_text(), messages::DETAIL_ERROR);
        assert_eq!(bot.store().get_or_create("u1").await, before);
        assert_eq!(bot.monitor().report().successful_calls, 1);
    }

    #[tokio::test]
    async fn test_rich_menu_renderer() {
        let model = Arc::new(FakeModel::with_recipe_responses());
        let bot = orchestrator(model).with_renderer(Arc::new(RichMenuRenderer));

        let reply = bot.handle("u1", "我有雞蛋、白飯、蔥").await;
        let Reply::Menu { options, .. } = reply else {
            panic!("expected a menu");
        };
        let texts: Vec<&str> = options.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, vec!["1", "2", "3"]);
    }
}
