//! MomsHero: a conversational home-cooking assistant.
//!
//! A user lists what is in the fridge, gets up to three dish suggestions, picks one for a
//! full recipe, and can ask how to cook around a missing ingredient. Model calls go through
//! [`gateway::ModelGateway`], which retries, classifies quota failures and caches results.

pub mod cache;
pub mod config;
pub mod conversation;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod llm;
pub mod monitor;
pub mod prompts;
pub mod recipe_parser;
pub mod session;
pub mod types;

pub use cache::{CacheKey, CacheStats, ResponseCache};
pub use config::{AssistantConfig, ProviderKind, RendererKind};
pub use conversation::{
    ConversationInterface, ConversationOrchestrator, PlainTextRenderer, Reply, ReplyRenderer,
    RichMenuRenderer,
};
pub use error::{CacheError, CallError, ConfigError};
pub use extract::IngredientExtractor;
pub use gateway::{ModelGateway, ParsedOutput, RetryPolicy};
pub use llm::{FakeModel, GeminiModel, LanguageModel, LlmError};
pub use monitor::{CallOutcome, QuotaStatus, UsageMonitor, UsageReport};
pub use session::{DialogueStateStore, Session, SessionUpdate, Stage};
pub use types::{CallKind, Recipe, RecipeIngredient};
