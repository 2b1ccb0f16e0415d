//! Prompt templates, one module per call kind.

pub mod detail;
pub mod extraction;
pub mod recommend;
pub mod substitution;

pub use detail::render_detail_prompt;
pub use extraction::render_extraction_prompt;
pub use recommend::render_recommend_prompt;
pub use substitution::render_substitution_prompt;

/// Persona line shared by the user-facing prompts.
pub const PERSONA: &str = "你是一位溫暖的資深煮婦，擅長用家裡現有的食材做出簡單好吃的家常菜。";
