//! Per-user dialogue state.

mod store;

pub use store::{DialogueStateStore, NoPersistence, SessionGuard, SessionPersistence};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Recipe;

/// Position of a session in the conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Idle,
    CollectingIngredients,
    AwaitingChoice,
    SubstitutionMode,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::CollectingIngredients => "collecting_ingredients",
            Stage::AwaitingChoice => "awaiting_choice",
            Stage::SubstitutionMode => "substitution_mode",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The latest substitution request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstitutionContext {
    pub recipe_name: String,
    /// The user's own words about what is missing.
    pub missing: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub stage: Stage,
    /// Most recent extraction; replaced, never merged.
    pub ingredients: Vec<String>,
    /// At most three, from the last successful recommendation call.
    pub recommendations: Vec<Recipe>,
    pub selected_recipe: Option<Recipe>,
    pub substitution_context: Option<SubstitutionContext>,
}

impl Session {
    /// Shallow-merge `update` into this session; unset fields are left alone.
    pub fn apply(&mut self, update: SessionUpdate) {
        if let Some(stage) = update.stage {
            self.stage = stage;
        }
        if let Some(ingredients) = update.ingredients {
            self.ingredients = ingredients;
        }
        if let Some(recommendations) = update.recommendations {
            self.recommendations = recommendations;
        }
        if let Some(selected) = update.selected_recipe {
            self.selected_recipe = selected;
        }
        if let Some(context) = update.substitution_context {
            self.substitution_context = context;
        }
    }

    /// Recommendation at 1-based `choice`, if in range.
    pub fn recommendation(&self, choice: usize) -> Option<&Recipe> {
        choice
            .checked_sub(1)
            .and_then(|index| self.recommendations.get(index))
    }
}

/// Partial session fields. `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionUpdate {
    pub stage: Option<Stage>,
    pub ingredients: Option<Vec<String>>,
    pub recommendations: Option<Vec<Recipe>>,
    pub selected_recipe: Option<Option<Recipe>>,
    pub substitution_context: Option<Option<SubstitutionContext>>,
}

impl SessionUpdate {
    pub fn stage(stage: Stage) -> Self {
        Self {
            stage: Some(stage),
            ..Default::default()
        }
    }

    pub fn with_ingredients(mut self, ingredients: Vec<String>) -> Self {
        self.ingredients = Some(ingredients);
        self
    }

    pub fn with_recommendations(mut self, recommendations: Vec<Recipe>) -> Self {
        self.recommendations = Some(recommendations);
        self
    }

    pub fn with_selected_recipe(mut self, recipe: Option<Recipe>) -> Self {
        self.selected_recipe = Some(recipe);
        self
    }

    pub fn with_substitution_context(mut self, context: Option<SubstitutionContext>) -> Self {
        self.substitution_context = Some(context);
        self
    }
}
