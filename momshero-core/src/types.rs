//! Shared value types: call kinds and recipes.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

/// Purpose of a model invocation.
///
/// Used to partition the response cache and to pick validation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    Recommend,
    Detail,
    Substitution,
    Extraction,
}

impl CallKind {
    pub const ALL: [CallKind; 4] = [
        CallKind::Recommend,
        CallKind::Detail,
        CallKind::Substitution,
        CallKind::Extraction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CallKind::Recommend => "recommend",
            CallKind::Detail => "detail",
            CallKind::Substitution => "substitution",
            CallKind::Extraction => "extraction",
        }
    }

    /// Shortest response (in characters, after trimming) that counts as a usable answer.
    pub fn min_response_chars(&self) -> usize {
        match self {
            CallKind::Recommend => 50,
            CallKind::Detail => 20,
            CallKind::Substitution => 20,
            CallKind::Extraction => 1,
        }
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ingredient line of a recipe.
///
/// Models return either bare names or `{name, amount, note}` objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecipeIngredient {
    Plain(String),
    Measured {
        name: String,
        #[serde(default, deserialize_with = "lenient_text")]
        amount: Option<String>,
        #[serde(default, deserialize_with = "lenient_text")]
        note: Option<String>,
    },
}

impl RecipeIngredient {
    pub fn name(&self) -> &str {
        match self {
            RecipeIngredient::Plain(name) => name,
            RecipeIngredient::Measured { name, .. } => name,
        }
    }
}

impl fmt::Display for RecipeIngredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecipeIngredient::Plain(name) => f.write_str(name),
            RecipeIngredient::Measured { name, amount, note } => {
                let parts: Vec<&str> = [Some(name.as_str()), amount.as_deref(), note.as_deref()]
                    .into_iter()
                    .flatten()
                    .filter(|p| !p.is_empty())
                    .collect();
                f.write_str(&parts.join(" "))
            }
        }
    }
}

/// A recipe as produced by the model, either a recommendation summary or a full detail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(default)]
    pub name: String,
    #[serde(
        default,
        alias = "main_ingredients",
        deserialize_with = "ingredient_list"
    )]
    pub ingredients: Vec<RecipeIngredient>,
    #[serde(default, alias = "cooking_time", deserialize_with = "lenient_text")]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub difficulty: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "step_list")]
    pub steps: Vec<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub tips: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub nutrition: Option<String>,
}

impl Recipe {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Ingredient names joined with the ideographic comma.
    pub fn ingredient_summary(&self) -> String {
        self.ingredients
            .iter()
            .map(|i| i.name())
            .collect::<Vec<_>>()
            .join("、")
    }

    /// Fill fields this recipe is missing from `summary`, and pin the name to the summary's.
    ///
    /// The detail call may rename the dish; the session always refers to the item the user picked.
    pub fn completed_from(mut self, summary: &Recipe) -> Recipe {
        self.name = summary.name.clone();
        if self.ingredients.is_empty() {
            self.ingredients = summary.ingredients.clone();
        }
        if self.time.is_none() {
            self.time = summary.time.clone();
        }
        if self.difficulty.is_none() {
            self.difficulty = summary.difficulty.clone();
        }
        if self.description.is_none() {
            self.description = summary.description.clone();
        }
        self
    }
}

/// Split a free-text list such as "雞蛋、白飯, 蔥" into trimmed items.
pub fn split_list(text: &str) -> Vec<String> {
    text.split(['、', ',', '，', ';', '；', '/'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Accept strings, numbers, or any other JSON value as optional text.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        JsonValue::Null => None,
        JsonValue::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        other => Some(other.to_string()),
    }))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IngredientsField {
    Many(Vec<RecipeIngredient>),
    One(String),
}

fn ingredient_list<'de, D>(deserializer: D) -> Result<Vec<RecipeIngredient>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<IngredientsField>::deserialize(deserializer)? {
        Some(IngredientsField::Many(items)) => items,
        Some(IngredientsField::One(text)) => split_list(&text)
            .into_iter()
            .map(RecipeIngredient::Plain)
            .collect(),
        None => Vec::new(),
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StepsField {
    Many(Vec<String>),
    One(String),
}

fn step_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<StepsField>::deserialize(deserializer)? {
        Some(StepsField::Many(steps)) => steps,
        Some(StepsField::One(text)) => text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_ingredients() {
        let recipe: Recipe = serde_json::from_str(
            r#"{"name": "番茄炒蛋", "ingredients": [{"name": "番茄", "amount": 2, "note": "切塊"}, "蔥"]}"#,
        )
        .unwrap();

        assert_eq!(recipe.ingredients.len(), 2);
        assert_eq!(recipe.ingredients[0].to_string(), "番茄 2 切塊");
        assert_eq!(recipe.ingredients[1], RecipeIngredient::Plain("蔥".to_string()));
    }

    #[test]
    fn test_string_fields_are_split() {
        let recipe: Recipe = serde_json::from_str(
            r#"{"name": "蔥油拌飯", "main_ingredients": "白飯、蔥, 醬油", "steps": "煮飯\n拌勻", "cooking_time": "10分鐘"}"#,
        )
        .unwrap();

        assert_eq!(recipe.ingredient_summary(), "白飯、蔥、醬油");
        assert_eq!(recipe.steps, vec!["煮飯", "拌勻"]);
        assert_eq!(recipe.time.as_deref(), Some("10分鐘"));
    }

    #[test]
    fn test_non_string_nutrition() {
        let recipe: Recipe =
            serde_json::from_str(r#"{"name": "湯", "nutrition": {"calories": 120}}"#).unwrap();
        assert_eq!(recipe.nutrition.as_deref(), Some(r#"{"calories":120}"#));
    }

    #[test]
    fn test_completed_from_keeps_summary_name() {
        let summary = Recipe {
            name: "蔥花蛋炒飯".to_string(),
            time: Some("15分鐘".to_string()),
            ..Default::default()
        };
        let detail = Recipe {
            name: "黃金蛋炒飯".to_string(),
            steps: vec!["熱鍋".to_string()],
            ..Default::default()
        };

        let merged = detail.completed_from(&summary);
        assert_eq!(merged.name, "蔥花蛋炒飯");
        assert_eq!(merged.time.as_deref(), Some("15分鐘"));
        assert_eq!(merged.steps, vec!["熱鍋"]);
    }

    #[test]
    fn test_call_kind_names() {
        for kind in CallKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }
}
