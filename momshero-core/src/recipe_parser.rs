//! Parsing of model output into recipes.
//!
//! Recommendation answers arrive either as a numbered list with labelled fields
//! ("主要食材：...", "預估烹飪時間：...", "難度：...") or as a JSON payload, often wrapped
//! in a Markdown code fence. Detail answers are always JSON.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::types::{split_list, Recipe, RecipeIngredient};

/// Most recommendations kept from one answer.
pub const MAX_RECOMMENDATIONS: usize = 3;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct ParseError(pub String);

/// Start of a numbered item: "1. 名稱", "2、名稱", "**3)** 名稱".
static ITEM_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\*\*|#+\s*)?([1-9])\s*(?:\*\*)?\s*[.．、)）]\s*(.*)$")
        .expect("Invalid item regex")
});

/// Remove a surrounding Markdown code fence (```json ... ```), if any.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}

/// Slice the outermost JSON object or array out of surrounding prose.
fn embedded_json(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let closing = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(closing)?;
    (end > start).then(|| &text[start..=end])
}

/// Parse a recommendation answer. Items without a name are dropped; at most three are kept.
pub fn parse_recommendations(raw: &str) -> Result<Vec<Recipe>, ParseError> {
    let text = strip_code_fence(raw);

    let recipes = if text.starts_with('{') || text.starts_with('[') {
        parse_structured_recommendations(text)?
    } else {
        // JSON after a prose preamble; anything that does not parse is read as a list.
        match embedded_json(text).map(parse_structured_recommendations) {
            Some(Ok(recipes)) if !recipes.is_empty() => recipes,
            _ => parse_itemized_recommendations(text),
        }
    };

    if recipes.is_empty() {
        return Err(ParseError(
            "no named recommendation in response".to_string(),
        ));
    }
    Ok(recipes)
}

fn parse_structured_recommendations(text: &str) -> Result<Vec<Recipe>, ParseError> {
    let payload: JsonValue = serde_json::from_str(text)
        .map_err(|e| ParseError(format!("invalid recommendation JSON: {e}")))?;

    let items = match payload {
        JsonValue::Array(items) => items,
        JsonValue::Object(mut map) => match map.remove("recommendations") {
            Some(JsonValue::Array(items)) => items,
            _ => {
                return Err(ParseError(
                    "recommendation JSON has no \"recommendations\" list".to_string(),
                ))
            }
        },
        _ => return Err(ParseError("unexpected recommendation JSON".to_string())),
    };

    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<Recipe>(item).ok())
        .map(|mut recipe| {
            recipe.name = clean_name(&recipe.name);
            recipe
        })
        .filter(|recipe| !recipe.name.is_empty())
        .take(MAX_RECOMMENDATIONS)
        .collect())
}

fn parse_itemized_recommendations(text: &str) -> Vec<Recipe> {
    let mut recipes = Vec::new();
    let mut current: Option<Recipe> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = ITEM_START.captures(line) {
            if let Some(done) = current.take() {
                recipes.push(done);
            }
            let name = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            current = Some(Recipe::named(clean_name(name)));
            continue;
        }

        let Some(recipe) = current.as_mut() else {
            continue;
        };
        let Some((label, value)) = split_field(line) else {
            continue;
        };

        if label.contains("食材") {
            recipe.ingredients = split_list(value)
                .into_iter()
                .map(RecipeIngredient::Plain)
                .collect();
        } else if label.contains("時間") {
            recipe.time = non_empty(value);
        } else if label.contains("難度") {
            recipe.difficulty = non_empty(value);
        } else if label.contains("描述") || label.contains("簡介") {
            recipe.description = non_empty(value);
        }
    }

    if let Some(done) = current {
        recipes.push(done);
    }

    recipes
        .into_iter()
        .filter(|r| !r.name.is_empty())
        .take(MAX_RECOMMENDATIONS)
        .collect()
}

/// Parse a detail answer (a single JSON recipe object).
pub fn parse_recipe_detail(raw: &str) -> Result<Recipe, ParseError> {
    let text = strip_code_fence(raw);
    let json = embedded_json(text)
        .ok_or_else(|| ParseError("no JSON object in detail response".to_string()))?;

    let mut recipe: Recipe = serde_json::from_str(json)
        .map_err(|e| ParseError(format!("invalid detail JSON: {e}")))?;
    recipe.name = clean_name(&recipe.name);
    Ok(recipe)
}

/// "  - 主要食材：雞蛋、白飯" -> ("主要食材", "雞蛋、白飯")
fn split_field(line: &str) -> Option<(&str, &str)> {
    let line = line.trim_start_matches(['-', '•', '*', '·', ' ']);
    let idx = line.find(['：', ':'])?;
    let (label, rest) = line.split_at(idx);
    let sep_len = rest.chars().next().map(char::len_utf8).unwrap_or(0);
    Some((label.trim(), rest[sep_len..].trim()))
}

fn clean_name(name: &str) -> String {
    name.trim()
        .trim_matches(['*', '[', ']', '【', '】', '「', '」', ' '])
        .trim()
        .to_string()
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim_matches('*').trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITEMIZED: &str = "以下是推薦：\n\n1. 蔥花蛋炒飯\n   主要食材：雞蛋、白飯、蔥\n   預估烹飪時間：15分鐘\n   難度：簡單\n\n2. **蔥油拌飯**\n   - 主要食材: 白飯、蔥、醬油\n   - 預估烹飪時間：10分鐘\n   - 難度：簡單\n\n3. [雞蛋蔥餅]\n   主要食材：雞蛋、蔥、麵粉\n   難度：中等\n";

    #[test]
    fn test_itemized_list() {
        let recipes = parse_recommendations(ITEMIZED).unwrap();

        assert_eq!(recipes.len(), 3);
        assert_eq!(recipes[0].name, "蔥花蛋炒飯");
        assert_eq!(recipes[0].ingredient_summary(), "雞蛋、白飯、蔥");
        assert_eq!(recipes[0].time.as_deref(), Some("15分鐘"));
        assert_eq!(recipes[1].name, "蔥油拌飯");
        assert_eq!(recipes[1].ingredient_summary(), "白飯、蔥、醬油");
        assert_eq!(recipes[2].name, "雞蛋蔥餅");
        assert_eq!(recipes[2].time, None);
        assert_eq!(recipes[2].difficulty.as_deref(), Some("中等"));
    }

    #[test]
    fn test_unnamed_items_are_dropped() {
        let text = "1.\n   主要食材：雞蛋\n2. 蒸蛋\n   難度：簡單\n";
        let recipes = parse_recommendations(text).unwrap();
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].name, "蒸蛋");
    }

    #[test]
    fn test_at_most_three() {
        let text = "1. 甲\n2. 乙\n3. 丙\n4. 丁\n";
        let recipes = parse_recommendations(text).unwrap();
        assert_eq!(recipes.len(), 3);
        assert_eq!(recipes[2].name, "丙");
    }

    #[test]
    fn test_fenced_json_recommendations() {
        let text = "```json\n{\"recommendations\": [{\"name\": \"番茄炒蛋\", \"ingredients\": [\"番茄\", \"雞蛋\"], \"time\": \"15分鐘\", \"difficulty\": \"簡單\"}, {\"ingredients\": [\"蔥\"]}]}\n```";
        let recipes = parse_recommendations(text).unwrap();

        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].name, "番茄炒蛋");
        assert_eq!(recipes[0].ingredient_summary(), "番茄、雞蛋");
    }

    #[test]
    fn test_json_after_preamble() {
        let text = "以下是推薦：\n```json{\"recommendations\": [{\"name\": \"番茄炒蛋\", \"ingredients\": [\"番茄\", \"雞蛋\"]}, {\"name\": \"番茄蛋花湯\"}]}```";
        let recipes = parse_recommendations(text).unwrap();

        assert_eq!(recipes.len(), 2);
        assert_eq!(recipes[0].name, "番茄炒蛋");
        assert_eq!(recipes[1].name, "番茄蛋花湯");
    }

    #[test]
    fn test_no_items_is_an_error() {
        assert!(parse_recommendations("抱歉，我無法提供推薦。").is_err());
        assert!(parse_recommendations("{\"recommendations\": []}").is_err());
        assert!(parse_recommendations("{\"recommendations\": ").is_err());
    }

    #[test]
    fn test_detail_with_prose() {
        let text = "好的，以下是食譜：\n```json\n{\"name\": \"蔥油拌飯\", \"ingredients\": [{\"name\": \"白飯\", \"amount\": \"1碗\"}], \"steps\": [\"煮飯\", \"拌勻\"], \"tips\": \"趁熱吃\"}\n```";
        let recipe = parse_recipe_detail(text).unwrap();

        assert_eq!(recipe.name, "蔥油拌飯");
        assert_eq!(recipe.steps.len(), 2);
        assert_eq!(recipe.tips.as_deref(), Some("趁熱吃"));
    }

    #[test]
    fn test_detail_without_json() {
        assert!(parse_recipe_detail("【食材準備】白飯一碗").is_err());
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("```\n[1]\n```  "), "[1]");
        assert_eq!(strip_code_fence("  plain  "), "plain");
    }
}
