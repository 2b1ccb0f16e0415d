//! Reply payloads and the renderers that build them.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::keywords::MISSING_PROMPT_TRIGGER;
use crate::types::Recipe;

/// One tappable option. `text` is what the transport sends back when it is picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuOption {
    pub label: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MenuOption {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
            description: None,
        }
    }

    /// An option whose label is also the text it sends.
    pub fn echo(text: &str) -> Self {
        Self::new(text, text)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// What the assistant answers to one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        quick_replies: Vec<MenuOption>,
    },
    Menu {
        title: String,
        options: Vec<MenuOption>,
    },
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text {
            text: text.into(),
            quick_replies: Vec::new(),
        }
    }

    pub fn with_quick_replies(self, options: Vec<MenuOption>) -> Self {
        match self {
            Reply::Text { text, .. } => Reply::Text {
                text,
                quick_replies: options,
            },
            menu => menu,
        }
    }

    /// Plain-text rendering for transports without rich messages.
    pub fn as_text(&self) -> String {
        match self {
            Reply::Text { text, .. } => text.clone(),
            Reply::Menu { title, options } => {
                let mut out = title.clone();
                for (i, option) in options.iter().enumerate() {
                    out.push_str(&format!("\n{}. {}", i + 1, option.label));
                    if let Some(description) = &option.description {
                        out.push_str(&format!("（{description}）"));
                    }
                }
                out
            }
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

/// Builds replies for model output. Canned messages go through [`ReplyRenderer::message`].
pub trait ReplyRenderer: Send + Sync + fmt::Debug {
    fn message(&self, text: &str) -> Reply {
        Reply::text(text)
    }

    fn recommendations(&self, ingredients: &[String], recipes: &[Recipe]) -> Reply;

    fn recipe_detail(&self, recipe: &Recipe) -> Reply;

    fn substitution(&self, recipe_name: &str, advice: &str) -> Reply;
}

/// Everything as text; the recommendation list is numbered.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextRenderer;

/// Recommendations as a menu, detail and substitution replies with quick replies.
#[derive(Debug, Clone, Copy, Default)]
pub struct RichMenuRenderer;

impl ReplyRenderer for PlainTextRenderer {
    fn recommendations(&self, ingredients: &[String], recipes: &[Recipe]) -> Reply {
        let mut text = format!("根據您的食材（{}），推薦以下料理：\n", ingredients.join("、"));
        for (i, recipe) in recipes.iter().enumerate() {
            text.push_str(&format!("\n{}. {}\n", i + 1, recipe.name));
            text.push_str(&summary_lines(recipe));
        }
        text.push_str(&format!("\n{}", choice_hint(recipes.len())));
        Reply::text(text)
    }

    fn recipe_detail(&self, recipe: &Recipe) -> Reply {
        Reply::text(format!(
            "{}\n\n缺少食材時請告訴我，例如「我沒有醬油」。",
            format_detail(recipe)
        ))
    }

    fn substitution(&self, recipe_name: &str, advice: &str) -> Reply {
        Reply::text(format_substitution(recipe_name, advice))
    }
}

impl ReplyRenderer for RichMenuRenderer {
    fn recommendations(&self, ingredients: &[String], recipes: &[Recipe]) -> Reply {
        let options = recipes
            .iter()
            .enumerate()
            .map(|(i, recipe)| {
                let option = MenuOption::new(&recipe.name, (i + 1).to_string());
                match one_line_summary(recipe) {
                    Some(summary) => option.with_description(summary),
                    None => option,
                }
            })
            .collect();

        Reply::Menu {
            title: format!("根據您的食材（{}），為您推薦：", ingredients.join("、")),
            options,
        }
    }

    fn recipe_detail(&self, recipe: &Recipe) -> Reply {
        Reply::text(format_detail(recipe)).with_quick_replies(vec![
            MenuOption::echo(MISSING_PROMPT_TRIGGER),
            MenuOption::echo("重新選擇"),
            MenuOption::echo("重新開始"),
        ])
    }

    fn substitution(&self, recipe_name: &str, advice: &str) -> Reply {
        Reply::text(format_substitution(recipe_name, advice)).with_quick_replies(vec![
            MenuOption::echo("完成查詢"),
            MenuOption::echo("重新開始"),
        ])
    }
}

fn choice_hint(count: usize) -> String {
    match count {
        0 | 1 => "請輸入 1 查看詳細食譜！".to_string(),
        2 => "請選擇 1 或 2 來查看詳細食譜！".to_string(),
        _ => "請選擇 1、2 或 3 來查看詳細食譜！".to_string(),
    }
}

fn summary_lines(recipe: &Recipe) -> String {
    let mut lines = String::new();
    if !recipe.ingredients.is_empty() {
        lines.push_str(&format!("   主要食材：{}\n", recipe.ingredient_summary()));
    }
    if let Some(time) = &recipe.time {
        lines.push_str(&format!("   預估烹飪時間：{time}\n"));
    }
    if let Some(difficulty) = &recipe.difficulty {
        lines.push_str(&format!("   難度：{difficulty}\n"));
    }
    lines
}

fn one_line_summary(recipe: &Recipe) -> Option<String> {
    if let Some(description) = &recipe.description {
        return Some(description.clone());
    }
    let parts: Vec<&str> = [recipe.time.as_deref(), recipe.difficulty.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    (!parts.is_empty()).then(|| parts.join(" · "))
}

/// Sectioned detail layout: 【食材準備】【烹調時間】【難度等級】【詳細步驟】【小技巧】【營養價值】.
pub fn format_detail(recipe: &Recipe) -> String {
    let mut out = format!("🍳 {}", recipe.name);

    if !recipe.ingredients.is_empty() {
        out.push_str("\n\n【食材準備】");
        for ingredient in &recipe.ingredients {
            out.push_str(&format!("\n• {ingredient}"));
        }
    }
    if let Some(time) = &recipe.time {
        out.push_str(&format!("\n\n【烹調時間】\n{time}"));
    }
    if let Some(difficulty) = &recipe.difficulty {
        out.push_str(&format!("\n\n【難度等級】\n{difficulty}"));
    }
    if !recipe.steps.is_empty() {
        out.push_str("\n\n【詳細步驟】");
        for (i, step) in recipe.steps.iter().enumerate() {
            out.push_str(&format!("\n{}. {}", i + 1, step));
        }
    }
    if let Some(tips) = &recipe.tips {
        out.push_str(&format!("\n\n【小技巧】\n{tips}"));
    }
    if let Some(nutrition) = &recipe.nutrition {
        out.push_str(&format!("\n\n【營養價值】\n{nutrition}"));
    }
    out
}

fn format_substitution(recipe_name: &str, advice: &str) -> String {
    format!("🔄 「{recipe_name}」的替代方案：\n\n{}", advice.trim())
}
