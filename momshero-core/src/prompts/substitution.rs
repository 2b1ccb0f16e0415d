//! Substitution prompt: what to use instead of a missing ingredient.

pub fn render_substitution_prompt(
    recipe_name: &str,
    recipe_ingredients: &[String],
    message: &str,
) -> String {
    let ingredients = if recipe_ingredients.is_empty() {
        String::new()
    } else {
        format!("食譜食材：{}\n", recipe_ingredients.join("、"))
    };

    format!(
        r#"用戶想做：{recipe_name}
{ingredients}用戶說：{message}

請提供簡潔的替代方案建議，格式要求：

1. 不要開場白，直接給建議
2. 每個建議1-2行即可
3. 如果食材可以省略，直接說「可以不用」
4. 用點列式呈現，簡潔明瞭

範例格式：
• 沒有醬油 → 用鹽+糖調味，或直接省略
• 沒有蒜 → 用蒜粉代替，或可以不用

請用繁體中文回答，保持簡短實用。"#
    )
}
