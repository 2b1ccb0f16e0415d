//! Detail prompt: the full recipe for one chosen dish, as JSON.

use super::PERSONA;

pub fn render_detail_prompt(recipe_name: &str, ingredients: &[String]) -> String {
    let ingredients = if ingredients.is_empty() {
        "（未提供）".to_string()
    } else {
        ingredients.join("、")
    };

    format!(
        r#"{PERSONA}

請為「{recipe_name}」提供詳細的食譜。用戶手邊的食材：{ingredients}

以 JSON 格式回覆：

{{
    "name": "{recipe_name}",
    "ingredients": [
        {{"name": "食材名稱", "amount": "份量", "note": "備註"}}
    ],
    "time": "總烹調時間",
    "difficulty": "簡單/中等/困難",
    "steps": ["步驟1", "步驟2", "步驟3"],
    "tips": "烹調小技巧",
    "nutrition": "營養價值"
}}

請確保：
1. 步驟要詳細且容易理解
2. 食材份量要明確
3. 小技巧要實用，言簡意賅
4. 只回覆 JSON，不要其他文字"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_prompt() {
        let prompt = render_detail_prompt("蔥油拌飯", &["白飯".to_string(), "蔥".to_string()]);

        assert!(prompt.contains("請為「蔥油拌飯」提供詳細的食譜"));
        assert!(prompt.contains("白飯、蔥"));
        assert!(prompt.contains(r#""name": "蔥油拌飯""#));
        assert!(prompt.contains(r#""steps""#));
    }
}
