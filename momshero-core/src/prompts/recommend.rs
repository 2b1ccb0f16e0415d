//! Recommendation prompt: three dishes for a set of ingredients.

use super::PERSONA;

/// Render the recommendation prompt.
///
/// `exclude` lists dishes already shown to the user; they are asked to be skipped so that
/// "choose again" yields a fresh set (and a fresh cache key).
pub fn render_recommend_prompt(ingredients: &[String], exclude: &[String]) -> String {
    let ingredients = ingredients.join("、");
    let exclude_line = if exclude.is_empty() {
        String::new()
    } else {
        format!("\n請不要再推薦以下料理：{}\n", exclude.join("、"))
    };

    format!(
        r#"{PERSONA}
根據用戶提供的食材：{ingredients}
{exclude_line}
請推薦 3 道適合的料理，格式如下：

1. 料理名稱
   主要食材：食材1、食材2
   預估烹飪時間：15分鐘
   難度：簡單/中等/困難

2. 料理名稱
   主要食材：食材1、食材2
   預估烹飪時間：20分鐘
   難度：簡單/中等/困難

3. 料理名稱
   主要食材：食材1、食材2
   預估烹飪時間：30分鐘
   難度：簡單/中等/困難

要求：以用戶的食材為主，簡單實用的家常料理。請用繁體中文回答，不要其他說明文字。"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_prompt() {
        let prompt = render_recommend_prompt(
            &["雞蛋".to_string(), "白飯".to_string(), "蔥".to_string()],
            &[],
        );

        assert!(prompt.contains("雞蛋、白飯、蔥"));
        assert!(prompt.contains("推薦 3 道適合的料理"));
        assert!(!prompt.contains("請不要再推薦"));
    }

    #[test]
    fn test_exclusions_change_the_prompt() {
        let ingredients = vec!["豆腐".to_string()];
        let plain = render_recommend_prompt(&ingredients, &[]);
        let again = render_recommend_prompt(&ingredients, &["麻婆豆腐".to_string()]);

        assert_ne!(plain, again);
        assert!(again.contains("請不要再推薦以下料理：麻婆豆腐"));
    }
}
