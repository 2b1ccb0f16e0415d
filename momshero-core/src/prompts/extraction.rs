//! Extraction prompt: ingredient names explicitly present in a message.

/// What the model answers when the message names no ingredient.
pub const NONE_TOKEN: &str = "無";

pub fn render_extraction_prompt(message: &str) -> String {
    format!(
        r#"請從以下訊息中識別出食材名稱，只回傳食材名稱，用逗號分隔：

訊息：{message}

規則：
1. 只識別明確提到的食材
2. 不要假設或推測用戶有什麼食材
3. 不要添加用戶沒有提到的食材
4. 如果沒有明確的食材，回傳「{NONE_TOKEN}」

例如：
- 「我有鮭魚、秋葵、松露」→ 鮭魚,秋葵,松露
- 「我想做料理」→ {NONE_TOKEN}
- 「今天天氣真好」→ {NONE_TOKEN}

請只回傳食材名稱或「{NONE_TOKEN}」，不要其他文字："#
    )
}
