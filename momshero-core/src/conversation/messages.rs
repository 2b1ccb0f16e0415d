//! Canned replies.

pub const QUOTA_EXCEEDED: &str =
    "抱歉，AI 服務的免費額度已用完。請稍後再試，或考慮升級到付費版本。";

pub const GENERIC_ERROR: &str = "抱歉，處理您的訊息時發生錯誤。請稍後再試！";

pub const RECOMMEND_ERROR: &str = "抱歉，生成推薦時發生錯誤，請稍後再試。";

pub const DETAIL_ERROR: &str = "抱歉，生成食譜詳情時發生錯誤，請稍後再試。";

pub const SUBSTITUTION_ERROR: &str = "抱歉，生成替代方案時發生錯誤，請稍後再試。";

pub const ONBOARDING: &str = "歡迎來到 MomsHero！👩‍🍳

我是您的專屬料理助手，請告訴我您有哪些食材，我會為您推薦適合的料理！

例如：
- 「我有雞蛋、白飯、蔥」
- 「家裡有豬肉、青菜、豆腐」
- 「冰箱裡有雞胸肉、胡蘿蔔」
- 「我有鮭魚、秋葵、松露」

請分享您的食材吧！";

pub const OFF_TOPIC: &str =
    "抱歉，我是專門協助料理和食譜的助手。請詢問與食材、料理、烹調相關的問題，我很樂意為您提供幫助！";

pub const RESET: &str = "好的！讓我們重新開始。請告訴我您有哪些食材，我會為您推薦適合的料理！";

pub const CHOICE_CLARIFICATION: &str =
    "請選擇 1、2 或 3 來選擇您想要的料理，或者告訴我您有其他食材！";

pub const AWAITING_CHOICE_HINT: &str = "如果您需要替代方案，請告訴我缺少什麼食材！
例如：「我沒有醬油」、「家裡沒有蔥」等。

或者您可以說「重新選擇」來看看其他推薦料理。
您也可以提供新的食材，我會為您推薦其他料理！";

pub const ASK_MISSING: &str =
    "請告訴我您缺少哪些食材，我會為您提供替代建議。\n\n例如：沒有雞蛋、沒有醬油、沒有蒜...";

pub const CLOSING: &str =
    "查詢已完成！✅\n\n希望這些建議對您有幫助。如果您想要查看其他料理推薦，請告訴我您的食材。";

pub const HELP: &str = "📖 使用說明

1. 告訴我您有哪些食材，例如「我有雞蛋、白飯、蔥」
2. 從推薦的料理中輸入 1、2 或 3 查看詳細食譜
3. 缺少食材時說「我沒有醬油」，我會提供替代方案
4. 說「重新選擇」看其他推薦，說「重新開始」清除對話";
