//! Keyword triggers and choice parsing.

use std::sync::LazyLock;

use regex::Regex;

use crate::extract::cooking_keywords;
use crate::types::Recipe;

pub const RESET_KEYWORDS: &[&str] = &["重新開始", "重置", "重來", "restart", "reset"];
pub const MISSING_KEYWORDS: &[&str] = &["沒有", "缺少", "缺", "替代", "食材有缺"];
pub const CHOOSE_AGAIN_KEYWORDS: &[&str] = &["重新選擇", "換一個", "其他選項", "再推薦"];
pub const CLOSING_KEYWORDS: &[&str] = &["謝謝", "好的", "了解", "完成查詢", "結束"];
pub const HELP_KEYWORDS: &[&str] = &["幫助", "說明", "help"];

/// Quick-reply text that opens the substitution flow without naming an ingredient.
pub const MISSING_PROMPT_TRIGGER: &str = "我食材有缺";

/// Prefix of a choice by dish name ("我要做蔥油拌飯").
pub const NAMED_CHOICE_PREFIX: &str = "我要做";

/// Messages longer than this (in characters) with no cooking word are off-topic.
pub const OFF_TOPIC_MIN_CHARS: usize = 10;

/// A whole message that is a choice: "2", "２", "選2", "第二道", "我選 3。"
static CHOICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:我要|我)?(?:選|第)?\s*([0-9０-９]+|[一二三四五六七八九十])\s*(?:道|個|号|號)?\s*[.。!！]?$")
        .expect("Invalid choice regex")
});

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}

pub fn is_reset(text: &str) -> bool {
    contains_any(text, RESET_KEYWORDS)
}

pub fn is_missing_intent(text: &str) -> bool {
    contains_any(text, MISSING_KEYWORDS)
}

pub fn is_choose_again(text: &str) -> bool {
    contains_any(text, CHOOSE_AGAIN_KEYWORDS)
}

pub fn is_closing(text: &str) -> bool {
    contains_any(text, CLOSING_KEYWORDS)
}

pub fn is_help(text: &str) -> bool {
    contains_any(text, HELP_KEYWORDS)
}

/// Whether an unmatched message still talks about cooking.
pub fn is_cooking_related(text: &str) -> bool {
    let lower = text.to_lowercase();
    cooking_keywords().iter().any(|k| lower.contains(k.as_str()))
}

/// Off-topic: long enough to be a real question, yet with no cooking word in it.
pub fn is_off_topic(text: &str) -> bool {
    text.chars().count() > OFF_TOPIC_MIN_CHARS && !is_cooking_related(text)
}

/// The 1-based number a message chooses, if the whole message is a choice token.
pub fn parse_choice(text: &str) -> Option<usize> {
    let caps = CHOICE.captures(text.trim())?;
    let token = caps.get(1)?.as_str();

    chinese_numeral(token).or_else(|| {
        let ascii: String = token.chars().map(to_ascii_digit).collect();
        ascii.parse().ok()
    })
}

/// 1-based index of the recommendation named by "我要做{name}".
pub fn parse_named_choice(text: &str, recommendations: &[Recipe]) -> Option<usize> {
    let name = text.trim().strip_prefix(NAMED_CHOICE_PREFIX)?.trim();
    recommendations
        .iter()
        .position(|r| r.name == name)
        .map(|index| index + 1)
}

fn to_ascii_digit(c: char) -> char {
    match c {
        '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
        other => other,
    }
}

fn chinese_numeral(token: &str) -> Option<usize> {
    let value = match token {
        "一" => 1,
        "二" => 2,
        "三" => 3,
        "四" => 4,
        "五" => 5,
        "六" => 6,
        "七" => 7,
        "八" => 8,
        "九" => 9,
        "十" => 10,
        _ => return None,
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_choice() {
        assert_eq!(parse_choice("2"), Some(2));
        assert_eq!(parse_choice(" ３ "), Some(3));
        assert_eq!(parse_choice("選1"), Some(1));
        assert_eq!(parse_choice("第二道"), Some(2));
        assert_eq!(parse_choice("我選 3。"), Some(3));
        assert_eq!(parse_choice("5"), Some(5));
        assert_eq!(parse_choice("一"), Some(1));
    }

    #[test]
    fn test_not_a_choice() {
        assert_eq!(parse_choice("我有3顆蛋"), None);
        assert_eq!(parse_choice("2個雞蛋和白飯"), None);
        assert_eq!(parse_choice(""), None);
        assert_eq!(parse_choice("蔥油拌飯"), None);
        assert_eq!(parse_choice("99999999999999999999999"), None);
    }

    #[test]
    fn test_named_choice() {
        let recipes = vec![Recipe::named("蔥花蛋炒飯"), Recipe::named("蔥油拌飯")];
        assert_eq!(parse_named_choice("我要做蔥油拌飯", &recipes), Some(2));
        assert_eq!(parse_named_choice("我要做 蔥花蛋炒飯", &recipes), Some(1));
        assert_eq!(parse_named_choice("我要做麻婆豆腐", &recipes), None);
        assert_eq!(parse_named_choice("蔥油拌飯", &recipes), None);
    }

    #[test]
    fn test_triggers() {
        assert!(is_reset("請重新開始"));
        assert!(is_reset("RESET"));
        assert!(!is_reset("重新選擇"));
        assert!(is_choose_again("可以換一個嗎"));
        assert!(is_missing_intent("我沒有醬油"));
        assert!(is_missing_intent(MISSING_PROMPT_TRIGGER));
        assert!(is_closing("好的，謝謝"));
        assert!(is_help("help"));
        assert!(!is_help("我有雞蛋"));
    }

    #[test]
    fn test_off_topic() {
        assert!(is_off_topic("今天的股市行情看起來怎麼樣呢"));
        assert!(!is_off_topic("今天晚餐可以煮什麼好呢大家"));
        assert!(!is_off_topic("你好"));
    }
}
