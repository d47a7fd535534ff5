//! Action determination for free-text requests
//!
//! Envelope content may carry `{"input": "..."}` instead of an action. The
//! text is matched against keyword groups in a fixed order (translation,
//! summary, sentiment, classification, data analysis) and falls back to
//! `generate_text` with the whole input as prompt.

use crate::message::{
    Action, AnalyzeData, AnalyzeSentiment, ClassifyText, GenerateText, Summarize, TranslateText,
};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::debug;

#[allow(clippy::expect_used)]
static LANGUAGE_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)from\s+(\w+)\s+to\s+(\w+)").expect("static regex should not panic")
});
#[allow(clippy::expect_used)]
static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(.*?)\]").expect("static regex should not panic"));
#[allow(clippy::expect_used)]
static PARENTHESIZED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((.*?)\)").expect("static regex should not panic"));
#[allow(clippy::expect_used)]
static JSON_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("static regex should not panic"));

const TRANSLATE_WORDS: &[&str] = &["translate", "translation", "spanish", "french", "german"];
const SUMMARIZE_WORDS: &[&str] = &["summarize", "summary", "shorten", "brief"];
const SENTIMENT_WORDS: &[&str] = &["sentiment", "feeling", "emotion", "positive", "negative"];
const CLASSIFY_WORDS: &[&str] = &["classify", "categorize", "category", "type"];
const ANALYZE_WORDS: &[&str] = &["analyze", "analysis", "data", "statistics"];

// Instructions stripped from the text to translate, besides language names
const TRANSLATE_PHRASES: &[&str] = &["translation", "translate", "convert to"];

const LANGUAGES: &[(&str, &str)] = &[
    ("english", "en"),
    ("spanish", "es"),
    ("french", "fr"),
    ("german", "de"),
    ("italian", "it"),
    ("chinese", "zh"),
    ("japanese", "ja"),
    ("russian", "ru"),
    ("portuguese", "pt"),
    ("arabic", "ar"),
    ("hindi", "hi"),
    ("korean", "ko"),
    ("dutch", "nl"),
];

/// Pick the action and parameters a free-text request asks for
pub fn determine_action(input: &str) -> Action {
    let lower = input.to_lowercase();
    let mentions = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    let action = if mentions(TRANSLATE_WORDS) {
        let (source_language, target_language) = languages(input);
        Action::TranslateText(TranslateText {
            text: text_to_translate(input),
            source_language,
            target_language,
        })
    } else if mentions(SUMMARIZE_WORDS) {
        Action::Summarize(Summarize {
            text: input.to_string(),
            max_length: 100,
        })
    } else if mentions(SENTIMENT_WORDS) {
        Action::AnalyzeSentiment(AnalyzeSentiment {
            text: input.to_string(),
        })
    } else if mentions(CLASSIFY_WORDS) {
        let categories = categories(input);
        Action::ClassifyText(ClassifyText {
            text: input.to_string(),
            categories: (!categories.is_empty()).then_some(categories),
        })
    } else if mentions(ANALYZE_WORDS) || input.contains('{') {
        let query = match input.split_once('{') {
            Some((query, _)) => query.trim().to_string(),
            None => input.to_string(),
        };
        Action::AnalyzeData(AnalyzeData {
            query,
            data: embedded_object(input).unwrap_or_default(),
        })
    } else {
        Action::GenerateText(GenerateText {
            prompt: input.to_string(),
            max_tokens: 100,
        })
    };

    debug!("Determined {} from free-text input", action);
    action
}

fn language_code(name: &str) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find(|(language, _)| *language == name)
        .map(|(_, code)| *code)
}

/// Source and target language codes, `en` → `es` unless the text says otherwise
fn languages(input: &str) -> (String, String) {
    if let Some(pair) = LANGUAGE_PAIR.captures(input) {
        let code = |name: &str| {
            let name = name.to_lowercase();
            language_code(&name).map(str::to_string).unwrap_or(name)
        };
        return (code(&pair[1]), code(&pair[2]));
    }

    let lower = input.to_lowercase();
    let target = LANGUAGES
        .iter()
        .find(|(language, _)| {
            lower.contains(&format!("in {language}")) || lower.contains(&format!("to {language}"))
        })
        .map_or("es", |(_, code)| *code);
    ("en".to_string(), target.to_string())
}

fn text_to_translate(input: &str) -> String {
    let mut text = LANGUAGE_PAIR
        .replace_all(&input.to_lowercase(), "")
        .into_owned();
    for phrase in TRANSLATE_PHRASES {
        text = text.replace(phrase, "");
    }
    for (language, _) in LANGUAGES {
        text = text
            .replace(&format!("in {language}"), "")
            .replace(&format!("to {language}"), "");
    }
    text.trim_matches(|c: char| c.is_whitespace() || c == ':')
        .to_string()
}

/// Comma-separated categories from the first `[...]` and `(...)` groups
fn categories(input: &str) -> Vec<String> {
    [&*BRACKETED, &*PARENTHESIZED]
        .into_iter()
        .filter_map(|re| re.captures(input))
        .flat_map(|group| {
            group[1]
                .split(',')
                .map(|c| c.trim().to_string())
                .collect::<Vec<_>>()
        })
        .filter(|c| !c.is_empty())
        .collect()
}

fn embedded_object(input: &str) -> Option<Map<String, Value>> {
    let found = JSON_OBJECT.find(input)?;
    serde_json::from_str(found.as_str()).ok()
}
