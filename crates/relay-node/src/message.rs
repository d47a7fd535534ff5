//! Message envelope and the closed set of relay actions
//!
//! On the wire an envelope's `content` is `{action, parameters}`. Parameters
//! may also be given inline next to `action`, which is how older nodes frame
//! their messages; both decode to the same [`Action`]. Content without an
//! action but with free-text `input` is resolved by
//! [`determine_action`](crate::intent::determine_action).

use crate::error::{Error, Result};
use crate::intent::determine_action;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// One relayed request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    /// Correlation id, generated by the sender
    #[serde(default = "generate_message_id")]
    pub message_id: String,

    /// Service that built or last forwarded the envelope
    pub source_id: String,

    /// Service the envelope is addressed to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,

    /// Action and its parameters
    pub content: Action,

    /// Creation time, informational only
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

fn generate_message_id() -> String {
    Uuid::new_v4().to_string()
}

impl MessageEnvelope {
    /// Build a fresh envelope from `source_id`
    pub fn new(source_id: impl Into<String>, target_id: Option<String>, content: Action) -> Self {
        Self {
            message_id: generate_message_id(),
            source_id: source_id.into(),
            target_id,
            content,
            timestamp: Utc::now(),
        }
    }

    /// Same message, forwarded by `source_id` to `target_id`
    pub fn readdressed(&self, source_id: &str, target_id: &str) -> Self {
        Self {
            source_id: source_id.to_string(),
            target_id: Some(target_id.to_string()),
            ..self.clone()
        }
    }
}

/// Parameters of `generate_text`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateText {
    /// Prompt to complete
    pub prompt: String,
    /// Upper bound on generated tokens
    #[serde(default = "default_limit")]
    pub max_tokens: u32,
}

/// Parameters of `summarize`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summarize {
    /// Text to summarize
    pub text: String,
    /// Upper bound on summary length
    #[serde(default = "default_limit")]
    pub max_length: u32,
}

/// Parameters of `analyze_data`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeData {
    /// Question about the data
    pub query: String,
    /// Data to analyze
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// Parameters of `translate_text`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslateText {
    /// Text to translate
    pub text: String,
    /// Language of `text`
    #[serde(default = "default_source_language")]
    pub source_language: String,
    /// Language to translate into
    #[serde(default = "default_target_language")]
    pub target_language: String,
}

/// Parameters of `classify_text`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifyText {
    /// Text to classify
    pub text: String,
    /// Candidate categories, endpoint defaults when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
}

/// Parameters of `analyze_sentiment`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeSentiment {
    /// Text to analyze
    pub text: String,
}

fn default_limit() -> u32 {
    100
}

fn default_source_language() -> String {
    "en".to_string()
}

fn default_target_language() -> String {
    "es".to_string()
}

/// Envelope content: one of the known actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawContent", into = "RawContent")]
pub enum Action {
    /// Generate text from a prompt
    GenerateText(GenerateText),
    /// Summarize a text
    Summarize(Summarize),
    /// Answer a query over structured data
    AnalyzeData(AnalyzeData),
    /// Translate a text
    TranslateText(TranslateText),
    /// Classify a text
    ClassifyText(ClassifyText),
    /// Analyze the sentiment of a text
    AnalyzeSentiment(AnalyzeSentiment),
    /// Report the status of the receiving node
    GetStatus,
    /// An action name outside the known set
    Unknown {
        /// The action as received
        action: String,
    },
}

impl Action {
    /// Action name, also the capability that serves it
    pub fn name(&self) -> &str {
        match self {
            Action::GenerateText(_) => "generate_text",
            Action::Summarize(_) => "summarize",
            Action::AnalyzeData(_) => "analyze_data",
            Action::TranslateText(_) => "translate_text",
            Action::ClassifyText(_) => "classify_text",
            Action::AnalyzeSentiment(_) => "analyze_sentiment",
            Action::GetStatus => "get_status",
            Action::Unknown { action } => action,
        }
    }

    /// Parameters as a JSON object
    pub fn parameters(&self) -> Result<Value> {
        let value = match self {
            Action::GenerateText(p) => serde_json::to_value(p)?,
            Action::Summarize(p) => serde_json::to_value(p)?,
            Action::AnalyzeData(p) => serde_json::to_value(p)?,
            Action::TranslateText(p) => serde_json::to_value(p)?,
            Action::ClassifyText(p) => serde_json::to_value(p)?,
            Action::AnalyzeSentiment(p) => serde_json::to_value(p)?,
            Action::GetStatus | Action::Unknown { .. } => Value::Object(Map::new()),
        };
        Ok(value)
    }

    /// Reject unknown actions and empty required text
    pub fn validate(&self) -> Result<()> {
        let (field, value) = match self {
            Action::Unknown { action } => {
                return Err(Error::invalid_argument(format!("Unknown action: {action}")));
            }
            Action::GetStatus => return Ok(()),
            Action::GenerateText(p) => ("prompt", &p.prompt),
            Action::Summarize(p) => ("text", &p.text),
            Action::AnalyzeData(p) => ("query", &p.query),
            Action::TranslateText(p) => ("text", &p.text),
            Action::ClassifyText(p) => ("text", &p.text),
            Action::AnalyzeSentiment(p) => ("text", &p.text),
        };

        if value.trim().is_empty() {
            return Err(Error::invalid_argument(format!(
                "{} requires a non-empty {field}",
                self.name()
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Serialize, Deserialize)]
struct RawContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    action: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    parameters: Value,
    #[serde(flatten)]
    inline: Map<String, Value>,
}

fn decode<T: serde::de::DeserializeOwned>(action: &str, parameters: Value) -> std::result::Result<T, String> {
    serde_json::from_value(parameters).map_err(|e| format!("Invalid parameters for {action}: {e}"))
}

impl TryFrom<RawContent> for Action {
    type Error = String;

    fn try_from(raw: RawContent) -> std::result::Result<Self, Self::Error> {
        let Some(name) = raw.action else {
            return match raw.inline.get("input") {
                Some(Value::String(input)) => Ok(determine_action(input)),
                Some(other) => Err(format!("Invalid input: expected a string, got {other}")),
                None => Err("missing field `action`".to_string()),
            };
        };

        let parameters = match raw.parameters {
            Value::Null => Value::Object(raw.inline),
            Value::Object(map) => Value::Object(map),
            other => {
                return Err(format!(
                    "Invalid parameters for {name}: expected an object, got {other}"
                ));
            }
        };

        let action = match name.as_str() {
            "generate_text" => Action::GenerateText(decode(&name, parameters)?),
            "summarize" => Action::Summarize(decode(&name, parameters)?),
            "analyze_data" => Action::AnalyzeData(decode(&name, parameters)?),
            "translate_text" => Action::TranslateText(decode(&name, parameters)?),
            "classify_text" => Action::ClassifyText(decode(&name, parameters)?),
            "analyze_sentiment" => Action::AnalyzeSentiment(decode(&name, parameters)?),
            "get_status" => Action::GetStatus,
            _ => Action::Unknown { action: name },
        };
        Ok(action)
    }
}

impl From<Action> for RawContent {
    fn from(action: Action) -> Self {
        // Parameter structs always serialize to objects
        let parameters = action.parameters().unwrap_or(Value::Null);
        Self {
            action: Some(action.name().to_string()),
            parameters,
            inline: Map::new(),
        }
    }
}
