//! GraphQL capability endpoints
//!
//! Each supported action maps to one query against `{url}/graphql`. Result
//! fields come back in camelCase and are renamed to snake_case so callers see
//! the same keys a REST endpoint would return.

use super::{Transport, send};
use crate::{
    error::{Error, Result},
    message::{Action, MessageEnvelope},
};
use async_trait::async_trait;
use heck::ToSnakeCase;
use serde_json::{Map, Value, json};
use std::time::Duration;
use tracing::debug;

const GENERATE_TEXT: &str = "query GenerateText($prompt: String!, $maxTokens: Int) {
  generateText(prompt: $prompt, maxTokens: $maxTokens) { text confidence modelUsed }
}";

const TRANSLATE_TEXT: &str = "query TranslateText($text: String!, $sourceLanguage: String!, $targetLanguage: String!) {
  translateText(text: $text, sourceLanguage: $sourceLanguage, targetLanguage: $targetLanguage) {
    translatedText confidence modelUsed languagePair
  }
}";

const CLASSIFY_TEXT: &str = "query ClassifyText($text: String!, $categories: [String!]) {
  classifyText(text: $text, categories: $categories) {
    result categories { category confidence } modelUsed
  }
}";

const ANALYZE_SENTIMENT: &str = "query AnalyzeSentiment($text: String!) {
  analyzeSentiment(text: $text) {
    result confidence scores { positive negative neutral } modelUsed
  }
}";

/// A GraphQL query ready to post
#[derive(Debug, Clone, PartialEq)]
pub struct GraphqlQuery {
    /// Query document
    pub query: &'static str,
    /// Top-level field holding the result
    pub field: &'static str,
    /// Query variables
    pub variables: Value,
}

impl GraphqlQuery {
    /// Query serving `action`, if the action has one
    pub fn for_action(action: &Action) -> Option<Self> {
        let (query, field, variables) = match action {
            Action::GenerateText(p) => (
                GENERATE_TEXT,
                "generateText",
                json!({"prompt": p.prompt, "maxTokens": p.max_tokens}),
            ),
            Action::TranslateText(p) => (
                TRANSLATE_TEXT,
                "translateText",
                json!({
                    "text": p.text,
                    "sourceLanguage": p.source_language,
                    "targetLanguage": p.target_language,
                }),
            ),
            Action::ClassifyText(p) => (
                CLASSIFY_TEXT,
                "classifyText",
                json!({"text": p.text, "categories": p.categories}),
            ),
            Action::AnalyzeSentiment(p) => {
                (ANALYZE_SENTIMENT, "analyzeSentiment", json!({"text": p.text}))
            }
            _ => return None,
        };
        Some(Self {
            query,
            field,
            variables,
        })
    }

    /// Request body
    pub fn body(&self) -> Value {
        json!({"query": self.query, "variables": self.variables})
    }

    /// Extract this query's result from a GraphQL response
    pub fn extract(&self, status: reqwest::StatusCode, body: Value) -> Result<Value> {
        if let Some(errors) = body
            .get("errors")
            .and_then(Value::as_array)
            .filter(|e| !e.is_empty())
        {
            let error = errors[0]
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("GraphQL query failed")
                .to_string();
            return Err(Error::Remote {
                error,
                details: Some(Value::Array(errors.clone())),
            });
        }

        match body.get("data").and_then(|d| d.get(self.field)) {
            Some(result) if !result.is_null() => Ok(snake_case_keys(result.clone())),
            _ if !status.is_success() => Err(Error::upstream(
                format!("Target returned status {}", status.as_u16()),
                body,
            )),
            _ => Err(Error::upstream("Unexpected response format", body)),
        }
    }
}

/// Endpoint answering GraphQL queries at `{url}/graphql`
#[derive(Debug, Clone)]
pub struct GraphqlTransport {
    endpoint: String,
    http: reqwest::Client,
    timeout: Duration,
}

impl GraphqlTransport {
    /// Create a transport for the endpoint at `base_url`
    pub fn new(base_url: &str, http: reqwest::Client, timeout: Duration) -> Self {
        Self {
            endpoint: format!("{}/graphql", base_url.trim_end_matches('/')),
            http,
            timeout,
        }
    }
}

#[async_trait]
impl Transport for GraphqlTransport {
    fn supports(&self, action: &Action) -> bool {
        GraphqlQuery::for_action(action).is_some()
    }

    async fn forward(&self, envelope: &MessageEnvelope, trace_id: Option<&str>) -> Result<Value> {
        let action = &envelope.content;
        let query = GraphqlQuery::for_action(action).ok_or_else(|| {
            Error::routing(format!("GraphQL endpoint {} does not serve {action}", self.endpoint))
        })?;

        debug!("Forwarding {} to {} ({})", envelope.message_id, self.endpoint, query.field);

        let builder = self.http.post(&self.endpoint).json(&query.body());
        let (status, body) = send(builder, self.timeout, trace_id).await?;
        query.extract(status, body)
    }
}

/// Rename every object key from camelCase to snake_case
pub fn snake_case_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k.to_snake_case(), snake_case_keys(v)))
                .collect::<Map<_, _>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(snake_case_keys).collect()),
        other => other,
    }
}
