//! Perplexity AI adapter.
//!
//! One tool: ask the `sonar` model a question over the chat-completions
//! endpoint and return the answer text.

use async_trait::async_trait;
use serde_json::{Value, json};

use concierge_core::error::{AdapterError, Result};
use concierge_core::format;
use concierge_core::http::{Envelope, RestClient};
use concierge_core::params::ParamReader;
use concierge_core::traits::{
    Adapter, AdapterType, AuthRequirement, HealthStatus, ToolDefinition,
};

const API_BASE_URL: &str = "https://api.perplexity.ai";
const TOKEN_ENV: &str = "PERPLEXITY_API_KEY";
const MODEL: &str = "sonar";

pub struct PerplexityAdapter {
    id: String,
    client: RestClient,
}

impl PerplexityAdapter {
    pub fn new() -> Self {
        Self {
            id: "perplexity".to_string(),
            client: RestClient::new(API_BASE_URL, Some(TOKEN_ENV), Envelope::Raw),
        }
    }

    async fn tool_ask(&self, params: Value) -> Result<String> {
        let mut reader = ParamReader::new(&params);
        let query = reader.required_str_bounded("query", 1, 4000);
        reader.finish("perplexity_ask")?;
        let query = query.unwrap_or_default();

        let body = json!({
            "model": MODEL,
            "messages": [
                {"role": "user", "content": query}
            ]
        });
        let data = self.client.post("chat/completions", &body).await?;
        let answer = data
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .unwrap_or("No response")
            .to_string();
        Ok(format::clip_tail(answer, "Ask a narrower question."))
    }
}

impl Default for PerplexityAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Adapter for PerplexityAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Knowledge
    }

    fn health_check(&self) -> HealthStatus {
        if self.client.bearer_token().is_ok() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        vec![ToolDefinition {
            name: "perplexity_ask".to_string(),
            description: "Ask Perplexity AI a question and get a researched answer".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "minLength": 1, "maxLength": 4000, "description": "The question to ask"}
                },
                "required": ["query"]
            }),
        }]
    }

    async fn execute_tool(&self, name: &str, params: Value) -> Result<String> {
        match name {
            "perplexity_ask" => self.tool_ask(params).await,
            _ => Err(AdapterError::ToolNotFound {
                adapter_id: self.id.clone(),
                tool_name: name.to_string(),
            }),
        }
    }

    fn required_auth(&self) -> Option<AuthRequirement> {
        Some(AuthRequirement {
            provider: "perplexity".to_string(),
            env_var: TOKEN_ENV.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ask_requires_a_query() {
        let adapter = PerplexityAdapter::new();
        let err = adapter
            .execute_tool("perplexity_ask", json!({}))
            .await
            .unwrap_err();
        assert!(err.user_message().contains("`query`: required"));
    }

    #[tokio::test]
    async fn missing_api_key_is_a_configuration_error() {
        if std::env::var(TOKEN_ENV).is_ok() {
            return;
        }
        let adapter = PerplexityAdapter::new();
        let err = adapter
            .execute_tool("perplexity_ask", json!({"query": "What is the capital of Georgia?"}))
            .await
            .unwrap_err();
        assert_eq!(
            err.user_message(),
            "Configuration Error: PERPLEXITY_API_KEY environment variable not set"
        );
    }

    #[test]
    fn single_tool_is_exposed() {
        let adapter = PerplexityAdapter::new();
        let tools = adapter.tools();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "perplexity_ask");
    }
}
