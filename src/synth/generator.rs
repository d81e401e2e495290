//! Generative Text Service client.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::GenerationConfig;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Produces reply text from an instruction, the user's message and memory context.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, system: &str, user_message: &str, context: &str) -> Result<String>;
}

/// Client for an Anthropic-style `/messages` endpoint.
pub struct AnthropicGenerator {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    max_tokens: u32,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [ChatTurn<'a>; 1],
}

#[derive(Serialize)]
struct ChatTurn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            endpoint: format!("{}/messages", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }
}

#[async_trait]
impl TextGenerator for AnthropicGenerator {
    async fn generate(&self, system: &str, user_message: &str, context: &str) -> Result<String> {
        let content = format!("{user_message}{context}");
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system,
            messages: [ChatTurn {
                role: "user",
                content: &content,
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .context("generation request failed")?;

        anyhow::ensure!(
            response.status().is_success(),
            "generation failed with HTTP {}",
            response.status()
        );

        let body: MessagesResponse = response
            .json()
            .await
            .context("generation response was not valid JSON")?;
        extract_text(body).context("generation response had no text")
    }
}

fn extract_text(body: MessagesResponse) -> Option<String> {
    let text = body
        .content
        .into_iter()
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join("\n");
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// The configured generator, or `None` when generation is disabled.
pub fn create_generator(config: &GenerationConfig) -> Result<Option<Arc<dyn TextGenerator>>> {
    if !config.is_enabled() {
        tracing::info!("generation disabled, replies will use templates");
        return Ok(None);
    }
    match config.provider.as_str() {
        "anthropic" => {
            let generator: Arc<dyn TextGenerator> = Arc::new(AnthropicGenerator::new(config)?);
            tracing::info!(model = %config.model, "generator ready");
            Ok(Some(generator))
        }
        other => anyhow::bail!("unknown generation provider: {other}. Supported: anthropic, none"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_blocks_are_joined_and_trimmed() {
        let body: MessagesResponse = serde_json::from_str(
            r#"{"content":[{"type":"text","text":"  Beta, "},{"type":"tool_use"},{"type":"text","text":"so jao ab.  "}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(body).as_deref(), Some("Beta, \nso jao ab."));
    }

    #[test]
    fn blank_response_is_none() {
        let body: MessagesResponse = serde_json::from_str(r#"{"content":[{"type":"text","text":"   "}]}"#).unwrap();
        assert!(extract_text(body).is_none());
        let body: MessagesResponse = serde_json::from_str("{}").unwrap();
        assert!(extract_text(body).is_none());
    }

    #[test]
    fn request_serializes_in_messages_shape() {
        let request = MessagesRequest {
            model: "m",
            max_tokens: 400,
            system: "sys",
            messages: [ChatTurn {
                role: "user",
                content: "hi",
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["max_tokens"], 400);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["system"], "sys");
    }

    #[test]
    fn disabled_config_creates_no_generator() {
        assert!(create_generator(&GenerationConfig::default()).unwrap().is_none());
        let config = GenerationConfig {
            api_key: "sk-test".into(),
            provider: "other".into(),
            ..GenerationConfig::default()
        };
        assert!(create_generator(&config).is_err());
    }
}
