//! Chat-completions client for trade advice
//!
//! Speaks the OpenAI `/chat/completions` wire format, which other
//! compatible providers accept as well.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::{AdvicePrompt, Advisor};
use crate::config::AdvisorConfig;
use crate::error::{PrinterError, Result};

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: content.to_string(),
        }
    }

    fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }
}

/// Chat completions request
#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

/// Chat completions response
#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Advisor backed by a chat-completions endpoint
pub struct OpenAiAdvisor {
    config: AdvisorConfig,
    api_key: Zeroizing<String>,
    http: Client,
}

impl OpenAiAdvisor {
    pub fn new(config: AdvisorConfig, api_key: Zeroizing<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PrinterError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            api_key,
            http,
        })
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn request_body(&self, prompt: &AdvicePrompt) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage::system(&prompt.system),
                ChatMessage::user(&prompt.user),
            ],
            temperature: self.config.temperature,
        }
    }
}

#[async_trait]
impl Advisor for OpenAiAdvisor {
    async fn advise(&self, prompt: &AdvicePrompt) -> Result<String> {
        if !self.is_configured() {
            return Err(PrinterError::Advice("advisor API key not configured".to_string()));
        }

        debug!(
            "Sending advice request ({} + {} chars) to {}",
            prompt.system.len(),
            prompt.user.len(),
            self.config.model
        );

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .bearer_auth(self.api_key.as_str())
            .json(&self.request_body(prompt))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("Advisor API error: {} - {}", status, body);
            return Err(PrinterError::Advice(format!("{} - {}", status, body)));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| PrinterError::Advice(format!("Failed to parse advisor response: {}", e)))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| PrinterError::Advice("advisor returned no choices".to_string()))?;

        debug!("Advice received: {} chars", content.len());
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_carries_both_messages() {
        let advisor =
            OpenAiAdvisor::new(AdvisorConfig::default(), Zeroizing::new("k".to_string())).unwrap();
        let prompt = AdvicePrompt {
            system: "rules".to_string(),
            user: "what now?".to_string(),
        };

        let body = serde_json::to_value(advisor.request_body(&prompt)).unwrap();
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "what now?");
        assert!((body["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_response_without_content_is_tolerated_by_decoder() {
        let chat: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant"}}]}"#).unwrap();
        assert!(chat.choices[0].message.content.is_none());
    }

    #[tokio::test]
    async fn test_unconfigured_advisor_fails_fast() {
        let advisor =
            OpenAiAdvisor::new(AdvisorConfig::default(), Zeroizing::new(String::new())).unwrap();
        let prompt = AdvicePrompt {
            system: String::new(),
            user: String::new(),
        };
        assert!(matches!(
            advisor.advise(&prompt).await,
            Err(PrinterError::Advice(_))
        ));
    }
}
