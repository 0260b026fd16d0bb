//! Completion client for the travel-advisor agent.
//!
//! The production client speaks the OpenAI-style chat-completions protocol.
//! The trait seam lets tests script responses without a network.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// System prompt steering the agent into its travel-guide persona.
const SYSTEM_PROMPT: &str = "\
You must act as a highly knowledgeable and friendly travel guide who guides \
the user in determining where they would like to travel. In doing so, you \
should determine the user's preferences and make it easy for them to reveal \
their preferences by making conversation easy. Ultimately, you must recommend \
a few good travel destinations based on the user's preferences. Then, when \
the user selects a travel destination, recommend generating a travel \
itinerary and a budget, and do so upon user request. When asked, your name is \
simply Smart Travel Advisor.";

/// One turn of completion input.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionTurn {
    /// `user` or `assistant`
    pub role: &'static str,
    pub text: String,
}

/// External completion capability.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Whether the client was initialized successfully at startup.
    fn ready(&self) -> bool;

    /// Generate a response for the given conversation history.
    async fn complete(&self, history: &[CompletionTurn]) -> Result<String>;
}

/// Configuration for the advisor completion client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    /// Base URL of the OpenAI-compatible endpoint
    pub base_url: String,
    /// Model identifier
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub temperature: f32,
    pub top_p: f32,
    /// Hard deadline for one completion call, in seconds
    pub timeout_secs: u64,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.7,
            top_p: 0.99,
            timeout_secs: 60,
        }
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    temperature: f32,
    top_p: f32,
}

#[derive(Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: WireMessage,
}

/// OpenAI-compatible completion client.
pub struct AdvisorClient {
    config: AdvisorConfig,
    client: reqwest::Client,
    /// Resolved at construction; `None` when the key env var was missing.
    api_key: Option<String>,
}

impl AdvisorClient {
    /// Build the client, resolving the API key from the environment.
    ///
    /// A missing key does not fail construction: the client reports not
    /// ready and completion calls error out instead.
    pub fn new(config: AdvisorConfig) -> Self {
        let api_key = std::env::var(&config.api_key_env).ok().filter(|k| !k.is_empty());
        Self {
            config,
            client: reqwest::Client::new(),
            api_key,
        }
    }
}

#[async_trait]
impl CompletionClient for AdvisorClient {
    fn ready(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(&self, history: &[CompletionTurn]) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .context("completion client has no API key")?;

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(WireMessage {
            role: "system".to_string(),
            content: SYSTEM_PROMPT.to_string(),
        });
        messages.extend(history.iter().map(|turn| WireMessage {
            role: turn.role.to_string(),
            content: turn.text.clone(),
        }));

        let body = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            top_p: self.config.top_p,
        };

        debug!(model = %self.config.model, turns = history.len(), "requesting completion");
        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .context("sending completion request")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("completion service returned {status}: {text}");
        }

        let parsed: ChatCompletionResponse =
            response.json().await.context("decoding completion response")?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();

        Ok(content)
    }
}
