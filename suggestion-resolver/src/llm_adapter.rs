use crate::traits::{Prompt, SuggestionSource};
use crate::types::{ResolverConfig, ResolverError, Result, SourceError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Chat-completions client for OpenAI-compatible endpoints.
pub struct OpenAiChatAdapter {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatReplyMessage,
}

#[derive(Deserialize, Debug)]
struct ChatReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiChatAdapter {
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        let api_key = config
            .openai_api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ResolverError::Configuration("OpenAI API key not found".to_string())
            })?;

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl SuggestionSource for OpenAiChatAdapter {
    fn source_name(&self) -> String {
        format!("OpenAI chat ({})", self.model)
    }

    async fn complete(&self, prompt: &Prompt) -> std::result::Result<String, SourceError> {
        debug!("Requesting completion from {}", self.model);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Completion request failed with HTTP {}", status);
            return Err(SourceError::Transport(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| SourceError::MalformedResponse(format!("unreadable completion body: {}", e)))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| SourceError::MalformedResponse("completion had no content".to_string()))?;

        info!("Received {} bytes from {}", content.len(), self.model);
        Ok(content)
    }
}

/// Canned-reply source for development and testing.
///
/// Replies are served in order; the last one repeats once the queue is down
/// to a single entry. Every prompt is recorded.
pub struct MockLlmAdapter {
    name: String,
    replies: Mutex<VecDeque<std::result::Result<String, String>>>,
    prompts: Mutex<Vec<Prompt>>,
    response_delay_ms: u64,
}

impl MockLlmAdapter {
    pub fn new(name: String) -> Self {
        Self {
            name,
            replies: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            response_delay_ms: 0,
        }
    }

    pub fn with_reply(self, reply: impl Into<String>) -> Self {
        self.push(Ok(reply.into()));
        self
    }

    /// Queue a transport failure.
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.push(Err(message.into()));
        self
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.response_delay_ms = delay_ms;
        self
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn push(&self, reply: std::result::Result<String, String>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }

    fn next_reply(&self) -> std::result::Result<String, String> {
        let Ok(mut replies) = self.replies.lock() else {
            return Err("mock reply queue poisoned".to_string());
        };
        if replies.len() > 1 {
            replies.pop_front().unwrap_or_else(|| Err("no reply queued".to_string()))
        } else {
            replies
                .front()
                .cloned()
                .unwrap_or_else(|| Err("no reply queued".to_string()))
        }
    }
}

#[async_trait]
impl SuggestionSource for MockLlmAdapter {
    fn source_name(&self) -> String {
        format!("Mock LLM Adapter ({})", self.name)
    }

    async fn complete(&self, prompt: &Prompt) -> std::result::Result<String, SourceError> {
        if self.response_delay_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.response_delay_ms)).await;
        }
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.clone());
        }
        self.next_reply().map_err(SourceError::Transport)
    }
}
