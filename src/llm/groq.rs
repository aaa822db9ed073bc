//! Groq 채팅 완성 클라이언트
//!
//! OpenAI 호환 `/chat/completions` 엔드포인트를 사용합니다.
//! source: https://console.groq.com/docs/openai

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

use super::streaming::SseTokenStream;
use super::{ChatMessage, ChatProvider, ChatRequest, TokenStream};

/// Groq API 기본 주소
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Groq 클라이언트
#[derive(Debug, Clone)]
pub struct GroqClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GroqClient {
    /// API 키로 생성
    pub fn new(api_key: String) -> Result<Self, ConfigError> {
        Self::with_base_url(api_key, GROQ_BASE_URL.to_string())
    }

    /// 주소를 지정하여 생성 (프록시 등)
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, ConfigError> {
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential("GROQ_API_KEY"));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ConfigError::InvalidSetting {
                name: "http client",
                reason: e.to_string(),
            })?;

        Ok(Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn send(&self, request: &ChatRequest, stream: bool) -> Result<reqwest::Response> {
        let body = CompletionBody {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            top_p: request.top_p,
            max_tokens: request.max_tokens,
            stream,
        };

        let response = self
            .client
            .post(self.endpoint())
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key.trim()))
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .context("Failed to call Groq chat completions")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            bail!("Groq returned {}: {}", status, text);
        }

        Ok(response)
    }
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    top_p: f32,
    max_tokens: usize,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl ChatProvider for GroqClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let response = self.send(request, false).await?;
        let parsed: CompletionResponse = response
            .json()
            .await
            .context("Failed to parse Groq response")?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .context("Groq response missing message content")
    }

    async fn stream(&self, request: &ChatRequest) -> Result<TokenStream> {
        let response = self.send(request, true).await?;
        Ok(Box::pin(SseTokenStream::new(response.bytes_stream())))
    }

    fn name(&self) -> &str {
        "groq"
    }
}
