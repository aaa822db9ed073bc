//! LLM 모듈 - 채팅 완성 프로바이더
//!
//! 라우터는 단발 완성(`complete`)을, 답변 생성기는 스트리밍(`stream`)을 사용합니다.

mod groq;
mod streaming;

use std::pin::Pin;

use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};

pub use groq::{GroqClient, GROQ_BASE_URL};
pub use streaming::SseTokenStream;

// ============================================================================
// Types
// ============================================================================

/// 메시지 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// 채팅 메시지 (대화 턴)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// 채팅 완성 요청
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: usize,
}

/// 생성 토큰 스트림 (소비자가 끌어가는 만큼만 진행)
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

// ============================================================================
// ChatProvider Trait
// ============================================================================

/// LLM 프로바이더 트레이트
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// 전체 응답을 한 번에 받는 완성
    async fn complete(&self, request: &ChatRequest) -> Result<String>;

    /// 토큰 단위 스트리밍 완성
    async fn stream(&self, request: &ChatRequest) -> Result<TokenStream>;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}
