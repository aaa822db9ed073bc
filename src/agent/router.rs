//! Router - 질문을 PDF 또는 WEB 소스로 분류
//!
//! 온도 0의 단발 완성으로 한 단어(PDF/WEB)만 답하게 합니다.
//! 응답에 "PDF"가 포함되면 PDF, 그 외에는 WEB 입니다.
//! 호출 자체가 실패하면 PDF로 기본 설정됩니다 (문서가 로드된 상태에서만 호출되므로).

use std::sync::Arc;

use crate::llm::{ChatMessage, ChatProvider, ChatRequest};

use super::Source;

/// 라우팅 에이전트
pub struct Router {
    provider: Arc<dyn ChatProvider>,
    model: String,
}

impl Router {
    pub fn new(provider: Arc<dyn ChatProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// 질문에 사용할 소스 결정
    pub async fn decide(&self, question: &str) -> Source {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(routing_prompt(question))],
            temperature: 0.0,
            top_p: 0.1,
            max_tokens: 10,
        };

        match self.provider.complete(&request).await {
            Ok(reply) => {
                let source = interpret_decision(&reply);
                tracing::info!("Router decided {} (reply: {:?})", source, reply.trim());
                source
            }
            Err(e) => {
                tracing::warn!("Routing failed, defaulting to PDF: {:#}", e);
                Source::Pdf
            }
        }
    }
}

/// 라우팅 프롬프트
pub fn routing_prompt(question: &str) -> String {
    format!(
        "You are a routing agent. Your job is to decide whether to answer a user's question \
         using a private PDF document or a public web search.\n\
         If the question is about \"the document\", \"the paper\", \"this document\", or seems \
         to refer to a specific uploaded text, reply with the single word: PDF\n\
         If the question is a general knowledge question, asks for real-time information, or is \
         about a public topic, reply with the single word: WEB\n\
         User Question: \"{}\"\n\
         Your decision (reply with only PDF or WEB):",
        question
    )
}

/// 모델 응답 해석 ("PDF" 포함 여부)
pub fn interpret_decision(reply: &str) -> Source {
    if reply.contains("PDF") {
        Source::Pdf
    } else {
        Source::Web
    }
}

// ============================================================================
// Tests
// ============================================================================
