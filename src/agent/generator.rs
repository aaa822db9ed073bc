//! AnswerGenerator - 검색 근거 기반 스트리밍 답변
//!
//! 반환되는 스트림은 유한하고 재시작할 수 없습니다. 각 토큰은 생성 순서대로
//! 한 번만 전달되며, 중간에 실패하면 사람이 읽을 수 있는 에러 조각을
//! 마지막으로 내보내고 정상 종료합니다. 소비자가 중간에 스트림을 버리면
//! 내부 HTTP 스트림도 함께 해제됩니다.

use std::pin::Pin;
use std::sync::Arc;

use async_stream::stream;
use futures::{Stream, StreamExt};

use crate::llm::{ChatMessage, ChatProvider, ChatRequest};

use super::session::ConversationTurn;
use super::Source;

/// 답변 토큰 스트림 (에러도 텍스트 조각으로 전달)
pub type AnswerTokens = Pin<Box<dyn Stream<Item = String> + Send>>;

/// 컨텍스트 조각 구분자
const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// 답변 생성기
pub struct AnswerGenerator {
    provider: Arc<dyn ChatProvider>,
    model: String,
    temperature: f32,
    top_p: f32,
    max_tokens: usize,
}

impl AnswerGenerator {
    pub fn new(provider: Arc<dyn ChatProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.2,
            top_p: 0.1,
            max_tokens: 1000,
        }
    }

    /// 답변 스트림 생성
    ///
    /// # Arguments
    /// * `question` - 현재 질문
    /// * `passages` - 검색된 근거 (비어 있어도 됨)
    /// * `history` - 이전 대화 (현재 질문 제외)
    /// * `source` - 근거의 출처
    pub fn generate(
        &self,
        question: &str,
        passages: &[String],
        history: &[ConversationTurn],
        source: Source,
    ) -> AnswerTokens {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: build_messages(question, passages, history, source),
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
        };
        let provider = Arc::clone(&self.provider);

        Box::pin(stream! {
            let mut tokens = match provider.stream(&request).await {
                Ok(tokens) => tokens,
                Err(e) => {
                    tracing::warn!("Answer generation failed to start: {:#}", e);
                    yield error_fragment(provider.name(), &e);
                    return;
                }
            };

            while let Some(item) = tokens.next().await {
                match item {
                    Ok(token) => yield token,
                    Err(e) => {
                        tracing::warn!("Answer stream interrupted: {:#}", e);
                        yield error_fragment(provider.name(), &e);
                        return;
                    }
                }
            }
        })
    }
}

/// 프롬프트 메시지 구성
///
/// `[system] + history + [user(context + question)]`
pub fn build_messages(
    question: &str,
    passages: &[String],
    history: &[ConversationTurn],
    source: Source,
) -> Vec<ChatMessage> {
    let context = passages.join(CONTEXT_SEPARATOR);

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(format!(
        "You are an expert Q&A assistant. Use the given context from a {} to answer the \
         user's question accurately. If the context does not contain the answer, say so.",
        source.label()
    )));
    messages.extend(history.iter().cloned());
    messages.push(ChatMessage::user(format!(
        "Context: {}\n\nQuestion: {}",
        context, question
    )));
    messages
}

fn error_fragment(provider: &str, error: &anyhow::Error) -> String {
    format!("\n\nError calling {} API: {:#}", provider, error)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::testing::ScriptedChat;
    use crate::llm::Role;

    fn collect(tokens: AnswerTokens) -> Vec<String> {
        futures::executor::block_on(tokens.collect::<Vec<_>>())
    }

    #[test]
    fn test_build_messages_order() {
        let history = vec![
            ChatMessage::user("earlier question"),
            ChatMessage::assistant("earlier answer"),
        ];
        let passages = vec!["first".to_string(), "second".to_string()];

        let messages = build_messages("now?", &passages, &history, Source::Pdf);

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("private PDF document"));
        assert_eq!(messages[1].content, "earlier question");
        assert_eq!(messages[2].role, Role::Assistant);
        assert_eq!(
            messages[3].content,
            "Context: first\n\n---\n\nsecond\n\nQuestion: now?"
        );
    }

    #[test]
    fn test_build_messages_web_label_and_empty_context() {
        let messages = build_messages("q", &[], &[], Source::Web);
        assert!(messages[0].content.contains("web search"));
        assert_eq!(messages[1].content, "Context: \n\nQuestion: q");
    }

    #[tokio::test]
    async fn test_tokens_in_generation_order() {
        let chat = Arc::new(ScriptedChat::answering(&["Paris", " is", " the capital."]));
        let generator = AnswerGenerator::new(chat.clone(), "answer-model");

        let tokens = generator.generate("q", &[], &[], Source::Web);
        let collected: Vec<String> = tokens.collect().await;

        assert_eq!(collected, vec!["Paris", " is", " the capital."]);
        let request = chat.last_request().expect("request recorded");
        assert_eq!(request.model, "answer-model");
        assert!((request.temperature - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn test_mid_stream_failure_yields_error_fragment() {
        let chat = Arc::new(ScriptedChat::answering(&["partial", " answer"]).fail_after(1));
        let generator = AnswerGenerator::new(chat, "answer-model");

        let collected = collect(generator.generate("q", &[], &[], Source::Pdf));

        assert_eq!(collected.len(), 2);
        assert_eq!(collected[0], "partial");
        assert!(collected[1].starts_with("\n\nError calling scripted API:"));
    }

    #[test]
    fn test_open_failure_yields_single_error_fragment() {
        let generator = AnswerGenerator::new(Arc::new(ScriptedChat::failing()), "answer-model");

        let collected = collect(generator.generate("q", &[], &[], Source::Web));

        assert_eq!(collected.len(), 1);
        assert!(collected[0].contains("Error calling scripted API"));
    }

    #[tokio::test]
    async fn test_consumer_can_stop_early() {
        let chat = Arc::new(ScriptedChat::answering(&["a", "b", "c"]));
        let generator = AnswerGenerator::new(chat, "answer-model");

        let mut tokens = generator.generate("q", &[], &[], Source::Web);
        assert_eq!(tokens.next().await.as_deref(), Some("a"));
        drop(tokens);
    }
}
