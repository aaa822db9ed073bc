//! Agent 모듈 - 질문별 라우팅, 검색, 답변 생성
//!
//! 질문 하나는 `ROUTING → RETRIEVING → GENERATING → COMMITTED` 순서로 진행됩니다.
//! - Router: 단발 LLM 호출로 PDF / WEB 중 하나를 선택
//! - AnswerGenerator: 검색 결과를 근거로 한 스트리밍 답변
//! - Pipeline: 위 단계를 묶고 세션/기록을 갱신
//! - Session: 대화 기록과 문서 인덱스 스냅샷

mod generator;
mod pipeline;
mod router;
mod session;

#[cfg(test)]
pub(crate) mod testing;

use std::fmt;

pub use generator::{build_messages, AnswerGenerator, AnswerTokens};
pub use pipeline::{Answer, Capabilities, Pipeline, PipelineState};
pub use router::{interpret_decision, routing_prompt, Router};
pub use session::{ConversationTurn, Session};

/// 검색 소스
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// 업로드된 문서의 벡터 인덱스
    Pdf,
    /// 외부 웹 검색
    Web,
}

impl Source {
    /// 프롬프트와 출처 표시에 쓰는 이름
    pub fn label(&self) -> &'static str {
        match self {
            Source::Pdf => "private PDF document",
            Source::Web => "web search",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Pdf => write!(f, "PDF"),
            Source::Web => write!(f, "WEB"),
        }
    }
}
