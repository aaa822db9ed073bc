//! carag - 에이전트형 RAG 질의응답
//!
//! 업로드한 문서(PDF/텍스트)와 웹 검색 중 하나를 질문마다 골라
//! 근거를 찾고, 그 근거로 답변을 스트리밍합니다.
//!
//! - 문서: 고정 길이 겹침 청크 + 정확한 L2 최근접 검색
//! - 라우팅: 단발 LLM 호출로 PDF / WEB 결정
//! - 답변: 대화 기록을 포함한 스트리밍 생성, 완료 시 기록 저장

pub mod agent;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extractor;
pub mod history;
pub mod knowledge;
pub mod llm;
pub mod search;

// Re-exports
pub use agent::{Answer, Capabilities, Pipeline, PipelineState, Session, Source};
pub use config::{PipelineConfig, Settings};
pub use embedding::{EmbeddingProvider, GeminiEmbedding};
pub use error::{ConfigError, IngestError};
pub use history::{HistoryRecord, HistorySink, SqliteHistoryStore};
pub use knowledge::{chunk_text, ChunkConfig, Chunker, DocumentIndex, IndexHandle, WindowChunker};
pub use llm::{ChatMessage, ChatProvider, GroqClient};
pub use search::{TavilyClient, WebSearch, WebSearchProvider};
