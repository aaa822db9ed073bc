//! Pipeline - 문서 인제스트와 질의응답 오케스트레이션
//!
//! 질문 처리 흐름:
//! 1. ROUTING: 문서가 없으면 라우터를 건너뛰고 WEB
//! 2. RETRIEVING: PDF 인덱스 조회 또는 웹 검색
//! 3. GENERATING: 답변 토큰 스트리밍
//! 4. COMMITTED: 스트림이 끝까지 소비되면 대화 기록과 History 에 반영
//!
//! 스트림을 끝까지 읽지 않고 버린 답변은 기록되지 않습니다.

use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_stream::stream;
use futures::{Stream, StreamExt};
use tokio::sync::watch;

use crate::config::{PipelineConfig, Settings};
use crate::embedding::{EmbeddingProvider, GeminiEmbedding};
use crate::error::{ConfigError, IngestError};
use crate::history::{HistoryRecord, HistorySink, NoopHistory, SqliteHistoryStore};
use crate::knowledge::{Chunker, DocumentIndex, IndexHandle, WindowChunker};
use crate::llm::{ChatProvider, GroqClient};
use crate::search::{TavilyClient, WebSearch, WebSearchProvider};

use super::generator::{AnswerGenerator, AnswerTokens};
use super::router::Router;
use super::session::Session;
use super::Source;

// ============================================================================
// State
// ============================================================================

/// 질문 하나의 진행 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Routing,
    Retrieving,
    Generating,
    Committed,
}

// ============================================================================
// Capabilities
// ============================================================================

/// 파이프라인이 사용하는 외부 기능 묶음
#[derive(Clone)]
pub struct Capabilities {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub chat: Arc<dyn ChatProvider>,
    pub search: Arc<dyn WebSearchProvider>,
    pub history: Arc<dyn HistorySink>,
}

impl Capabilities {
    /// 설정으로부터 실제 클라이언트 생성 (Gemini / Groq / Tavily / SQLite)
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let embedder = GeminiEmbedding::new(
            settings.gemini_key()?.to_string(),
            settings.embedding_dimension,
        )?;
        let chat = GroqClient::with_base_url(
            settings.groq_key()?.to_string(),
            settings.groq_base_url.clone(),
        )?;
        let search = TavilyClient::with_base_url(
            settings.tavily_key()?.to_string(),
            settings.tavily_base_url.clone(),
        )?;

        Ok(Self {
            embedder: Arc::new(embedder),
            chat: Arc::new(chat),
            search: Arc::new(search),
            history: open_history(&settings.data_dir),
        })
    }
}

/// 기록 저장소 열기
///
/// 열 수 없으면 경고만 남기고 기록 없이 계속합니다.
fn open_history(data_dir: &Path) -> Arc<dyn HistorySink> {
    match SqliteHistoryStore::open_in(data_dir) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::warn!(
                "History store unavailable at {:?}, answers will not be recorded: {:#}",
                data_dir,
                e
            );
            Arc::new(NoopHistory)
        }
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// RAG 파이프라인
pub struct Pipeline {
    config: PipelineConfig,
    chunker: WindowChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    router: Router,
    generator: AnswerGenerator,
    web: WebSearch,
    history: Arc<dyn HistorySink>,
}

impl Pipeline {
    /// 파이프라인 생성 (설정 검증 포함)
    pub fn new(config: PipelineConfig, capabilities: Capabilities) -> Result<Self, ConfigError> {
        config.validate()?;
        let chunker = WindowChunker::new(config.chunk)?;

        tracing::info!(
            "Pipeline ready (embedder: {}, llm: {}, search: {})",
            capabilities.embedder.name(),
            capabilities.chat.name(),
            capabilities.search.name()
        );

        Ok(Self {
            router: Router::new(Arc::clone(&capabilities.chat), config.router_model.clone()),
            generator: AnswerGenerator::new(
                Arc::clone(&capabilities.chat),
                config.answer_model.clone(),
            ),
            web: WebSearch::new(capabilities.search),
            embedder: capabilities.embedder,
            history: capabilities.history,
            chunker,
            config,
        })
    }

    /// 설정 + 실제 클라이언트로 생성
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        Self::new(settings.pipeline.clone(), Capabilities::from_settings(settings)?)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 문서 인제스트
    ///
    /// 성공하면 세션의 인덱스를 새 인덱스로 교체합니다. 실패하면 이전 인덱스는
    /// 버려지고 세션은 WEB 전용이 됩니다.
    pub async fn ingest_document(
        &self,
        session: &Session,
        raw_text: &str,
        label: Option<String>,
    ) -> Result<IndexHandle, IngestError> {
        match self.build_index(raw_text, label).await {
            Ok(index) => {
                let handle = index.handle().clone();
                session.replace_index(Some(Arc::new(index)));
                tracing::info!(
                    "Indexed {} chunks for session {}",
                    handle.chunk_count,
                    session.id()
                );
                Ok(handle)
            }
            Err(e) => {
                session.replace_index(None);
                tracing::warn!("Ingestion failed, session {} is web-only: {}", session.id(), e);
                Err(e)
            }
        }
    }

    async fn build_index(
        &self,
        raw_text: &str,
        label: Option<String>,
    ) -> Result<DocumentIndex, IngestError> {
        if raw_text.trim().is_empty() {
            return Err(IngestError::EmptyDocument);
        }

        let chunks = self.chunker.chunk(raw_text);
        tracing::debug!("{} produced {} chunks", self.chunker.name(), chunks.len());

        DocumentIndex::build(raw_text, chunks, self.embedder.as_ref(), label).await
    }

    /// 질문 하나에 대한 답변 스트림
    ///
    /// 라우팅과 검색은 여기서 끝나고, 생성은 반환된 `Answer` 를 읽는 만큼 진행됩니다.
    /// 반환 시점의 상태는 `Generating` 이므로 그 이전 단계를 지켜보려면
    /// `answer_question_with` 에 미리 만든 채널을 넘깁니다.
    pub async fn answer_question(&self, session: &Arc<Session>, question: &str) -> Answer {
        let (state_tx, _) = watch::channel(PipelineState::Routing);
        self.answer_question_with(session, question, state_tx).await
    }

    /// 호출자가 만든 상태 채널로 진행 상황을 알리며 답변
    ///
    /// `state_tx` 의 구독자는 `Routing → Retrieving → Generating → Committed`
    /// 전이를 모두 관찰할 수 있습니다.
    pub async fn answer_question_with(
        &self,
        session: &Arc<Session>,
        question: &str,
        state_tx: watch::Sender<PipelineState>,
    ) -> Answer {
        state_tx.send_replace(PipelineState::Routing);
        let state_rx = state_tx.subscribe();

        // 질문 시작 시점의 인덱스를 끝까지 사용
        let index = session.index();
        let source = match &index {
            None => {
                tracing::debug!("No document loaded, routing to web search");
                Source::Web
            }
            Some(_) => self.router.decide(question).await,
        };

        state_tx.send_replace(PipelineState::Retrieving);
        let passages = match (source, &index) {
            (Source::Pdf, Some(index)) => {
                index
                    .query(question, self.embedder.as_ref(), self.config.pdf_top_k)
                    .await
            }
            _ => self.web.search(question, self.config.web_top_k).await,
        };
        tracing::info!("Retrieved {} passages from {}", passages.len(), source);

        state_tx.send_replace(PipelineState::Generating);
        let history = session.transcript();
        let tokens = self
            .generator
            .generate(question, &passages, &history, source);

        let stream = committing_stream(
            tokens,
            Arc::clone(session),
            Arc::clone(&self.history),
            question.to_string(),
            state_tx,
        );

        Answer {
            source,
            passages,
            state: state_rx,
            stream,
        }
    }
}

/// 답변 토큰을 전달하면서 모으고, 끝까지 읽히면 세션과 기록에 반영
fn committing_stream(
    mut tokens: AnswerTokens,
    session: Arc<Session>,
    history: Arc<dyn HistorySink>,
    question: String,
    state_tx: watch::Sender<PipelineState>,
) -> AnswerTokens {
    Box::pin(stream! {
        let mut answer = String::new();
        while let Some(token) = tokens.next().await {
            answer.push_str(&token);
            yield token;
        }

        session.commit_turns(&question, &answer);

        let record = HistoryRecord::new(session.user(), question.as_str(), answer.as_str());
        if let Err(e) = history.record(record).await {
            tracing::warn!("Failed to record history: {:#}", e);
        }

        state_tx.send_replace(PipelineState::Committed);
    })
}

// ============================================================================
// Answer
// ============================================================================

/// 진행 중인 답변
///
/// 답변 텍스트 조각의 스트림입니다. 끝까지 읽어야 대화 기록에 반영됩니다.
pub struct Answer {
    source: Source,
    passages: Vec<String>,
    state: watch::Receiver<PipelineState>,
    stream: AnswerTokens,
}

impl Answer {
    /// 선택된 소스
    pub fn source(&self) -> Source {
        self.source
    }

    /// 생성에 사용된 근거
    pub fn passages(&self) -> &[String] {
        &self.passages
    }

    /// 현재 진행 상태
    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    /// 스트림을 끝까지 읽어 전체 답변 반환
    pub async fn collect_text(mut self) -> String {
        let mut text = String::new();
        while let Some(token) = self.next().await {
            text.push_str(&token);
        }
        text
    }
}

impl Stream for Answer {
    type Item = String;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<String>> {
        self.stream.as_mut().poll_next(cx)
    }
}

// ============================================================================
// Tests
// ============================================================================
