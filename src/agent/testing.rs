//! 테스트용 프로바이더 스텁
//!
//! 네트워크 없이 파이프라인 전체를 돌리기 위한 결정적 구현들입니다.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::stream;

use crate::embedding::EmbeddingProvider;
use crate::history::{HistoryRecord, HistorySink};
use crate::llm::{ChatProvider, ChatRequest, TokenStream};
use crate::search::{SearchHit, WebSearchProvider};

// ============================================================================
// Embedding
// ============================================================================

const KEYWORD_BUCKETS: usize = 64;

/// 단어 해시 기반 bag-of-words 임베더 (정규화됨)
#[derive(Debug, Default)]
pub struct KeywordEmbedder {
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    /// embed_batch 호출 횟수
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn vectorize(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; KEYWORD_BUCKETS];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            vector[fnv1a(&token.to_lowercase()) % KEYWORD_BUCKETS] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

fn fnv1a(token: &str) -> usize {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in token.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash as usize
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| Self::vectorize(t)).collect())
    }

    fn dimension(&self) -> usize {
        KEYWORD_BUCKETS
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// 항상 실패하는 임베더
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(anyhow!("embedding service unavailable"))
    }

    fn dimension(&self) -> usize {
        KEYWORD_BUCKETS
    }

    fn name(&self) -> &str {
        "failing"
    }
}

// ============================================================================
// Web Search
// ============================================================================

/// 고정 결과를 돌려주는 검색
#[derive(Debug)]
pub struct StaticSearch {
    passages: Vec<String>,
    calls: AtomicUsize,
}

impl StaticSearch {
    pub fn new(passages: Vec<&str>) -> Self {
        Self {
            passages: passages.into_iter().map(String::from).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WebSearchProvider for StaticSearch {
    async fn search(&self, _query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .passages
            .iter()
            .take(top_k)
            .enumerate()
            .map(|(i, content)| SearchHit {
                title: format!("result {}", i + 1),
                url: format!("https://example.org/{}", i + 1),
                content: content.clone(),
            })
            .collect())
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// 항상 실패하는 검색
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingSearch;

#[async_trait]
impl WebSearchProvider for FailingSearch {
    async fn search(&self, _query: &str, _top_k: usize) -> Result<Vec<SearchHit>> {
        Err(anyhow!("search quota exceeded"))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

// ============================================================================
// Chat
// ============================================================================

/// 미리 정한 응답을 돌려주는 채팅 프로바이더
///
/// `complete` 는 라우팅 응답, `stream` 은 답변 토큰을 돌려줍니다.
#[derive(Debug, Default)]
pub struct ScriptedChat {
    routing_reply: Option<String>,
    tokens: Vec<String>,
    fail_stream_open: bool,
    fail_after: Option<usize>,
    complete_calls: AtomicUsize,
    stream_calls: AtomicUsize,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedChat {
    /// 라우팅 응답만 정의
    pub fn routing(reply: &str) -> Self {
        Self {
            routing_reply: Some(reply.to_string()),
            ..Self::default()
        }
    }

    /// 답변 토큰만 정의 (라우팅 호출은 실패)
    pub fn answering(tokens: &[&str]) -> Self {
        Self {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            ..Self::default()
        }
    }

    /// 모든 호출이 실패
    pub fn failing() -> Self {
        Self {
            fail_stream_open: true,
            ..Self::default()
        }
    }

    pub fn with_routing(mut self, reply: &str) -> Self {
        self.routing_reply = Some(reply.to_string());
        self
    }

    /// 토큰 n개를 보낸 뒤 스트림 에러
    pub fn fail_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    pub fn complete_calls(&self) -> usize {
        self.complete_calls.load(Ordering::SeqCst)
    }

    pub fn stream_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ChatRequest> {
        self.requests.lock().ok()?.last().cloned()
    }

    fn remember(&self, request: &ChatRequest) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
    }
}

#[async_trait]
impl ChatProvider for ScriptedChat {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        self.remember(request);
        self.routing_reply
            .clone()
            .ok_or_else(|| anyhow!("routing model unavailable"))
    }

    async fn stream(&self, request: &ChatRequest) -> Result<TokenStream> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        self.remember(request);
        if self.fail_stream_open {
            return Err(anyhow!("connection refused"));
        }

        let mut items: Vec<Result<String>> = match self.fail_after {
            Some(n) => self.tokens.iter().take(n).cloned().map(Ok).collect(),
            None => self.tokens.iter().cloned().map(Ok).collect(),
        };
        if self.fail_after.is_some() {
            items.push(Err(anyhow!("stream reset by peer")));
        }
        Ok(Box::pin(stream::iter(items)))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ============================================================================
// History
// ============================================================================

/// 메모리에 쌓는 기록 수신자
#[derive(Debug, Default)]
pub struct MemoryHistory {
    records: Mutex<Vec<HistoryRecord>>,
}

impl MemoryHistory {
    pub fn records(&self) -> Vec<HistoryRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl HistorySink for MemoryHistory {
    async fn record(&self, record: HistoryRecord) -> Result<()> {
        self.records
            .lock()
            .map_err(|e| anyhow!("Lock error: {}", e))?
            .push(record);
        Ok(())
    }
}

/// 항상 실패하는 기록 수신자
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingHistory;

#[async_trait]
impl HistorySink for FailingHistory {
    async fn record(&self, _record: HistoryRecord) -> Result<()> {
        Err(anyhow!("disk full"))
    }
}
