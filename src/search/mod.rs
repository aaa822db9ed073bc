//! 웹 검색 모듈
//!
//! 외부 검색 엔진에서 질문과 관련된 본문 조각(passage)을 가져옵니다.
//! 검색 실패는 예외가 아니라 단일 에러 passage로 변환됩니다.

mod tavily;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

pub use tavily::{TavilyClient, TAVILY_BASE_URL};

/// 기본 검색 결과 수
pub const DEFAULT_WEB_TOP_K: usize = 3;

/// 검색 결과 한 건
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub content: String,
}

/// 웹 검색 프로바이더 트레이트
#[async_trait]
pub trait WebSearchProvider: Send + Sync {
    /// 관련도 순으로 최대 `top_k` 건 검색
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>>;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

/// 실패를 에러 passage로 바꿔 주는 검색 래퍼
#[derive(Clone)]
pub struct WebSearch {
    provider: Arc<dyn WebSearchProvider>,
}

impl WebSearch {
    pub fn new(provider: Arc<dyn WebSearchProvider>) -> Self {
        Self { provider }
    }

    /// passage 텍스트 목록 반환
    ///
    /// 실패 시 `"Error searching web: ..."` 한 건만 담긴 목록을 돌려주므로
    /// 답변 생성기는 항상 무언가를 받습니다.
    pub async fn search(&self, query: &str, top_k: usize) -> Vec<String> {
        match self.provider.search(query, top_k).await {
            Ok(hits) => {
                tracing::debug!(
                    "{} returned {} results",
                    self.provider.name(),
                    hits.len()
                );
                hits.into_iter().map(|hit| hit.content).collect()
            }
            Err(e) => {
                tracing::warn!("Web search failed: {:#}", e);
                vec![format!("Error searching web: {:#}", e)]
            }
        }
    }
}
