//! 임베딩 모듈 - Gemini API를 통한 텍스트 벡터화
//!
//! 인덱스 빌드(청크 배치)와 질의 시점(질문 1건) 모두 같은 프로바이더를 사용합니다.
//!
//! ## 사용법
//! ```rust,ignore
//! let embedder = GeminiEmbedding::new(api_key, DEFAULT_DIMENSION)?;
//! let vectors = embedder.embed_batch(&chunks).await?;
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ============================================================================
// EmbeddingProvider Trait
// ============================================================================

/// 임베딩 프로바이더 트레이트
///
/// 텍스트를 고정 차원 벡터로 변환하는 인터페이스입니다.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// 배치 임베딩 (입력 순서와 같은 순서로 반환)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// 단일 텍스트 임베딩
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().context("Embedder returned no vector")
    }

    /// 임베딩 차원 수
    fn dimension(&self) -> usize;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

// ============================================================================
// Google Gemini Embedding
// ============================================================================

/// Gemini 배치 임베딩 API 엔드포인트
/// source: https://ai.google.dev/gemini-api/docs/embeddings
const GEMINI_BATCH_EMBED_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-embedding-001:batchEmbedContents";

const GEMINI_MODEL: &str = "models/gemini-embedding-001";

/// 기본 임베딩 차원
pub const DEFAULT_DIMENSION: usize = 768;

/// 한 번의 배치 요청에 담을 최대 텍스트 수
const MAX_BATCH_SIZE: usize = 100;
/// 429 에러 시 최대 재시도 횟수
const MAX_RETRIES: u32 = 3;
/// 재시도 시 초기 백오프 (ms)
const INITIAL_BACKOFF_MS: u64 = 2000;

/// Google Gemini 임베딩 구현체
#[derive(Debug)]
pub struct GeminiEmbedding {
    api_key: String,
    client: reqwest::Client,
    dimension: usize,
}

impl GeminiEmbedding {
    /// 새 Gemini 임베딩 인스턴스 생성
    ///
    /// # Arguments
    /// * `api_key` - Google AI API 키
    /// * `dimension` - 임베딩 차원 (768, 1536, 3072 중 선택)
    pub fn new(api_key: String, dimension: usize) -> Result<Self, ConfigError> {
        if api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential("GEMINI_API_KEY"));
        }

        if ![768, 1536, 3072].contains(&dimension) {
            return Err(ConfigError::InvalidSetting {
                name: "embedding dimension",
                reason: format!("{} (must be 768, 1536, or 3072)", dimension),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ConfigError::InvalidSetting {
                name: "http client",
                reason: e.to_string(),
            })?;

        Ok(Self {
            api_key,
            client,
            dimension,
        })
    }

    /// 배치 요청 본문 구성
    fn build_request<'a>(&self, texts: &[&'a str], task: TaskType) -> BatchEmbedRequest<'a> {
        BatchEmbedRequest {
            requests: texts
                .iter()
                .map(|&text| EmbedRequest {
                    model: GEMINI_MODEL,
                    content: EmbedContent {
                        parts: vec![EmbedPart { text }],
                    },
                    task_type: task.as_str(),
                    output_dimensionality: self.dimension,
                })
                .collect(),
        }
    }

    /// 비어 있지 않은 텍스트들을 한 번의 요청으로 임베딩 (429 시 재시도)
    async fn request_batch(&self, texts: &[&str], task: TaskType) -> Result<Vec<Vec<f32>>> {
        let request = self.build_request(texts, task);

        let mut attempt = 0;
        loop {
            let response = self
                .client
                .post(GEMINI_BATCH_EMBED_URL)
                .header("x-goog-api-key", &self.api_key)
                .json(&request)
                .send()
                .await
                .context("Failed to send embedding request")?;

            let status = response.status();
            let body = response
                .text()
                .await
                .context("Failed to read embedding response body")?;

            if status.is_success() {
                let parsed: BatchEmbedResponse =
                    serde_json::from_str(&body).context("Failed to parse embedding response")?;
                return Ok(parsed.embeddings.into_iter().map(|e| e.values).collect());
            }

            if status.as_u16() == 429 && attempt < MAX_RETRIES {
                let backoff = Duration::from_millis(INITIAL_BACKOFF_MS * 2u64.pow(attempt));
                tracing::warn!(
                    "Rate limit hit (429), backing off {:?} (attempt {}/{})",
                    backoff,
                    attempt + 1,
                    MAX_RETRIES
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
                continue;
            }

            if let Ok(error) = serde_json::from_str::<GeminiError>(&body) {
                anyhow::bail!(
                    "Gemini API error ({}): {}",
                    error.error.status,
                    error.error.message
                );
            }
            anyhow::bail!("Gemini API error ({}): {}", status, body);
        }
    }
}

/// 임베딩 용도 (문서 청크 / 검색 질문)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskType {
    Document,
    Query,
}

impl TaskType {
    fn as_str(self) -> &'static str {
        match self {
            TaskType::Document => "RETRIEVAL_DOCUMENT",
            TaskType::Query => "RETRIEVAL_QUERY",
        }
    }
}

/// Gemini 배치 요청 본문
#[derive(Debug, Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedRequest<'a>>,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    content: EmbedContent<'a>,
    #[serde(rename = "taskType")]
    task_type: &'a str,
    #[serde(rename = "outputDimensionality")]
    output_dimensionality: usize,
}

#[derive(Debug, Serialize)]
struct EmbedContent<'a> {
    parts: Vec<EmbedPart<'a>>,
}

#[derive(Debug, Serialize)]
struct EmbedPart<'a> {
    text: &'a str,
}

/// Gemini 배치 응답
#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

/// Gemini API 에러 응답
#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
    #[serde(default)]
    status: String,
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbedding {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // 빈 텍스트는 API 호출 없이 영벡터
        let mut results = vec![vec![0.0; self.dimension]; texts.len()];
        let pending: Vec<(usize, &str)> = texts
            .iter()
            .enumerate()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(i, text)| (i, text.as_str()))
            .collect();

        for (batch_no, batch) in pending.chunks(MAX_BATCH_SIZE).enumerate() {
            tracing::debug!(
                "Embedding batch {} ({} texts)",
                batch_no + 1,
                batch.len()
            );

            let inputs: Vec<&str> = batch.iter().map(|(_, text)| *text).collect();
            let vectors = self.request_batch(&inputs, TaskType::Document).await?;

            if vectors.len() != batch.len() {
                anyhow::bail!(
                    "Gemini returned {} embeddings for {} texts",
                    vectors.len(),
                    batch.len()
                );
            }

            for ((position, _), vector) in batch.iter().zip(vectors) {
                results[*position] = vector;
            }
        }

        Ok(results)
    }

    /// 질문 임베딩 (RETRIEVAL_QUERY)
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Ok(vec![0.0; self.dimension]);
        }

        let mut vectors = self.request_batch(&[text], TaskType::Query).await?;
        if vectors.len() != 1 {
            anyhow::bail!("Gemini returned {} embeddings for 1 query", vectors.len());
        }
        vectors.pop().context("Gemini returned no query embedding")
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        "gemini-embedding-001"
    }
}

// ============================================================================
// Tests
// ============================================================================
