//! Document Index - 문서 하나에 대한 청크 + 벡터 인덱스
//!
//! 인덱스 행 i 는 항상 청크 i 로 되돌아갑니다 (순서 정렬 불변식).
//! 새 문서가 들어오면 인덱스 전체를 새로 만들어 교체합니다 (병합 없음).

use sha2::{Digest, Sha256};

use crate::embedding::EmbeddingProvider;
use crate::error::IngestError;

use super::vector::{Chunk, FlatIndex};

/// 인덱스 메타데이터
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHandle {
    /// 원문 텍스트의 SHA-256 (hex)
    pub fingerprint: String,
    /// 청크 수
    pub chunk_count: usize,
    /// 임베딩 차원
    pub dimension: usize,
    /// 표시용 이름 (파일명 등)
    pub label: Option<String>,
}

/// 원문 텍스트 지문 계산
pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// 문서 인덱스 (빌드 후 불변)
#[derive(Debug)]
pub struct DocumentIndex {
    chunks: Vec<Chunk>,
    vectors: FlatIndex,
    handle: IndexHandle,
}

impl DocumentIndex {
    /// 청크 전체를 한 번의 배치 호출로 임베딩하여 인덱스 생성
    ///
    /// # Arguments
    /// * `source_text` - 지문 계산용 원문
    /// * `chunks` - 청커 출력
    /// * `embedder` - 임베딩 프로바이더
    pub async fn build(
        source_text: &str,
        chunks: Vec<String>,
        embedder: &dyn EmbeddingProvider,
        label: Option<String>,
    ) -> Result<Self, IngestError> {
        if chunks.is_empty() {
            return Err(IngestError::EmptyDocument);
        }

        let embeddings = embedder
            .embed_batch(&chunks)
            .await
            .map_err(|e| IngestError::Embedding(format!("{:#}", e)))?;

        if embeddings.len() != chunks.len() {
            return Err(IngestError::InconsistentEmbeddings(format!(
                "{} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let vectors = FlatIndex::from_rows(&embeddings).map_err(|row| {
            IngestError::InconsistentEmbeddings(format!(
                "vector {} has dimension {} (expected {})",
                row,
                embeddings[row].len(),
                embeddings[0].len()
            ))
        })?;

        let chunks: Vec<Chunk> = chunks
            .into_iter()
            .enumerate()
            .map(|(ordinal, text)| Chunk { text, ordinal })
            .collect();

        let handle = IndexHandle {
            fingerprint: fingerprint(source_text),
            chunk_count: chunks.len(),
            dimension: vectors.dimension(),
            label,
        };

        tracing::info!(
            "Built document index: {} chunks, dimension {}",
            handle.chunk_count,
            handle.dimension
        );

        Ok(Self {
            chunks,
            vectors,
            handle,
        })
    }

    /// 질문과 가장 가까운 청크 텍스트 k개 (거리 오름차순)
    ///
    /// 인덱스가 비었거나 임베딩이 실패하면 빈 목록을 반환합니다.
    pub async fn query(
        &self,
        question: &str,
        embedder: &dyn EmbeddingProvider,
        k: usize,
    ) -> Vec<String> {
        if self.vectors.is_empty() {
            return Vec::new();
        }

        let query_vector = match embedder.embed(question).await {
            Ok(vector) => vector,
            Err(e) => {
                tracing::warn!("Query embedding failed, continuing without context: {:#}", e);
                return Vec::new();
            }
        };

        if query_vector.len() != self.vectors.dimension() {
            tracing::warn!(
                "Query vector dimension {} does not match index dimension {}",
                query_vector.len(),
                self.vectors.dimension()
            );
            return Vec::new();
        }

        self.vectors
            .nearest(&query_vector, k)
            .into_iter()
            .filter_map(|hit| self.chunks.get(hit.ordinal))
            .map(|chunk| chunk.text.clone())
            .collect()
    }

    pub fn handle(&self) -> &IndexHandle {
        &self.handle
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
